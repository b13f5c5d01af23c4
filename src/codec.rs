//! Entity Key Codec
//!
//! Bidirectional mapping between structured entity identity and the path segment
//! that names it on storage. Each entity kind has its own key type implementing
//! [`EntityKey`]; the merge engine is generic over it.
//!
//! Composite file names join their components with [`SEPARATOR`], so that
//! character (and a few others that would make names ambiguous) is refused in
//! component values before anything is written.

use crate::error::KeyError;
use std::fmt::Debug;

pub mod keys;
pub mod spacing;

pub use keys::{
    FeaturesKey, MeshKey, ObjectKey, PicksKey, RunKey, SegmentationKey, TomogramKey,
    VoxelSpacingKey,
};
pub use spacing::Spacing;

/// Separator between components of a composite file name
pub const SEPARATOR: char = '_';

/// Longest encoded name accepted at creation (bytes), the common filesystem limit
pub const MAX_NAME_BYTES: usize = 255;

/// Characters that may never appear in a composite key component
const RESERVED_CHARS: &[char] = &[SEPARATOR, '/', '\\', ':', '@', '*', '\0'];

/// Characters that may never appear in a run name
const RESERVED_RUN_CHARS: &[char] = &['/', '\\', '\0'];

/// Structured identity of one entity kind
pub trait EntityKey: Clone + Ord + Eq + Debug + Send + Sync + 'static {
    /// Entity kind label (logging and diagnostics)
    const KIND: &'static str;

    /// Encode to the path segment used on storage
    fn encode(&self) -> String;

    /// Decode a raw path segment
    ///
    /// `Ok(None)` means the name belongs to a sibling kind that shares the same
    /// directory and is skipped silently; `Err` means the name is malformed.
    fn decode(name: &str) -> Result<Option<Self>, KeyError>;

    /// Check every component before a write
    fn validate(&self) -> Result<(), KeyError>;
}

/// Validate one component of a composite name
pub fn validate_component(
    component: &'static str,
    value: &str,
    allow_empty: bool,
) -> Result<(), KeyError> {
    if value.is_empty() {
        return if allow_empty {
            Ok(())
        } else {
            Err(KeyError::Empty { component })
        };
    }
    if let Some(ch) = value
        .chars()
        .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
    {
        return Err(KeyError::ReservedChar {
            component,
            value: value.to_string(),
            ch,
        });
    }
    if value.starts_with('.') {
        return Err(KeyError::Illegal {
            component,
            value: value.to_string(),
            reason: "leading '.' is reserved for hidden entries",
        });
    }
    if value.trim() != value {
        return Err(KeyError::Illegal {
            component,
            value: value.to_string(),
            reason: "leading or trailing whitespace",
        });
    }
    Ok(())
}

/// Validate a run name (a directory name, so the separator is allowed)
pub fn validate_run_name(value: &str) -> Result<(), KeyError> {
    const COMPONENT: &str = "run name";
    if value.is_empty() {
        return Err(KeyError::Empty {
            component: COMPONENT,
        });
    }
    if let Some(ch) = value
        .chars()
        .find(|c| RESERVED_RUN_CHARS.contains(c) || c.is_control())
    {
        return Err(KeyError::ReservedChar {
            component: COMPONENT,
            value: value.to_string(),
            ch,
        });
    }
    if value.starts_with('.') {
        return Err(KeyError::Illegal {
            component: COMPONENT,
            value: value.to_string(),
            reason: "leading '.' is reserved for hidden entries",
        });
    }
    if value.trim() != value {
        return Err(KeyError::Illegal {
            component: COMPONENT,
            value: value.to_string(),
            reason: "leading or trailing whitespace",
        });
    }
    validate_length(value)
}

pub(crate) fn validate_length(encoded: &str) -> Result<(), KeyError> {
    if encoded.len() > MAX_NAME_BYTES {
        return Err(KeyError::Illegal {
            component: "encoded name",
            value: encoded.to_string(),
            reason: "longer than 255 bytes",
        });
    }
    Ok(())
}

/// Whether a raw name is hidden (temporary files, staging entries, OS droppings)
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
