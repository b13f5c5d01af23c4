//! Listing scopes
//!
//! A scope is the parent directory of a listing, addressed separately on each side:
//! a static `VoxelSpacing10.0/` and an overlay `VoxelSpacing10.000/` are the same
//! logical parent but different paths.

use crate::backend::join_path;
use crate::overlay::Side;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    static_path: String,
    overlay_path: String,
}

impl Scope {
    /// The backend roots
    pub fn root() -> Self {
        Self::new("")
    }

    /// Same path on both sides
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            static_path: path.clone(),
            overlay_path: path,
        }
    }

    pub fn path(&self, side: Side) -> &str {
        match side {
            Side::Static => &self.static_path,
            Side::Overlay => &self.overlay_path,
        }
    }

    /// A fixed-name child directory (e.g. `Picks`)
    pub fn join(&self, segment: &str) -> Self {
        Self {
            static_path: join_path(&[&self.static_path, segment]),
            overlay_path: join_path(&[&self.overlay_path, segment]),
        }
    }

    /// A child entity directory, using the raw name observed on each side
    ///
    /// A side that does not hold the entity yet uses the canonical name, which is
    /// where a later write on that side lands.
    pub fn child(
        &self,
        static_name: Option<&str>,
        overlay_name: Option<&str>,
        canonical: &str,
    ) -> Self {
        Self {
            static_path: join_path(&[&self.static_path, static_name.unwrap_or(canonical)]),
            overlay_path: join_path(&[&self.overlay_path, overlay_name.unwrap_or(canonical)]),
        }
    }

    /// Path of an entry named `name` inside this scope on `side`
    pub fn entry(&self, side: Side, name: &str) -> String {
        join_path(&[self.path(side), name])
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.static_path == self.overlay_path {
            write!(f, "/{}", self.overlay_path)
        } else {
            write!(f, "/{} (static: /{})", self.overlay_path, self.static_path)
        }
    }
}
