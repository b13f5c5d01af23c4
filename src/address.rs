//! Entity addresses: `object_name[:user_id[/session_id]][@voxel_spacing]`
//!
//! Any component may be `*` or contain `*` wildcards. Omitted components match
//! anything. For segmentations the object part matches the segmentation name.

use crate::codec::{PicksKey, SegmentationKey, Spacing};
use crate::error::KeyError;
use std::fmt;
use std::str::FromStr;

/// One address component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Any,
    Exact(String),
    Glob(String),
}

impl Pattern {
    fn parse(raw: &str) -> Self {
        match raw {
            "" | "*" => Pattern::Any,
            s if s.contains('*') => Pattern::Glob(s.to_string()),
            s => Pattern::Exact(s.to_string()),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Exact(expected) => expected == value,
            Pattern::Glob(glob) => glob_match(glob.as_bytes(), value.as_bytes()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => f.write_str("*"),
            Pattern::Exact(s) | Pattern::Glob(s) => f.write_str(s),
        }
    }
}

/// `*` matches any run of characters
fn glob_match(pattern: &[u8], value: &[u8]) -> bool {
    let (mut p, mut v) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while v < value.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, v));
            p += 1;
        } else if p < pattern.len() && pattern[p] == value[v] {
            p += 1;
            v += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            v = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}

/// A parsed entity address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityAddress {
    pub object: Pattern,
    pub user_id: Pattern,
    pub session_id: Pattern,
    pub voxel_spacing: Option<Spacing>,
}

impl EntityAddress {
    pub fn parse(address: &str) -> Result<Self, KeyError> {
        let invalid = |reason: &str| KeyError::Undecodable {
            name: address.to_string(),
            reason: reason.to_string(),
        };
        let address_trimmed = address.trim();
        if address_trimmed.is_empty() {
            return Err(invalid("empty address"));
        }

        let (body, spacing) = match address_trimmed.split_once('@') {
            Some((body, spacing)) => {
                let spacing = Spacing::parse(spacing)
                    .map_err(|e| invalid(&format!("bad voxel spacing: {}", e)))?;
                (body, Some(spacing))
            }
            None => (address_trimmed, None),
        };

        let (object, rest) = match body.split_once(':') {
            Some((object, rest)) => (object, Some(rest)),
            None => (body, None),
        };
        if object.is_empty() {
            return Err(invalid("missing object name"));
        }
        let (user, session) = match rest {
            Some(rest) => match rest.split_once('/') {
                Some((user, session)) => (user, Some(session)),
                None => (rest, None),
            },
            None => ("*", None),
        };
        if session.map(|s| s.contains('/')).unwrap_or(false) || object.contains('/') {
            return Err(invalid("unexpected '/'"));
        }

        Ok(Self {
            object: Pattern::parse(object),
            user_id: Pattern::parse(user),
            // A trailing '/' addresses the empty session exactly
            session_id: match session {
                Some("") => Pattern::Exact(String::new()),
                Some(session) => Pattern::parse(session),
                None => Pattern::Any,
            },
            voxel_spacing: spacing,
        })
    }

    /// Whether a picks (or mesh) key is addressed
    pub fn matches_picks(&self, key: &PicksKey) -> bool {
        self.object.matches(&key.object_name)
            && self.user_id.matches(&key.user_id)
            && self.session_id.matches(&key.session_id)
    }

    /// Whether a segmentation key is addressed
    pub fn matches_segmentation(&self, key: &SegmentationKey) -> bool {
        self.object.matches(&key.name)
            && self.user_id.matches(&key.user_id)
            && self.session_id.matches(&key.session_id)
            && self
                .voxel_spacing
                .map(|s| s == key.voxel_spacing)
                .unwrap_or(true)
    }
}

impl FromStr for EntityAddress {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EntityAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.object, self.user_id, self.session_id)?;
        if let Some(spacing) = self.voxel_spacing {
            write!(f, "@{}", spacing)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_address() {
        let address = EntityAddress::parse("ribosome:user1/0@10.0").unwrap();
        assert_eq!(address.object, Pattern::Exact("ribosome".to_string()));
        assert_eq!(address.user_id, Pattern::Exact("user1".to_string()));
        assert_eq!(address.session_id, Pattern::Exact("0".to_string()));
        assert_eq!(address.voxel_spacing, Some(Spacing::new(10.0).unwrap()));
        assert_eq!(address.to_string(), "ribosome:user1/0@10.000");
    }

    #[test]
    fn test_omitted_components_match_anything() {
        let address = EntityAddress::parse("ribosome").unwrap();
        assert!(address.matches_picks(&PicksKey::new("ribosome", "alice", "1")));
        assert!(!address.matches_picks(&PicksKey::new("membrane", "alice", "1")));

        let address = EntityAddress::parse("ribosome:alice").unwrap();
        assert!(address.matches_picks(&PicksKey::new("ribosome", "alice", "7")));
        assert!(!address.matches_picks(&PicksKey::new("ribosome", "bob", "7")));
    }

    #[test]
    fn test_wildcards() {
        let address = EntityAddress::parse("*:user*/*").unwrap();
        assert!(address.matches_picks(&PicksKey::new("ribosome", "user1", "0")));
        assert!(address.matches_picks(&PicksKey::new("membrane", "user", "")));
        assert!(!address.matches_picks(&PicksKey::new("membrane", "tool", "0")));
    }

    #[test]
    fn test_empty_session_is_addressable() {
        let address = EntityAddress::parse("ribosome:user1/").unwrap();
        assert_eq!(address.session_id, Pattern::Exact(String::new()));
        assert!(address.matches_picks(&PicksKey::new("ribosome", "user1", "")));
        assert!(!address.matches_picks(&PicksKey::new("ribosome", "user1", "0")));
        assert_eq!(address.to_string(), "ribosome:user1/");
    }

    #[test]
    fn test_segmentation_matching_uses_spacing() {
        let key = SegmentationKey::new(Spacing::new(10.0).unwrap(), "membrane", "u", "0", false);
        assert!(EntityAddress::parse("membrane:u/0@10.000").unwrap().matches_segmentation(&key));
        assert!(EntityAddress::parse("membrane:u/0").unwrap().matches_segmentation(&key));
        assert!(!EntityAddress::parse("membrane:u/0@7.84").unwrap().matches_segmentation(&key));
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", ":user/0", "ribosome@abc", "ribosome:u/0/1", "a@1@2"] {
            assert!(EntityAddress::parse(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match(b"a*c", b"abbbc"));
        assert!(glob_match(b"*", b""));
        assert!(!glob_match(b"a*c", b"abd"));
        assert!(glob_match(b"*ome", b"ribosome"));
    }
}
