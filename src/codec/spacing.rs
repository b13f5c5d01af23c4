//! Voxel spacing canonicalisation

use crate::error::KeyError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SCALE: f64 = 1000.0;

/// Canonical voxel spacing, stored as an integer number of thousandths
///
/// Two values that format to the same three-decimal string are the same spacing;
/// `canonical` and `parse` are exact inverses on canonical strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Spacing {
    milli: u64,
}

impl Spacing {
    pub fn new(value: f64) -> Result<Self, KeyError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(KeyError::InvalidSpacing(format!(
                "{} (must be a positive finite number)",
                value
            )));
        }
        let scaled = (value * SCALE).round();
        if scaled < 1.0 || scaled >= u64::MAX as f64 {
            return Err(KeyError::InvalidSpacing(format!(
                "{} (outside representable range)",
                value
            )));
        }
        Ok(Self {
            milli: scaled as u64,
        })
    }

    /// Value in angstrom
    pub fn value(&self) -> f64 {
        self.milli as f64 / SCALE
    }

    /// Canonical string, always three decimals (e.g. `10.000`)
    pub fn canonical(&self) -> String {
        format!("{}.{:03}", self.milli / 1000, self.milli % 1000)
    }

    pub fn parse(s: &str) -> Result<Self, KeyError> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed != s {
            return Err(KeyError::InvalidSpacing(format!("'{}'", s)));
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| KeyError::InvalidSpacing(format!("'{}' is not a number", s)))?;
        Self::new(value)
    }

    /// Whether `s` is exactly the canonical form of this spacing
    pub fn is_canonical(s: &str) -> bool {
        Self::parse(s).map(|sp| sp.canonical() == s).unwrap_or(false)
    }
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for Spacing {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<f64> for Spacing {
    type Error = KeyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Spacing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

impl<'de> Deserialize<'de> for Spacing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Spacing::new(value).map_err(serde::de::Error::custom)
    }
}
