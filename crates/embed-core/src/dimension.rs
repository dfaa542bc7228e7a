//! Display size hints for embedded frames
//!
//! Services and saved records describe width/height either as a bare number
//! (pixels) or as a CSS length string such as `"100%"` or `"320px"`.

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that can occur while validating a dimension
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DimensionError {
    /// Number is NaN, infinite or negative
    #[error("Dimension must be a finite, non-negative number, got {0}")]
    NotFinite(f64),

    /// String is not a CSS length
    #[error("Invalid CSS length: {0:?}")]
    InvalidLength(String),

    /// Value is neither a number nor a string
    #[error("Dimension must be a number or a CSS length string")]
    WrongKind,
}

/// Result type for dimension operations
pub type Result<T> = std::result::Result<T, DimensionError>;

/// Width or height hint
///
/// Whole pixel values serialize as integers, so `580` saves as `580`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    /// Fixed pixel value
    Pixels(f64),
    /// CSS length (`"100%"`, `"24em"`, `"auto"`)
    Length(String),
}

impl Dimension {
    /// Create a pixel dimension
    pub fn px(value: f64) -> Self {
        Dimension::Pixels(value)
    }

    /// Parse and validate a CSS length string
    ///
    /// Unitless numbers are accepted and kept as strings, matching how an
    /// HTML `height` attribute is written.
    pub fn parse_css(value: &str) -> Result<Self> {
        static CSS_LENGTH: OnceLock<Regex> = OnceLock::new();
        let re = CSS_LENGTH.get_or_init(|| {
            Regex::new(
                r"^(?:auto|(?:\d+(?:\.\d+)?|\.\d+)(?:px|%|em|rem|ex|ch|vh|vw|vmin|vmax|cm|mm|in|pt|pc)?)$",
            )
            .expect("CSS length regex is valid")
        });

        let trimmed = value.trim();
        if re.is_match(trimmed) {
            Ok(Dimension::Length(trimmed.to_string()))
        } else {
            Err(DimensionError::InvalidLength(value.to_string()))
        }
    }

    /// Validate an untyped configuration value
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => {
                let n = n.as_f64().ok_or(DimensionError::WrongKind)?;
                if n.is_finite() && n >= 0.0 {
                    Ok(Dimension::Pixels(n))
                } else {
                    Err(DimensionError::NotFinite(n))
                }
            }
            Value::String(s) => Self::parse_css(s),
            _ => Err(DimensionError::WrongKind),
        }
    }
}

// Largest integer an f64 holds exactly
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Dimension::Pixels(px) if px.fract() == 0.0 && px.abs() <= MAX_EXACT_INTEGER => {
                serializer.serialize_i64(*px as i64)
            }
            Dimension::Pixels(px) => serializer.serialize_f64(*px),
            Dimension::Length(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Pixels(px) => write!(f, "{}px", px),
            Dimension::Length(s) => f.write_str(s),
        }
    }
}
