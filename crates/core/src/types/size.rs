//! Size variant identifier.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A size variant chosen for a cart line (e.g. `"M"`, `"42"`).
///
/// Products without sizes, or lines added without a choice, use the
/// [`Size::DEFAULT`] sentinel. Empty or whitespace-only input is normalised
/// to the sentinel so `""` and `"default"` never form two distinct lines.
///
/// ```
/// use atelier_core::Size;
///
/// assert_eq!(Size::new("  "), Size::default());
/// assert_eq!(Size::new(" M "), Size::new("M"));
/// assert!(Size::default().is_default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Size(String);

impl Size {
    /// Sentinel used when no size was chosen.
    pub const DEFAULT: &'static str = "default";

    /// Create a size, trimming whitespace and mapping empty input to the sentinel.
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            Self::default()
        } else {
            Self(trimmed.to_owned())
        }
    }

    /// Returns true if this is the "no size chosen" sentinel.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }

    /// Returns the size as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Size {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Size {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Size {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// Stored carts may carry `""` or a missing size; both mean the sentinel.
impl<'de> Deserialize<'de> for Size {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map_or_else(Self::default, Self::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_size_is_default() {
        assert!(Size::new("").is_default());
        assert_eq!(Size::new("").as_str(), "default");
    }

    #[test]
    fn test_size_is_trimmed() {
        assert_eq!(Size::new(" XL\t").as_str(), "XL");
    }

    #[test]
    fn test_deserialize_null_and_empty() {
        let from_null: Size = serde_json::from_str("null").unwrap();
        let from_empty: Size = serde_json::from_str("\"\"").unwrap();
        assert!(from_null.is_default());
        assert!(from_empty.is_default());

        let from_value: Size = serde_json::from_str("\"S\"").unwrap();
        assert_eq!(from_value, Size::new("S"));
    }
}
