//! Job priority levels (lower number = higher priority).

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A priority value outside the accepted range. `got` is the value as the
/// caller wrote it, which need not fit an `i64`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("priority must be between {min} and {max} (got {got})", min = Priority::MIN, max = Priority::MAX)]
pub struct PriorityError {
    pub got: String,
}

/// Validated priority level in `0..=3`; 0 is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Priority(u8);

const LABELS: [&str; Priority::LEVELS] = ["0", "1", "2", "3"];

impl Priority {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 3;
    pub const LEVELS: usize = (Self::MAX - Self::MIN) as usize + 1;

    pub const CRITICAL: Priority = Priority(0);
    pub const HIGH: Priority = Priority(1);
    pub const NORMAL: Priority = Priority(2);
    pub const LOW: Priority = Priority(3);

    /// Validate a raw level coming from a caller.
    pub fn new(level: i64) -> Result<Self, PriorityError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&level) {
            Ok(Priority(level as u8))
        } else {
            Err(PriorityError {
                got: level.to_string(),
            })
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Lane index inside the queue.
    pub(crate) fn index(self) -> usize {
        (self.0 - Self::MIN) as usize
    }

    /// Metric label value.
    pub fn label(self) -> &'static str {
        LABELS[self.index()]
    }

    /// All levels, most urgent first.
    pub fn all() -> [Priority; Self::LEVELS] {
        [Self::CRITICAL, Self::HIGH, Self::NORMAL, Self::LOW]
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<i64> for Priority {
    type Error = PriorityError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_full_range() {
        for level in 0..=3 {
            assert_eq!(Priority::new(level).unwrap().level() as i64, level);
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(Priority::new(9), Err(PriorityError { got: "9".into() }));
        assert_eq!(Priority::new(-1), Err(PriorityError { got: "-1".into() }));
        assert_eq!(
            Priority::new(4).unwrap_err().to_string(),
            "priority must be between 0 and 3 (got 4)"
        );
    }

    #[test]
    fn test_try_from_level() {
        assert_eq!(Priority::try_from(0), Ok(Priority::CRITICAL));
        assert!(Priority::try_from(i64::MAX).is_err());
    }

    #[test]
    fn test_default_is_normal() {
        assert_eq!(Priority::default().level(), 2);
    }

    #[test]
    fn test_labels_and_ordering() {
        let all = Priority::all();
        assert_eq!(all.map(Priority::label), ["0", "1", "2", "3"]);
        assert!(Priority::CRITICAL < Priority::LOW);
        assert_eq!(Priority::HIGH.to_string(), "P1");
    }

    #[test]
    fn test_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Priority::LOW).unwrap(), "3");
    }
}
