//! Recall quality on the SM-2 six-point scale.

use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grades below this count as a failed review.
pub const PASSING_QUALITY: u8 = 3;

/// Highest grade on the scale (perfect recall).
pub const MAX_QUALITY: u8 = 5;

/// A validated quality rating: 0 = complete blackout, 5 = perfect response.
///
/// The only way to build one is through a checked constructor, so the
/// scheduler never sees an out-of-range grade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const BLACKOUT: Quality = Quality(0);
    pub const PERFECT: Quality = Quality(MAX_QUALITY);

    pub fn new(value: u8) -> Result<Self, SchedulerError> {
        if value > MAX_QUALITY {
            return Err(SchedulerError::InvalidQuality(i64::from(value)));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_passing(self) -> bool {
        self.0 >= PASSING_QUALITY
    }

    /// All six grades, lowest first.
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=MAX_QUALITY).map(Quality)
    }
}

impl TryFrom<i64> for Quality {
    type Error = SchedulerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_QUALITY)
            .map(Quality)
            .ok_or(SchedulerError::InvalidQuality(value))
    }
}

impl TryFrom<u8> for Quality {
    type Error = SchedulerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Quality::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl FromStr for Quality {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| SchedulerError::UnparsableQuality(trimmed.to_string()))?;
        Quality::try_from(value)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_full_scale() {
        for v in 0..=5u8 {
            assert_eq!(Quality::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(Quality::new(6), Err(SchedulerError::InvalidQuality(6)));
        assert_eq!(Quality::try_from(-1i64), Err(SchedulerError::InvalidQuality(-1)));
        assert_eq!(Quality::try_from(300i64), Err(SchedulerError::InvalidQuality(300)));
    }

    #[test]
    fn test_parse() {
        assert_eq!(" 4 ".parse::<Quality>().unwrap().value(), 4);
        assert_eq!("7".parse::<Quality>(), Err(SchedulerError::InvalidQuality(7)));
        assert_eq!(
            "3.5".parse::<Quality>(),
            Err(SchedulerError::UnparsableQuality("3.5".to_string()))
        );
        assert!("good".parse::<Quality>().is_err());
    }

    #[test]
    fn test_passing_threshold() {
        let passing: Vec<u8> = Quality::all().filter(|q| q.is_passing()).map(u8::from).collect();
        assert_eq!(passing, vec![3, 4, 5]);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        assert_eq!(serde_json::from_str::<Quality>("5").unwrap(), Quality::PERFECT);
        assert!(serde_json::from_str::<Quality>("9").is_err());
        assert_eq!(serde_json::to_string(&Quality::BLACKOUT).unwrap(), "0");
    }
}
