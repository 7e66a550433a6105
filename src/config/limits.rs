//! Soft limit configuration and types.

use serde::Deserialize;

use super::units::Millimeters;

/// Software travel limits of one axis, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SoftLimits {
    /// Minimum allowed position in millimeters.
    #[serde(rename = "min_mm")]
    pub min: Millimeters,

    /// Maximum allowed position in millimeters.
    #[serde(rename = "max_mm")]
    pub max: Millimeters,
}

impl SoftLimits {
    /// Create new soft limits.
    pub fn new(min: Millimeters, max: Millimeters) -> Self {
        Self { min, max }
    }

    /// Check if limits are valid (min < max).
    pub fn is_valid(&self) -> bool {
        self.min.0 < self.max.0
    }

    /// Check if a position is within limits (inclusive).
    pub fn contains(&self, position: Millimeters) -> bool {
        position.0 >= self.min.0 && position.0 <= self.max.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_limits_inclusive() {
        let limits = SoftLimits::new(Millimeters(0.0), Millimeters(100.0));

        assert!(limits.contains(Millimeters(0.0)));
        assert!(limits.contains(Millimeters(100.0)));
        assert!(limits.contains(Millimeters(42.0)));
        assert!(!limits.contains(Millimeters(150.0)));
        assert!(!limits.contains(Millimeters(-0.1)));
    }

    #[test]
    fn test_soft_limits_validity() {
        assert!(SoftLimits::new(Millimeters(-5.0), Millimeters(5.0)).is_valid());
        assert!(!SoftLimits::new(Millimeters(5.0), Millimeters(5.0)).is_valid());
    }
}
