//! Unit types for configured quantities.
//!
//! Lengths, feedrates and accelerations are kept apart at the type level;
//! G-code registers themselves stay plain `f32` millimeters.

use core::ops::Mul;

use serde::Deserialize;

/// Millimeters per inch, the `G20` unit scale.
pub const MM_PER_INCH: f32 = 25.4;

/// Linear position or distance in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f32);

impl Millimeters {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }
}

/// Feedrate in millimeters per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerSec(pub f32);

impl MmPerSec {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// Convert a G-code `F` word, which is given in mm/min.
    #[inline]
    pub fn from_mm_per_min(mm_per_min: f32) -> Self {
        Self(mm_per_min / 60.0)
    }
}

impl Mul<f32> for MmPerSec {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Acceleration in millimeters per second squared. Zero means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerSecSquared(pub f32);

impl MmPerSecSquared {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// True for the configured "no acceleration limit".
    #[inline]
    pub fn is_unlimited(self) -> bool {
        self.0 == 0.0
    }
}

/// Absolute motor position in steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Steps(pub i64);

impl Steps {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Position in millimeters.
    #[inline]
    pub fn to_mm(self, steps_per_mm: f32) -> Millimeters {
        Millimeters(self.0 as f32 / steps_per_mm)
    }

    /// Nearest step to `mm`. Rounding from the absolute position keeps
    /// consecutive moves from accumulating error.
    #[inline]
    pub fn from_mm(mm: Millimeters, steps_per_mm: f32) -> Self {
        Self(libm::roundf(mm.0 * steps_per_mm) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedrate_conversion() {
        assert!((MmPerSec::from_mm_per_min(600.0).value() - 10.0).abs() < 1e-6);
        assert_eq!(MmPerSec(10.0) * 0.5, MmPerSec(5.0));
    }

    #[test]
    fn test_steps_round_to_nearest() {
        assert_eq!(Steps::from_mm(Millimeters(0.99), 10.0), Steps(10));
        assert_eq!(Steps::from_mm(Millimeters(-0.26), 10.0), Steps(-3));
        let mm = Steps(1600).to_mm(160.0);
        assert!((mm.value() - 10.0).abs() < 1e-6);
    }
}
