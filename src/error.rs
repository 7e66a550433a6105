//! Error types for gcode-motion.
//!
//! Provides unified error handling across configuration, the motion queue and
//! session I/O. Recoverable command-level violations are modeled separately as
//! [`PolicyError`]; they are reported to the session and never end it.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all gcode-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motion queue or backend failure
    Queue(QueueError),
    /// Session transport error (file or socket)
    Io(String),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(String),
    /// File I/O error
    IoError(String),
    /// Speed factor must be > 0
    InvalidSpeedFactor(f32),
    /// Axis table key is not a known axis letter
    UnknownAxis(String),
    /// Steps per mm must be > 0
    InvalidStepsPerMm {
        /// Axis letter
        axis: char,
        /// Configured value
        value: f32,
    },
    /// Max feedrate must be > 0
    InvalidMaxFeedrate {
        /// Axis letter
        axis: char,
        /// Configured value
        value: f32,
    },
    /// Acceleration must be >= 0
    InvalidAcceleration {
        /// Axis letter
        axis: char,
        /// Configured value
        value: f32,
    },
    /// Invalid soft limits (min must be < max)
    InvalidSoftLimits {
        /// Axis letter
        axis: char,
        /// Minimum limit value
        min: f32,
        /// Maximum limit value
        max: f32,
    },
    /// Default feedrate must be > 0
    InvalidDefaultFeedrate(f32),
    /// Axis mapping contains something other than axis letters or `_`
    InvalidAxisMapping(String),
    /// An axis is mapped to a motor but has no `[axes.<letter>]` table
    MissingAxisConfig(char),
    /// Home order contains something other than axis letters
    InvalidHomeOrder(String),
    /// Both endstops of an axis are marked for homing
    DuplicateHomingEndstop(char),
    /// Endstop switch number out of range
    InvalidEndstopSwitch {
        /// Axis letter
        axis: char,
        /// Configured switch number
        switch: u8,
    },
    /// The same switch is configured with different trigger levels
    ConflictingEndstopTrigger(u8),
}

/// Motion queue errors. Any of these ends the current session.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueError {
    /// The queue has been shut down and accepts no more instructions
    Shutdown,
    /// The consumer reported a hardware fault
    BackendFault(String),
}

/// Command-level policy violations.
///
/// These are recoverable: the command is dropped, a diagnostic is emitted and
/// the session continues.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Motion attempted before the machine was homed
    HomingRequired,
    /// Target outside an axis' soft limits
    OutOfRange {
        /// Axis letter
        axis: char,
        /// Requested position in mm
        target: f32,
        /// Minimum limit in mm
        min: f32,
        /// Maximum limit in mm
        max: f32,
    },
    /// Feedrate factor must be > 0
    InvalidFeedrateFactor(f32),
    /// Move needs more steps on one motor than a segment can carry
    StepRange(char),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Queue(e) => write!(f, "Motion queue error: {}", e),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::InvalidSpeedFactor(v) => {
                write!(f, "Invalid speed factor: {}. Must be > 0", v)
            }
            ConfigError::UnknownAxis(name) => write!(f, "Unknown axis '{}'", name),
            ConfigError::InvalidStepsPerMm { axis, value } => {
                write!(f, "Invalid steps_per_mm for axis {}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidMaxFeedrate { axis, value } => {
                write!(f, "Invalid max_feedrate for axis {}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidAcceleration { axis, value } => {
                write!(f, "Invalid acceleration for axis {}: {}. Must be >= 0", axis, value)
            }
            ConfigError::InvalidSoftLimits { axis, min, max } => write!(
                f,
                "Invalid soft limits for axis {}: min ({}) must be < max ({})",
                axis, min, max
            ),
            ConfigError::InvalidDefaultFeedrate(v) => {
                write!(f, "Invalid default feedrate: {}. Must be > 0", v)
            }
            ConfigError::InvalidAxisMapping(mapping) => {
                write!(f, "Invalid axis mapping '{}'", mapping)
            }
            ConfigError::MissingAxisConfig(axis) => {
                write!(f, "Axis {} is mapped to a motor but not configured", axis)
            }
            ConfigError::InvalidHomeOrder(order) => write!(f, "Invalid home order '{}'", order),
            ConfigError::DuplicateHomingEndstop(axis) => {
                write!(f, "Axis {} has more than one homing endstop", axis)
            }
            ConfigError::InvalidEndstopSwitch { axis, switch } => write!(
                f,
                "Invalid endstop switch {} on axis {}. Valid switches: 0 (unwired) or 1-{}",
                switch,
                axis,
                crate::config::ENDSTOP_SWITCH_COUNT
            ),
            ConfigError::ConflictingEndstopTrigger(switch) => {
                write!(f, "Endstop switch {} configured with conflicting trigger levels", switch)
            }
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Shutdown => write!(f, "Motion queue is shut down"),
            QueueError::BackendFault(msg) => write!(f, "Backend fault: {}", msg),
        }
    }
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::HomingRequired => write!(f, "please home machine first (G28)."),
            PolicyError::OutOfRange {
                axis,
                target,
                min,
                max,
            } => write!(
                f,
                "outside machine limit: axis {} = {:.3}mm not within [{:.3}, {:.3}]. Ignoring move!",
                axis, target, min, max
            ),
            PolicyError::InvalidFeedrateFactor(v) => {
                write!(f, "invalid feedrate factor {}. Must be > 0", v)
            }
            PolicyError::StepRange(axis) => {
                write!(f, "move exceeds step range on axis {}. Ignoring move!", axis)
            }
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Error::Queue(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl std::error::Error for Error {}

impl std::error::Error for ConfigError {}

impl std::error::Error for QueueError {}

impl std::error::Error for PolicyError {}
