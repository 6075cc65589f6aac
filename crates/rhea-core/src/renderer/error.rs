// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Contract violations (`OutOfRange`, `InvalidState`, `UnsupportedFeature`)
//! are surfaced to the caller immediately and never clamped. `DriverFatal`
//! wraps a [`DriverError`] and is never retried inside the render system.

use std::fmt;

/// The hardware limit an index was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// A texture unit (sampler stage).
    TextureUnit,
    /// A user clip plane.
    ClipPlane,
    /// A fixed-function light slot.
    Light,
    /// A generic vertex attribute slot.
    VertexAttribute,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LimitKind::TextureUnit => "texture unit",
            LimitKind::ClipPlane => "clip plane",
            LimitKind::Light => "light",
            LimitKind::VertexAttribute => "vertex attribute",
        };
        f.write_str(name)
    }
}

/// An unrecoverable failure reported by the graphics driver or the context
/// system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The context was lost (GPU reset, driver update, display teardown).
    ContextLost,
    /// The device ran out of memory.
    OutOfMemory,
    /// The window system failed to create a context.
    ContextCreationFailed(String),
    /// The window system failed to make a context current.
    MakeCurrentFailed(String),
    /// The driver rejected a call as an invalid operation.
    InvalidOperation {
        /// The name of the rejected call.
        call: &'static str,
    },
    /// Any other driver error code.
    Unknown {
        /// The raw error code.
        code: u32,
    },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::ContextLost => write!(f, "The graphics context was lost."),
            DriverError::OutOfMemory => write!(f, "The graphics device is out of memory."),
            DriverError::ContextCreationFailed(msg) => {
                write!(f, "Failed to create graphics context: {msg}")
            }
            DriverError::MakeCurrentFailed(msg) => {
                write!(f, "Failed to make graphics context current: {msg}")
            }
            DriverError::InvalidOperation { call } => {
                write!(f, "The driver rejected '{call}' as an invalid operation.")
            }
            DriverError::Unknown { code } => write!(f, "Unknown driver error 0x{code:04X}."),
        }
    }
}

impl std::error::Error for DriverError {}

/// An error raised by a render system operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// An index (texture unit, clip plane, light, attribute) is beyond the
    /// limit reported by the capability probe.
    OutOfRange {
        /// What kind of index was checked.
        kind: LimitKind,
        /// The requested index.
        index: usize,
        /// The probed limit (exclusive).
        limit: usize,
    },
    /// The operation requires state that has not been established, e.g. a draw
    /// call without a render target or without a bound program.
    InvalidState(String),
    /// The operation needs a capability the driver does not report.
    UnsupportedFeature(String),
    /// The driver failed unrecoverably.
    DriverFatal(DriverError),
}

impl RenderError {
    /// Builds an `OutOfRange` error.
    pub fn out_of_range(kind: LimitKind, index: usize, limit: usize) -> Self {
        RenderError::OutOfRange { kind, index, limit }
    }

    /// Returns `true` for errors caused by a driver failure rather than by the
    /// caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::DriverFatal(_))
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::OutOfRange { kind, index, limit } => {
                write!(f, "{kind} index {index} is out of range (limit {limit})")
            }
            RenderError::InvalidState(msg) => write!(f, "Invalid render system state: {msg}"),
            RenderError::UnsupportedFeature(msg) => write!(f, "Feature not supported: {msg}"),
            RenderError::DriverFatal(err) => write!(f, "Fatal driver error: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::DriverFatal(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DriverError> for RenderError {
    fn from(err: DriverError) -> Self {
        RenderError::DriverFatal(err)
    }
}

/// An error raised while reading or changing configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No option with this name exists.
    UnknownOption(String),
    /// The value is not one of the option's possible values.
    InvalidValue {
        /// The option name.
        name: String,
        /// The rejected value.
        value: String,
    },
    /// The option cannot be changed.
    Immutable(String),
    /// Options are frozen once the first context has been created.
    Frozen(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownOption(name) => write!(f, "Unknown config option '{name}'"),
            ConfigError::InvalidValue { name, value } => {
                write!(f, "Invalid value '{value}' for config option '{name}'")
            }
            ConfigError::Immutable(name) => write!(f, "Config option '{name}' is immutable"),
            ConfigError::Frozen(name) => write!(
                f,
                "Config option '{name}' cannot change after the render system is initialised"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn out_of_range_display() {
        let err = RenderError::out_of_range(LimitKind::TextureUnit, 8, 8);
        assert_eq!(
            format!("{err}"),
            "texture unit index 8 is out of range (limit 8)"
        );
        assert!(!err.is_fatal());
        assert!(err.source().is_none());
    }

    #[test]
    fn driver_error_wraps_into_render_error() {
        let render_err: RenderError = DriverError::ContextLost.into();
        assert!(render_err.is_fatal());
        assert_eq!(
            format!("{render_err}"),
            "Fatal driver error: The graphics context was lost."
        );
        assert!(render_err.source().is_some());
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            name: "Orientation".to_string(),
            value: "Upside Down".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Invalid value 'Upside Down' for config option 'Orientation'"
        );
        assert_eq!(
            format!("{}", DriverError::Unknown { code: 0x505 }),
            "Unknown driver error 0x0505."
        );
    }
}
