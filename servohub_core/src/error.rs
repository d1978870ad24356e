//! Error type surfaced by servo commands.

use std::fmt;

use servohub_common::error::ErrorKind;

/// Wraps an [`ErrorKind`] with a human-readable message. The motor is left
/// coasting on any failure path; this type carries no recovery state of its
/// own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoError {
    kind: ErrorKind,
    message: String,
}

impl ServoError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ServoError { kind, message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn invalid_port(port: impl fmt::Display) -> Self {
        ServoError::new(ErrorKind::InvalidPort, format!("no servo configured at port {port}"))
    }

    pub fn not_supported(motor_type_tag: impl fmt::Display) -> Self {
        ServoError::new(ErrorKind::NotSupported, format!("unsupported motor type: {motor_type_tag}"))
    }
}

impl fmt::Display for ServoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ServoError {}
