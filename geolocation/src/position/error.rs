//! Error types for position acquisition.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by the coordinator to callers and watch subscribers.
///
/// Cloneable so one outcome can be delivered to several waiters (the
/// authorization gate broadcasts a single prompt result to every caller
/// attached to it).
#[derive(Debug, Clone, Error)]
pub enum GeolocationError {
    /// Authorization is not granted for the requested accuracy tier.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// No provider is reachable, or a provider failed mid-stream.
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    /// No qualifying reading before the deadline and no usable cached reading.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The permission prompt cannot be shown.
    #[error("Host context unavailable: {0}")]
    HostContextUnavailable(String),

    /// Unexpected provider failure.
    #[error("Unknown error: {message}")]
    Unknown {
        message: String,
        #[source]
        source: Option<Arc<dyn StdError + Send + Sync>>,
    },
}

impl GeolocationError {
    /// Wrap an unexpected failure, keeping the original cause.
    pub fn unknown<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Unknown {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// The error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::PositionUnavailable(_) => ErrorKind::PositionUnavailable,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::HostContextUnavailable(_) => ErrorKind::HostContextUnavailable,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// The human-readable message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::PermissionDenied(message)
            | Self::PositionUnavailable(message)
            | Self::Timeout(message)
            | Self::HostContextUnavailable(message) => message,
            Self::Unknown { message, .. } => message,
        }
    }
}

/// Error category, with the stable codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unknown,
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    HostContextUnavailable,
}

impl ErrorKind {
    /// Numeric wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::PermissionDenied => 1,
            Self::PositionUnavailable => 2,
            Self::Timeout => 3,
            Self::HostContextUnavailable => 4,
        }
    }

    /// String wire code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN_ERROR",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PositionUnavailable => "POSITION_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
            Self::HostContextUnavailable => "ACTIVITY_NULL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(ErrorKind::Unknown.code(), 0);
        assert_eq!(ErrorKind::PermissionDenied.code(), 1);
        assert_eq!(ErrorKind::PositionUnavailable.code(), 2);
        assert_eq!(ErrorKind::Timeout.code(), 3);
        assert_eq!(ErrorKind::HostContextUnavailable.code(), 4);
        assert_eq!(ErrorKind::HostContextUnavailable.to_string(), "ACTIVITY_NULL");
    }

    #[test]
    fn test_kind_and_message() {
        let err = GeolocationError::Timeout("no fix".to_string());
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.message(), "no fix");
        assert_eq!(err.to_string(), "Timeout: no fix");
    }

    #[test]
    fn test_unknown_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "radio gone");
        let err = GeolocationError::unknown("provider crashed", io);

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.message(), "provider crashed");
        let source = err.source().expect("source should be kept");
        assert_eq!(source.to_string(), "radio gone");
    }

    #[test]
    fn test_clone_preserves_variant() {
        let err = GeolocationError::PermissionDenied("denied".to_string());
        let cloned = err.clone();
        assert_eq!(cloned.kind(), ErrorKind::PermissionDenied);
    }
}
