use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures reported by a document store, local or remote.
///
/// The variants map one-to-one onto the `code` field of wire error frames
/// (see [`StoreError::code`]), except `Timeout`, which only a client sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Stable machine-readable code carried in wire error frames.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidPath(_) => "invalid_path",
            StoreError::PermissionDenied(_) => "permission_denied",
            StoreError::Unavailable(_) | StoreError::Timeout(_) => "not_connected",
            StoreError::Protocol(_) => "protocol",
            StoreError::Internal(_) => "internal",
        }
    }

    /// Rebuild an error from a wire `code` and message.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "invalid_path" => StoreError::InvalidPath(message),
            "permission_denied" => StoreError::PermissionDenied(message),
            "not_connected" => StoreError::Unavailable(message),
            "protocol" => StoreError::Protocol(message),
            _ => StoreError::Internal(message),
        }
    }

    /// The human-readable part of the error, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            StoreError::InvalidPath(m)
            | StoreError::PermissionDenied(m)
            | StoreError::Unavailable(m)
            | StoreError::Timeout(m)
            | StoreError::Protocol(m)
            | StoreError::Internal(m) => m,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Protocol(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskdeckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("network error: {0}")]
    Network(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("server.port = 0 is out of range".into());
        assert_eq!(
            err.to_string(),
            "config validation error: server.port = 0 is out of range"
        );
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::InvalidPath("presence//users".into());
        assert_eq!(err.to_string(), "invalid path: presence//users");

        let err = StoreError::PermissionDenied("u2 may not write u1".into());
        assert_eq!(err.to_string(), "permission denied: u2 may not write u1");
    }

    #[test]
    fn store_error_codes_survive_the_wire() {
        let errors = [
            StoreError::InvalidPath("a".into()),
            StoreError::PermissionDenied("b".into()),
            StoreError::Unavailable("c".into()),
            StoreError::Protocol("d".into()),
            StoreError::Internal("e".into()),
        ];
        for err in errors {
            let back = StoreError::from_code(err.code(), err.message());
            assert_eq!(back, err);
        }
    }

    #[test]
    fn timeout_is_reported_as_not_connected() {
        let err = StoreError::Timeout("set".into());
        assert_eq!(err.code(), "not_connected");
        assert!(matches!(
            StoreError::from_code(err.code(), err.message()),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn unknown_code_is_internal() {
        let err = StoreError::from_code("exploded", "boom");
        assert_eq!(err, StoreError::Internal("boom".into()));
    }

    #[test]
    fn taskdeck_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: TaskdeckError = config_err.into();
        assert!(matches!(err, TaskdeckError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn taskdeck_error_from_store() {
        let err: TaskdeckError = StoreError::Unavailable("offline".into()).into();
        assert!(matches!(err, TaskdeckError::Store(_)));
        assert_eq!(err.to_string(), "store unavailable: offline");
    }

    #[test]
    fn taskdeck_error_network_display() {
        let err = TaskdeckError::Network("timeout".into());
        assert_eq!(err.to_string(), "network error: timeout");
    }
}
