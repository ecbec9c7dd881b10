use std::path::PathBuf;

/// Errors a backend can return on the write path.
///
/// There is deliberately no read-path variant: a missing or unparseable
/// payload is reported as absent (and logged), so the caller can fall back to
/// its seed data instead of handling a parse failure it cannot repair.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error while persisting a namespace
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Payload could not be serialized
    #[error("serialize failed for namespace '{namespace}': {source}")]
    Serialize {
        namespace: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display_names_path() {
        let err = StoreError::io_error(
            "/tmp/records.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/records.json"));
    }
}
