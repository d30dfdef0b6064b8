use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("invalid configuration for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("configuration error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read local address of listener")]
    LocalAddr {
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server terminated: {source}")]
    Serve {
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, Error, ServerError};
    use std::error::Error as _;

    #[test]
    fn bind_error_keeps_io_source() {
        let err = Error::from(ServerError::Bind {
            addr: "localhost:8080".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        });
        assert_eq!(err.to_string(), "failed to bind listener on localhost:8080");
        assert!(err.source().is_some());
    }

    #[test]
    fn config_errors_are_transparent() {
        let err = Error::from(ConfigError::InvalidField {
            field: "server.bind_addr",
            message: "bad".to_string(),
        });
        assert_eq!(err.to_string(), "invalid configuration for server.bind_addr: bad");
    }
}
