#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[cfg(feature = "prometheus")]
    #[error(transparent)]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid metrics listen address: {address}")]
    InvalidListenAddress { address: String },
}

impl Error {
    #[must_use]
    pub fn invalid_listen_address(address: impl Into<String>) -> Self {
        Self::InvalidListenAddress {
            address: address.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
