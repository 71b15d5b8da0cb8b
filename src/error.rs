use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub(crate) enum DashboardError {
    /// The backing store could not be opened or read. Nothing downstream can
    /// run without the catalog.
    #[error("data source unavailable: {0}")]
    DataSourceUnavailable(String),

    /// A mean was requested over zero records.
    #[error("cannot compute {field} over an empty product set")]
    EmptyInput { field: &'static str },

    #[error("invalid product record {id}: {reason}")]
    InvalidRecord { id: u64, reason: String },
}

impl DashboardError {
    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::DataSourceUnavailable(err.to_string())
    }
}
