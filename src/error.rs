//! Error types for the capture and export pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing charts or exporting a report
#[derive(Error, Debug)]
pub enum Error {
    /// The rendering layer failed to produce or describe a chart
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// The vector representation could not be decoded or drawn
    #[error("Vector fallback failed: {0}")]
    VectorError(String),

    /// A raster could not be encoded into its portable form
    #[error("Image encoding failed: {0}")]
    EncodeError(String),

    /// Fetching metrics for a category failed
    #[error("Metrics fetch failed: {0}")]
    MetricsError(String),

    /// Assembling or generating the export artifact failed
    #[error("Export failed: {0}")]
    ExportError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The file generator does not handle the requested format
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
