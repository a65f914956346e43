/// Error types for the AQI forecast library
use thiserror::Error;

/// Main error type for forecast pipeline operations
#[derive(Error, Debug)]
pub enum AqfError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Provider payload is missing the expected hourly structure
    #[error("Invalid {provider} API response format (missing 'hourly' or 'time')")]
    PayloadSchema { provider: String },

    /// Provider returned no hourly observations
    #[error("No hourly data returned by the {0} API")]
    EmptySeries(String),

    /// Failed to parse a provider timestamp
    #[error("Failed to parse timestamp: {0}")]
    TimestampParse(String),

    /// Air quality and temperature series never align
    #[error("No overlapping air quality and temperature data")]
    NoOverlap,

    /// Too few clean rows to fill the model input window
    #[error("Insufficient historical data after cleaning (needed: {needed}, found: {found})")]
    InsufficientData { needed: usize, found: usize },

    /// Failed to read an artifact file
    #[error("Failed to read artifact: {0}")]
    ArtifactIo(#[from] std::io::Error),

    /// Failed to parse scaler attributes
    #[error("Failed to parse scaler attributes: {0}")]
    AttributeParse(#[from] serde_json::Error),

    /// Scaler parameters are unusable
    #[error("Invalid scaler parameters: {0}")]
    InvalidScaler(String),

    /// Array shape does not match the scaler parameters
    #[error("Input shape mismatch (expected trailing axis {expected}, found {found})")]
    ShapeMismatch { expected: usize, found: usize },

    /// Model input contract disagrees with the pipeline output
    #[error("Model expects {model} features but the pipeline produces {pipeline}")]
    FeatureContract { model: usize, pipeline: usize },

    /// Failed to load the forecast model
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    /// Model inference failed
    #[error("Model inference failed: {0}")]
    Inference(String),

    /// Failed to turn raw model output into a forecast
    #[error("Error processing prediction result: {0}")]
    ResultProcessing(String),
}

impl AqfError {
    /// True for failures caused by upstream observation data rather than
    /// this service's own configuration or computation. The HTTP layer
    /// reports these to the caller verbatim instead of masking them.
    pub fn is_upstream_data(&self) -> bool {
        matches!(
            self,
            AqfError::HttpRequest(_)
                | AqfError::PayloadSchema { .. }
                | AqfError::EmptySeries(_)
                | AqfError::TimestampParse(_)
                | AqfError::NoOverlap
                | AqfError::InsufficientData { .. }
        )
    }
}

/// Type alias for Results using AqfError
pub type Result<T> = std::result::Result<T, AqfError>;
