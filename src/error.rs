use thiserror::Error;

pub type SegResult<T> = Result<T, SegError>;

#[derive(Debug, Error)]
pub enum SegError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid or unsupported data format: {0}")]
    UnsupportedFormat(String),

    #[error("empty data")]
    EmptyData,

    #[error("i/o failure on `{path}`: {message}")]
    Io { path: String, message: String },

    #[error("json error: {0}")]
    Json(String),

    #[error("another load or export is still pending")]
    Busy,
}

impl From<serde_json::Error> for SegError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
