use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Inference backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inference backend busy")]
    Busy,

    #[error("Inference backend misconfigured: {0}")]
    Config(String),

    #[error("Unparsable inference response: {0}")]
    InvalidResponse(String),
}

pub type InferenceResult<T> = Result<T, InferenceError>;
