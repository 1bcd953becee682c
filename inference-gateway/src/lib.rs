//! HTTP clients for the two external model backends: the llama.cpp
//! extraction servers and the OpenAI-compatible field recommender.

pub mod error;
pub mod extraction;
pub mod grammar;
pub mod recommender;

pub use error::{InferenceError, InferenceResult};
pub use extraction::{InferenceEngine, ServiceMode};
pub use recommender::OpenAiRecommender;
