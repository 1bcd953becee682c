use async_trait::async_trait;

use crate::types::{ExtractedRecord, Provenance};

/// Seam to the structured-extraction backend.
///
/// Infallible by contract: transport failures, timeouts and unparsable
/// completions must come back as an empty record with
/// [`Provenance::Error`] so a turn degrades to "no new information"
/// instead of failing.
#[async_trait]
pub trait InfoExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> (ExtractedRecord, Provenance);
}
