//! Conversational intake core for ER-Match Engine.
//!
//! A multi-state dialogue protocol that collects age, gender, symptoms,
//! history and location through free-form Korean chat, merging best-effort
//! structured extraction into per-session accumulated data until a
//! search-ready terminal payload can be emitted.

pub mod extractor;
pub mod intent;
pub mod machine;
pub mod merge;
pub mod types;

pub use extractor::InfoExtractor;
pub use intent::{Intent, IntentLexicon};
pub use machine::{DialogueStateMachine, TurnContext, TurnOutcome};
pub use merge::{merge_extracted, NO_FINDINGS};
pub use types::{
    ChatTurn, CollectedData, DialogueState, ExtractedRecord, FinalPayload, GenderCode, GeoPoint,
    Provenance, normalize_age_bucket, normalize_gender,
};
