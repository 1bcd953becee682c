pub mod chat_service;
pub mod search_service;

pub use chat_service::{ChatService, ChatTurnResponse};
pub use search_service::{SearchOutcome, SearchService};
