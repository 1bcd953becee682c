pub mod chat;
pub mod health;
pub mod hospitals;
pub mod location;
pub mod search;
