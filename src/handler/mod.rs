pub mod chat;
pub mod deals;
pub mod ws;
