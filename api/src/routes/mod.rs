pub mod admin;
pub mod ai;
pub mod chat_requests;
pub mod execute;
pub mod prompt_sets;
pub mod websites;
