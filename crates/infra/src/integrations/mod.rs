//! Third-party service integrations

pub mod openai;
