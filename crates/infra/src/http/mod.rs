//! Outbound HTTP with retry and backoff

pub mod client;

pub use client::{HttpClient, HttpClientBuilder, RetryPolicy};
