//! Delivery of tracked intervals to a remote backend

pub mod http_sink;

pub use http_sink::HttpIntervalSink;
