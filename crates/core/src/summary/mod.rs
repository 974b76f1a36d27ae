//! Daily-user and manager roll-ups

pub mod engine;
pub mod ports;
pub mod template;

pub use engine::SummaryEngine;
pub use template::NarrativeTemplate;
