//! Billability classification: rule cache, oracle fallback, manual overrides

pub mod fallback;
pub mod ports;
pub mod resolver;

pub use fallback::KeywordClassifier;
pub use resolver::{ClassificationResolver, Resolution, ResolutionSource, ResolverStats};
