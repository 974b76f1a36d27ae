/// OpenAI integration for the classification and narrative oracles
///
/// `OpenAIClient` wraps the Chat Completions API and implements both
/// `ClassifierOracle` and `NarrativeOracle` from `focusledger-core`.
///
/// # Usage
///
/// ```no_run
/// use focusledger_domain::OracleConfig;
/// use focusledger_infra::integrations::openai::OpenAIClient;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = OracleConfig { api_key: Some("sk-...".into()), ..OracleConfig::default() };
/// let client = OpenAIClient::from_config(&config)?;
///
/// let verdict = client.classify_activity("code", "main.rs - Code", None).await?;
/// println!("{} ({:.2})", verdict.classification, verdict.confidence);
/// # Ok(())
/// # }
/// ```
///
/// # Error Handling
///
/// - **Network errors, 5xx, 429**: retried by `HttpClient`, then surfaced as
///   transient `LedgerError::Network`
/// - **401 / 403 or no key**: `LedgerError::Config`, which makes the resolver
///   switch to the keyword fallback for the rest of the run
/// - **Unparseable answers**: `LedgerError::Oracle`
pub mod client;
pub mod types;

pub use client::OpenAIClient;
pub use types::{ActivityVerdictPayload, OpenAIError};
