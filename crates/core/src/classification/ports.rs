//! Port interfaces for activity classification

use async_trait::async_trait;
use focusledger_domain::{ClassificationRule, OracleVerdict, Result};

/// Shared cache of learned and manual classification rules, keyed by the
/// normalized app name.
///
/// Implementations must make `upsert` atomic on the key and must never let
/// an `ai` rule replace a `manual` one.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn find(&self, app_name: &str) -> Result<Option<ClassificationRule>>;

    /// Writes the rule and returns what is stored afterwards (which is the
    /// existing manual rule when an `ai` write was refused).
    async fn upsert(&self, rule: ClassificationRule) -> Result<ClassificationRule>;

    async fn list(&self) -> Result<Vec<ClassificationRule>>;

    /// Returns whether a rule was removed.
    async fn delete(&self, app_name: &str) -> Result<bool>;
}

/// External decision service answering "is this activity billable?".
///
/// A `LedgerError::Config` answer means the oracle cannot work at all for
/// this run (missing or rejected credentials).
#[async_trait]
pub trait ClassifierOracle: Send + Sync {
    async fn classify(
        &self,
        app_name: &str,
        app_title: &str,
        context: Option<&str>,
    ) -> Result<OracleVerdict>;
}
