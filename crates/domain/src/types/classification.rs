//! Billability classification and the learned rule cache entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_label_conversions;

/// One of `billable`, `non-billable`, `ambiguous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Billable,
    NonBillable,
    Ambiguous,
}

impl_label_conversions!(Classification {
    Billable => "billable",
    NonBillable => "non-billable",
    Ambiguous => "ambiguous",
});

impl Classification {
    pub fn is_billable(self) -> bool {
        matches!(self, Self::Billable)
    }
}

/// Who wrote a rule. Manual rules are never replaced by automatic ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    Manual,
    Ai,
}

impl_label_conversions!(RuleSource {
    Manual => "manual",
    Ai => "ai",
});

/// Cached classification for one normalized app key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub app_name: String,
    pub classification: Classification,
    pub source: RuleSource,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ClassificationRule {
    pub fn learned(app_name: impl Into<String>, classification: Classification) -> Self {
        Self {
            app_name: app_name.into(),
            classification,
            source: RuleSource::Ai,
            notes: None,
            updated_at: Utc::now(),
        }
    }

    pub fn manual(
        app_name: impl Into<String>,
        classification: Classification,
        notes: Option<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            classification,
            source: RuleSource::Manual,
            notes,
            updated_at: Utc::now(),
        }
    }

    /// Whether writing `incoming` over `self` is allowed: an automatic
    /// rule may not replace a manual one.
    pub fn accepts_overwrite_from(&self, incoming: &ClassificationRule) -> bool {
        self.source != RuleSource::Manual || incoming.source == RuleSource::Manual
    }
}

/// Answer returned by a classification oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleVerdict {
    pub classification: Classification,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

impl OracleVerdict {
    pub fn new(classification: Classification, confidence: f64) -> Self {
        Self { classification, confidence: confidence.clamp(0.0, 1.0), reasoning: None }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// Outcome of a manual override and its retroactive re-stamp pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideReport {
    pub rule: ClassificationRule,
    pub entries_updated: usize,
    pub entries_failed: usize,
}
