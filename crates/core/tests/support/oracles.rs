//! Oracle doubles that count their calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use focusledger_core::{ClassifierOracle, NarrativeOracle, RemoteIntervalSink};
use focusledger_domain::{
    Classification, LedgerError, OracleVerdict, Result, SummaryItem, TrackedInterval,
};
use parking_lot::Mutex;
use uuid::Uuid;

/// Always answers with the same verdict (or error), counting calls.
pub struct CountingOracle {
    answer: Result<OracleVerdict>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl CountingOracle {
    pub fn answering(classification: Classification, confidence: f64) -> Self {
        Self {
            answer: Ok(OracleVerdict::new(classification, confidence)),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: LedgerError) -> Self {
        Self { answer: Err(error), delay: None, calls: AtomicUsize::new(0) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassifierOracle for CountingOracle {
    async fn classify(&self, _: &str, _: &str, _: Option<&str>) -> Result<OracleVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.clone()
    }
}

/// Narrative double: fixed text, `None`, or an error.
pub struct ScriptedNarrator {
    answer: Result<Option<String>>,
    calls: AtomicUsize,
}

impl ScriptedNarrator {
    pub fn text(text: &str) -> Self {
        Self { answer: Ok(Some(text.to_string())), calls: AtomicUsize::new(0) }
    }

    pub fn silent() -> Self {
        Self { answer: Ok(None), calls: AtomicUsize::new(0) }
    }

    pub fn down() -> Self {
        Self {
            answer: Err(LedgerError::Network("narrative service down".into())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Rejects every call the way a revoked API key does.
    pub fn misconfigured() -> Self {
        Self {
            answer: Err(LedgerError::Config("Invalid API key (401)".into())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrativeOracle for ScriptedNarrator {
    async fn summarize(&self, _: &[SummaryItem], _: &str, _: NaiveDate) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

/// Records delivered intervals; fails for ids in the reject list.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<TrackedInterval>>,
    reject: Mutex<Vec<Uuid>>,
}

impl RecordingSink {
    pub fn reject(&self, id: Uuid) {
        self.reject.lock().push(id);
    }

    pub fn accept_all(&self) {
        self.reject.lock().clear();
    }

    pub fn delivered(&self) -> Vec<TrackedInterval> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl RemoteIntervalSink for RecordingSink {
    async fn transmit(&self, interval: &TrackedInterval) -> Result<()> {
        if self.reject.lock().contains(&interval.id) {
            return Err(LedgerError::Network(format!("rejected {}", interval.id)));
        }
        self.delivered.lock().push(interval.clone());
        Ok(())
    }
}
