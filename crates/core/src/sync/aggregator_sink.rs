//! In-process delivery straight into the appointment aggregator

use std::sync::Arc;

use async_trait::async_trait;
use focusledger_domain::{Result, TrackedInterval};

use super::ports::RemoteIntervalSink;
use crate::aggregation::AppointmentAggregator;

pub struct AggregatorSink {
    aggregator: Arc<AppointmentAggregator>,
}

impl AggregatorSink {
    pub fn new(aggregator: Arc<AppointmentAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl RemoteIntervalSink for AggregatorSink {
    async fn transmit(&self, tracked: &TrackedInterval) -> Result<()> {
        self.aggregator
            .record_appointment(
                &tracked.user_id,
                &tracked.project_id,
                tracked.task_id.clone(),
                tracked.interval.clone(),
            )
            .await
            .map(|_| ())
    }
}
