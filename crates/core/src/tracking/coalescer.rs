//! Sample-to-interval coalescing
//!
//! Turns a stream of focused-window samples into discrete intervals, one per
//! continuous stretch of focus on a window title. Stretches at or below the
//! noise threshold are discarded as focus flicker. Pure and synchronous: the
//! caller owns the clock and feeds samples in order.

use focusledger_domain::constants::{
    DEFAULT_MIN_FINAL_INTERVAL_SECS, DEFAULT_NOISE_THRESHOLD_SECS,
};
use focusledger_domain::{Interval, Sample, TrackingConfig};
use tracing::{debug, trace};

/// Thresholds applied by the [`Coalescer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoalescerConfig {
    /// Intervals must be strictly longer than this to be emitted on a switch.
    pub noise_threshold_secs: f64,
    /// Intervals must be strictly longer than this to survive a stop.
    pub min_final_interval_secs: f64,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            noise_threshold_secs: DEFAULT_NOISE_THRESHOLD_SECS,
            min_final_interval_secs: DEFAULT_MIN_FINAL_INTERVAL_SECS,
        }
    }
}

impl From<&TrackingConfig> for CoalescerConfig {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            noise_threshold_secs: config.noise_threshold_secs,
            min_final_interval_secs: config.min_final_interval_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalescerState {
    NoCurrent,
    Accumulating,
}

/// Per-session coalescing state machine.
#[derive(Debug, Clone)]
pub struct Coalescer {
    config: CoalescerConfig,
    current: Option<Interval>,
    /// The last interval that ended without being emitted. Resumed when the
    /// flicker that replaced it turns out to be noise and focus returns.
    bridge: Option<Interval>,
    dropped_samples: u64,
}

impl Coalescer {
    pub fn new(config: CoalescerConfig) -> Self {
        Self { config, current: None, bridge: None, dropped_samples: 0 }
    }

    pub fn state(&self) -> CoalescerState {
        if self.current.is_some() {
            CoalescerState::Accumulating
        } else {
            CoalescerState::NoCurrent
        }
    }

    /// The in-progress interval, if any.
    pub fn current(&self) -> Option<&Interval> {
        self.current.as_ref()
    }

    /// Samples rejected as invalid (blank or out of order).
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Feeds one sample. Returns the interval finalized by this sample, if
    /// any. Invalid samples are dropped without disturbing state.
    pub fn push(&mut self, sample: &Sample) -> Option<Interval> {
        if sample.is_blank() {
            self.drop_sample(sample, "blank sample");
            return None;
        }

        let title = title_of(sample);

        let Some(mut current) = self.current.take() else {
            self.current = Some(Interval::open(title, sample.process_name.trim(), sample.timestamp));
            return None;
        };

        if current.extend_to(sample.timestamp).is_err() {
            self.current = Some(current);
            self.drop_sample(sample, "sample older than current interval");
            return None;
        }

        if current.app_title == title {
            self.current = Some(current);
            return None;
        }

        if current.duration_seconds > self.config.noise_threshold_secs {
            self.bridge = None;
            self.current = Some(Interval::open(title, sample.process_name.trim(), sample.timestamp));
            debug!(
                app_title = %current.app_title,
                duration_seconds = current.duration_seconds,
                "interval finalized"
            );
            return Some(current);
        }

        trace!(
            app_title = %current.app_title,
            duration_seconds = current.duration_seconds,
            "discarding sub-threshold interval"
        );

        match self.bridge.take() {
            Some(mut resumed) if resumed.app_title == title => {
                // The bridge ended where `current` began, so this cannot fail.
                if resumed.extend_to(sample.timestamp).is_ok() {
                    self.current = Some(resumed);
                } else {
                    self.current =
                        Some(Interval::open(title, sample.process_name.trim(), sample.timestamp));
                }
            }
            _ => {
                self.bridge = Some(current);
                self.current =
                    Some(Interval::open(title, sample.process_name.trim(), sample.timestamp));
            }
        }
        None
    }

    /// Ends the session: the in-progress interval is returned if it is longer
    /// than the stop minimum, otherwise dropped. Leaves the coalescer empty.
    pub fn stop(&mut self) -> Option<Interval> {
        self.bridge = None;
        let current = self.current.take()?;
        if current.duration_seconds > self.config.min_final_interval_secs {
            Some(current)
        } else {
            trace!(
                app_title = %current.app_title,
                duration_seconds = current.duration_seconds,
                "dropping short final interval"
            );
            None
        }
    }

    fn drop_sample(&mut self, sample: &Sample, reason: &'static str) {
        self.dropped_samples += 1;
        debug!(timestamp = %sample.timestamp, reason, "sample dropped");
    }
}

impl Default for Coalescer {
    fn default() -> Self {
        Self::new(CoalescerConfig::default())
    }
}

/// Window title used to tell intervals apart; the process name stands in
/// when the title is blank.
fn title_of(sample: &Sample) -> &str {
    let title = sample.window_title.trim();
    if title.is_empty() {
        sample.process_name.trim()
    } else {
        title
    }
}
