//! Staff leaderboard and per-staff handled counts derived from the staff event log.
//!
//! Each staff-log entry credits the first user mentioned in its content. Tallies are rebuilt
//! on every run and cover only the scanned window, so results are a sliding-window
//! approximation of the full history.

use std::{collections::HashMap, sync::Arc};

use concierge_core::{first_mention, mentions_user, PlatformApi};
use tracing::warn;

use crate::event_log_scanner::{EventLogScanner, ScanWindow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffTally {
    pub staff_id: String,
    pub count: u64,
}

/// Outcome of a leaderboard run. `NoData` (nothing credited) and `Unavailable` (log could
/// not be read) are distinct from any ranked list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaderboard {
    Ranked(Vec<StaffTally>),
    NoData,
    Unavailable,
}

impl Leaderboard {
    pub fn entries(&self) -> &[StaffTally] {
        match self {
            Self::Ranked(entries) => entries,
            Self::NoData | Self::Unavailable => &[],
        }
    }
}

/// Per-run mention counts that remember first-seen order for tie-breaking.
#[derive(Debug, Default)]
pub struct MentionTally {
    tallies: Vec<StaffTally>,
    index: HashMap<String, usize>,
}

impl MentionTally {
    pub fn record(&mut self, staff_id: &str) {
        match self.index.get(staff_id) {
            Some(&position) => self.tallies[position].count += 1,
            None => {
                self.index.insert(staff_id.to_string(), self.tallies.len());
                self.tallies.push(StaffTally {
                    staff_id: staff_id.to_string(),
                    count: 1,
                });
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// Highest counts first; equal counts keep first-seen order.
    pub fn into_top(mut self, top_n: usize) -> Vec<StaffTally> {
        self.tallies.sort_by(|left, right| right.count.cmp(&left.count));
        self.tallies.truncate(top_n);
        self.tallies
    }
}

pub struct StaffAnalyticsAggregator {
    scanner: EventLogScanner,
}

impl StaffAnalyticsAggregator {
    pub fn new(platform: Arc<dyn PlatformApi>, window: ScanWindow) -> Self {
        Self {
            scanner: EventLogScanner::new(platform, window),
        }
    }

    pub async fn compute_top_staff(&self, log_channel_id: &str, top_n: usize) -> Leaderboard {
        let mut tally = MentionTally::default();
        let scanned = self
            .scanner
            .scan(log_channel_id, |entry| {
                if let Some(staff_id) = first_mention(&entry.content) {
                    tally.record(staff_id);
                }
            })
            .await;
        if let Err(error) = scanned {
            warn!(log_channel_id, error = %error, "staff leaderboard scan failed");
            return Leaderboard::Unavailable;
        }
        if tally.is_empty() {
            return Leaderboard::NoData;
        }
        Leaderboard::Ranked(tally.into_top(top_n))
    }

    /// Number of scanned entries mentioning `staff_id`; 0 when the log cannot be read.
    pub async fn count_mentions_of(&self, log_channel_id: &str, staff_id: &str) -> u64 {
        let mut count = 0_u64;
        let scanned = self
            .scanner
            .scan(log_channel_id, |entry| {
                if mentions_user(&entry.content, staff_id) {
                    count += 1;
                }
            })
            .await;
        match scanned {
            Ok(_) => count,
            Err(error) => {
                warn!(log_channel_id, staff_id, error = %error, "staff mention count scan failed");
                0
            }
        }
    }
}
