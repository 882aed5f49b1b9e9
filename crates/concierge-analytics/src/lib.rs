//! Staff statistics mined from the staff event log.

pub mod event_log_scanner;
pub mod staff_analytics;

pub use event_log_scanner::{EventLogScanner, ScanSummary, ScanWindow};
pub use staff_analytics::{Leaderboard, MentionTally, StaffAnalyticsAggregator, StaffTally};
