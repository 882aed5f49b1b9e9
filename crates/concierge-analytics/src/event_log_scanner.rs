//! Backward, page-bounded traversal of a channel's message history.

use std::sync::Arc;

use concierge_core::{HistoryQuery, PlatformApi, PlatformMessage, PlatformResult};
use tracing::debug;

pub const DEFAULT_SCAN_MAX_PAGES: usize = 10;
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 100;

/// Bounds of one scan: at most `max_pages * page_size` entries are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub max_pages: usize,
    pub page_size: usize,
}

impl Default for ScanWindow {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_SCAN_MAX_PAGES,
            page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub pages: usize,
    pub entries: usize,
}

pub struct EventLogScanner {
    platform: Arc<dyn PlatformApi>,
    window: ScanWindow,
}

impl EventLogScanner {
    pub fn new(platform: Arc<dyn PlatformApi>, window: ScanWindow) -> Self {
        Self { platform, window }
    }

    pub fn window(&self) -> ScanWindow {
        self.window
    }

    /// Visits entries of `channel_id` newest first. Stops after an empty page or once
    /// `max_pages` pages were fetched. Any page failure aborts the scan.
    pub async fn scan<F>(&self, channel_id: &str, mut visit: F) -> PlatformResult<ScanSummary>
    where
        F: FnMut(&PlatformMessage),
    {
        let mut summary = ScanSummary::default();
        let mut before: Option<String> = None;
        while summary.pages < self.window.max_pages {
            let query = HistoryQuery {
                limit: self.window.page_size.max(1),
                before: before.take(),
            };
            let page = self.platform.fetch_messages(channel_id, &query).await?;
            summary.pages += 1;
            let Some(oldest) = page.last() else {
                break;
            };
            before = Some(oldest.id.clone());
            summary.entries += page.len();
            page.iter().for_each(&mut visit);
        }
        debug!(
            channel_id,
            pages = summary.pages,
            entries = summary.entries,
            "event log scanned"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use concierge_core::{testing::InMemoryPlatform, ChannelKind, PlatformError};

    use super::{EventLogScanner, ScanSummary, ScanWindow};

    const LOG: &str = "800000000000000002";

    fn platform_with_entries(count: usize) -> Arc<InMemoryPlatform> {
        let platform = InMemoryPlatform::new("1", "2");
        platform.add_channel(LOG, "staff-log", ChannelKind::Text);
        platform.seed_messages(LOG, "2", (0..count).map(|index| format!("entry {index}")));
        Arc::new(platform)
    }

    #[tokio::test]
    async fn functional_scan_walks_pages_until_empty_page() {
        let platform = platform_with_entries(5);
        let scanner = EventLogScanner::new(
            platform.clone(),
            ScanWindow {
                max_pages: 10,
                page_size: 2,
            },
        );
        let mut seen = Vec::new();
        let summary = scanner
            .scan(LOG, |message| seen.push(message.content.clone()))
            .await
            .expect("scan");

        assert_eq!(summary, ScanSummary { pages: 4, entries: 5 });
        assert_eq!(seen.first().map(String::as_str), Some("entry 4"));
        assert_eq!(seen.last().map(String::as_str), Some("entry 0"));
        assert_eq!(platform.fetch_calls(LOG), 4);
    }

    #[tokio::test]
    async fn unit_scan_stops_at_max_pages() {
        let platform = platform_with_entries(50);
        let scanner = EventLogScanner::new(
            platform.clone(),
            ScanWindow {
                max_pages: 3,
                page_size: 10,
            },
        );
        let summary = scanner.scan(LOG, |_| {}).await.expect("scan");
        assert_eq!(summary, ScanSummary { pages: 3, entries: 30 });
        assert_eq!(platform.fetch_calls(LOG), 3);
    }

    #[tokio::test]
    async fn unit_scan_reports_unreachable_channel() {
        let platform = platform_with_entries(3);
        platform.make_channel_unreachable(LOG);
        let scanner = EventLogScanner::new(platform, ScanWindow::default());
        assert!(matches!(
            scanner.scan(LOG, |_| {}).await,
            Err(PlatformError::NotFound { .. })
        ));
    }
}
