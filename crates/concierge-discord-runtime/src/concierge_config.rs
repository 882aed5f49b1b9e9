//! Guild-level bot configuration, loaded once at startup.

use std::time::Duration;

use anyhow::{bail, Result};
use concierge_analytics::ScanWindow;
use serde::{Deserialize, Serialize};

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_max_tickets_per_user() -> usize {
    1
}

fn default_close_grace_seconds() -> u64 {
    10
}

fn default_dashboard_refresh_seconds() -> u64 {
    20
}

fn default_dashboard_search_window() -> usize {
    10
}

fn default_leaderboard_max_pages() -> usize {
    10
}

fn default_leaderboard_page_size() -> usize {
    100
}

fn default_leaderboard_top_n() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConciergeConfig {
    pub guild_id: String,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    pub panel_channel_id: String,
    pub ticket_category_id: String,
    pub ticket_log_channel_id: String,
    /// Channel whose entries start with the handling staff member's mention.
    pub staff_log_channel_id: String,
    pub management_channel_id: String,
    pub support_role_id: String,
    pub staff_role_id: String,
    #[serde(default = "default_max_tickets_per_user")]
    pub max_tickets_per_user: usize,
    #[serde(default = "default_close_grace_seconds")]
    pub close_grace_seconds: u64,
    #[serde(default = "default_dashboard_refresh_seconds")]
    pub dashboard_refresh_seconds: u64,
    #[serde(default = "default_dashboard_search_window")]
    pub dashboard_search_window: usize,
    #[serde(default = "default_leaderboard_max_pages")]
    pub leaderboard_max_pages: usize,
    #[serde(default = "default_leaderboard_page_size")]
    pub leaderboard_page_size: usize,
    #[serde(default = "default_leaderboard_top_n")]
    pub leaderboard_top_n: usize,
}

impl ConciergeConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config = serde_json::from_str::<Self>(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("guild_id", &self.guild_id),
            ("command_prefix", &self.command_prefix),
            ("panel_channel_id", &self.panel_channel_id),
            ("ticket_category_id", &self.ticket_category_id),
            ("ticket_log_channel_id", &self.ticket_log_channel_id),
            ("staff_log_channel_id", &self.staff_log_channel_id),
            ("management_channel_id", &self.management_channel_id),
            ("support_role_id", &self.support_role_id),
            ("staff_role_id", &self.staff_role_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                bail!("invalid concierge config: {field} must not be empty");
            }
        }
        let positive = [
            ("max_tickets_per_user", self.max_tickets_per_user as u64),
            ("dashboard_refresh_seconds", self.dashboard_refresh_seconds),
            ("dashboard_search_window", self.dashboard_search_window as u64),
            ("leaderboard_max_pages", self.leaderboard_max_pages as u64),
            ("leaderboard_page_size", self.leaderboard_page_size as u64),
            ("leaderboard_top_n", self.leaderboard_top_n as u64),
        ];
        for (field, value) in positive {
            if value == 0 {
                bail!("invalid concierge config: {field} must be greater than 0");
            }
        }
        if self.leaderboard_page_size > 100 {
            bail!(
                "invalid concierge config: leaderboard_page_size must be at most 100, found {}",
                self.leaderboard_page_size
            );
        }
        Ok(())
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_secs(self.close_grace_seconds)
    }

    pub fn dashboard_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard_refresh_seconds)
    }

    pub fn scan_window(&self) -> ScanWindow {
        ScanWindow {
            max_pages: self.leaderboard_max_pages,
            page_size: self.leaderboard_page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ConciergeConfig;

    const MINIMAL: &str = r#"{
        "guild_id": "100000000000000000",
        "panel_channel_id": "200000000000000001",
        "ticket_category_id": "200000000000000002",
        "ticket_log_channel_id": "200000000000000003",
        "staff_log_channel_id": "200000000000000004",
        "management_channel_id": "200000000000000005",
        "support_role_id": "300000000000000001",
        "staff_role_id": "300000000000000002"
    }"#;

    #[test]
    fn unit_minimal_config_applies_defaults() {
        let config = ConciergeConfig::from_json_str(MINIMAL).expect("config");
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.max_tickets_per_user, 1);
        assert_eq!(config.close_grace(), Duration::from_secs(10));
        assert_eq!(config.dashboard_refresh_interval(), Duration::from_secs(20));
        assert_eq!(config.dashboard_search_window, 10);
        assert_eq!(config.scan_window().max_pages, 10);
        assert_eq!(config.scan_window().page_size, 100);
        assert_eq!(config.leaderboard_top_n, 5);
    }

    #[test]
    fn regression_validation_rejects_empty_ids_and_zero_limits() {
        let mut config = ConciergeConfig::from_json_str(MINIMAL).expect("config");
        config.staff_log_channel_id = "  ".to_string();
        let error = config.validate().expect_err("empty id");
        assert!(error.to_string().contains("staff_log_channel_id"));

        let mut config = ConciergeConfig::from_json_str(MINIMAL).expect("config");
        config.max_tickets_per_user = 0;
        assert!(config.validate().is_err());

        let mut config = ConciergeConfig::from_json_str(MINIMAL).expect("config");
        config.dashboard_refresh_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unit_missing_required_field_fails_to_parse() {
        assert!(ConciergeConfig::from_json_str(r#"{ "guild_id": "1" }"#).is_err());
    }
}
