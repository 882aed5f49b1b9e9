//! Auto-refreshed management dashboard for the ticket system.

pub mod dashboard_publisher;
pub mod dashboard_refresher;
pub mod dashboard_render;

pub use dashboard_publisher::{
    DashboardConfig, DashboardPublisher, DashboardSnapshot, RefreshOutcome,
};
pub use dashboard_refresher::{
    start_dashboard_refresher, DashboardEventSink, DashboardRefresherHandle,
};
pub use dashboard_render::{format_uptime, medal_for_rank, render_leaderboard};
