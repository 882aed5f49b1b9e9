use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use concierge_analytics::{Leaderboard, ScanWindow, StaffAnalyticsAggregator, StaffTally};
use concierge_core::{
    testing::InMemoryPlatform, ChannelKind, ContentTemplates, PlatformApi, PlatformGuild,
    PlatformUser,
};
use concierge_dashboard::{DashboardConfig, DashboardPublisher, RefreshOutcome};
use concierge_discord_runtime::StaffQueryFlow;
use concierge_tickets::{
    spawn_event_subscriber, Caller, TicketError, TicketLifecycleConfig, TicketLifecycleManager,
    TicketLogNotifier,
};

const GUILD: &str = "100000000000000000";
const BOT: &str = "100000000000000999";
const CATEGORY: &str = "200000000000000001";
const TICKET_LOG: &str = "200000000000000002";
const STAFF_LOG: &str = "200000000000000003";
const MANAGEMENT: &str = "200000000000000004";
const SUPPORT_ROLE: &str = "300000000000000001";
const STAFF_ROLE: &str = "300000000000000002";
const SAM: &str = "500000000000000001";
const TERRY: &str = "500000000000000002";

struct Harness {
    platform: Arc<InMemoryPlatform>,
    templates: Arc<ContentTemplates>,
    tickets: Arc<TicketLifecycleManager>,
    analytics: Arc<StaffAnalyticsAggregator>,
}

fn guild() -> PlatformGuild {
    PlatformGuild {
        id: GUILD.to_string(),
        name: "Test Guild".to_string(),
        member_count: Some(42),
        icon_url: None,
    }
}

fn harness(max_tickets_per_user: usize, close_grace: Duration) -> Harness {
    let platform = Arc::new(InMemoryPlatform::new(GUILD, BOT));
    platform.add_channel(CATEGORY, "Tickets", ChannelKind::Category);
    platform.add_channel(TICKET_LOG, "ticket-log", ChannelKind::Text);
    platform.add_channel(STAFF_LOG, "staff-log", ChannelKind::Text);
    platform.add_channel(MANAGEMENT, "management", ChannelKind::Text);
    let templates = Arc::new(ContentTemplates::default());
    let platform_api = platform.clone() as Arc<dyn PlatformApi>;
    let tickets = Arc::new(TicketLifecycleManager::new(
        Arc::clone(&platform_api),
        Arc::clone(&templates),
        TicketLifecycleConfig {
            guild: guild(),
            ticket_category_id: CATEGORY.to_string(),
            support_role_id: SUPPORT_ROLE.to_string(),
            staff_role_id: STAFF_ROLE.to_string(),
            max_tickets_per_user,
            close_grace,
        },
    ));
    let analytics = Arc::new(StaffAnalyticsAggregator::new(
        platform_api,
        ScanWindow::default(),
    ));
    Harness {
        platform,
        templates,
        tickets,
        analytics,
    }
}

fn user(index: usize) -> PlatformUser {
    PlatformUser::new(format!("4000000000000000{index:02}"), format!("user{index}"))
}

fn member(user: PlatformUser) -> Caller {
    Caller {
        user,
        role_ids: Vec::new(),
        is_admin: false,
    }
}

fn support(user_id: &str, username: &str) -> Caller {
    Caller {
        user: PlatformUser::new(user_id, username),
        role_ids: vec![SUPPORT_ROLE.to_string()],
        is_admin: false,
    }
}

async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn integration_create_claim_close_scenario_honours_grace_delay() {
    let harness = harness(1, Duration::from_millis(150));
    let owner = user(1);

    let handle = harness.tickets.create(&owner).await.expect("create");
    assert_eq!(harness.tickets.active_count(), 1);

    let claimed = harness
        .tickets
        .claim(&handle.channel_id, &support(SAM, "sam"))
        .await
        .expect("claim");
    assert_eq!(claimed.claimed_by.as_deref(), Some(SAM));
    let second = harness
        .tickets
        .claim(&handle.channel_id, &support(TERRY, "terry"))
        .await
        .expect_err("second claim");
    assert!(matches!(second, TicketError::AlreadyClaimed { ref staff_id } if staff_id == SAM));

    let started = Instant::now();
    let closed = harness
        .tickets
        .close(&handle.channel_id, &member(owner))
        .await
        .expect("close");
    assert_eq!(harness.tickets.active_count(), 0);
    assert!(harness.platform.has_channel(&handle.channel_id));

    closed.deletion.await.expect("deletion task");
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert!(!harness.platform.has_channel(&handle.channel_id));
    assert_eq!(harness.platform.deleted_channels(), vec![handle.channel_id]);
}

#[tokio::test]
async fn integration_per_user_limit_holds_for_each_configured_maximum() {
    for max in 1..=3 {
        let harness = harness(max, Duration::ZERO);
        let owner = user(1);
        for _ in 0..max {
            harness.tickets.create(&owner).await.expect("within limit");
        }
        let error = harness
            .tickets
            .create(&owner)
            .await
            .expect_err("over limit");
        assert_eq!(error, TicketError::LimitExceeded { max });
        assert_eq!(harness.platform.created_channels().len(), max);
        assert_eq!(harness.tickets.active_count(), max);
    }
}

#[tokio::test]
async fn integration_claim_after_completed_close_is_not_a_ticket() {
    let harness = harness(1, Duration::from_secs(60));
    let owner = user(1);
    let handle = harness.tickets.create(&owner).await.expect("create");
    harness
        .tickets
        .close(&handle.channel_id, &member(owner))
        .await
        .expect("close");

    let error = harness
        .tickets
        .claim(&handle.channel_id, &support(SAM, "sam"))
        .await
        .expect_err("claim after close");
    assert!(matches!(error, TicketError::NotATicket { .. }));
}

#[tokio::test]
async fn integration_claim_log_feeds_leaderboard_dashboard_and_staff_query() {
    let harness = harness(1, Duration::ZERO);
    let platform_api = harness.platform.clone() as Arc<dyn PlatformApi>;
    let notifier = spawn_event_subscriber(
        harness.tickets.events(),
        Arc::new(TicketLogNotifier::new(
            Arc::clone(&platform_api),
            Arc::clone(&harness.templates),
            guild(),
            TICKET_LOG,
            STAFF_LOG,
        )),
    );

    let mut claims = Vec::new();
    for (index, staff) in [SAM, SAM, TERRY].into_iter().enumerate() {
        let handle = harness
            .tickets
            .create(&user(index + 1))
            .await
            .expect("create");
        claims.push(
            harness
                .tickets
                .claim(&handle.channel_id, &support(staff, "staff"))
                .await
                .expect("claim"),
        );
    }
    assert_eq!(claims.len(), 3);
    wait_until(|| harness.platform.messages_in(STAFF_LOG).len() == 3).await;
    wait_until(|| harness.platform.messages_in(TICKET_LOG).len() == 3).await;

    let leaderboard = harness.analytics.compute_top_staff(STAFF_LOG, 5).await;
    assert_eq!(
        leaderboard,
        Leaderboard::Ranked(vec![
            StaffTally {
                staff_id: SAM.to_string(),
                count: 2,
            },
            StaffTally {
                staff_id: TERRY.to_string(),
                count: 1,
            },
        ])
    );

    let dashboard = DashboardPublisher::new(
        Arc::clone(&platform_api),
        Arc::clone(&harness.templates),
        Arc::clone(&harness.tickets),
        Arc::clone(&harness.analytics),
        DashboardConfig {
            guild: guild(),
            bot_user_id: BOT.to_string(),
            management_channel_id: MANAGEMENT.to_string(),
            staff_log_channel_id: STAFF_LOG.to_string(),
            search_window: 10,
            top_n: 5,
        },
        Instant::now(),
    );
    let first = dashboard.refresh().await.expect("first refresh");
    assert!(matches!(first, RefreshOutcome::Sent { .. }));
    let second = dashboard.refresh().await.expect("second refresh");
    assert_eq!(
        second,
        RefreshOutcome::Edited {
            message_id: first.message_id().to_string(),
        }
    );
    assert_eq!(harness.platform.messages_in(MANAGEMENT).len(), 1);

    let query = StaffQueryFlow::new(
        platform_api,
        Arc::clone(&harness.templates),
        Arc::clone(&harness.analytics),
        guild(),
        STAFF_LOG,
    );
    let result = query.resolve(SAM).await.expect("staff query");
    assert_eq!(result.mention_count, 2);

    notifier.abort();
}

#[tokio::test]
async fn integration_invalid_identifiers_are_rejected_before_any_scan() {
    let harness = harness(1, Duration::ZERO);
    let query = StaffQueryFlow::new(
        harness.platform.clone(),
        Arc::clone(&harness.templates),
        Arc::clone(&harness.analytics),
        guild(),
        STAFF_LOG,
    );

    for raw in [
        "abc",
        "123",
        "123456789012345678901",
        "１２３４５６７８９０１２３４５６７",
        "١٢٣٤٥٦٧٨٩٠١٢٣٤٥٦٧",
    ] {
        let error = query.resolve(raw).await.expect_err("invalid identifier");
        assert!(matches!(error, TicketError::InvalidIdentifierFormat { .. }));
    }
    assert_eq!(harness.platform.fetch_calls(STAFF_LOG), 0);
}
