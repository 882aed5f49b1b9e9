//! Two-step staff lookup: open the query form, then answer the submitted identifier.

use std::sync::Arc;

use concierge_analytics::StaffAnalyticsAggregator;
use concierge_core::{
    controls, current_rfc3339_timestamp, fill_placeholders, is_platform_identifier, mention_of,
    ContentTemplates, InteractionResponse, OutboundMessage, PlatformApi, PlatformGuild,
};
use concierge_tickets::TicketError;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffQueryResult {
    pub staff_id: String,
    pub display_name: String,
    pub mention_count: u64,
}

pub struct StaffQueryFlow {
    platform: Arc<dyn PlatformApi>,
    templates: Arc<ContentTemplates>,
    analytics: Arc<StaffAnalyticsAggregator>,
    guild: PlatformGuild,
    staff_log_channel_id: String,
}

impl StaffQueryFlow {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        templates: Arc<ContentTemplates>,
        analytics: Arc<StaffAnalyticsAggregator>,
        guild: PlatformGuild,
        staff_log_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            templates,
            analytics,
            guild,
            staff_log_channel_id: staff_log_channel_id.into(),
        }
    }

    /// Step one: the input form shown when the `query_staff` control is pressed.
    pub fn open_form(&self) -> InteractionResponse {
        InteractionResponse::Modal(
            self.templates
                .staff_query_modal
                .to_form(controls::STAFF_QUERY_MODAL, controls::STAFF_ID_INPUT),
        )
    }

    /// Step two: validates `staff_id` as submitted and counts the staff log entries mentioning it.
    ///
    /// An invalid identifier fails before the log is read.
    pub async fn resolve(&self, staff_id: &str) -> Result<StaffQueryResult, TicketError> {
        if !is_platform_identifier(staff_id) {
            return Err(TicketError::InvalidIdentifierFormat {
                value: staff_id.to_string(),
            });
        }
        let display_name = self.display_name(staff_id).await;
        let mention_count = self
            .analytics
            .count_mentions_of(&self.staff_log_channel_id, staff_id)
            .await;
        info!(staff_id, mention_count, "staff query answered");
        Ok(StaffQueryResult {
            staff_id: staff_id.to_string(),
            display_name,
            mention_count,
        })
    }

    /// Full reply for a submitted form. Every failure becomes an ephemeral error message.
    pub async fn submit(&self, raw_id: &str) -> OutboundMessage {
        match self.resolve(raw_id).await {
            Ok(result) => self.render(&result),
            Err(error) => {
                debug!(error = %error, "staff query rejected");
                OutboundMessage::ephemeral_text(error.response_text(&self.templates))
            }
        }
    }

    pub fn render(&self, result: &StaffQueryResult) -> OutboundMessage {
        let user = mention_of(&result.staff_id);
        let count = result.mention_count.to_string();
        let embed = self
            .templates
            .staff_query_result
            .render(&[
                ("userName", result.display_name.as_str()),
                ("userId", result.staff_id.as_str()),
                ("user", user.as_str()),
                ("mentionCount", count.as_str()),
            ])
            .with_footer(
                self.templates.footer_for(&self.guild.name),
                self.guild.icon_url.as_deref(),
            )
            .with_timestamp(current_rfc3339_timestamp());
        OutboundMessage::embed(embed)
    }

    async fn display_name(&self, staff_id: &str) -> String {
        match self.platform.user(staff_id).await {
            Ok(user) => format!("{} ({})", user.tag(), user.username),
            Err(error) => {
                debug!(staff_id, error = %error, "staff lookup failed");
                fill_placeholders(
                    &self.templates.responses.unknown_user,
                    &[("userId", staff_id)],
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use concierge_analytics::{ScanWindow, StaffAnalyticsAggregator};
    use concierge_core::{
        testing::InMemoryPlatform, ChannelKind, ContentTemplates, InteractionResponse,
        PlatformApi, PlatformGuild, PlatformUser,
    };
    use concierge_tickets::TicketError;

    use super::StaffQueryFlow;

    const GUILD: &str = "100000000000000000";
    const BOT: &str = "100000000000000999";
    const STAFF_LOG: &str = "200000000000000002";
    const STAFF: &str = "300000000000000001";

    fn flow(platform: &Arc<InMemoryPlatform>) -> StaffQueryFlow {
        let platform_api = platform.clone() as Arc<dyn PlatformApi>;
        StaffQueryFlow::new(
            platform_api.clone(),
            Arc::new(ContentTemplates::default()),
            Arc::new(StaffAnalyticsAggregator::new(
                platform_api,
                ScanWindow::default(),
            )),
            PlatformGuild {
                id: GUILD.to_string(),
                name: "Test Guild".to_string(),
                member_count: Some(42),
                icon_url: None,
            },
            STAFF_LOG,
        )
    }

    #[test]
    fn unit_open_form_targets_staff_id_input() {
        let platform = Arc::new(InMemoryPlatform::new(GUILD, BOT));
        let InteractionResponse::Modal(form) = flow(&platform).open_form() else {
            panic!("expected modal");
        };
        assert_eq!(form.custom_id, "staff_query_modal");
        assert_eq!(form.inputs[0].custom_id, "staff_id_input");
    }

    #[tokio::test]
    async fn functional_resolve_counts_mentions_and_names_user() {
        let platform = Arc::new(InMemoryPlatform::new(GUILD, BOT));
        platform.add_channel(STAFF_LOG, "staff-log", ChannelKind::Text);
        let mention = format!("**<@{STAFF}> handled a support request! 🎯**");
        platform.seed_messages(STAFF_LOG, BOT, [mention.clone(), mention, "other".to_string()]);
        let mut user = PlatformUser::new(STAFF, "bob");
        user.global_name = Some("Bob B.".to_string());
        platform.add_user(user);

        let result = flow(&platform).resolve(STAFF).await.expect("resolve");
        assert_eq!(result.mention_count, 2);
        assert_eq!(result.display_name, "Bob B. (bob)");

        let reply = flow(&platform).render(&result);
        assert!(!reply.ephemeral);
        let fields = &reply.embeds[0].fields;
        assert_eq!(fields[0].value, "`2 tickets`");
    }

    #[tokio::test]
    async fn regression_invalid_identifier_never_reads_the_log() {
        let platform = Arc::new(InMemoryPlatform::new(GUILD, BOT));
        platform.add_channel(STAFF_LOG, "staff-log", ChannelKind::Text);
        let query = flow(&platform);

        let error = query.resolve("abc").await.expect_err("invalid");
        assert!(matches!(error, TicketError::InvalidIdentifierFormat { .. }));
        let reply = query.submit("123").await;
        assert!(reply.ephemeral);
        assert_eq!(
            reply.content.as_deref(),
            Some("❌ Please enter a valid user ID (17-20 digits).")
        );
        assert_eq!(platform.fetch_calls(STAFF_LOG), 0);
    }

    #[tokio::test]
    async fn regression_padded_or_non_ascii_identifier_is_rejected_as_submitted() {
        let platform = Arc::new(InMemoryPlatform::new(GUILD, BOT));
        platform.add_channel(STAFF_LOG, "staff-log", ChannelKind::Text);
        let query = flow(&platform);

        for raw in [
            " 300000000000000001 ",
            "300000000000000001\n",
            "３００００００００００００００００１",
            "٣٠٠٠٠٠٠٠٠٠٠٠٠٠٠٠٠١",
        ] {
            let error = query.resolve(raw).await.expect_err("invalid");
            assert!(matches!(
                error,
                TicketError::InvalidIdentifierFormat { ref value } if value == raw
            ));
        }
        assert_eq!(platform.fetch_calls(STAFF_LOG), 0);
    }

    #[tokio::test]
    async fn functional_unknown_user_and_unreachable_log_still_answer() {
        let platform = Arc::new(InMemoryPlatform::new(GUILD, BOT));
        let reply = flow(&platform).submit(STAFF).await;
        assert!(!reply.ephemeral);
        assert_eq!(
            reply.embeds[0].description.as_deref(),
            Some(format!("Statistics for **Unknown user ({STAFF})**.").as_str())
        );
        assert_eq!(reply.embeds[0].fields[0].value, "`0 tickets`");
    }
}
