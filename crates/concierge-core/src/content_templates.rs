//! Externally supplied user-facing text with `{placeholder}` substitution.
//!
//! Every string a user sees comes from [`ContentTemplates`]. Operators may override any
//! subset through a JSON file; missing fields fall back to the built-in English defaults.
//! Callers only supply correctly-typed substitution values.

use serde::{Deserialize, Serialize};

use crate::platform::{EmbedField, ModalForm, ModalInput, OutboundEmbed};

/// Replaces every `{key}` occurrence for each `(key, value)` pair. Unknown placeholders stay.
pub fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (key, value) in values {
        let placeholder = format!("{{{key}}}");
        if rendered.contains(&placeholder) {
            rendered = rendered.replace(&placeholder, value);
        }
    }
    rendered
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFieldTemplate {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl EmbedFieldTemplate {
    fn new(name: &str, value: &str, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            inline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedTemplate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub fields: Vec<EmbedFieldTemplate>,
}

impl EmbedTemplate {
    fn new(title: &str, description: Option<&str>, color: u32) -> Self {
        Self {
            title: title.to_string(),
            description: description.map(str::to_string),
            color,
            fields: Vec::new(),
        }
    }

    fn with_fields(mut self, fields: Vec<EmbedFieldTemplate>) -> Self {
        self.fields = fields;
        self
    }

    /// Renders description and field values. The title is used verbatim so it stays a
    /// stable identity for find-or-send lookups.
    pub fn render(&self, values: &[(&str, &str)]) -> OutboundEmbed {
        OutboundEmbed {
            title: self.title.clone(),
            description: self
                .description
                .as_deref()
                .map(|description| fill_placeholders(description, values)),
            color: Some(self.color),
            fields: self
                .fields
                .iter()
                .map(|field| EmbedField {
                    name: fill_placeholders(&field.name, values),
                    value: fill_placeholders(&field.value, values),
                    inline: field.inline,
                })
                .collect(),
            ..OutboundEmbed::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonLabels {
    pub create_ticket: String,
    pub claim_ticket: String,
    pub close_ticket: String,
    pub query_staff: String,
}

impl Default for ButtonLabels {
    fn default() -> Self {
        Self {
            create_ticket: "Create Ticket".to_string(),
            claim_ticket: "Handle Ticket".to_string(),
            close_ticket: "Close Ticket".to_string(),
            query_staff: "Query Staff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalTemplate {
    pub title: String,
    pub input_label: String,
    pub input_placeholder: String,
    pub input_max_length: u16,
}

impl Default for ModalTemplate {
    fn default() -> Self {
        Self {
            title: "Staff Query".to_string(),
            input_label: "Staff user ID".to_string(),
            input_placeholder: "e.g. 123456789012345678".to_string(),
            input_max_length: 20,
        }
    }
}

impl ModalTemplate {
    pub fn to_form(&self, custom_id: &str, input_custom_id: &str) -> ModalForm {
        ModalForm {
            custom_id: custom_id.to_string(),
            title: self.title.clone(),
            inputs: vec![ModalInput {
                custom_id: input_custom_id.to_string(),
                label: self.input_label.clone(),
                placeholder: Some(self.input_placeholder.clone()),
                required: true,
                min_length: Some(1),
                max_length: Some(self.input_max_length),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseTemplates {
    pub ticket_created: String,
    pub max_tickets_reached: String,
    pub ticket_exists: String,
    pub configuration_missing: String,
    pub not_ticket_channel: String,
    pub no_claim_permission: String,
    pub no_close_permission: String,
    pub ticket_already_claimed: String,
    pub ticket_claimed: String,
    pub ticket_closing: String,
    pub invalid_identifier: String,
    pub external_unavailable: String,
    pub transport_failure: String,
    pub modal_error: String,
    pub query_error: String,
    pub panel_updated: String,
    pub panel_update_error: String,
    pub unknown_user: String,
    pub leaderboard_entry: String,
    pub leaderboard_no_data: String,
    pub leaderboard_unavailable: String,
}

impl Default for ResponseTemplates {
    fn default() -> Self {
        Self {
            ticket_created: "✅ Your ticket has been created: {channel}".to_string(),
            max_tickets_reached: "❌ You can have at most {max} open ticket(s) at a time."
                .to_string(),
            ticket_exists: "❌ You already have an open ticket: {channel}".to_string(),
            configuration_missing:
                "❌ The {item} is not configured correctly. Please contact an administrator."
                    .to_string(),
            not_ticket_channel: "❌ This channel is not an open ticket.".to_string(),
            no_claim_permission: "❌ You do not have permission to handle tickets.".to_string(),
            no_close_permission:
                "❌ Only the ticket owner or an administrator can close this ticket.".to_string(),
            ticket_already_claimed: "❌ This ticket is already being handled by {staff}."
                .to_string(),
            ticket_claimed: "✅ You are now handling this ticket.".to_string(),
            ticket_closing: "🔒 This ticket will be deleted in {seconds} seconds.".to_string(),
            invalid_identifier: "❌ Please enter a valid user ID (17-20 digits).".to_string(),
            external_unavailable:
                "❌ A required channel or user could not be reached. Please try again later."
                    .to_string(),
            transport_failure: "❌ The request could not be completed. Please try again later."
                .to_string(),
            modal_error: "❌ The query form could not be opened.".to_string(),
            query_error: "❌ The staff query failed. Please try again later.".to_string(),
            panel_updated: "✅ Ticket panel updated.".to_string(),
            panel_update_error: "❌ The ticket panel could not be updated.".to_string(),
            unknown_user: "Unknown user ({userId})".to_string(),
            leaderboard_entry: "{medal} {user}: `{count} tickets`".to_string(),
            leaderboard_no_data: "`No data yet`".to_string(),
            leaderboard_unavailable: "`Data unavailable`".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentTemplates {
    pub footer: String,
    pub panel: EmbedTemplate,
    pub ticket_welcome: EmbedTemplate,
    pub ticket_close: EmbedTemplate,
    pub ticket_claimed: EmbedTemplate,
    pub management: EmbedTemplate,
    pub staff_query_result: EmbedTemplate,
    pub log_ticket_created: EmbedTemplate,
    pub log_ticket_closed: EmbedTemplate,
    pub log_ticket_claimed: EmbedTemplate,
    /// Text content of the claim log entry. Must start with `{handledBy}`: the leaderboard
    /// counts the first mention in each staff-log entry.
    pub claim_log_content: String,
    pub buttons: ButtonLabels,
    pub staff_query_modal: ModalTemplate,
    pub responses: ResponseTemplates,
}

impl Default for ContentTemplates {
    fn default() -> Self {
        Self {
            footer: "{guildName} Ticket System".to_string(),
            panel: EmbedTemplate::new(
                "🎫 Support Tickets",
                Some("Need help? Press the button below to open a private support ticket."),
                0x5865F2,
            ),
            ticket_welcome: EmbedTemplate::new(
                "🎫 Ticket Opened",
                Some("Welcome {user}! Describe your issue and a staff member will be with you shortly."),
                0x57F287,
            ),
            ticket_close: EmbedTemplate::new(
                "🔒 Ticket Closed",
                Some("This ticket was closed by {user}. The channel will be deleted shortly."),
                0xED4245,
            ),
            ticket_claimed: EmbedTemplate::new(
                "🎯 Ticket Handled",
                Some("{staff} is now handling this ticket ({timestamp})."),
                0xFEE75C,
            ),
            management: EmbedTemplate::new(
                "📊 Ticket Management",
                Some("Live support statistics for **{guildName}**."),
                0x5865F2,
            )
            .with_fields(vec![
                EmbedFieldTemplate::new("🎫 Active Tickets", "`{activeTickets}`", true),
                EmbedFieldTemplate::new("👥 Members", "`{totalUsers}`", true),
                EmbedFieldTemplate::new("🏆 Top Staff", "{topStaff}", false),
                EmbedFieldTemplate::new("⏱️ Uptime", "`{uptime}`", true),
            ]),
            staff_query_result: EmbedTemplate::new(
                "🔍 Staff Query",
                Some("Statistics for **{userName}**."),
                0x5865F2,
            )
            .with_fields(vec![EmbedFieldTemplate::new(
                "🎯 Tickets Handled",
                "`{mentionCount} tickets`",
                true,
            )]),
            log_ticket_created: EmbedTemplate::new("📥 Ticket Created", None, 0x57F287)
                .with_fields(vec![
                    EmbedFieldTemplate::new("User", "{user} ({userTag}, `{userId}`)", false),
                    EmbedFieldTemplate::new("Channel", "{channel} (`{channelId}`)", false),
                    EmbedFieldTemplate::new("Created", "{timestamp}", false),
                ]),
            log_ticket_closed: EmbedTemplate::new("📤 Ticket Closed", None, 0xED4245)
                .with_fields(vec![
                    EmbedFieldTemplate::new("User", "{user} ({userTag}, `{userId}`)", false),
                    EmbedFieldTemplate::new("Channel", "#{channelName} (`{channelId}`)", false),
                    EmbedFieldTemplate::new(
                        "Closed By",
                        "{closedBy} ({closedByTag}, `{closedById}`)",
                        false,
                    ),
                    EmbedFieldTemplate::new("Closed", "{timestamp}", false),
                ]),
            log_ticket_claimed: EmbedTemplate::new("🎯 Ticket Handled", None, 0xFEE75C)
                .with_fields(vec![
                    EmbedFieldTemplate::new(
                        "Staff",
                        "{handledBy} ({handledByTag}, `{handledById}`)",
                        false,
                    ),
                    EmbedFieldTemplate::new("User", "{user} (`{userId}`)", false),
                ]),
            claim_log_content: "**{handledBy} handled a support request! 🎯**".to_string(),
            buttons: ButtonLabels::default(),
            staff_query_modal: ModalTemplate::default(),
            responses: ResponseTemplates::default(),
        }
    }
}

impl ContentTemplates {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn footer_for(&self, guild_name: &str) -> String {
        fill_placeholders(&self.footer, &[("guildName", guild_name)])
    }
}
