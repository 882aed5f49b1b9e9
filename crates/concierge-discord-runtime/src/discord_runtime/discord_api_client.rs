//! Discord REST client implementing the platform contract.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use concierge_core::{
    HistoryQuery, InteractionRef, InteractionResponse, OutboundMessage, PlatformApi,
    PlatformChannel, PlatformError, PlatformGuild, PlatformMessage, PlatformResult, PlatformUser,
    TicketChannelRequest,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::discord_payloads::{
    interaction_callback_payload, message_payload, ticket_channel_payload, DiscordChannel,
    DiscordGuild, DiscordMessage, DiscordUser,
};
use crate::discord_helpers::{
    is_retryable_discord_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};

const MAX_HISTORY_PAGE: usize = 100;
const MAX_BULK_DELETE: usize = 100;

enum RequestFailure {
    Status { status: u16, body: String },
    Transport(String),
}

impl RequestFailure {
    fn into_platform_error(self, operation: &str, resource: &'static str, id: &str) -> PlatformError {
        match self {
            Self::Status { status: 404, .. } => PlatformError::not_found(resource, id),
            Self::Status { status, body } => PlatformError::transport(
                operation,
                format!("status {status}: {}", truncate_for_error(&body, 800)),
            ),
            Self::Transport(detail) => PlatformError::transport(operation, detail),
        }
    }
}

#[derive(Clone)]
pub struct DiscordApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl DiscordApiClient {
    pub fn new(
        api_base: String,
        bot_token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("DiscordBot (concierge, 0.1)"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create discord api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header(
            reqwest::header::AUTHORIZATION,
            format!("Bot {}", self.bot_token),
        )
    }

    async fn send_with_retry<F>(
        &self,
        mut builder: F,
    ) -> std::result::Result<reqwest::Response, RequestFailure>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = self
                .authorized(builder())
                .header(
                    "x-concierge-retry-attempt",
                    attempt.saturating_sub(1).to_string(),
                )
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_discord_status(status.as_u16())
                    {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }
                    return Err(RequestFailure::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(RequestFailure::Transport(error.to_string()));
                }
            }
        }
    }

    async fn request_json<T, F>(
        &self,
        operation: &str,
        resource: &'static str,
        id: &str,
        builder: F,
    ) -> PlatformResult<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let response = self
            .send_with_retry(builder)
            .await
            .map_err(|failure| failure.into_platform_error(operation, resource, id))?;
        response.json::<T>().await.map_err(|error| {
            PlatformError::transport(operation, format!("failed to decode response: {error}"))
        })
    }

    async fn request_empty<F>(
        &self,
        operation: &str,
        resource: &'static str,
        id: &str,
        builder: F,
    ) -> PlatformResult<()>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        self.send_with_retry(builder)
            .await
            .map(|_| ())
            .map_err(|failure| failure.into_platform_error(operation, resource, id))
    }
}

#[async_trait]
impl PlatformApi for DiscordApiClient {
    async fn current_user(&self) -> PlatformResult<PlatformUser> {
        let user: DiscordUser = self
            .request_json("current_user", "user", "@me", || {
                self.http.get(self.url("/users/@me"))
            })
            .await?;
        Ok(user.into())
    }

    async fn guild(&self, guild_id: &str) -> PlatformResult<PlatformGuild> {
        let guild: DiscordGuild = self
            .request_json("guild", "guild", guild_id, || {
                self.http
                    .get(self.url(&format!("/guilds/{guild_id}")))
                    .query(&[("with_counts", "true")])
            })
            .await?;
        Ok(guild.into())
    }

    async fn guild_channels(&self, guild_id: &str) -> PlatformResult<Vec<PlatformChannel>> {
        let channels: Vec<DiscordChannel> = self
            .request_json("guild_channels", "guild", guild_id, || {
                self.http
                    .get(self.url(&format!("/guilds/{guild_id}/channels")))
            })
            .await?;
        Ok(channels.into_iter().map(PlatformChannel::from).collect())
    }

    async fn user(&self, user_id: &str) -> PlatformResult<PlatformUser> {
        let user: DiscordUser = self
            .request_json("user", "user", user_id, || {
                self.http.get(self.url(&format!("/users/{user_id}")))
            })
            .await?;
        Ok(user.into())
    }

    async fn create_ticket_channel(
        &self,
        guild_id: &str,
        request: &TicketChannelRequest,
    ) -> PlatformResult<PlatformChannel> {
        let payload = ticket_channel_payload(guild_id, request);
        let channel: DiscordChannel = self
            .request_json("create_ticket_channel", "guild", guild_id, || {
                self.http
                    .post(self.url(&format!("/guilds/{guild_id}/channels")))
                    .json(&payload)
            })
            .await?;
        Ok(channel.into())
    }

    async fn delete_channel(&self, channel_id: &str) -> PlatformResult<()> {
        self.request_empty("delete_channel", "channel", channel_id, || {
            self.http
                .delete(self.url(&format!("/channels/{channel_id}")))
        })
        .await
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutboundMessage,
    ) -> PlatformResult<PlatformMessage> {
        let payload = message_payload(message);
        let posted: DiscordMessage = self
            .request_json("send_message", "channel", channel_id, || {
                self.http
                    .post(self.url(&format!("/channels/{channel_id}/messages")))
                    .json(&payload)
            })
            .await?;
        Ok(posted.into())
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        message: &OutboundMessage,
    ) -> PlatformResult<PlatformMessage> {
        let payload = message_payload(message);
        let edited: DiscordMessage = self
            .request_json("edit_message", "message", message_id, || {
                self.http
                    .patch(self.url(&format!(
                        "/channels/{channel_id}/messages/{message_id}"
                    )))
                    .json(&payload)
            })
            .await?;
        Ok(edited.into())
    }

    async fn delete_messages(
        &self,
        channel_id: &str,
        message_ids: &[String],
    ) -> PlatformResult<()> {
        for chunk in message_ids.chunks(MAX_BULK_DELETE) {
            if let [message_id] = chunk {
                self.request_empty("delete_message", "message", message_id, || {
                    self.http.delete(self.url(&format!(
                        "/channels/{channel_id}/messages/{message_id}"
                    )))
                })
                .await?;
                continue;
            }
            let payload = json!({ "messages": chunk });
            self.request_empty("bulk_delete_messages", "channel", channel_id, || {
                self.http
                    .post(self.url(&format!(
                        "/channels/{channel_id}/messages/bulk-delete"
                    )))
                    .json(&payload)
            })
            .await?;
        }
        Ok(())
    }

    async fn fetch_messages(
        &self,
        channel_id: &str,
        query: &HistoryQuery,
    ) -> PlatformResult<Vec<PlatformMessage>> {
        let limit = query.limit.clamp(1, MAX_HISTORY_PAGE).to_string();
        let messages: Vec<DiscordMessage> = self
            .request_json("fetch_messages", "channel", channel_id, || {
                let mut request = self
                    .http
                    .get(self.url(&format!("/channels/{channel_id}/messages")))
                    .query(&[("limit", limit.as_str())]);
                if let Some(before) = query.before.as_deref() {
                    request = request.query(&[("before", before)]);
                }
                request
            })
            .await?;
        Ok(messages.into_iter().map(PlatformMessage::from).collect())
    }

    async fn respond_to_interaction(
        &self,
        interaction: &InteractionRef,
        response: &InteractionResponse,
    ) -> PlatformResult<()> {
        let payload = interaction_callback_payload(response);
        self.request_empty(
            "respond_to_interaction",
            "interaction",
            &interaction.id,
            || {
                self.http
                    .post(self.url(&format!(
                        "/interactions/{}/{}/callback",
                        interaction.id, interaction.token
                    )))
                    .json(&payload)
            },
        )
        .await
    }
}
