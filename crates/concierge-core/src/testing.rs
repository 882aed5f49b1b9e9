//! Scripted in-memory [`PlatformApi`] used by unit and integration tests.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::platform::{
    ChannelKind, HistoryQuery, InteractionRef, InteractionResponse, OutboundMessage, PlatformApi,
    PlatformChannel, PlatformError, PlatformGuild, PlatformMessage, PlatformResult, PlatformUser,
    TicketChannelRequest,
};

const FIRST_SYNTHETIC_ID: u64 = 900_000_000_000_000_000;

#[derive(Default)]
struct InMemoryState {
    channels: Vec<PlatformChannel>,
    users: HashMap<String, PlatformUser>,
    messages: BTreeMap<String, Vec<PlatformMessage>>,
    failing_operations: HashSet<String>,
    unreachable_channels: HashSet<String>,
    created_channels: Vec<TicketChannelRequest>,
    deleted_channels: Vec<String>,
    edited_messages: Vec<(String, String)>,
    interaction_responses: Vec<(InteractionRef, InteractionResponse)>,
    fetch_calls: HashMap<String, usize>,
}

pub struct InMemoryPlatform {
    bot: PlatformUser,
    guild: PlatformGuild,
    next_id: AtomicU64,
    create_latency: Mutex<Option<Duration>>,
    state: Mutex<InMemoryState>,
}

impl InMemoryPlatform {
    pub fn new(guild_id: &str, bot_user_id: &str) -> Self {
        let mut bot = PlatformUser::new(bot_user_id, "concierge");
        bot.bot = true;
        Self {
            bot,
            guild: PlatformGuild {
                id: guild_id.to_string(),
                name: "Test Guild".to_string(),
                member_count: Some(42),
                icon_url: None,
            },
            next_id: AtomicU64::new(FIRST_SYNTHETIC_ID),
            create_latency: Mutex::new(None),
            state: Mutex::new(InMemoryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, InMemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn allocate_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    pub fn bot_user_id(&self) -> &str {
        &self.bot.id
    }

    pub fn set_member_count(&mut self, member_count: u64) {
        self.guild.member_count = Some(member_count);
    }

    pub fn add_channel(&self, id: &str, name: &str, kind: ChannelKind) {
        self.add_channel_with_topic(id, name, kind, None);
    }

    pub fn add_channel_with_topic(
        &self,
        id: &str,
        name: &str,
        kind: ChannelKind,
        topic: Option<&str>,
    ) {
        let mut state = self.state();
        state.channels.push(PlatformChannel {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            topic: topic.map(str::to_string),
            parent_id: None,
        });
        state.messages.entry(id.to_string()).or_default();
    }

    pub fn add_user(&self, user: PlatformUser) {
        self.state().users.insert(user.id.clone(), user);
    }

    /// Appends messages oldest first, authored by `author_id`.
    pub fn seed_messages<I, S>(&self, channel_id: &str, author_id: &str, contents: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let seeded = contents
            .into_iter()
            .map(|content| PlatformMessage {
                id: self.allocate_id(),
                channel_id: channel_id.to_string(),
                author_id: author_id.to_string(),
                content: content.into(),
                embed_titles: Vec::new(),
            })
            .collect::<Vec<_>>();
        self.state()
            .messages
            .entry(channel_id.to_string())
            .or_default()
            .extend(seeded);
    }

    pub fn seed_embed_message(&self, channel_id: &str, author_id: &str, title: &str) -> String {
        let id = self.allocate_id();
        self.state()
            .messages
            .entry(channel_id.to_string())
            .or_default()
            .push(PlatformMessage {
                id: id.clone(),
                channel_id: channel_id.to_string(),
                author_id: author_id.to_string(),
                content: String::new(),
                embed_titles: vec![title.to_string()],
            });
        id
    }

    /// Makes every call named `operation` fail with a transport error.
    pub fn fail_operation(&self, operation: &str) {
        self.state().failing_operations.insert(operation.to_string());
    }

    pub fn recover_operation(&self, operation: &str) {
        self.state().failing_operations.remove(operation);
    }

    pub fn make_channel_unreachable(&self, channel_id: &str) {
        self.state()
            .unreachable_channels
            .insert(channel_id.to_string());
    }

    pub fn set_create_latency(&self, latency: Duration) {
        *self
            .create_latency
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(latency);
    }

    pub fn channels(&self) -> Vec<PlatformChannel> {
        self.state().channels.clone()
    }

    pub fn has_channel(&self, channel_id: &str) -> bool {
        self.state()
            .channels
            .iter()
            .any(|channel| channel.id == channel_id)
    }

    pub fn messages_in(&self, channel_id: &str) -> Vec<PlatformMessage> {
        self.state()
            .messages
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn created_channels(&self) -> Vec<TicketChannelRequest> {
        self.state().created_channels.clone()
    }

    pub fn deleted_channels(&self) -> Vec<String> {
        self.state().deleted_channels.clone()
    }

    pub fn edited_messages(&self) -> Vec<(String, String)> {
        self.state().edited_messages.clone()
    }

    pub fn interaction_responses(&self) -> Vec<(InteractionRef, InteractionResponse)> {
        self.state().interaction_responses.clone()
    }

    pub fn fetch_calls(&self, channel_id: &str) -> usize {
        self.state()
            .fetch_calls
            .get(channel_id)
            .copied()
            .unwrap_or_default()
    }

    fn check_operation(&self, operation: &str) -> PlatformResult<()> {
        if self.state().failing_operations.contains(operation) {
            return Err(PlatformError::transport(operation, "injected failure"));
        }
        Ok(())
    }

    fn check_channel(&self, channel_id: &str) -> PlatformResult<()> {
        let state = self.state();
        if state.unreachable_channels.contains(channel_id)
            || !state.messages.contains_key(channel_id)
        {
            return Err(PlatformError::not_found("channel", channel_id));
        }
        Ok(())
    }
}

fn render_message(
    id: String,
    channel_id: &str,
    author_id: &str,
    message: &OutboundMessage,
) -> PlatformMessage {
    PlatformMessage {
        id,
        channel_id: channel_id.to_string(),
        author_id: author_id.to_string(),
        content: message.content.clone().unwrap_or_default(),
        embed_titles: message
            .embeds
            .iter()
            .map(|embed| embed.title.clone())
            .collect(),
    }
}

fn numeric_id(id: &str) -> u128 {
    id.parse::<u128>().unwrap_or_default()
}

#[async_trait]
impl PlatformApi for InMemoryPlatform {
    async fn current_user(&self) -> PlatformResult<PlatformUser> {
        self.check_operation("current_user")?;
        Ok(self.bot.clone())
    }

    async fn guild(&self, guild_id: &str) -> PlatformResult<PlatformGuild> {
        self.check_operation("guild")?;
        if guild_id != self.guild.id {
            return Err(PlatformError::not_found("guild", guild_id));
        }
        Ok(self.guild.clone())
    }

    async fn guild_channels(&self, guild_id: &str) -> PlatformResult<Vec<PlatformChannel>> {
        self.check_operation("guild_channels")?;
        if guild_id != self.guild.id {
            return Err(PlatformError::not_found("guild", guild_id));
        }
        Ok(self.state().channels.clone())
    }

    async fn user(&self, user_id: &str) -> PlatformResult<PlatformUser> {
        self.check_operation("user")?;
        self.state()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found("user", user_id))
    }

    async fn create_ticket_channel(
        &self,
        guild_id: &str,
        request: &TicketChannelRequest,
    ) -> PlatformResult<PlatformChannel> {
        let latency = *self
            .create_latency
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.check_operation("create_ticket_channel")?;
        if guild_id != self.guild.id {
            return Err(PlatformError::not_found("guild", guild_id));
        }
        let channel = PlatformChannel {
            id: self.allocate_id(),
            name: request.name.clone(),
            kind: ChannelKind::Text,
            topic: Some(request.topic.clone()),
            parent_id: Some(request.parent_id.clone()),
        };
        let mut state = self.state();
        state.created_channels.push(request.clone());
        state.channels.push(channel.clone());
        state.messages.entry(channel.id.clone()).or_default();
        Ok(channel)
    }

    async fn delete_channel(&self, channel_id: &str) -> PlatformResult<()> {
        self.check_operation("delete_channel")?;
        let mut state = self.state();
        let before = state.channels.len();
        state.channels.retain(|channel| channel.id != channel_id);
        if state.channels.len() == before {
            return Err(PlatformError::not_found("channel", channel_id));
        }
        state.messages.remove(channel_id);
        state.deleted_channels.push(channel_id.to_string());
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutboundMessage,
    ) -> PlatformResult<PlatformMessage> {
        self.check_operation("send_message")?;
        self.check_channel(channel_id)?;
        let sent = render_message(self.allocate_id(), channel_id, &self.bot.id, message);
        self.state()
            .messages
            .entry(channel_id.to_string())
            .or_default()
            .push(sent.clone());
        Ok(sent)
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        message: &OutboundMessage,
    ) -> PlatformResult<PlatformMessage> {
        self.check_operation("edit_message")?;
        self.check_channel(channel_id)?;
        let mut state = self.state();
        let existing = state
            .messages
            .get_mut(channel_id)
            .and_then(|messages| messages.iter_mut().find(|entry| entry.id == message_id))
            .ok_or_else(|| PlatformError::not_found("message", message_id))?;
        let edited = render_message(
            message_id.to_string(),
            channel_id,
            &existing.author_id,
            message,
        );
        *existing = edited.clone();
        state
            .edited_messages
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(edited)
    }

    async fn delete_messages(
        &self,
        channel_id: &str,
        message_ids: &[String],
    ) -> PlatformResult<()> {
        self.check_operation("delete_messages")?;
        self.check_channel(channel_id)?;
        if let Some(messages) = self.state().messages.get_mut(channel_id) {
            messages.retain(|message| !message_ids.contains(&message.id));
        }
        Ok(())
    }

    async fn fetch_messages(
        &self,
        channel_id: &str,
        query: &HistoryQuery,
    ) -> PlatformResult<Vec<PlatformMessage>> {
        *self
            .state()
            .fetch_calls
            .entry(channel_id.to_string())
            .or_default() += 1;
        self.check_operation("fetch_messages")?;
        self.check_channel(channel_id)?;
        let state = self.state();
        let before = query.before.as_deref().map(numeric_id);
        Ok(state
            .messages
            .get(channel_id)
            .map(|messages| {
                messages
                    .iter()
                    .rev()
                    .filter(|message| {
                        before.map_or(true, |cutoff| numeric_id(&message.id) < cutoff)
                    })
                    .take(query.limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn respond_to_interaction(
        &self,
        interaction: &InteractionRef,
        response: &InteractionResponse,
    ) -> PlatformResult<()> {
        self.check_operation("respond_to_interaction")?;
        self.state()
            .interaction_responses
            .push((interaction.clone(), response.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryPlatform;
    use crate::platform::{ChannelKind, HistoryQuery, PlatformApi};

    #[tokio::test]
    async fn unit_fetch_messages_pages_newest_first_with_before_cursor() {
        let platform = InMemoryPlatform::new("1", "2");
        platform.add_channel("log", "log", ChannelKind::Text);
        platform.seed_messages("log", "2", (0..5).map(|index| format!("entry {index}")));

        let first = platform
            .fetch_messages("log", &HistoryQuery::latest(2))
            .await
            .expect("first page");
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].content, "entry 4");
        assert_eq!(first[1].content, "entry 3");

        let second = platform
            .fetch_messages(
                "log",
                &HistoryQuery {
                    limit: 10,
                    before: Some(first[1].id.clone()),
                },
            )
            .await
            .expect("second page");
        let contents = second
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(contents, vec!["entry 2", "entry 1", "entry 0"]);
        assert_eq!(platform.fetch_calls("log"), 2);
    }
}
