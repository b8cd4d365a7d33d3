//! serenity wiring for the worker.
//!
//! Provides the [`Gateway`] implementation over Discord's HTTP API, the
//! event handler that snapshots gateway callbacks for the worker loop, and
//! the reconnecting connection loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::BackoffBuilder;
use serenity::all::{
    ButtonStyle as DiscordButtonStyle, ChannelId, ComponentInteraction, CreateActionRow,
    CreateAttachment, CreateButton, CreateInteractionResponse, CreateMessage, GetMessages,
    Interaction, MessageId, MessageUpdateEvent, User, UserId,
};
use serenity::cache::Settings as CacheSettings;
use serenity::gateway::GatewayError;
use serenity::http::{Http, HttpBuilder};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::bridge::channels::WorkerChannels;
use crate::common::error::{WorkerError, WorkerResult};
use crate::common::logging::{LogBuffer, LogForwarder};
use crate::common::{ButtonPayload, ButtonStyle, FilePayload, OutboundMessage};
use crate::config::types::DiscordConfig;
use crate::discord::gateway::{ButtonPress, Gateway, MessageSnapshot, WorkerEvent};
use crate::discord::worker::Worker;

/// Messages kept in the cache so edits can be forwarded.
pub const MESSAGE_CACHE_SIZE: usize = 1000;

/// Filename prefix Discord uses to hide an attachment behind a spoiler.
const SPOILER_PREFIX: &str = "SPOILER_";

/// Upper bound for the reconnect backoff.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

/// Largest page the history endpoint returns.
const HISTORY_PAGE_SIZE: usize = 100;

type DiscordEvent = WorkerEvent<ComponentInteraction>;

/// Resolved send target.
#[derive(Debug, Clone)]
pub enum Destination {
    User(Box<User>),
    Channel(ChannelId),
}

/// [`Gateway`] over Discord's HTTP API.
#[derive(Clone)]
pub struct DiscordGateway {
    http: Arc<Http>,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Gateway for DiscordGateway {
    type Destination = Destination;
    type Interaction = ComponentInteraction;

    async fn fetch_user(&self, id: u64) -> Option<Destination> {
        if id == 0 {
            return None;
        }
        match self.http.get_user(UserId::new(id)).await {
            Ok(user) => Some(Destination::User(Box::new(user))),
            Err(e) => {
                warn!("Failed to fetch user {}: {}", id, e);
                None
            }
        }
    }

    async fn fetch_channel(&self, id: u64) -> Option<Destination> {
        if id == 0 {
            return None;
        }
        match self.http.get_channel(ChannelId::new(id)).await {
            Ok(channel) => Some(Destination::Channel(channel.id())),
            Err(e) => {
                warn!("Failed to fetch channel {}: {}", id, e);
                None
            }
        }
    }

    async fn send(&self, destination: Option<&Destination>, message: OutboundMessage) -> WorkerResult<()> {
        let destination = destination.ok_or(WorkerError::UnresolvedDestination)?;
        let builder = render_message(message);

        let sent = match destination {
            Destination::User(user) => user.direct_message(&self.http, builder).await?,
            Destination::Channel(channel_id) => channel_id.send_message(&self.http, builder).await?,
        };
        debug!("Sent message {} to channel {}", sent.id, sent.channel_id);
        Ok(())
    }

    async fn reply(&self, channel_id: u64, content: &str) -> WorkerResult<()> {
        ChannelId::new(channel_id).say(&self.http, content).await?;
        Ok(())
    }

    async fn acknowledge(&self, interaction: &ComponentInteraction) -> WorkerResult<()> {
        interaction
            .create_response(&self.http, CreateInteractionResponse::Acknowledge)
            .await?;
        Ok(())
    }

    async fn recent_messages(&self, channel_id: u64, limit: usize) -> WorkerResult<Vec<u64>> {
        let channel_id = ChannelId::new(channel_id);
        let mut ids = Vec::new();
        let mut before: Option<MessageId> = None;

        while ids.len() < limit {
            let page = (limit - ids.len()).min(HISTORY_PAGE_SIZE);
            let mut request = GetMessages::new().limit(page as u8);
            if let Some(before) = before {
                request = request.before(before);
            }

            let messages = channel_id.messages(&self.http, request).await?;
            ids.extend(messages.iter().map(|message| message.id.get()));
            before = messages.last().map(|message| message.id);

            if messages.len() < page {
                break;
            }
        }

        Ok(ids)
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> WorkerResult<()> {
        ChannelId::new(channel_id)
            .delete_message(&self.http, MessageId::new(message_id))
            .await?;
        Ok(())
    }
}

/// Build the Discord request for an outbound message.
pub fn render_message(message: OutboundMessage) -> CreateMessage {
    let mut builder = CreateMessage::new().tts(message.tts);

    if !message.content.is_empty() {
        builder = builder.content(message.content);
    }
    if let Some(file) = message.file {
        builder = builder.add_file(render_file(file));
    }
    if let Some(button) = message.button {
        builder = builder.components(vec![render_button(&button)]);
    }

    builder
}

fn render_file(file: FilePayload) -> CreateAttachment {
    let filename = attachment_filename(&file);
    let attachment = CreateAttachment::bytes(file.buffer.to_vec(), filename);
    match file.description {
        Some(description) => attachment.description(description),
        None => attachment,
    }
}

/// Filename sent for an attachment, with the spoiler marker when requested.
pub fn attachment_filename(file: &FilePayload) -> String {
    if file.spoiler && !file.filename.starts_with(SPOILER_PREFIX) {
        format!("{}{}", SPOILER_PREFIX, file.filename)
    } else {
        file.filename.clone()
    }
}

fn render_button(button: &ButtonPayload) -> CreateActionRow {
    CreateActionRow::Buttons(vec![CreateButton::new(button.id_btn.clone())
        .label(button.label.clone())
        .style(button_style(button.style))])
}

fn button_style(style: ButtonStyle) -> DiscordButtonStyle {
    match style {
        ButtonStyle::Primary => DiscordButtonStyle::Primary,
        ButtonStyle::Secondary => DiscordButtonStyle::Secondary,
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    }
}

/// Copy what the worker needs out of a gateway message.
///
/// Names come from the cache only; the callback never waits on HTTP.
fn snapshot_message(ctx: &Context, message: &Message) -> MessageSnapshot {
    let (channel_name, guild_name) = match message.guild_id.and_then(|id| ctx.cache.guild(id)) {
        Some(guild) => (
            lookup_channel_name(
                guild.channels.get(&message.channel_id),
                guild.threads.as_slice(),
                |channel| channel.id == message.channel_id,
                |channel| channel.name.as_str(),
            ),
            Some(guild.name.clone()),
        ),
        None => (None, None),
    };

    MessageSnapshot {
        id: message.id.get(),
        author_id: message.author.id.get(),
        author_name: message.author.name.clone(),
        author_nick: message.member.as_ref().and_then(|member| member.nick.clone()),
        author_is_bot: message.author.bot,
        channel_id: message.channel_id.get(),
        channel_name,
        guild_id: message.guild_id.map(|id| id.get()),
        guild_name,
        content: message.content.clone(),
    }
}

/// Name of a guild channel, falling back to the guild's active threads.
fn lookup_channel_name<C>(
    channel: Option<&C>,
    threads: &[C],
    is_target: impl Fn(&C) -> bool,
    name: impl Fn(&C) -> &str,
) -> Option<String> {
    channel
        .or_else(|| threads.iter().find(|thread| is_target(thread)))
        .map(|channel| name(channel).to_string())
}

struct WorkerEvents {
    events_tx: mpsc::UnboundedSender<DiscordEvent>,
}

impl WorkerEvents {
    fn new(events_tx: mpsc::UnboundedSender<DiscordEvent>) -> Self {
        Self { events_tx }
    }

    fn emit(&self, event: DiscordEvent) {
        if let Err(error) = self.events_tx.send(event) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

#[async_trait]
impl EventHandler for WorkerEvents {
    async fn ready(&self, _context: Context, ready: Ready) {
        self.emit(WorkerEvent::Ready {
            user_name: ready.user.name.clone(),
        });
    }

    async fn message(&self, context: Context, message: Message) {
        self.emit(WorkerEvent::Message(snapshot_message(&context, &message)));
    }

    async fn message_update(
        &self,
        context: Context,
        _old_if_available: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let Some(message) = new else {
            debug!("Edit of uncached message {} ignored", event.id);
            return;
        };
        self.emit(WorkerEvent::MessageEdit {
            id_prev: event.id.get(),
            message: snapshot_message(&context, &message),
        });
    }

    async fn interaction_create(&self, _context: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            self.emit(WorkerEvent::ButtonPress(ButtonPress {
                id_btn: component.data.custom_id.clone(),
                user_id: component.user.id.get(),
                user_name: component.user.name.clone(),
                channel_id: component.channel_id.get(),
                interaction: component,
            }));
        }
    }
}

fn build_http(token: &str) -> anyhow::Result<Http> {
    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    Ok(HttpBuilder::new(token).client(reqwest_client).build())
}

async fn build_client(token: &str, events_tx: mpsc::UnboundedSender<DiscordEvent>) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGE_REACTIONS;

    let mut cache_settings = CacheSettings::default();
    cache_settings.max_messages = MESSAGE_CACHE_SIZE;

    let client = serenity::client::ClientBuilder::new_with_http(build_http(token)?, intents)
        .cache_settings(cache_settings)
        .event_handler(WorkerEvents::new(events_tx))
        .await?;
    Ok(client)
}

/// Keep a gateway connection up, reconnecting with backoff.
///
/// Returns on a clean shutdown or when Discord rejects the token.
async fn run_connection(token: &str, events_tx: mpsc::UnboundedSender<DiscordEvent>) {
    /// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
    fn discord_backoff() -> impl Iterator<Item = Duration> {
        backon::ExponentialBuilder::default()
            .with_min_delay(Duration::from_secs(5))
            .with_max_delay(MAX_RECONNECT_DELAY)
            .with_factor(1.1)
            .with_jitter()
            .without_max_times()
            .build()
    }

    let mut backoff = discord_backoff();

    loop {
        info!("Connecting to Discord...");

        let mut client = match build_client(token, events_tx.clone()).await {
            Ok(client) => {
                backoff = discord_backoff();
                client
            }
            Err(e) => {
                error!("Failed to build Discord client: {}", e);
                let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                sleep(delay).await;
                continue;
            }
        };

        match client.start().await {
            Ok(()) => {
                info!("Discord client disconnected normally");
                let _ = events_tx.send(WorkerEvent::Disconnected);
                break;
            }
            Err(serenity::Error::Gateway(GatewayError::InvalidAuthentication)) => {
                // Nothing is forwarded before the first ready event.
                eprintln!("Discord rejected the bot token");
                error!("Discord rejected the bot token");
                break;
            }
            Err(e) => {
                error!("Discord client error: {}", e);
                let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                warn!(
                    "Discord disconnected. Reconnecting in {:.1}s...",
                    delay.as_secs_f64(),
                );
                let _ = events_tx.send(WorkerEvent::Disconnected);
                sleep(delay).await;
            }
        }
    }
}

/// Worker body: connect to Discord and service the bridge until the
/// connection gives up.
pub async fn run_worker(config: DiscordConfig, channels: WorkerChannels, log_buffer: LogBuffer) {
    let http = match build_http(&config.token) {
        Ok(http) => Arc::new(http),
        Err(e) => {
            eprintln!("Failed to build Discord HTTP client: {}", e);
            return;
        }
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let worker = Worker::new(
        DiscordGateway::new(http),
        channels,
        events_rx,
        LogForwarder::new(log_buffer),
        config.poll_interval(),
    );

    tokio::select! {
        _ = run_connection(&config.token, events_tx) => {},
        _ = worker.run() => {},
    }
    info!("Discord worker ended");
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn file(name: &str, spoiler: bool) -> FilePayload {
        FilePayload {
            filename: name.to_string(),
            spoiler,
            description: None,
            buffer: Bytes::from_static(b"data"),
        }
    }

    #[test]
    fn test_spoiler_filename() {
        assert_eq!(attachment_filename(&file("cat.png", true)), "SPOILER_cat.png");
        assert_eq!(attachment_filename(&file("SPOILER_cat.png", true)), "SPOILER_cat.png");
        assert_eq!(attachment_filename(&file("cat.png", false)), "cat.png");
    }

    #[test]
    fn test_button_style_mapping() {
        assert_eq!(button_style(ButtonStyle::default()), DiscordButtonStyle::Success);
        assert_eq!(button_style(ButtonStyle::Danger), DiscordButtonStyle::Danger);
        assert_eq!(button_style(ButtonStyle::Primary), DiscordButtonStyle::Primary);
    }

    #[test]
    fn test_channel_name_falls_back_to_threads() {
        let general = (10_u64, "general");
        let threads = [(11_u64, "release-notes"), (12_u64, "help")];
        let lookup = |channel: Option<&(u64, &'static str)>, id: u64| {
            lookup_channel_name(channel, &threads[..], |c| c.0 == id, |c| c.1)
        };

        assert_eq!(lookup(Some(&general), 10), Some("general".to_string()));
        assert_eq!(lookup(None, 12), Some("help".to_string()));
        assert_eq!(lookup(None, 99), None);
    }
}
