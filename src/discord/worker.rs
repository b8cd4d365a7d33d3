//! Worker loop.
//!
//! Owns the worker ends of the bridge channels. Platform events are handled
//! as they arrive; once the connection is first ready, the outbound queues
//! and the log buffer are serviced on a timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::bridge::channels::{take_one, WorkerChannels};
use crate::common::error::{CommandError, WorkerResult};
use crate::common::logging::{LogForward, LogForwarder};
use crate::common::{CommandConfig, OutboundMessage};
use crate::discord::commands::{
    parse_invocation, report_command_error, run_clear_history, CommandAction, CommandRegistry,
};
use crate::discord::gateway::{ButtonPress, Gateway, MessageSnapshot, WorkerEvent};
use crate::discord::handler;
use crate::discord::resolver::DestinationResolver;

/// Result of one queue-servicing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Failed,
}

/// What one servicing iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationReport {
    pub log: LogForward,
    /// `None` when no outbound message was pending.
    pub message: Option<StepOutcome>,
    /// `None` when no command config was pending or the iteration stopped early.
    pub command: Option<StepOutcome>,
}

impl IterationReport {
    /// Whether a message or command was taken off its queue.
    pub fn found_work(&self) -> bool {
        self.message.is_some() || self.command.is_some()
    }
}

pub struct Worker<G: Gateway> {
    gateway: G,
    channels: WorkerChannels,
    events: mpsc::UnboundedReceiver<WorkerEvent<G::Interaction>>,
    registry: CommandRegistry,
    destinations: DestinationResolver<G::Destination>,
    log: LogForwarder,
    poll_interval: Duration,
    polling: bool,
}

impl<G: Gateway> Worker<G> {
    pub fn new(
        gateway: G,
        channels: WorkerChannels,
        events: mpsc::UnboundedReceiver<WorkerEvent<G::Interaction>>,
        log: LogForwarder,
        poll_interval: Duration,
    ) -> Self {
        Self {
            gateway,
            channels,
            events,
            registry: CommandRegistry::with_builtins(),
            destinations: DestinationResolver::new(),
            log,
            poll_interval,
            polling: false,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Run until the platform event stream closes.
    pub async fn run(mut self) {
        let timer = sleep(Duration::ZERO);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Discord event stream closed");
                        break;
                    }
                },
                _ = &mut timer, if self.polling => {
                    let report = self.service_queues().await;
                    // Busy queues are drained back to back.
                    let delay = if report.found_work() {
                        Duration::ZERO
                    } else {
                        self.poll_interval
                    };
                    timer.as_mut().reset(Instant::now() + delay);
                }
            }
        }
    }

    /// One servicing iteration: forward buffered logs, then send at most one
    /// outbound message, then register at most one command.
    ///
    /// A failing step ends the iteration; later steps wait for the next one.
    pub async fn service_queues(&mut self) -> IterationReport {
        let mut report = IterationReport {
            log: self.log.forward(&self.channels.log_tx),
            message: None,
            command: None,
        };

        if let Some(message) = take_one(&mut self.channels.msg_rx) {
            if let Err(e) = self.deliver(message).await {
                error!("Failed to send message: {}", e);
                report.message = Some(StepOutcome::Failed);
                return report;
            }
            report.message = Some(StepOutcome::Completed);
        }

        if let Some(config) = take_one(&mut self.channels.cmd_config_rx) {
            if let Err(e) = self.register(config) {
                error!("Failed to register command: {}", e);
                report.command = Some(StepOutcome::Failed);
                return report;
            }
            report.command = Some(StepOutcome::Completed);
        }

        report
    }

    async fn deliver(&mut self, message: OutboundMessage) -> WorkerResult<()> {
        let destination = self.destinations.resolve(&self.gateway, message.target).await;
        self.gateway.send(destination.as_ref(), message).await
    }

    fn register(&mut self, config: CommandConfig) -> WorkerResult<()> {
        let name = config.name.clone();
        match self.registry.register(config)? {
            Some(_) => info!("Replaced command '{}'", name),
            None => info!("Registered command '{}'", name),
        }
        Ok(())
    }

    pub async fn handle_event(&mut self, event: WorkerEvent<G::Interaction>) {
        match event {
            WorkerEvent::Ready { user_name } => {
                info!("Discord bot connected as {}", user_name);
                if !self.polling {
                    self.polling = true;
                    info!("Starting queue service");
                }
            }
            WorkerEvent::Message(message) => {
                if let Err(e) = self.on_message(message).await {
                    error!("{}", e);
                }
            }
            WorkerEvent::MessageEdit { id_prev, message } => self.on_message_edit(id_prev, message),
            WorkerEvent::ButtonPress(press) => self.on_button_press(press).await,
            WorkerEvent::Disconnected => warn!("Discord connection lost"),
        }
    }

    /// Dispatch commands and forward everything else.
    ///
    /// Returns the command error that was not shown to the user verbatim.
    pub async fn on_message(&mut self, message: MessageSnapshot) -> Result<(), CommandError> {
        if message.author_is_bot {
            return Ok(());
        }

        if let Some(parsed) = parse_invocation(&message.content) {
            debug!("Processing command: {} with args: {:?}", parsed.name, parsed.args);
            if let Err(e) = self.invoke(&message, &parsed.name, parsed.args) {
                return report_command_error(&self.gateway, message.channel_id, e).await;
            }
            return Ok(());
        }

        if handler::should_forward(&message) {
            let record = handler::inbound_message(&message, None);
            handler::forward(&self.channels.msg_tx, record, "Message");
        }
        Ok(())
    }

    fn invoke(&mut self, message: &MessageSnapshot, name: &str, args: Vec<String>) -> Result<(), CommandError> {
        let entry = self.registry.resolve(name)?;

        match entry.action {
            CommandAction::Forward => {
                let record = handler::command_invocation(message, &entry.name, args);
                handler::forward(&self.channels.cmd_tx, record, "Command input");
            }
            CommandAction::ClearHistory => {
                tokio::spawn(run_clear_history(self.gateway.clone(), message.channel_id));
            }
        }
        Ok(())
    }

    fn on_message_edit(&mut self, id_prev: u64, message: MessageSnapshot) {
        if !handler::should_forward(&message) {
            return;
        }
        let record = handler::inbound_message(&message, Some(id_prev));
        handler::forward(&self.channels.msg_tx, record, "Message edit");
    }

    async fn on_button_press(&mut self, press: ButtonPress<G::Interaction>) {
        let record = handler::button_interaction(&press);
        handler::forward(&self.channels.cmd_tx, record, "Button input");

        if let Err(e) = self.gateway.acknowledge(&press.interaction).await {
            warn!("Failed to acknowledge button '{}': {}", press.id_btn, e);
        }
    }
}
