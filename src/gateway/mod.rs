//! Gateway: the main event loop connecting the channel, the command layer,
//! and the reminder scheduler.

mod delivery;


pub use delivery::ChannelDispatcher;

use crate::commands::{self, Callback, Command, CommandContext, Reply};
use crate::motivation::MotivationManager;
use crate::progress::ProgressEngine;
use crate::scheduler::ReminderScheduler;
use chrono::Local;
use hydro_core::{
    config::ReminderConfig,
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};
use hydro_memory::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Reply to anything that is neither a command nor a known button.
const UNKNOWN_INPUT: &str = "I only understand commands. Try /drink or /help.";

/// The central gateway that routes messages between the channel and the bot logic.
pub struct Gateway {
    channel: Arc<dyn Channel>,
    store: Store,
    scheduler: Arc<ReminderScheduler>,
    progress: ProgressEngine,
    motivation: MotivationManager,
    reminders: ReminderConfig,
    run_scheduler: bool,
    /// Senders with a message in flight. Later messages wait here, so one
    /// user's commands are applied in order.
    active_senders: Mutex<HashMap<i64, Vec<IncomingMessage>>>,
}

impl Gateway {
    pub fn new(
        channel: Arc<dyn Channel>,
        store: Store,
        scheduler: Arc<ReminderScheduler>,
        reminders: ReminderConfig,
        run_scheduler: bool,
    ) -> Self {
        Self {
            progress: ProgressEngine::new(store.clone(), reminders.clone()),
            motivation: MotivationManager::new(store.clone(), reminders.clone()),
            channel,
            store,
            scheduler,
            reminders,
            run_scheduler,
            active_senders: Mutex::new(HashMap::new()),
        }
    }

    /// Run the main event loop until Ctrl-C or the channel closes.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {}: {e}", self.channel.name()))?;
        info!("Channel started: {}", self.channel.name());

        if self.run_scheduler {
            self.scheduler.start();
        } else {
            info!("reminder scheduler disabled by config");
        }

        info!(
            "Hydro gateway running | channel: {} | scheduler: {}",
            self.channel.name(),
            if self.scheduler.is_running() {
                "on"
            } else {
                "off"
            },
        );

        loop {
            tokio::select! {
                incoming = rx.recv() => {
                    let Some(incoming) = incoming else {
                        warn!("channel {} closed its stream", self.channel.name());
                        break;
                    };
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.dispatch_message(incoming).await;
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Process a message now, or queue it behind the sender's in-flight one.
    async fn dispatch_message(self: Arc<Self>, incoming: IncomingMessage) {
        let sender = incoming.sender_id;
        {
            let mut active = self.active_senders.lock().await;
            if let Some(queue) = active.get_mut(&sender) {
                queue.push(incoming);
                return;
            }
            active.insert(sender, Vec::new());
        }

        self.handle_message(incoming).await;

        loop {
            let next = {
                let mut active = self.active_senders.lock().await;
                match active.get_mut(&sender) {
                    Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                    _ => {
                        active.remove(&sender);
                        None
                    }
                }
            };
            match next {
                Some(queued) => self.handle_message(queued).await,
                None => break,
            }
        }
    }

    /// Handle one command or button press and send the reply.
    pub(crate) async fn handle_message(&self, incoming: IncomingMessage) {
        if let Some(ref callback_id) = incoming.callback_id {
            if let Err(e) = self.channel.answer_callback(callback_id).await {
                warn!("failed to answer callback {callback_id}: {e}");
            }
        }

        let ctx = CommandContext {
            store: &self.store,
            scheduler: &self.scheduler,
            progress: &self.progress,
            motivation: &self.motivation,
            reminders: &self.reminders,
            sender_id: incoming.sender_id,
            sender_name: incoming.sender_name.as_deref(),
            text: &incoming.text,
            now: Local::now().naive_local(),
        };

        let reply = if incoming.is_callback() {
            match Callback::parse(&incoming.text) {
                Some(callback) => commands::handle_callback(callback, &ctx).await,
                None => {
                    warn!(
                        "unknown button payload '{}' from {}",
                        incoming.text, incoming.sender_id
                    );
                    return;
                }
            }
        } else {
            match Command::parse(&incoming.text) {
                Some(cmd) => {
                    info!("[{}] {} -> {cmd:?}", incoming.channel, incoming.sender_id);
                    commands::handle(cmd, &ctx).await
                }
                None => Reply::text(UNKNOWN_INPUT),
            }
        };

        self.send_reply(&incoming, reply).await;
    }

    async fn send_reply(&self, incoming: &IncomingMessage, reply: Reply) {
        let msg = OutgoingMessage {
            text: reply.text,
            controls: reply.controls,
            reply_target: incoming.reply_target.clone(),
        };
        if let Err(e) = self.channel.send(msg).await {
            error!("failed to send reply to {}: {e}", incoming.sender_id);
        }
    }

    /// Graceful shutdown: stop the poll loop, then the channel.
    async fn shutdown(&self) {
        info!("Shutting down...");
        self.scheduler.stop().await;
        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }
        info!("Shutdown complete.");
    }
}
