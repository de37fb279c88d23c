//! Event processing pipeline: the handle_event flow.

use super::routing::{ContextSource, Decision, Delivery};
use super::Gateway;
use crate::commands::{self, Command};
use kibitz_core::{
    context::Audience,
    mentions,
    message::{EventKind, InboundEvent, MessageMetadata, OutgoingMessage, ThreadEntry},
    turn::{ConversationKey, Speaker, Turn},
};
use tracing::{debug, error, info, warn};

impl Gateway {
    /// Process a single inbound event through the full pipeline.
    pub(super) async fn handle_event(&self, event: InboundEvent) {
        let decision = {
            let mut rng = match self.rng.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            self.router.classify(&event, self.clock.now(), &mut **rng)
        };

        match decision {
            Decision::Ignore { reason } => {
                debug!("[{}] ignored event from {}: {reason}", event.channel, event.sender_id);
            }
            Decision::RecordOnly { key, verdict } => {
                let text = mentions::render(&event.text, self.platform.as_ref()).await;
                debug!("[{key}] recorded silently ({verdict:?})");
                let speaker = Speaker::human(&event.sender_id, event.sender_name.clone());
                self.memory
                    .append(&key, Turn::new(speaker, text, self.clock.now()))
                    .await;
            }
            Decision::Reply {
                key,
                delivery,
                context,
                audience,
            } => {
                self.reply(&event, &key, &delivery, context, audience).await;
            }
        }
    }

    async fn reply(
        &self,
        event: &InboundEvent,
        key: &ConversationKey,
        delivery: &Delivery,
        context: ContextSource,
        audience: Audience,
    ) {
        // --- 1. RESOLVE NAMES ---
        let text = mentions::render(&event.text, self.platform.as_ref()).await;
        info!("[{key}] {} says: {}", event.sender_id, preview(&text));

        let sender_name = match audience {
            Audience::OneOnOne => self.sender_name(event).await,
            Audience::ChannelWide => event.sender_name.clone(),
        };
        let speaker = Speaker::human(&event.sender_id, sender_name);

        // --- 2. COMMANDS ---
        if event.kind != EventKind::Ambient {
            if let Some(cmd) = Command::parse(&text) {
                let response = commands::handle(cmd, &self.help_text);
                self.memory
                    .append(key, Turn::new(speaker, text, self.clock.now()))
                    .await;
                self.deliver(event, key, delivery, response, MessageMetadata::default())
                    .await;
                return;
            }
        }

        // --- 3. ENGINE + RECORD ---
        let selection = self.engines.select(&text);
        if selection.overridden {
            info!("[{key}] engine override: {}", selection.engine);
        }
        self.memory
            .append(
                key,
                Turn::new(speaker.clone(), selection.query.clone(), self.clock.now()),
            )
            .await;

        // --- 4. PROMPT ---
        let prompt = match context {
            ContextSource::Stored => {
                let history = self.memory.get(key).await;
                self.assembler.assemble(&history, audience)
            }
            ContextSource::Thread => self.thread_prompt(event, speaker, &selection.query).await,
        };

        // --- 5. COMPLETION ---
        match self.fetcher.fetch(&prompt, &selection.engine).await {
            Ok(reply) => {
                self.deliver(event, key, delivery, reply.text, reply.metadata)
                    .await;
            }
            Err(e) => warn!("[{key}] no reply sent: {e}"),
        }
    }

    /// Fresh thread transcript with the triggering message replaced by the
    /// cleaned query. A failed fetch degrades to the query alone. A truncated
    /// fetch may not end with the trigger; then nothing is dropped.
    async fn thread_prompt(&self, event: &InboundEvent, speaker: Speaker, query: &str) -> String {
        let thread = event.thread.as_deref().unwrap_or_default();
        let mut entries = match self.platform.thread_replies(&event.channel, thread).await {
            Ok(mut entries) => {
                if entries.last().is_some_and(|last| is_trigger(last, event)) {
                    entries.pop();
                } else {
                    debug!("thread {thread} does not end with the trigger, keeping every entry");
                }
                entries
            }
            Err(e) => {
                warn!(
                    "thread fetch failed for {}/{thread}, answering without history: {e}",
                    event.channel
                );
                Vec::new()
            }
        };

        for entry in &mut entries {
            entry.text = mentions::render(&entry.text, self.platform.as_ref()).await;
        }
        entries.push(ThreadEntry {
            speaker,
            text: query.to_string(),
        });
        self.assembler.assemble_thread(&entries)
    }

    /// Record the bot turn, then post it.
    async fn deliver(
        &self,
        event: &InboundEvent,
        key: &ConversationKey,
        delivery: &Delivery,
        text: String,
        metadata: MessageMetadata,
    ) {
        self.memory
            .append(key, Turn::bot(text.clone(), self.clock.now()))
            .await;

        let thread = match delivery {
            Delivery::Direct => None,
            Delivery::Threaded { thread } => Some(thread.clone()),
        };
        let attempts = metadata.attempts;
        let elapsed = metadata.processing_time_ms;
        let outgoing = OutgoingMessage {
            channel: event.channel.clone(),
            text,
            thread,
            metadata,
        };

        match self.platform.post_message(&outgoing).await {
            Ok(()) => info!("[{key}] replied ({attempts} attempt(s), {elapsed}ms)"),
            Err(e) => error!("[{key}] failed to post reply: {e}"),
        }
    }

    async fn sender_name(&self, event: &InboundEvent) -> Option<String> {
        if let Some(name) = event.sender_name.as_ref() {
            return Some(name.clone());
        }
        match self.platform.display_name(&event.sender_id).await {
            Ok(name) => Some(name),
            Err(e) => {
                warn!("name lookup failed for {}: {e}", event.sender_id);
                None
            }
        }
    }
}

/// Whether `entry` is the message that raised `event`: same sender, same words.
fn is_trigger(entry: &ThreadEntry, event: &InboundEvent) -> bool {
    matches!(&entry.speaker, Speaker::Human { user, .. } if *user == event.sender_id)
        && entry.text.split_whitespace().eq(event.text.split_whitespace())
}

/// First 60 characters, for log lines.
fn preview(text: &str) -> String {
    if text.chars().count() > 60 {
        let truncated: String = text.chars().take(60).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}
