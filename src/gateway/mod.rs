//! Gateway: the event loop connecting the platform, memory, and provider.
//!
//! Every inbound event is handled in its own task. Conversation state lives
//! in the store; the gateway itself only holds shared, immutable parts.

mod pipeline;
mod routing;


use routing::Router;

use kibitz_core::{
    clock::Clock,
    config::Config,
    context::PromptAssembler,
    engine::EngineSelector,
    interject::InterjectionPolicy,
    traits::{Platform, Provider},
};
use kibitz_memory::ConversationStore;
use kibitz_providers::{ResponseFetcher, RetryPolicy};
use rand::RngCore;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

/// The central gateway that routes events between the platform and the provider.
pub struct Gateway {
    pub(super) platform: Arc<dyn Platform>,
    pub(super) fetcher: ResponseFetcher,
    pub(super) memory: ConversationStore,
    pub(super) assembler: PromptAssembler,
    pub(super) engines: EngineSelector,
    pub(super) router: Router,
    pub(super) clock: Arc<dyn Clock>,
    /// Interjection draws. Never held across an await.
    pub(super) rng: Mutex<Box<dyn RngCore + Send>>,
    pub(super) help_text: String,
    pub(super) uptime: Instant,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        platform: Arc<dyn Platform>,
        provider: Arc<dyn Provider>,
        config: &Config,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let persona = &config.persona;
        let fetcher = ResponseFetcher::new(
            provider,
            RetryPolicy::from(&config.provider.retry),
            persona.bot_label.trim(),
            config.provider.sampling.clone(),
        );
        Self {
            platform,
            fetcher,
            memory: ConversationStore::with_clock(&config.memory, clock.clone()),
            assembler: PromptAssembler::new(persona, config.memory.max_prompt_turns),
            engines: EngineSelector::new(
                config.provider.allowed_models.clone(),
                config.provider.default_model.clone(),
            ),
            router: Router::new(
                InterjectionPolicy::new(&config.interjection),
                &config.memory.peer_scoped_channels,
            ),
            clock,
            rng: Mutex::new(rng),
            help_text: persona.help_text.clone(),
            uptime: Instant::now(),
        }
    }

    /// Run the main event loop until Ctrl-C or the platform stops.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Kibitz gateway running | provider: {} | platform: {} | default engine: {}",
            self.fetcher.provider_name(),
            self.platform.name(),
            self.engines.default_engine(),
        );

        let mut rx = self
            .platform
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start platform {}: {e}", self.platform.name()))?;

        loop {
            tokio::select! {
                incoming = rx.recv() => {
                    let Some(event) = incoming else {
                        warn!("platform event stream closed");
                        break;
                    };
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.handle_event(event).await;
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

    async fn shutdown(&self) {
        info!("Shutting down...");
        if let Err(e) = self.platform.stop().await {
            warn!("failed to stop platform {}: {e}", self.platform.name());
        }
        info!(
            "Shutdown complete after {}s, {} live conversation(s) discarded.",
            self.uptime.elapsed().as_secs(),
            self.memory.len().await
        );
    }
}
