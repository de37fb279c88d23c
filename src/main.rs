mod commands;
mod gateway;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kibitz_channels::SlackPlatform;
use kibitz_core::{
    clock::{Clock, SystemClock},
    config::{self, shellexpand, Config},
    context::{Audience, PromptAssembler},
    engine::EngineSelector,
    traits::{Platform, Provider},
    turn::{Speaker, Turn},
};
use kibitz_providers::{OpenAiProvider, ResponseFetcher, RetryPolicy};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "kibitz",
    version,
    about = "Kibitz: a chat persona that remembers the room"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Slack and start answering.
    Start,
    /// Check configuration and provider availability.
    Status,
    /// Send a one-shot message through the persona prompt.
    Ask {
        /// The message to send. End with `| engine` to pick a model.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg)?;
    if let Some(notice) = config::missing_notice(&cli.config) {
        info!("{notice}");
    }
    cfg.persona = cfg.persona.resolved();

    match cli.command {
        Commands::Start => {
            let provider = build_provider(&cfg);
            if !provider.is_available().await {
                warn!(
                    "provider '{}' did not answer the availability check; starting anyway",
                    provider.name()
                );
            }

            let slack = match cfg.channel.slack.as_ref() {
                Some(slack) if slack.enabled => slack.clone(),
                Some(_) => anyhow::bail!("Slack is disabled. Set channel.slack.enabled = true."),
                None => anyhow::bail!(
                    "Slack is not configured. Add a [channel.slack] section \
                     or set SLACK_APP_TOKEN and SLACK_BOT_TOKEN."
                ),
            };
            if slack.app_token.is_empty() || slack.bot_token.is_empty() {
                anyhow::bail!(
                    "Slack needs both app_token and bot_token. \
                     Set them in config.toml or via SLACK_APP_TOKEN / SLACK_BOT_TOKEN."
                );
            }
            let platform: Arc<dyn Platform> = Arc::new(SlackPlatform::new(slack));

            println!("Kibitz: starting {}...", cfg.bot.name);
            let gw = gateway::Gateway::new(
                platform,
                provider,
                &cfg,
                Arc::new(SystemClock),
                Box::new(StdRng::from_entropy()),
            );
            Arc::new(gw).run().await?;
        }
        Commands::Status => {
            println!("Kibitz status\n");
            println!("Config: {}", cli.config);
            println!("Persona: {}", cfg.persona.bot_label);
            println!(
                "Engines: {} (default {})",
                cfg.provider.allowed_models.join(", "),
                cfg.provider.default_model
            );
            println!(
                "Memory: {}s window, {}s peer window, {} ambient turns",
                cfg.memory.channel_ttl_secs,
                cfg.memory.peer_ttl_secs,
                cfg.memory.ambient_capacity
            );
            println!();

            let provider = build_provider(&cfg);
            let available = provider.is_available().await;
            println!(
                "  {}: {} ({})",
                provider.name(),
                if available { "available" } else { "unreachable" },
                cfg.provider.openai.base_url
            );

            match cfg.channel.slack.as_ref() {
                Some(slack) => println!(
                    "  slack: {}",
                    if slack.enabled && !slack.app_token.is_empty() && !slack.bot_token.is_empty() {
                        "configured"
                    } else if slack.enabled {
                        "enabled but missing tokens"
                    } else {
                        "disabled"
                    }
                ),
                None => println!("  slack: not configured"),
            }

            let channels = &cfg.interjection.channels;
            if channels.is_empty() {
                println!("  interjection: off");
            } else {
                println!(
                    "  interjection: {:.0}% in {}",
                    cfg.interjection.probability * 100.0,
                    channels.join(", ")
                );
            }
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: kibitz ask <message>");
            }

            let provider = build_provider(&cfg);
            let engines = EngineSelector::new(
                cfg.provider.allowed_models.clone(),
                cfg.provider.default_model.clone(),
            );
            let selection = engines.select(&message.join(" "));
            let assembler = PromptAssembler::new(&cfg.persona, cfg.memory.max_prompt_turns);
            let turn = Turn::new(
                Speaker::human("cli", None),
                selection.query,
                SystemClock.now(),
            );
            let prompt = assembler.assemble(&[turn], Audience::OneOnOne);

            let fetcher = ResponseFetcher::new(
                provider,
                RetryPolicy::from(&cfg.provider.retry),
                cfg.persona.bot_label.trim(),
                cfg.provider.sampling.clone(),
            );
            let reply = fetcher.fetch(&prompt, &selection.engine).await?;
            println!("{}", reply.text);
        }
    }

    Ok(())
}

/// Build the completion provider.
fn build_provider(cfg: &Config) -> Arc<dyn Provider> {
    Arc::new(OpenAiProvider::from_config(&cfg.provider.openai))
}

/// Console logging, plus a daily log file when `bot.data_dir` is set.
///
/// `RUST_LOG` overrides `bot.log_level`. The returned guard must live as
/// long as the process so buffered file lines are flushed.
fn init_logging(cfg: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.bot.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if cfg.bot.data_dir.trim().is_empty() {
        (None, None)
    } else {
        let dir = PathBuf::from(shellexpand(&cfg.bot.data_dir)).join("logs");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(&dir, "kibitz.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if guard.is_some() {
        info!("logging to {}/logs", cfg.bot.data_dir);
    }
    Ok(guard)
}
