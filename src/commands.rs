//! Subcommand handlers for AckQueue.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use ackqueue_config::{CodecKind, Config};
use ackqueue_core::{
    sweep_once, Codec, JsonCodec, QueueBackend, QueueConfig, RawCodec, SafeQueue, TextCodec, Wait,
};

use crate::cli::Commands;

/// Line-oriented input and output for a payload codec.
pub(crate) trait LineFormat: Codec {
    /// Turn one trimmed stdin line into a payload.
    fn parse_line(&self, line: &str) -> anyhow::Result<Self::Value>;

    /// Render a payload for a `uid payload` output line.
    fn render(&self, value: &Self::Value) -> String;
}

impl LineFormat for RawCodec {
    fn parse_line(&self, line: &str) -> anyhow::Result<Vec<u8>> {
        Ok(line.as_bytes().to_vec())
    }

    fn render(&self, value: &Vec<u8>) -> String {
        String::from_utf8_lossy(value).into_owned()
    }
}

impl LineFormat for TextCodec {
    fn parse_line(&self, line: &str) -> anyhow::Result<String> {
        Ok(line.to_string())
    }

    fn render(&self, value: &String) -> String {
        value.clone()
    }
}

impl LineFormat for JsonCodec<serde_json::Value> {
    fn parse_line(&self, line: &str) -> anyhow::Result<serde_json::Value> {
        serde_json::from_str(line).with_context(|| format!("not a JSON document: {}", line))
    }

    fn render(&self, value: &serde_json::Value) -> String {
        value.to_string()
    }
}

/// Build the queue config the core crate understands.
pub(crate) fn queue_config(config: &Config) -> QueueConfig {
    QueueConfig {
        name: config.queue.name.clone(),
        autoclean_interval: config.queue.autoclean_interval(),
    }
}

/// Handle a subcommand against the configured queue.
pub(crate) async fn handle_command(
    command: Commands,
    config: &Config,
    backend: Arc<dyn QueueBackend>,
) -> anyhow::Result<()> {
    match command {
        Commands::Stats => return stats(config, backend).await,
        Commands::Reclaim => return reclaim(config, backend).await,
        _ => {}
    }

    match config.queue.codec {
        CodecKind::Raw => run_with_codec(command, config, backend, RawCodec).await,
        CodecKind::Text => run_with_codec(command, config, backend, TextCodec).await,
        CodecKind::Json => {
            run_with_codec(command, config, backend, JsonCodec::<serde_json::Value>::new()).await
        }
    }
}

async fn run_with_codec<C: LineFormat + Clone>(
    command: Commands,
    config: &Config,
    backend: Arc<dyn QueueBackend>,
    codec: C,
) -> anyhow::Result<()> {
    let queue = SafeQueue::with_codec(queue_config(config), backend, codec.clone())
        .context("starting queue")?;

    let result = match command {
        Commands::Producer => producer(&queue, &codec).await,
        Commands::Consumer { timeout, no_ack } => {
            consumer(&queue, &codec, Wait::from_secs(timeout), !no_ack).await
        }
        Commands::Demo => demo(&queue, &codec).await,
        Commands::Stats | Commands::Reclaim => Ok(()),
    };

    queue.shutdown().await;
    result
}

/// Put every non-empty stdin line.
async fn producer<C: LineFormat>(queue: &SafeQueue<C>, codec: &C) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0u64;

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = codec.parse_line(line)?;
        let uid = queue.put(&value).await?;
        debug!("Queued {}", uid);
        count += 1;
    }

    info!("Queued {} item(s) on '{}'", count, queue.name());
    Ok(())
}

/// Print deliveries until a timed get comes back empty or Ctrl-C.
async fn consumer<C: LineFormat>(
    queue: &SafeQueue<C>,
    codec: &C,
    wait: Wait,
    ack: bool,
) -> anyhow::Result<()> {
    let mut count = 0u64;

    loop {
        let delivery = tokio::select! {
            result = queue.get(wait) => result?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };

        let Some(delivery) = delivery else {
            debug!("Queue '{}' drained", queue.name());
            break;
        };

        println!("{} {}", delivery.uid, codec.render(&delivery.payload));
        count += 1;

        if ack {
            queue.ack(&delivery.uid).await?;
        } else {
            warn!("Leaving {} unresolved", delivery.uid);
        }
    }

    info!("Consumed {} item(s) from '{}'", count, queue.name());
    Ok(())
}

async fn demo<C: LineFormat>(queue: &SafeQueue<C>, codec: &C) -> anyhow::Result<()> {
    for line in ["Hello", "World"] {
        let uid = queue.put(&codec.parse_line(line)?).await?;
        info!("Put {} as {}", line, uid);
    }

    consumer(queue, codec, Wait::For(Duration::from_secs(1)), true).await
}

async fn stats(config: &Config, backend: Arc<dyn QueueBackend>) -> anyhow::Result<()> {
    let queue = SafeQueue::new(queue_config(config).without_autoclean(), backend)?;
    let counts = queue.counts().await?;

    println!("queue:       {}", queue.name());
    println!("backend:     {}", queue.backend().id());
    println!("ready:       {}", counts.ready);
    println!("checked out: {}", counts.checked_out);
    println!("items:       {}", counts.items);
    if !counts.is_consistent() {
        warn!("Counts are inconsistent, an operation may be in flight");
    }

    Ok(())
}

async fn reclaim(config: &Config, backend: Arc<dyn QueueBackend>) -> anyhow::Result<()> {
    let queue_config = queue_config(config);
    let Some(interval) = queue_config.autoclean_interval else {
        bail!("autoclean is disabled for '{}', nothing to reclaim", queue_config.name);
    };

    let queue = SafeQueue::new(queue_config.without_autoclean(), backend.clone())?;
    let released = sweep_once(backend.as_ref(), queue.keys(), interval).await?;
    println!("{}", released);
    Ok(())
}
