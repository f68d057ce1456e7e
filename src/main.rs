use anyhow::Result;
use mailbox_agent::{Agent, CancellationToken, config};
use tracing::info;

/// Validates that a log level string is valid
fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging setup)
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Environment variable overrides config
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logs.level.clone());

    if let Err(e) = validate_log_level(&log_level) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))?,
        )
        .init();

    info!("Starting mailbox-agent demo with log level: {}", log_level);

    let cancel = CancellationToken::new();
    let counter = Agent::start_two_way(
        0u64,
        |count, step: u64| anyhow::Ok((count + step, count + step)),
        cancel.clone(),
    );

    let mut callers = Vec::with_capacity(config.demo.callers);
    for _ in 0..config.demo.callers {
        let counter = counter.clone();
        let messages = config.demo.messages_per_caller;
        callers.push(tokio::spawn(async move {
            for _ in 0..messages {
                counter.tell(1)?;
            }
            Ok::<(), mailbox_agent::Error>(())
        }));
    }
    for caller in callers {
        caller.await??;
    }

    let total = counter.ask(0, config.agent.ask_timeout()).await?;
    info!(agent = %counter.id(), total, "All messages processed");
    println!("{}", total);

    cancel.cancel();
    counter.terminated().await;

    Ok(())
}
