//! Play episodes against a remote simulation service.
//!
//! Run with: cargo run -p play-episode [config.json]
//!
//! Without a config file, settings are read from `REMOTE_ENV_*` variables
//! (`REMOTE_ENV_USERNAME`, `REMOTE_ENV_TOKEN`, `REMOTE_ENV_MASTER_ADDRESS`, ...).
//! `REMOTE_ENV_EPISODES` sets how many episodes to play (default 1).

use std::time::Duration;

use anyhow::Context;
use remote_env_core::{ClientConfig, action::DEFAULT_ACTION_SET};
use remote_env_session::RemoteEnv;
use remote_env_transport::TcpChannelProvider;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const READY_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => ClientConfig::from_env().context("Failed to read REMOTE_ENV_* settings")?,
    };
    if config.ready_timeout_ms.is_none() {
        config = config.ready_timeout(Some(READY_TIMEOUT));
    }

    let episodes: u32 = std::env::var("REMOTE_ENV_EPISODES")
        .ok()
        .map(|raw| raw.parse())
        .transpose()
        .context("REMOTE_ENV_EPISODES must be a number")?
        .unwrap_or(1);

    let mut env = RemoteEnv::connect(config, TcpChannelProvider::default()).await?;
    // Cycle through the movement actions.
    let policy = &DEFAULT_ACTION_SET[..9];

    for episode in 1..=episodes {
        env.reset().await?;
        let mut steps: usize = 0;
        let mut total_reward = 0.0;

        loop {
            let action = i64::try_from(steps % policy.len())?;
            let outcome = env.step(action).await?;
            steps += 1;
            total_reward += outcome.reward;
            if outcome.done {
                break;
            }
        }

        tracing::info!(
            episode,
            steps,
            total_reward,
            last_action = ?policy[(steps - 1) % policy.len()],
            "Episode finished"
        );
    }

    env.close().await;
    Ok(())
}
