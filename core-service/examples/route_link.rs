//! Routes links given on the command line against an in-memory settings store.
//!
//! ```text
//! cargo run -p core-service --example route_link -- spotify \
//!     https://music.apple.com/us/playlist/chill/pl.u-123 \
//!     https://open.spotify.com/track/6rqhFgbbKwnb9MLmUQDhG6
//! ```
//!
//! The first argument is the chosen provider id. Set `RUST_LOG=debug` for the
//! decision trace.

use anyhow::{bail, Context};
use bridge_desktop::SqliteSettingsStore;
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{CoreService, PreferenceUpdate};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))
        .context("failed to initialise logging")?;

    let mut args = std::env::args().skip(1);
    let Some(provider) = args.next() else {
        bail!("usage: route_link <provider id> <link>...");
    };
    let links: Vec<String> = args.collect();

    let store = SqliteSettingsStore::in_memory()
        .await
        .context("failed to open settings store")?;
    let config = CoreConfig::builder()
        .settings_store(Arc::new(store))
        .build()
        .await?;

    let core = CoreService::bootstrap(config).await?;
    core.wait_ready().await;
    core.save_preferences(PreferenceUpdate::choices(&provider, true, true))
        .await
        .with_context(|| format!("'{}' is not a known provider", provider))?;
    core.reload_preferences().await?;

    for link in &links {
        match core.explain(link) {
            Ok(decision) => println!("{}", serde_json::to_string_pretty(&decision)?),
            Err(e) => eprintln!("{}: {}", link, e),
        }
    }

    core.shutdown().await;
    Ok(())
}
