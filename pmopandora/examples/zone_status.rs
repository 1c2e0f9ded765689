//! Affiche l'état d'une zone Pandora for Business
//!
//! L'hôte et les credentials sont lus dans pmoconfig (`accounts.pandora`),
//! la session obtenue est persistée pour les lancements suivants.
//!
//! Usage:
//! ```bash
//! PMOMUSIC_CONFIG__ACCOUNTS__PANDORA__HOST=192.168.1.20 \
//! RUST_LOG=pmopandora=debug \
//! cargo run --example zone_status -- 3
//! ```
//!
//! L'argument optionnel est le nombre de rafraîchissements (défaut: 1).

use pmoconfig::get_config;
use pmopandora::{PandoraClient, PandoraConfigExt, PandoraPlayer};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();

    // RUST_LOG prime sur le niveau configuré (host.logger.min_level)
    let level = config.get_log_min_level()?.to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let rounds: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1);

    let interval = Duration::from_secs(config.get_pandora_poll_interval_secs()?);

    let client = Arc::new(PandoraClient::from_config()?);
    println!("=== Zone {} @ {} ===\n", client.zone_id(), client.base_url());

    let player = PandoraPlayer::new("Pandora", client);

    for round in 0..rounds {
        if round > 0 {
            tokio::time::sleep(interval).await;
        }

        match player.refresh().await {
            Ok(state) => {
                println!("State:   {:?}", state.state);
                println!("Station: {}", state.source.as_deref().unwrap_or("-"));
                println!(
                    "Track:   {} / {} / {}",
                    state.media_title.as_deref().unwrap_or("-"),
                    state.media_artist.as_deref().unwrap_or("-"),
                    state.media_album.as_deref().unwrap_or("-"),
                );
                println!("Sources: {}\n", state.source_list.join(", "));
            }
            Err(e) => println!("Zone unavailable: {}\n", e),
        }
    }

    println!("{}", serde_json::to_string_pretty(&player.diagnostics())?);
    Ok(())
}
