//! # pmopandora - Client Pandora for Business pour PMOMusic
//!
//! Cette crate pilote une zone d'un contrôleur Pandora for Business
//! (Mood Media ProFusion iO) par son interface HTTP locale.
//!
//! ## Vue d'ensemble
//!
//! - Authentification par formulaire, session portée par les cookies
//!   `sessionId` / `rememberMe`
//! - Validation réactive de la session (sonde `zone.getStatus`) et
//!   reconnexion unique avant chaque commande
//! - Commandes de zone : stations, changement de station, état de lecture,
//!   skip, lecture, pause
//! - Persistance des artefacts de session dans pmoconfig
//! - Adaptateur "media player" pour les couches d'automatisation
//!
//! ## Architecture
//!
//! ```text
//! pmopandora/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── client.rs           # PandoraClient et son builder
//! │   ├── session.rs          # Cycle de vie de la session
//! │   ├── player.rs           # Adaptateur media player
//! │   ├── models.rs           # Structures de données
//! │   ├── host.rs             # Validation et normalisation de l'hôte
//! │   ├── config_ext.rs       # Extension pmoconfig
//! │   ├── error.rs            # Gestion des erreurs
//! │   └── api/
//! │       ├── mod.rs          # Transport HTTP
//! │       ├── auth.rs         # Login
//! │       ├── commands.rs     # Commandes de zone
//! │       └── envelope.rs     # Enveloppe {status, data}
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use pmopandora::PandoraClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Hôte, credentials et session persistée depuis pmoconfig
//!     let client = PandoraClient::from_config()?;
//!
//!     let info = client.get_playback_info().await?;
//!     println!("{:?}", info.state);
//!
//!     if let Some(station) = client.get_stations().await?.first() {
//!         client.set_station(&station.id).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Gestion des erreurs
//!
//! ```rust,ignore
//! use pmopandora::PandoraError;
//!
//! match client.skip_song().await {
//!     Ok(()) => {}
//!     Err(PandoraError::Authentication(msg)) => println!("Login refusé: {}", msg),
//!     Err(e) if e.is_transport() => println!("Contrôleur injoignable: {}", e),
//!     Err(e) => println!("Erreur: {}", e),
//! }
//! ```

pub mod api;
pub mod client;
pub mod config_ext;
pub mod error;
pub mod host;
pub mod models;
pub mod player;
pub mod session;

pub use client::{PandoraClient, PandoraClientBuilder};
pub use config_ext::PandoraConfigExt;
pub use error::{PandoraError, Result};
pub use host::{base_url, host_valid};
pub use models::{
    Credentials, PlaybackSnapshot, PlaybackState, SessionTokens, Station, Track, ZoneTarget,
};
pub use player::{DeviceInfo, MediaPlayerState, PandoraPlayer, PlayerFeature, PlayerState};
pub use session::{Authenticator, SessionCallback, SessionManager};
