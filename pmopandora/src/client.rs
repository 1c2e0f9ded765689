//! Client haut niveau pour une zone d'un contrôleur Pandora for Business
//!
//! Chaque opération suit le même contrat : s'assurer qu'une session est
//! détenue (au plus un login), envoyer une commande, exiger une enveloppe
//! `"OK"` et en extraire le contenu. Les commandes ne sont jamais rejouées.
//!
//! # Exemple
//!
//! ```no_run
//! use pmopandora::PandoraClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PandoraClient::builder("192.168.1.20", "admin", "secret").build()?;
//!
//!     for station in client.get_stations().await? {
//!         println!("{} - {}", station.id, station.name);
//!     }
//!
//!     let info = client.get_playback_info().await?;
//!     println!("{:?}", info.state);
//!     Ok(())
//! }
//! ```

use crate::api::commands::ZoneCommand;
use crate::api::{DEFAULT_REQUEST_TIMEOUT_SECS, PandoraApi};
use crate::config_ext::PandoraConfigExt;
use crate::error::{PandoraError, Result};
use crate::host::base_url;
use crate::models::{
    Credentials, DEFAULT_ZONE_ID, PlaybackSnapshot, SessionTokens, Station, ZoneTarget,
};
use crate::session::{SessionCallback, SessionManager};
use pmoconfig::Config;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Clé de la liste des stations dans une réponse `zone.station.audio.getAll`
const STATIONS_KEY: &str = "styles";

/// Client lié à un contrôleur, une zone et un jeu de credentials
///
/// Le pool de connexions appartient à ce client et est fermé avec lui.
#[derive(Debug)]
pub struct PandoraClient {
    api: PandoraApi,
    session: SessionManager,
}

impl PandoraClient {
    /// Crée un builder pour `host` avec les credentials donnés
    pub fn builder(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> PandoraClientBuilder {
        PandoraClientBuilder::new(host, username, password)
    }

    /// Crée un client depuis la configuration globale pmoconfig
    ///
    /// Les artefacts de session persistés sont restaurés, et les nouveaux sont
    /// réécrits dans la configuration à chaque changement.
    pub fn from_config() -> Result<Self> {
        Self::from_config_obj(pmoconfig::get_config())
    }

    /// Crée un client depuis une configuration spécifique
    ///
    /// Une session persistée illisible est ignorée et effacée : le premier
    /// appel se reconnectera.
    pub fn from_config_obj(config: Arc<Config>) -> Result<Self> {
        let host = config.get_pandora_host()?;
        let (username, password) = config.get_pandora_credentials()?;

        let mut builder = Self::builder(host, username, password)
            .zone_id(config.get_pandora_zone_id()?)
            .timeout(Duration::from_secs(config.get_pandora_timeout_secs()?));

        match config.get_pandora_session() {
            Ok(Some(tokens)) => {
                debug!("Restored session data from configuration");
                builder = builder.with_session(tokens);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Discarding unreadable session data: {}", e);
                if let Err(e) = config.clear_pandora_session() {
                    warn!("Failed to clear session data: {}", e);
                }
            }
        }

        let store = config.clone();
        builder
            .on_session_update(move |session: &SessionManager| {
                if let Some(tokens) = session.session() {
                    match store.set_pandora_session(&tokens) {
                        Ok(()) => debug!("Persisted new session data"),
                        Err(e) => warn!("Failed to persist session data: {}", e),
                    }
                }
            })
            .build()
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }

    pub fn zone_id(&self) -> u32 {
        self.api.zone().zone_id
    }

    pub fn username(&self) -> &str {
        self.session.username()
    }

    /// Artefacts de session détenus, éventuellement périmés
    pub fn session(&self) -> Option<SessionTokens> {
        self.session.session()
    }

    pub fn has_session(&self) -> bool {
        self.session.has_session()
    }

    /// Enregistre le listener notifié quand les artefacts changent
    ///
    /// Emplacement unique : un nouveau callback remplace le précédent.
    pub fn set_session_update_callback<F>(&self, callback: F)
    where
        F: Fn(&SessionManager) + Send + Sync + 'static,
    {
        self.session.set_listener(Some(Arc::new(callback)));
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Login inconditionnel, retourne les nouveaux artefacts
    pub async fn login(&self) -> Result<SessionTokens> {
        self.session.login(&self.api).await
    }

    /// Teste la session détenue et se reconnecte si nécessaire
    pub async fn ensure_session(&self) -> Result<SessionTokens> {
        self.session.ensure_session(&self.api).await
    }

    /// Exécute une commande protégée
    async fn execute(&self, command: ZoneCommand) -> Result<Value> {
        let tokens = self.ensure_session().await?;
        self.api.send(&command, &tokens).await
    }

    // ========================================================================
    // Commandes de zone
    // ========================================================================

    /// Liste les stations connues du contrôleur, dans l'ordre du serveur
    ///
    /// Les entrées illisibles sont ignorées.
    pub async fn get_stations(&self) -> Result<Vec<Station>> {
        let data = self.execute(ZoneCommand::GetStations).await?;
        let styles = data
            .get(STATIONS_KEY)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                PandoraError::invalid_response(format!("missing `{}` in station list", STATIONS_KEY))
            })?;

        let stations: Vec<Station> = styles
            .iter()
            .filter_map(|entry| match Station::deserialize(entry) {
                Ok(station) => Some(station),
                Err(e) => {
                    debug!("Skipping unreadable station entry: {}", e);
                    None
                }
            })
            .collect();
        debug!("Controller reported {} stations", stations.len());
        Ok(stations)
    }

    /// Bascule la zone sur `station_id`
    pub async fn set_station(&self, station_id: &str) -> Result<()> {
        info!(zone_id = self.zone_id(), "Switching to station {}", station_id);
        self.execute(ZoneCommand::SetStation {
            station_id: station_id.to_string(),
        })
        .await
        .map(|_| ())
    }

    /// Contenu `data` brut de `zone.getStatus`
    pub async fn get_status(&self) -> Result<Value> {
        self.execute(ZoneCommand::GetStatus).await
    }

    /// État de lecture, station et morceau courants
    pub async fn get_playback_info(&self) -> Result<PlaybackSnapshot> {
        let data = self.get_status().await?;
        PlaybackSnapshot::from_status(&data)
    }

    pub async fn skip_song(&self) -> Result<()> {
        self.execute(ZoneCommand::Skip).await.map(|_| ())
    }

    /// Reprend la lecture
    pub async fn play(&self) -> Result<()> {
        self.execute(ZoneCommand::Resume).await.map(|_| ())
    }

    pub async fn pause(&self) -> Result<()> {
        self.execute(ZoneCommand::Pause).await.map(|_| ())
    }

    /// Même requête que [`pause`](Self::pause) : le contrôleur n'a pas de stop
    pub async fn stop(&self) -> Result<()> {
        self.pause().await
    }
}

/// Builder pour [`PandoraClient`]
pub struct PandoraClientBuilder {
    host: String,
    credentials: Credentials,
    zone_id: u32,
    timeout: Duration,
    session: Option<SessionTokens>,
    on_session_update: Option<SessionCallback>,
}

impl PandoraClientBuilder {
    fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            credentials: Credentials::new(username, password),
            zone_id: DEFAULT_ZONE_ID,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            session: None,
            on_session_update: None,
        }
    }

    pub fn zone_id(mut self, zone_id: u32) -> Self {
        self.zone_id = zone_id;
        self
    }

    /// Timeout par requête, login compris
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Démarre avec des artefacts persistés plutôt qu'une session vide
    pub fn with_session(mut self, tokens: SessionTokens) -> Self {
        self.session = Some(tokens);
        self
    }

    pub fn on_session_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SessionManager) + Send + Sync + 'static,
    {
        self.on_session_update = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<PandoraClient> {
        let zone = ZoneTarget::new(base_url(&self.host)?, self.zone_id);
        info!(host = %zone.base_url, zone_id = zone.zone_id, "Creating zone controller client");

        let api = PandoraApi::new(zone, self.timeout)?;
        let mut session = SessionManager::new(self.credentials, self.on_session_update);
        if let Some(tokens) = self.session {
            session = session.with_tokens(tokens);
        }

        Ok(PandoraClient { api, session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = PandoraClient::builder("10.0.0.5/", "admin", "secret")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.5");
        assert_eq!(client.zone_id(), DEFAULT_ZONE_ID);
        assert_eq!(client.username(), "admin");
        assert!(!client.has_session());
    }

    #[test]
    fn test_builder_restores_session() {
        let tokens = SessionTokens::new("persisted", Some("remember".to_string()));
        let client = PandoraClient::builder("10.0.0.5", "admin", "secret")
            .zone_id(4)
            .with_session(tokens.clone())
            .build()
            .unwrap();
        assert_eq!(client.zone_id(), 4);
        assert_eq!(client.session(), Some(tokens));
    }

    #[test]
    fn test_builder_rejects_invalid_host() {
        let err = PandoraClient::builder("not a host", "admin", "secret")
            .build()
            .unwrap_err();
        assert!(matches!(err, PandoraError::InvalidHost(_)));
    }
}
