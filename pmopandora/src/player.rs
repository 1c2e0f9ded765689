//! Vue "media player" d'une zone
//!
//! `PandoraPlayer` est l'interlocuteur d'une couche d'automatisation : il
//! rafraîchit un [`PlayerState`] publié à la cadence de polling et expose les
//! commandes média habituelles. Tout échec rend le player indisponible
//! jusqu'au prochain rafraîchissement réussi, sans jamais arrêter le polling.

use crate::client::PandoraClient;
use crate::error::{PandoraError, Result};
use crate::models::{PlaybackSnapshot, PlaybackState, Station};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

const MANUFACTURER: &str = "Mood Media";
const MODEL: &str = "ProFusion iO";
const REDACTED: &str = "**REDACTED**";

/// État présenté à la plateforme hôte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaPlayerState {
    /// Injoignable ou pas encore rafraîchi
    #[default]
    Off,
    Idle,
    Playing,
    Paused,
}

impl From<PlaybackState> for MediaPlayerState {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Playing => Self::Playing,
            PlaybackState::Paused => Self::Paused,
            PlaybackState::Stopped => Self::Idle,
        }
    }
}

/// Commandes média acceptées par le player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerFeature {
    Play,
    Pause,
    Stop,
    NextTrack,
    SelectSource,
}

pub const SUPPORTED_FEATURES: &[PlayerFeature] = &[
    PlayerFeature::Play,
    PlayerFeature::Pause,
    PlayerFeature::Stop,
    PlayerFeature::NextTrack,
    PlayerFeature::SelectSource,
];

/// Description de l'appareil pour le registre de l'hôte
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

/// Dernier état publié de la zone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerState {
    pub available: bool,
    pub state: MediaPlayerState,
    pub source_list: Vec<String>,
    pub source: Option<String>,
    pub media_title: Option<String>,
    pub media_artist: Option<String>,
    pub media_album: Option<String>,
    pub media_image_url: Option<String>,
}

impl PlayerState {
    fn from_refresh(snapshot: PlaybackSnapshot, stations: &[Station]) -> Self {
        let track = snapshot.current_track.unwrap_or_default();
        Self {
            available: true,
            state: snapshot.state.into(),
            source_list: stations.iter().map(|s| s.name.clone()).collect(),
            source: snapshot.current_station.map(|s| s.name),
            media_title: track.title,
            media_artist: track.artist,
            media_album: track.album,
            media_image_url: track.artwork_url,
        }
    }
}

/// Adaptateur media player pour une zone
pub struct PandoraPlayer {
    name: String,
    client: Arc<PandoraClient>,
    state: RwLock<PlayerState>,
}

impl PandoraPlayer {
    pub fn new(name: impl Into<String>, client: Arc<PandoraClient>) -> Self {
        Self {
            name: name.into(),
            client,
            state: RwLock::new(PlayerState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Arc<PandoraClient> {
        &self.client
    }

    /// Copie de l'état publié
    pub fn state(&self) -> PlayerState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn available(&self) -> bool {
        self.state().available
    }

    pub fn supported_features(&self) -> &'static [PlayerFeature] {
        SUPPORTED_FEATURES
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: self.name.clone(),
            manufacturer: MANUFACTURER,
            model: MODEL,
        }
    }

    fn publish(&self, next: PlayerState) {
        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if current.state != next.state {
            debug!("State of {} changed to {:?}", self.name, next.state);
        }
        *current = next;
    }

    fn update(&self, f: impl FnOnce(&mut PlayerState)) {
        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut current);
    }

    fn mark_unavailable(&self, err: &PandoraError) {
        warn!("Error updating {}: {}", self.name, err);
        self.publish(PlayerState::default());
    }

    /// Interroge l'état et la liste des stations, puis publie le résultat
    ///
    /// Appelable à n'importe quelle cadence : aucun état n'est conservé en
    /// dehors de l'instantané publié.
    pub async fn refresh(&self) -> Result<PlayerState> {
        let result = async {
            let snapshot = self.client.get_playback_info().await?;
            let stations = self.client.get_stations().await?;
            Ok::<_, PandoraError>(PlayerState::from_refresh(snapshot, &stations))
        }
        .await;

        match result {
            Ok(state) => {
                self.publish(state.clone());
                Ok(state)
            }
            Err(e) => {
                self.mark_unavailable(&e);
                Err(e)
            }
        }
    }

    fn finish(&self, verb: &str, result: Result<()>, next: Option<MediaPlayerState>) -> Result<()> {
        match result {
            Ok(()) => {
                if let Some(next) = next {
                    self.update(|s| s.state = next);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Failed to {} on {}: {}", verb, self.name, e);
                Err(e)
            }
        }
    }

    pub async fn play(&self) -> Result<()> {
        let result = self.client.play().await;
        self.finish("start playback", result, Some(MediaPlayerState::Playing))
    }

    pub async fn pause(&self) -> Result<()> {
        let result = self.client.pause().await;
        self.finish("pause playback", result, Some(MediaPlayerState::Paused))
    }

    pub async fn stop(&self) -> Result<()> {
        let result = self.client.stop().await;
        self.finish("stop playback", result, Some(MediaPlayerState::Idle))
    }

    pub async fn next_track(&self) -> Result<()> {
        let result = self.client.skip_song().await;
        self.finish("skip track", result, None)
    }

    /// Sélectionne une station par son nom
    pub async fn select_source(&self, source: &str) -> Result<()> {
        let result = async {
            let stations = self.client.get_stations().await?;
            let station = stations
                .iter()
                .find(|s| s.name == source)
                .ok_or_else(|| PandoraError::StationNotFound(source.to_string()))?;
            self.client.set_station(&station.id).await
        }
        .await;

        self.finish("select source", result, None)?;
        self.update(|s| s.source = Some(source.to_string()));
        Ok(())
    }

    /// Diagnostic, secrets masqués
    pub fn diagnostics(&self) -> Value {
        let session = self.client.session();
        json!({
            "device": self.device_info(),
            "config": {
                "host": self.client.base_url(),
                "zone_id": self.client.zone_id(),
                "username": self.client.username(),
                "password": REDACTED,
            },
            "session": {
                "held": session.is_some(),
                "session_id": session.as_ref().map(|_| REDACTED),
                "remember_me": session
                    .as_ref()
                    .and_then(|t| t.remember_me.as_ref())
                    .map(|_| REDACTED),
            },
            "state": self.state(),
            "supported_features": SUPPORTED_FEATURES,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionTokens, Track};

    fn player() -> PandoraPlayer {
        let client = PandoraClient::builder("10.0.0.5", "admin", "hunter2")
            .with_session(SessionTokens::new("tok-123", Some("rem-456".to_string())))
            .build()
            .unwrap();
        PandoraPlayer::new("Lobby", Arc::new(client))
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(
            MediaPlayerState::from(PlaybackState::Playing),
            MediaPlayerState::Playing
        );
        assert_eq!(
            MediaPlayerState::from(PlaybackState::Paused),
            MediaPlayerState::Paused
        );
        assert_eq!(
            MediaPlayerState::from(PlaybackState::Stopped),
            MediaPlayerState::Idle
        );
    }

    #[test]
    fn test_initial_state_is_off() {
        let player = player();
        assert!(!player.available());
        assert_eq!(player.state().state, MediaPlayerState::Off);
        assert_eq!(player.supported_features().len(), 5);
        assert_eq!(player.device_info().model, "ProFusion iO");
    }

    #[test]
    fn test_from_refresh() {
        let snapshot = PlaybackSnapshot {
            state: PlaybackState::Playing,
            current_station: Some(Station {
                id: "2".to_string(),
                name: "Lounge".to_string(),
            }),
            current_track: Some(Track {
                title: Some("Blue in Green".to_string()),
                artist: Some("Miles Davis".to_string()),
                album: Some("Kind of Blue".to_string()),
                artwork_url: None,
            }),
        };
        let stations = vec![
            Station {
                id: "1".to_string(),
                name: "Jazz".to_string(),
            },
            Station {
                id: "2".to_string(),
                name: "Lounge".to_string(),
            },
        ];

        let state = PlayerState::from_refresh(snapshot, &stations);
        assert!(state.available);
        assert_eq!(state.state, MediaPlayerState::Playing);
        assert_eq!(state.source_list, vec!["Jazz", "Lounge"]);
        assert_eq!(state.source.as_deref(), Some("Lounge"));
        assert_eq!(state.media_album.as_deref(), Some("Kind of Blue"));
    }

    #[test]
    fn test_diagnostics_redacts_secrets() {
        let dump = player().diagnostics().to_string();
        assert!(!dump.contains("hunter2"));
        assert!(!dump.contains("tok-123"));
        assert!(!dump.contains("rem-456"));
        assert!(dump.contains("admin"));
        assert!(dump.contains("Mood Media"));
    }
}
