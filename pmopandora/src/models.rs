//! Structures de données échangées avec le contrôleur de zone

use crate::error::{PandoraError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Zone adressée quand aucune n'est configurée
pub const DEFAULT_ZONE_ID: u32 = 1;

/// Clés sous lesquelles le contrôleur indique la station courante.
/// Les deux familles de firmware connues divergent, la première trouvée gagne.
const STATION_KEYS: &[&str] = &["currentAudioStyle", "currentStation", "station"];

/// Clés sous lesquelles le contrôleur indique le morceau courant
const TRACK_KEYS: &[&str] = &["currentAudioSong", "currentTrack", "playback"];

/// Chemins vers l'état de lecture brut
const STATE_PATHS: &[&[&str]] = &[
    &["state"],
    &["playState"],
    &["playback", "state"],
    &["currentAudioSong", "state"],
];

/// Désérialise un ID qui peut être une chaîne ou un nombre
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("ID must be a string or number")),
    }
}

/// Couple identifiant/mot de passe pour le login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"**REDACTED**")
            .finish()
    }
}

/// Artefacts de session délivrés par le contrôleur au login
///
/// Les deux valeurs sont opaques et circulent dans les cookies `sessionId` et
/// `rememberMe`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub session_id: String,
    #[serde(default)]
    pub remember_me: Option<String>,
}

impl SessionTokens {
    pub fn new(session_id: impl Into<String>, remember_me: Option<String>) -> Self {
        Self {
            session_id: session_id.into(),
            remember_me,
        }
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("session_id", &"**REDACTED**")
            .field(
                "remember_me",
                &self.remember_me.as_ref().map(|_| "**REDACTED**"),
            )
            .finish()
    }
}

/// Adresse du contrôleur et zone, fixes pour la durée de vie d'un client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTarget {
    /// URL de base normalisée, sans slash final
    pub base_url: String,
    pub zone_id: u32,
}

impl ZoneTarget {
    pub fn new(base_url: impl Into<String>, zone_id: u32) -> Self {
        Self {
            base_url: base_url.into(),
            zone_id,
        }
    }
}

/// Programme audio sélectionnable ("style" côté contrôleur)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
}

/// Morceau en cours de diffusion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default, alias = "artUrl", alias = "coverUrl", alias = "imageUrl")]
    pub artwork_url: Option<String>,
}

impl Track {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.artwork_url.is_none()
    }
}

/// État de lecture vu par les utilisateurs du client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlaybackState {
    Playing,
    Paused,
    /// Arrêté, ou état inconnu de ce client
    Stopped,
}

impl PlaybackState {
    /// Convertit l'état brut du contrôleur en état de lecture
    ///
    /// Le vocabulaire est défini par le serveur ; tout état inconnu donne `Stopped`.
    pub fn classify(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "PLAYED" | "PLAYING" | "PLAY" => Self::Playing,
            "PAUSED" | "PAUSE" => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

/// État de la zone tiré d'une seule réponse `zone.getStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub current_station: Option<Station>,
    pub current_track: Option<Track>,
}

impl PlaybackSnapshot {
    /// Construit un instantané depuis le contenu `data` d'une réponse d'état
    pub fn from_status(data: &Value) -> Result<Self> {
        if !data.is_object() {
            return Err(PandoraError::invalid_response(
                "zone status payload is not an object",
            ));
        }

        let current_station = STATION_KEYS
            .iter()
            .filter_map(|key| data.get(*key))
            .find_map(|value| match Station::deserialize(value) {
                Ok(station) => Some(station),
                Err(e) => {
                    debug!("Ignoring unreadable station entry: {}", e);
                    None
                }
            });

        let current_track = TRACK_KEYS
            .iter()
            .filter_map(|key| data.get(*key))
            .filter_map(|value| Track::deserialize(value).ok())
            .find(|track| !track.is_empty());

        Ok(Self {
            state: Self::state_of(data),
            current_station,
            current_track,
        })
    }

    fn state_of(data: &Value) -> PlaybackState {
        let tag = STATE_PATHS.iter().find_map(|path| {
            path.iter()
                .try_fold(data, |node, key| node.get(*key))
                .and_then(Value::as_str)
        });

        match tag {
            Some(tag) => PlaybackState::classify(tag),
            None => match data.get("isPlaying").and_then(Value::as_bool) {
                Some(true) => PlaybackState::Playing,
                Some(false) => PlaybackState::Paused,
                None => PlaybackState::Stopped,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_tags() {
        assert_eq!(PlaybackState::classify("PLAYED"), PlaybackState::Playing);
        assert_eq!(PlaybackState::classify("playing"), PlaybackState::Playing);
        assert_eq!(PlaybackState::classify("PAUSED"), PlaybackState::Paused);
        assert_eq!(PlaybackState::classify("paused"), PlaybackState::Paused);
        assert_eq!(PlaybackState::classify("stopped"), PlaybackState::Stopped);
        assert_eq!(PlaybackState::classify("BUFFERING"), PlaybackState::Stopped);
        assert_eq!(PlaybackState::classify(""), PlaybackState::Stopped);
    }

    #[test]
    fn test_station_numeric_id() {
        let station: Station = serde_json::from_value(json!({"id": 42, "name": "Jazz"})).unwrap();
        assert_eq!(station.id, "42");
        assert_eq!(station.name, "Jazz");
    }

    #[test]
    fn test_snapshot_from_audio_style_layout() {
        let data = json!({
            "state": "PLAYED",
            "currentAudioStyle": {"id": "17", "name": "Acoustic Cafe"},
            "currentAudioSong": {
                "title": "Harvest Moon",
                "artist": "Neil Young",
                "album": "Harvest Moon",
                "artUrl": "http://art/1.jpg"
            }
        });

        let snapshot = PlaybackSnapshot::from_status(&data).unwrap();
        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert_eq!(snapshot.current_station.unwrap().name, "Acoustic Cafe");
        let track = snapshot.current_track.unwrap();
        assert_eq!(track.artist.as_deref(), Some("Neil Young"));
        assert_eq!(track.artwork_url.as_deref(), Some("http://art/1.jpg"));
    }

    #[test]
    fn test_snapshot_from_station_playback_layout() {
        let data = json!({
            "station": {"id": 3, "name": "Lounge"},
            "playback": {"state": "paused", "title": "So What", "artist": "Miles Davis"}
        });

        let snapshot = PlaybackSnapshot::from_status(&data).unwrap();
        assert_eq!(snapshot.state, PlaybackState::Paused);
        assert_eq!(snapshot.current_station.unwrap().id, "3");
        assert_eq!(
            snapshot.current_track.unwrap().title.as_deref(),
            Some("So What")
        );
    }

    #[test]
    fn test_snapshot_is_playing_flag() {
        let data = json!({"isPlaying": true});
        let snapshot = PlaybackSnapshot::from_status(&data).unwrap();
        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert!(snapshot.current_station.is_none());
        assert!(snapshot.current_track.is_none());
    }

    #[test]
    fn test_snapshot_unknown_layout_is_stopped() {
        let snapshot = PlaybackSnapshot::from_status(&json!({})).unwrap();
        assert_eq!(snapshot.state, PlaybackState::Stopped);
    }

    #[test]
    fn test_snapshot_rejects_non_object() {
        assert!(PlaybackSnapshot::from_status(&json!(null)).is_err());
    }

    #[test]
    fn test_tokens_debug_is_redacted() {
        let tokens = SessionTokens::new("abc123", Some("xyz".to_string()));
        let printed = format!("{:?}", tokens);
        assert!(!printed.contains("abc123"));
        assert!(!printed.contains("xyz"));

        let creds = Credentials::new("admin", "hunter2");
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
