//! Extension pour intégrer le contrôleur de zone dans pmoconfig
//!
//! Ce module fournit le trait `PandoraConfigExt` qui ajoute à
//! `pmoconfig::Config` la gestion de l'adresse du contrôleur, des
//! credentials et des artefacts de session persistés.
//!
//! # Structure YAML
//!
//! ```yaml
//! accounts:
//!   pandora:
//!     host: 192.168.1.20
//!     username: admin
//!     password: "encrypted:..."
//!     zone_id: 1
//!     timeout_secs: 10
//!     poll_interval_secs: 10
//!     session_id: "encrypted:..."
//!     remember_me: "encrypted:..."
//! ```
//!
//! # Exemple
//!
//! ```no_run
//! use pmoconfig::get_config;
//! use pmopandora::PandoraConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! let (username, _password) = config.get_pandora_credentials()?;
//! println!("Zone controller {} as {}", config.get_pandora_host()?, username);
//! # Ok(())
//! # }
//! ```

use crate::api::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::models::{DEFAULT_ZONE_ID, SessionTokens};
use anyhow::{Result, anyhow};
use pmoconfig::Config;
use pmoconfig::encryption::{encrypt_secret, reveal_secret};
use serde_yaml::{Number, Value};
use tracing::warn;

/// Cadence de polling par défaut du player
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

const SECTION: [&str; 2] = ["accounts", "pandora"];

fn key(name: &str) -> [&str; 3] {
    [SECTION[0], SECTION[1], name]
}

/// Trait d'extension pour gérer le contrôleur de zone dans pmoconfig
pub trait PandoraConfigExt {
    /// Adresse du contrôleur (IP, hostname ou URL)
    ///
    /// # Errors
    ///
    /// Retourne une erreur si l'adresse n'est pas configurée
    fn get_pandora_host(&self) -> Result<String>;

    fn set_pandora_host(&self, host: &str) -> Result<()>;

    fn get_pandora_username(&self) -> Result<String>;

    fn set_pandora_username(&self, username: &str) -> Result<()>;

    /// Mot de passe en clair, déchiffré si stocké sous la forme `encrypted:...`
    fn get_pandora_password(&self) -> Result<String>;

    /// Stocke le mot de passe (chiffré quand la clé machine est disponible)
    fn set_pandora_password(&self, password: &str) -> Result<()>;

    /// Récupère le couple (username, password)
    fn get_pandora_credentials(&self) -> Result<(String, String)>;

    /// Zone pilotée (défaut: 1)
    fn get_pandora_zone_id(&self) -> Result<u32>;

    fn set_pandora_zone_id(&self, zone_id: u32) -> Result<()>;

    /// Timeout par requête en secondes (défaut: 10)
    fn get_pandora_timeout_secs(&self) -> Result<u64>;

    /// Intervalle de rafraîchissement du player en secondes (défaut: 10)
    fn get_pandora_poll_interval_secs(&self) -> Result<u64>;

    fn set_pandora_poll_interval_secs(&self, secs: u64) -> Result<()>;

    /// Artefacts de session persistés, ou None si absents
    fn get_pandora_session(&self) -> Result<Option<SessionTokens>>;

    /// Persiste les artefacts de session
    fn set_pandora_session(&self, tokens: &SessionTokens) -> Result<()>;

    /// Oublie les artefacts de session
    fn clear_pandora_session(&self) -> Result<()>;
}

/// Chiffre une valeur sensible, ou la garde en clair si la clé machine
/// n'est pas disponible
fn protect(value: &str) -> String {
    match encrypt_secret(value) {
        Ok(encrypted) => encrypted,
        Err(e) => {
            warn!("Storing secret unencrypted: {}", e);
            value.to_string()
        }
    }
}

/// Lecture tolérante des clés de la section
trait ConfigReadExt {
    fn optional_string(&self, name: &str) -> Option<String>;
    fn optional_u64(&self, name: &str) -> Option<u64>;
}

impl ConfigReadExt for Config {
    fn optional_string(&self, name: &str) -> Option<String> {
        match self.get_value(&key(name)) {
            Ok(Value::String(s)) if !s.is_empty() => Some(s),
            Ok(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    fn optional_u64(&self, name: &str) -> Option<u64> {
        match self.get_value(&key(name)) {
            Ok(Value::Number(n)) => n.as_u64(),
            Ok(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl PandoraConfigExt for Config {
    fn get_pandora_host(&self) -> Result<String> {
        self.optional_string("host")
            .ok_or_else(|| anyhow!("Pandora host not configured"))
    }

    fn set_pandora_host(&self, host: &str) -> Result<()> {
        self.set_value(&key("host"), Value::String(host.to_string()))
    }

    fn get_pandora_username(&self) -> Result<String> {
        self.optional_string("username")
            .ok_or_else(|| anyhow!("Pandora username not configured"))
    }

    fn set_pandora_username(&self, username: &str) -> Result<()> {
        self.set_value(&key("username"), Value::String(username.to_string()))
    }

    fn get_pandora_password(&self) -> Result<String> {
        let stored = self
            .optional_string("password")
            .ok_or_else(|| anyhow!("Pandora password not configured"))?;
        reveal_secret(&stored).map_err(|e| anyhow!("Failed to decrypt password: {}", e))
    }

    fn set_pandora_password(&self, password: &str) -> Result<()> {
        self.set_value(&key("password"), Value::String(protect(password)))
    }

    fn get_pandora_credentials(&self) -> Result<(String, String)> {
        let username = self.get_pandora_username()?;
        let password = self.get_pandora_password()?;
        Ok((username, password))
    }

    fn get_pandora_zone_id(&self) -> Result<u32> {
        match self.optional_u64("zone_id") {
            Some(id) => u32::try_from(id).map_err(|_| anyhow!("Invalid zone id {}", id)),
            None => Ok(DEFAULT_ZONE_ID),
        }
    }

    fn set_pandora_zone_id(&self, zone_id: u32) -> Result<()> {
        self.set_value(&key("zone_id"), Value::Number(Number::from(zone_id)))
    }

    fn get_pandora_timeout_secs(&self) -> Result<u64> {
        Ok(self
            .optional_u64("timeout_secs")
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    fn get_pandora_poll_interval_secs(&self) -> Result<u64> {
        Ok(self
            .optional_u64("poll_interval_secs")
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS))
    }

    fn set_pandora_poll_interval_secs(&self, secs: u64) -> Result<()> {
        self.set_value(
            &key("poll_interval_secs"),
            Value::Number(Number::from(secs)),
        )
    }

    fn get_pandora_session(&self) -> Result<Option<SessionTokens>> {
        let Some(stored) = self.optional_string("session_id") else {
            return Ok(None);
        };

        let session_id = reveal_secret(&stored)
            .map_err(|e| anyhow!("Failed to decrypt session data: {}", e))?;
        let remember_me = match self.optional_string("remember_me") {
            Some(stored) => Some(
                reveal_secret(&stored)
                    .map_err(|e| anyhow!("Failed to decrypt session data: {}", e))?,
            ),
            None => None,
        };

        Ok(Some(SessionTokens::new(session_id, remember_me)))
    }

    fn set_pandora_session(&self, tokens: &SessionTokens) -> Result<()> {
        self.set_value(
            &key("session_id"),
            Value::String(protect(&tokens.session_id)),
        )?;
        let remember = tokens
            .remember_me
            .as_deref()
            .map(protect)
            .unwrap_or_default();
        self.set_value(&key("remember_me"), Value::String(remember))
    }

    fn clear_pandora_session(&self) -> Result<()> {
        self.set_value(&key("session_id"), Value::String(String::new()))?;
        self.set_value(&key("remember_me"), Value::String(String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(&dir.path().to_string_lossy()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_defaults() {
        let (_dir, config) = config();
        assert_eq!(config.get_pandora_zone_id().unwrap(), DEFAULT_ZONE_ID);
        assert_eq!(
            config.get_pandora_timeout_secs().unwrap(),
            DEFAULT_REQUEST_TIMEOUT_SECS
        );
        assert_eq!(
            config.get_pandora_poll_interval_secs().unwrap(),
            DEFAULT_POLL_INTERVAL_SECS
        );
        assert!(config.get_pandora_session().unwrap().is_none());
        assert!(config.get_pandora_host().is_err());
    }

    #[test]
    fn test_credentials_round_trip() {
        let (_dir, config) = config();
        config.set_pandora_host("192.168.1.20").unwrap();
        config.set_pandora_username("admin").unwrap();
        config.set_pandora_password("s3cret!").unwrap();
        config.set_pandora_zone_id(3).unwrap();

        assert_eq!(config.get_pandora_host().unwrap(), "192.168.1.20");
        assert_eq!(
            config.get_pandora_credentials().unwrap(),
            ("admin".to_string(), "s3cret!".to_string())
        );
        assert_eq!(config.get_pandora_zone_id().unwrap(), 3);
    }

    #[test]
    fn test_plaintext_password_is_accepted() {
        let (_dir, config) = config();
        config
            .set_value(&key("password"), Value::String("plain".to_string()))
            .unwrap();
        assert_eq!(config.get_pandora_password().unwrap(), "plain");
    }

    #[test]
    fn test_session_persist_and_clear() {
        let (_dir, config) = config();
        let tokens = SessionTokens::new("abc", Some("def".to_string()));
        config.set_pandora_session(&tokens).unwrap();
        assert_eq!(config.get_pandora_session().unwrap(), Some(tokens));

        let without_remember = SessionTokens::new("ghi", None);
        config.set_pandora_session(&without_remember).unwrap();
        assert_eq!(config.get_pandora_session().unwrap(), Some(without_remember));

        config.clear_pandora_session().unwrap();
        assert!(config.get_pandora_session().unwrap().is_none());
    }

    #[test]
    fn test_session_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        let tokens = SessionTokens::new("persisted", Some("remember".to_string()));

        Config::load_config(&path)
            .unwrap()
            .set_pandora_session(&tokens)
            .unwrap();

        let reloaded = Config::load_config(&path).unwrap();
        assert_eq!(reloaded.get_pandora_session().unwrap(), Some(tokens));
    }
}
