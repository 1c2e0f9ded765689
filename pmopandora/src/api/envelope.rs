//! Enveloppe statut + données de chaque réponse de commande
//!
//! ```json
//! { "status": { "code": "OK" }, "data": { ... } }
//! ```

use crate::error::{PandoraError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Marqueur de succès du champ `status.code`
pub const SUCCESS_CODE: &str = "OK";

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub status: Value,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Parse un corps brut en enveloppe
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| PandoraError::invalid_response(format!("not a response envelope: {}", e)))
    }

    pub fn code(&self) -> Option<&str> {
        self.status.get("code").and_then(Value::as_str)
    }

    pub fn is_success(&self) -> bool {
        self.code() == Some(SUCCESS_CODE)
    }

    /// Extrait le contenu, ou échoue avec l'objet statut complet
    pub fn into_data(self, command: &str) -> Result<Value> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(PandoraError::Command {
                command: command.to_string(),
                status: self.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let env = Envelope::parse(r#"{"status":{"code":"OK"},"data":{"styles":[]}}"#).unwrap();
        assert!(env.is_success());
        assert_eq!(env.into_data("zone.station.audio.getAll").unwrap(), json!({"styles": []}));
    }

    #[test]
    fn test_missing_data_is_null() {
        let env = Envelope::parse(r#"{"status":{"code":"OK"}}"#).unwrap();
        assert_eq!(env.into_data("zone.track.skip").unwrap(), Value::Null);
    }

    #[test]
    fn test_failure_carries_status() {
        let env = Envelope::parse(
            r#"{"status":{"code":"NOT_LOGGED_IN","message":"Session expired"},"data":{}}"#,
        )
        .unwrap();
        assert!(!env.is_success());

        match env.into_data("zone.getStatus") {
            Err(PandoraError::Command { command, status }) => {
                assert_eq!(command, "zone.getStatus");
                assert_eq!(status, json!({"code": "NOT_LOGGED_IN", "message": "Session expired"}));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_lowercase_ok_is_not_success() {
        let env = Envelope::parse(r#"{"status":{"code":"ok"}}"#).unwrap();
        assert!(!env.is_success());
    }

    #[test]
    fn test_garbage_is_invalid_response() {
        assert!(matches!(
            Envelope::parse("<html>login</html>"),
            Err(PandoraError::InvalidResponse(_))
        ));
        assert!(matches!(
            Envelope::parse(r#"{"data":{}}"#),
            Err(PandoraError::InvalidResponse(_))
        ));
    }
}
