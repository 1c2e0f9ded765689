//! Types d'erreurs du client de contrôleur de zone

use serde_json::Value;

/// Type Result pour les opérations sur le contrôleur
pub type Result<T> = std::result::Result<T, PandoraError>;

/// Erreurs possibles lors des échanges avec le contrôleur de zone
#[derive(Debug, thiserror::Error)]
pub enum PandoraError {
    /// Échec réseau (connexion, timeout, lecture du corps)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Une commande a répondu avec un statut HTTP hors 2xx
    #[error("HTTP error {code}: {message}")]
    HttpStatus { code: u16, message: String },

    /// Login refusé, ou sans artefact de session
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// L'enveloppe de réponse porte un code différent de "OK"
    #[error("Command {command} failed: {status}")]
    Command { command: String, status: Value },

    /// Réponse illisible ou contenu attendu absent
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Erreur de parsing JSON
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Hôte refusé par la validation
    #[error("Invalid host: {0}")]
    InvalidHost(String),

    /// Aucune station ne correspond à la source demandée
    #[error("Station not found: {0}")]
    StationNotFound(String),

    /// Erreur de configuration (depuis pmoconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl PandoraError {
    /// Crée une erreur de réponse invalide
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Vrai pour les échecs réseau et les réponses hors 2xx
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpStatus { .. })
    }

    /// Vrai quand l'échec est sous HTTP (aucune réponse)
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Vrai quand la requête a expiré
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    pub fn is_command_error(&self) -> bool {
        matches!(self, Self::Command { .. })
    }

    /// Statut brut d'une commande en échec
    pub fn command_status(&self) -> Option<&Value> {
        match self {
            Self::Command { status, .. } => Some(status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classification() {
        let err = PandoraError::HttpStatus {
            code: 502,
            message: "bad gateway".to_string(),
        };
        assert!(err.is_transport());
        assert!(!err.is_network());
        assert!(!err.is_auth_error());

        let err = PandoraError::Authentication("no session ID received".to_string());
        assert!(err.is_auth_error());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_command_status_is_kept_verbatim() {
        let status = json!({"code": "SESSION_EXPIRED", "message": "Please log in"});
        let err = PandoraError::Command {
            command: "zone.getStatus".to_string(),
            status: status.clone(),
        };
        assert!(err.is_command_error());
        assert_eq!(err.command_status(), Some(&status));
        assert!(err.to_string().contains("SESSION_EXPIRED"));
    }
}
