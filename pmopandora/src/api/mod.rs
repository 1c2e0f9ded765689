//! Accès bas niveau à l'interface HTTP du contrôleur de zone
//!
//! Cette couche connaît le format d'échange (endpoints, headers, cookies,
//! enveloppe) mais ne détient aucune session : les artefacts sont fournis par
//! l'appelant à chaque requête.

pub mod auth;
pub mod commands;
pub mod envelope;

use crate::error::{PandoraError, Result};
use crate::models::{SessionTokens, ZoneTarget};
use commands::ZoneCommand;
use envelope::Envelope;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER};
use reqwest::{Client, Response};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout par défaut de chaque requête, login compris
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Cookie portant le jeton de session
pub const SESSION_COOKIE: &str = "sessionId";

/// Cookie portant le jeton remember-me
pub const REMEMBER_COOKIE: &str = "rememberMe";

const ACCEPT_VALUE: &str = "application/json, text/javascript, */*; q=0.01";
const X_REQUESTED_WITH: &str = "x-requested-with";
const ZONE_PAGE: &str = "/zone.shtml";
const LOGIN_PAGE: &str = "/public/login.shtml";

/// Client bas niveau lié à un contrôleur et une zone
pub struct PandoraApi {
    client: Client,
    zone: ZoneTarget,
    command_headers: HeaderMap,
    login_headers: HeaderMap,
}

impl fmt::Debug for PandoraApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PandoraApi").field("zone", &self.zone).finish()
    }
}

impl PandoraApi {
    /// Crée le client HTTP pour `zone`
    pub fn new(zone: ZoneTarget, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            command_headers: Self::headers(&zone.base_url, ZONE_PAGE)?,
            login_headers: Self::headers(&zone.base_url, LOGIN_PAGE)?,
            client,
            zone,
        })
    }

    pub fn zone(&self) -> &ZoneTarget {
        &self.zone
    }

    pub fn base_url(&self) -> &str {
        &self.zone.base_url
    }

    fn headers(base_url: &str, page: &str) -> Result<HeaderMap> {
        let value = |s: &str| {
            HeaderValue::from_str(s).map_err(|e| PandoraError::InvalidHost(format!("{}: {}", s, e)))
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(
            HeaderName::from_static(X_REQUESTED_WITH),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        headers.insert(ORIGIN, value(base_url)?);
        headers.insert(REFERER, value(&format!("{}{}", base_url, page))?);
        Ok(headers)
    }

    /// Valeur du header `Cookie` pour des artefacts de session
    fn cookie_header(tokens: &SessionTokens) -> Result<HeaderValue> {
        let mut cookie = format!("{}={}", SESSION_COOKIE, tokens.session_id);
        if let Some(remember) = tokens.remember_me.as_deref().filter(|r| !r.is_empty()) {
            cookie.push_str(&format!("; {}={}", REMEMBER_COOKIE, remember));
        }

        HeaderValue::from_str(&cookie)
            .map_err(|_| PandoraError::invalid_response("session artifact is not a valid cookie value"))
    }

    /// Envoie une commande et retourne le contenu `data` de l'enveloppe
    pub async fn send(&self, command: &ZoneCommand, tokens: &SessionTokens) -> Result<Value> {
        let url = format!("{}/cmd", self.zone.base_url);
        debug!(cmd = command.name(), zone_id = self.zone.zone_id, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.command_headers.clone())
            .header(COOKIE, Self::cookie_header(tokens)?)
            .query(&command.query())
            .form(&command.form(self.zone.zone_id))
            .send()
            .await?;

        let envelope = self.handle_response(response).await?;
        envelope.into_data(command.name()).inspect_err(|e| {
            warn!(cmd = command.name(), "Command rejected: {}", e);
        })
    }

    /// Vérifie le statut HTTP et décode l'enveloppe
    async fn handle_response(&self, response: Response) -> Result<Envelope> {
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("HTTP error ({}): {}", status.as_u16(), message);
            return Err(PandoraError::HttpStatus {
                code: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        Envelope::parse(&text).inspect_err(|e| warn!("Failed to parse response: {}", e))
    }
}
