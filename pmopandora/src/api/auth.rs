//! Login auprès du contrôleur de zone

use super::commands::ZoneCommand;
use super::{PandoraApi, REMEMBER_COOKIE, SESSION_COOKIE};
use crate::error::{PandoraError, Result};
use crate::models::{Credentials, SessionTokens};
use crate::session::Authenticator;
use async_trait::async_trait;
use tracing::{debug, info, warn};

impl PandoraApi {
    /// S'authentifie et récupère les artefacts de session
    ///
    /// # Errors
    ///
    /// * `PandoraError::Authentication` - réponse hors 2xx, ou pas de cookie
    ///   `sessionId` dans la réponse
    /// * `PandoraError::Transport` - contrôleur injoignable
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionTokens> {
        info!(
            host = %self.zone.base_url,
            "Attempting to login as {}", credentials.username
        );

        let response = self
            .client
            .post(format!("{}/login", self.zone.base_url))
            .headers(self.login_headers.clone())
            .form(&[
                ("user", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
                ("rememberMe", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Login rejected with HTTP {}", status.as_u16());
            return Err(PandoraError::Authentication(format!(
                "login rejected with HTTP {}",
                status.as_u16()
            )));
        }

        let mut session_id = None;
        let mut remember_me = None;
        for cookie in response.cookies() {
            match cookie.name() {
                SESSION_COOKIE => session_id = Some(cookie.value().to_string()),
                REMEMBER_COOKIE => remember_me = Some(cookie.value().to_string()),
                _ => {}
            }
        }

        let session_id = session_id.filter(|s| !s.is_empty()).ok_or_else(|| {
            PandoraError::Authentication("no session ID received".to_string())
        })?;

        debug!("Login successful, session artifacts received");
        Ok(SessionTokens::new(
            session_id,
            remember_me.filter(|r| !r.is_empty()),
        ))
    }
}

#[async_trait]
impl Authenticator for PandoraApi {
    async fn login(&self, credentials: &Credentials) -> Result<SessionTokens> {
        PandoraApi::login(self, credentials).await
    }

    async fn check_session(&self, tokens: &SessionTokens) -> Result<()> {
        self.send(&ZoneCommand::GetStatus, tokens).await.map(|_| ())
    }
}
