//! Cycle de vie de la session auprès du contrôleur de zone
//!
//! Le contrôleur délivre des artefacts de session opaques au login et
//! n'annonce jamais leur expiration. La validité est donc vérifiée à la
//! demande : avant une commande protégée, la session détenue est testée avec
//! la commande la moins coûteuse (`zone.getStatus`). Sans session, ou si ce
//! test est refusé, un nouveau login la remplace.
//!
//! ```text
//!   NO_SESSION ──login ok──▶ SESSION_HELD ──check refused──▶ login ──▶ SESSION_HELD
//! ```
//!
//! Une session détenue n'est jamais effacée : un jeton périmé reste en place
//! jusqu'à ce qu'un login réussi l'écrase.
//!
//! La séquence vérification puis login s'exécute sous un verrou asynchrone :
//! des appels concurrents ne déclenchent jamais deux logins.

use crate::error::Result;
use crate::models::{Credentials, SessionTokens};
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

/// Listener notifié quand les artefacts de session changent
///
/// Il reçoit le gestionnaire lui-même et y lit le nouvel état, typiquement
/// pour persister les artefacts d'un redémarrage à l'autre.
pub type SessionCallback = Arc<dyn Fn(&SessionManager) + Send + Sync>;

/// Ce que le gestionnaire de session attend du transport
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Se connecte et retourne de nouveaux artefacts de session
    async fn login(&self, credentials: &Credentials) -> Result<SessionTokens>;

    /// Requête la moins coûteuse, qui ne réussit qu'avec une session valide
    async fn check_session(&self, tokens: &SessionTokens) -> Result<()>;
}

/// Détient la session d'un client et décide quand se reconnecter
pub struct SessionManager {
    credentials: Credentials,
    tokens: RwLock<Option<SessionTokens>>,
    refresh: tokio::sync::Mutex<()>,
    listener: Mutex<Option<SessionCallback>>,
}

impl SessionManager {
    pub fn new(credentials: Credentials, listener: Option<SessionCallback>) -> Self {
        Self {
            credentials,
            tokens: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
            listener: Mutex::new(listener),
        }
    }

    /// Injecte des artefacts persistés sans notifier le listener
    pub fn with_tokens(self, tokens: SessionTokens) -> Self {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        self
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Artefacts actuellement détenus, éventuellement périmés
    pub fn session(&self) -> Option<SessionTokens> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_session(&self) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Remplace le listener (emplacement unique)
    pub fn set_listener(&self, listener: Option<SessionCallback>) {
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = listener;
    }

    /// Retourne une session utilisable, avec au plus un login
    ///
    /// Les échecs réseau du test de session sont retournés tels quels : un
    /// contrôleur injoignable n'accepterait pas non plus de login, et la
    /// session détenue reste intacte.
    pub async fn ensure_session<A>(&self, auth: &A) -> Result<SessionTokens>
    where
        A: Authenticator + ?Sized,
    {
        let _guard = self.refresh.lock().await;

        if let Some(tokens) = self.session() {
            match auth.check_session(&tokens).await {
                Ok(()) => return Ok(tokens),
                Err(err) if err.is_network() => return Err(err),
                Err(err) => info!("Session expired or invalid ({}), re-authenticating", err),
            }
        }

        self.login_locked(auth).await
    }

    /// Login inconditionnel
    pub async fn login<A>(&self, auth: &A) -> Result<SessionTokens>
    where
        A: Authenticator + ?Sized,
    {
        let _guard = self.refresh.lock().await;
        self.login_locked(auth).await
    }

    async fn login_locked<A>(&self, auth: &A) -> Result<SessionTokens>
    where
        A: Authenticator + ?Sized,
    {
        let tokens = auth.login(&self.credentials).await?;
        self.store(tokens.clone());
        Ok(tokens)
    }

    /// Installe de nouveaux artefacts, en notifiant le listener seulement s'ils changent
    fn store(&self, tokens: SessionTokens) -> bool {
        let changed = {
            let mut held = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
            if held.as_ref() == Some(&tokens) {
                false
            } else {
                *held = Some(tokens);
                true
            }
        };

        if changed {
            debug!("Session artifacts changed");
            let listener = self
                .listener
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(listener) = listener {
                listener(self);
            }
        }

        changed
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("credentials", &self.credentials)
            .field("tokens", &self.session())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PandoraError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Authentificateur scripté qui compte ses appels
    struct FakeAuth {
        logins: AtomicUsize,
        checks: AtomicUsize,
        next_session: Mutex<Vec<&'static str>>,
        session_valid: bool,
        login_ok: bool,
    }

    impl FakeAuth {
        fn new(sessions: Vec<&'static str>) -> Self {
            Self {
                logins: AtomicUsize::new(0),
                checks: AtomicUsize::new(0),
                next_session: Mutex::new(sessions),
                session_valid: true,
                login_ok: true,
            }
        }
    }

    #[async_trait]
    impl Authenticator for FakeAuth {
        async fn login(&self, _credentials: &Credentials) -> Result<SessionTokens> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if !self.login_ok {
                return Err(PandoraError::Authentication("bad password".to_string()));
            }
            let mut sessions = self.next_session.lock().unwrap();
            let id = if sessions.len() > 1 {
                sessions.remove(0)
            } else {
                sessions[0]
            };
            Ok(SessionTokens::new(id, Some("remember".to_string())))
        }

        async fn check_session(&self, _tokens: &SessionTokens) -> Result<()> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            if self.session_valid {
                Ok(())
            } else {
                Err(PandoraError::Command {
                    command: "zone.getStatus".to_string(),
                    status: json!({"code": "NOT_LOGGED_IN"}),
                })
            }
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(Credentials::new("admin", "secret"), None)
    }

    fn counting_listener() -> (SessionCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let listener: SessionCallback = Arc::new(move |_: &SessionManager| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (listener, count)
    }

    #[tokio::test]
    async fn test_no_session_logs_in_without_check() {
        let auth = FakeAuth::new(vec!["s1"]);
        let manager = manager();
        assert!(!manager.has_session());

        let tokens = manager.ensure_session(&auth).await.unwrap();
        assert_eq!(tokens.session_id, "s1");
        assert_eq!(auth.logins.load(Ordering::SeqCst), 1);
        assert_eq!(auth.checks.load(Ordering::SeqCst), 0);
        assert_eq!(manager.session(), Some(tokens));
    }

    #[tokio::test]
    async fn test_valid_session_is_kept() {
        let auth = FakeAuth::new(vec!["s2"]);
        let manager = manager().with_tokens(SessionTokens::new("s1", None));

        let tokens = manager.ensure_session(&auth).await.unwrap();
        assert_eq!(tokens.session_id, "s1");
        assert_eq!(auth.logins.load(Ordering::SeqCst), 0);
        assert_eq!(auth.checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_check_triggers_single_login() {
        let mut auth = FakeAuth::new(vec!["s2"]);
        auth.session_valid = false;
        let manager = manager().with_tokens(SessionTokens::new("s1", None));

        let tokens = manager.ensure_session(&auth).await.unwrap();
        assert_eq!(tokens.session_id, "s2");
        assert_eq!(auth.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_login_propagates_and_keeps_stale_token() {
        let mut auth = FakeAuth::new(vec!["s2"]);
        auth.session_valid = false;
        auth.login_ok = false;
        let stale = SessionTokens::new("s1", None);
        let manager = manager().with_tokens(stale.clone());

        let err = manager.ensure_session(&auth).await.unwrap_err();
        assert!(err.is_auth_error());
        assert_eq!(auth.logins.load(Ordering::SeqCst), 1);
        assert_eq!(manager.session(), Some(stale));
    }

    #[tokio::test]
    async fn test_listener_fires_only_on_change() {
        let auth = FakeAuth::new(vec!["s1"]);
        let (listener, count) = counting_listener();
        let manager = SessionManager::new(Credentials::new("admin", "secret"), Some(listener));

        manager.login(&auth).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Mêmes artefacts : pas de notification
        manager.login(&auth).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_seeding_does_not_notify() {
        let (listener, count) = counting_listener();
        let manager = SessionManager::new(Credentials::new("admin", "secret"), Some(listener))
            .with_tokens(SessionTokens::new("persisted", None));
        assert!(manager.has_session());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_listener_reads_new_state_from_manager() {
        let auth = FakeAuth::new(vec!["fresh"]);
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let manager = manager();
        manager.set_listener(Some(Arc::new(move |m: &SessionManager| {
            *sink.lock().unwrap() = m.session();
        })));

        manager.ensure_session(&auth).await.unwrap();
        let persisted = seen.lock().unwrap().clone().unwrap();
        assert_eq!(persisted.session_id, "fresh");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_login() {
        let auth = FakeAuth::new(vec!["s1"]);
        let manager = manager();

        let (a, b) = tokio::join!(manager.ensure_session(&auth), manager.ensure_session(&auth));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(auth.logins.load(Ordering::SeqCst), 1);
    }
}
