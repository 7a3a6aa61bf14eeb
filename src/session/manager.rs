//! Session manager: sign-in redirect, callback completion, silent refresh,
//! sign-out, and the event feed that auth hooks observe.
//!
//! One instance is built at startup and shared through `AppState`.
//! `dispose()` at shutdown cancels every hook and in-flight proxy call
//! derived from it.

use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::middleware::SessionHandle;
use super::{SessionBackend, SessionData};
use crate::config::Config;
use crate::error::AppError;
use crate::ocsf::{self, Activity, Severity};
use crate::oidc::client::{self, OidcError, TokenSet};
use crate::oidc::discovery::ProviderMetadataCache;
use crate::oidc::jwt::{self, JwksCache, JwtError, now_secs};
use crate::types::{Session, SessionTokens};

const EVENT_CAPACITY: usize = 64;

/// Query parameters of the provider's redirect back to `/auth/callback`.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEventKind {
    UserLoaded(Session),
    UserUnloaded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session_id: String,
    pub kind: SessionEventKind,
}

#[derive(Debug, thiserror::Error)]
enum SignInFailure {
    #[error("provider returned error: {0}")]
    Provider(String),
    #[error("missing authorization code")]
    MissingCode,
    #[error("no sign-in in progress for this session")]
    NoPendingSignIn,
    #[error("sign-in attempt expired")]
    SignInExpired,
    #[error("state mismatch")]
    StateMismatch,
    #[error("token response carried no id_token")]
    MissingIdToken,
    #[error("nonce mismatch")]
    NonceMismatch,
    #[error("id_token has no usable claims")]
    UnreadableClaims,
    #[error(transparent)]
    Oidc(#[from] OidcError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
}

pub struct SessionManager<B: SessionBackend> {
    config: Config,
    http_client: reqwest::Client,
    backend: Arc<B>,
    provider: ProviderMetadataCache,
    jwks: JwksCache,
    events: broadcast::Sender<SessionEvent>,
    shutdown: CancellationToken,
}

impl<B: SessionBackend> SessionManager<B> {
    pub fn new(config: Config, http_client: reqwest::Client, backend: Arc<B>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider: ProviderMetadataCache::new(http_client.clone()),
            jwks: JwksCache::new(http_client.clone()),
            config,
            http_client,
            backend,
            events,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Number of live event subscribers (mounted hooks).
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// A token cancelled when the manager is disposed.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn dispose(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!("session manager disposed");
            self.shutdown.cancel();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// The session bound to this request, refreshed first if it expired.
    ///
    /// Never fails: any problem is logged and reads as "no session".
    pub async fn current_user(&self, session: &SessionHandle) -> Option<Session> {
        let mut data = session.data.lock().await;
        self.resolve(&session.id, &mut data).await
    }

    /// Same as [`current_user`](Self::current_user) for a session with no
    /// request in flight; a refreshed token set is written back.
    pub async fn load_user(&self, session_id: &str) -> Option<Session> {
        let mut data = self.backend.load(session_id).await?;
        let before = data.clone();
        let user = self.resolve(session_id, &mut data).await;
        if data != before {
            self.backend.save(session_id, &data).await;
        }
        user
    }

    async fn resolve(&self, session_id: &str, data: &mut SessionData) -> Option<Session> {
        let tokens = data.tokens()?;

        if !tokens.is_expired() {
            return Session::from_tokens(&tokens);
        }

        let Some(refresh_token) = tokens.refresh_token.clone().filter(|t| !t.is_empty()) else {
            tracing::debug!("session expired without a refresh token");
            data.clear();
            self.emit(session_id, SessionEventKind::UserUnloaded);
            return None;
        };

        let email = ocsf::email_from_tokens(Some(&tokens));
        match self.refresh(&tokens, &refresh_token).await {
            Ok(refreshed) => {
                data.set_tokens(&refreshed);
                ocsf::authentication_event(
                    Activity::ServiceTicket,
                    true,
                    Severity::Informational,
                    email.as_deref(),
                    "Token refresh succeeded",
                );
                let user = Session::from_tokens(&refreshed);
                if let Some(user) = &user {
                    self.emit(session_id, SessionEventKind::UserLoaded(user.clone()));
                }
                user
            }
            Err(e) => {
                tracing::warn!("silent refresh failed: {}", e);
                ocsf::authentication_event(
                    Activity::ServiceTicket,
                    false,
                    Severity::Medium,
                    email.as_deref(),
                    &format!("Token refresh failed: {e}"),
                );
                data.clear();
                self.emit(session_id, SessionEventKind::UserUnloaded);
                None
            }
        }
    }

    async fn refresh(
        &self,
        current: &SessionTokens,
        refresh_token: &str,
    ) -> Result<SessionTokens, OidcError> {
        let metadata = self.provider.get(&self.config.discovery_url()).await?;
        let fresh = client::refresh_tokens(
            &self.http_client,
            &self.config,
            &metadata.token_endpoint,
            refresh_token,
        )
        .await?;

        Ok(SessionTokens {
            access_token: fresh.access_token,
            id_token: fresh.id_token.unwrap_or_else(|| current.id_token.clone()),
            // keep the old refresh token unless the provider rotated it
            refresh_token: fresh.refresh_token.or_else(|| current.refresh_token.clone()),
            expires_at: fresh.expires_in.map(|secs| now_secs() + secs),
        })
    }

    /// Start a sign-in attempt and return the provider URL to navigate to.
    pub async fn sign_in_redirect(&self, session: &SessionHandle) -> Result<String, AppError> {
        let metadata = self
            .provider
            .get(&self.config.discovery_url())
            .await
            .map_err(|e| AppError::ProviderUnavailable(e.to_string()))?;

        let pending = crate::oidc::pkce::PendingSignIn::generate();
        let url = client::authorization_url(&metadata, &self.config, &pending);
        session.data.lock().await.set_pending_signin(&pending);

        tracing::info!("sign-in redirect issued");
        Ok(url)
    }

    /// Finish the authorization-code flow.
    ///
    /// Returns the dashboard URL on success and the landing URL on any
    /// failure. Failures are logged, never retried.
    pub async fn complete_sign_in(&self, session: &SessionHandle, params: CallbackParams) -> String {
        match self.try_complete_sign_in(session, params).await {
            Ok(user) => {
                ocsf::authentication_event(
                    Activity::AuthTicket,
                    true,
                    Severity::Informational,
                    user.profile.email.as_deref(),
                    "OAuth token exchange succeeded",
                );
                self.emit(&session.id, SessionEventKind::UserLoaded(user));
                self.config.dashboard_url()
            }
            Err(e) => {
                tracing::error!("sign-in callback failed: {}", e);
                let severity = match e {
                    SignInFailure::StateMismatch
                    | SignInFailure::NonceMismatch
                    | SignInFailure::Jwt(_) => Severity::High,
                    _ => Severity::Medium,
                };
                ocsf::authentication_event(
                    Activity::AuthTicket,
                    false,
                    severity,
                    None,
                    &format!("OAuth sign-in failed: {e}"),
                );
                self.config.landing_url()
            }
        }
    }

    async fn try_complete_sign_in(
        &self,
        session: &SessionHandle,
        params: CallbackParams,
    ) -> Result<Session, SignInFailure> {
        // The pending attempt is single-use whatever happens next.
        let pending = session.data.lock().await.take_pending_signin();

        if let Some(error) = params.error {
            return Err(SignInFailure::Provider(
                params.error_description.unwrap_or(error),
            ));
        }
        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(SignInFailure::MissingCode)?;
        let pending = pending.ok_or(SignInFailure::NoPendingSignIn)?;
        if pending.is_stale(now_secs()) {
            return Err(SignInFailure::SignInExpired);
        }
        if params.state.as_deref() != Some(pending.state.as_str()) {
            return Err(SignInFailure::StateMismatch);
        }

        let metadata = self.provider.get(&self.config.discovery_url()).await?;
        let TokenSet {
            access_token,
            id_token,
            refresh_token,
            expires_in,
            ..
        } = client::exchange_code_for_tokens(
            &self.http_client,
            &self.config,
            &metadata.token_endpoint,
            &code,
            &pending.code_verifier,
        )
        .await?;

        let id_token = id_token.ok_or(SignInFailure::MissingIdToken)?;
        let claims = jwt::verify_id_token(
            &id_token,
            &self.jwks,
            &metadata.jwks_uri,
            &metadata.issuer,
            &self.config.oidc_client_id,
        )
        .await?;
        if claims.nonce.as_deref() != Some(pending.nonce.as_str()) {
            return Err(SignInFailure::NonceMismatch);
        }

        let tokens = SessionTokens {
            access_token,
            id_token,
            refresh_token,
            expires_at: expires_in.map(|secs| now_secs() + secs),
        };
        let user = Session::from_tokens(&tokens).ok_or(SignInFailure::UnreadableClaims)?;
        session.data.lock().await.set_tokens(&tokens);

        Ok(user)
    }

    /// End the session and return the landing URL.
    ///
    /// Local only: the provider session is not revoked.
    pub async fn sign_out(&self, session: &SessionHandle) -> String {
        let email = {
            let data = session.data.lock().await;
            ocsf::email_from_tokens(data.tokens().as_ref())
        };

        session.destroy().await;
        self.emit(&session.id, SessionEventKind::UserUnloaded);

        ocsf::authentication_event(
            Activity::Logoff,
            true,
            Severity::Informational,
            email.as_deref(),
            "User signed out",
        );

        self.config.landing_url()
    }

    fn emit(&self, session_id: &str, kind: SessionEventKind) {
        // Err only means nobody is listening.
        let _ = self.events.send(SessionEvent {
            session_id: session_id.to_string(),
            kind,
        });
    }
}
