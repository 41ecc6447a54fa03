//! Session and profile resolution.
//!
//! [`AuthState`] owns the current [`SessionContext`]. Every change (start-up
//! restore, sign-in, sign-out, token refresh) re-resolves the profile of the
//! session's user and is published on a broadcast channel so the shell can
//! re-route. Screens receive the context explicitly; nothing reads a global.
//!
//! The refresh token of the last session is kept in the credential store so
//! the session survives a restart.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{AppError, AppResult, ValidationError};
use crate::models::{Profile, Role, Session};
use crate::remote::RemoteStore;
use crate::storage::{CredentialStore, KEY_REFRESH_TOKEN};

/// Capacity of the auth event channel. Slow subscribers skip old events.
const EVENT_CAPACITY: usize = 16;

/// Refresh the access token when it expires within this many seconds.
const REFRESH_MARGIN_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Session or profile lookup in flight. No screen is chosen yet.
    Loading,
    Ready,
}

/// Who is using the application right now.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub phase: SessionPhase,
}

impl SessionContext {
    pub fn loading() -> Self {
        Self {
            session: None,
            profile: None,
            phase: SessionPhase::Loading,
        }
    }

    pub fn signed_out() -> Self {
        Self::resolved(None, None)
    }

    pub fn resolved(session: Option<Session>, profile: Option<Profile>) -> Self {
        Self {
            session,
            profile,
            phase: SessionPhase::Ready,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Loading
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(Session::user_id)
    }

    /// Role of the signed-in profile. `None` without a session.
    pub fn role(&self) -> Option<Role> {
        self.session.as_ref()?;
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn require_session(&self) -> AppResult<&Session> {
        self.session.as_ref().ok_or(AppError::NotSignedIn)
    }

    /// Session and profile, provided the profile has `role`.
    pub fn require_role(&self, role: Role) -> AppResult<(&Session, &Profile)> {
        let session = self.require_session()?;
        let profile = self
            .profile
            .as_ref()
            .ok_or_else(|| AppError::Forbidden("no profile for this user".into()))?;
        if profile.role != role {
            return Err(AppError::Forbidden(format!(
                "requires role {role:?}, profile has {:?}",
                profile.role
            )));
        }
        Ok((session, profile))
    }

    pub fn summary(&self) -> ContextSummary {
        let profile = self.profile.as_ref();
        ContextSummary {
            phase: self.phase,
            signed_in: self.session.is_some(),
            user_id: self.user_id(),
            email: self.session.as_ref().and_then(|s| s.user.email.clone()),
            full_name: profile.map(|p| p.full_name.clone()),
            role: self.role(),
            branch_id: profile.and_then(|p| p.branch_id),
            branch_name: profile.map(|p| p.branch_name().to_string()),
        }
    }
}

/// Token-free view of a [`SessionContext`] for the webview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSummary {
    pub phase: SessionPhase,
    pub signed_in: bool,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub branch_id: Option<Uuid>,
    pub branch_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub context: ContextSummary,
}

/// Receiving end of the auth event channel. Dropping it unsubscribes.
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    /// Next change, or `None` once the owning [`AuthState`] is gone.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth subscriber lagged, skipping old events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        debug!("auth subscription released");
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

pub struct AuthState {
    context: Mutex<SessionContext>,
    events: broadcast::Sender<AuthChange>,
    credentials: Arc<dyn CredentialStore>,
}

impl AuthState {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            context: Mutex::new(SessionContext::loading()),
            events,
            credentials,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.events.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Copy of the current context.
    pub fn snapshot(&self) -> SessionContext {
        self.lock().clone()
    }

    /// Restore the previous session from the stored refresh token, if any.
    pub async fn init(&self, remote: &dyn RemoteStore) -> SessionContext {
        self.set_loading();
        let session = match self.credentials.get(KEY_REFRESH_TOKEN) {
            Some(token) => match remote.refresh_session(&token).await {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(error = %e, "stored session could not be restored");
                    self.forget_refresh_token();
                    None
                }
            },
            None => None,
        };
        if let Some(s) = &session {
            self.remember_refresh_token(s);
        }
        self.resolve(remote, session, AuthEvent::InitialSession).await
    }

    pub async fn sign_in(
        &self,
        remote: &dyn RemoteStore,
        email: &str,
        password: String,
    ) -> AppResult<SessionContext> {
        let password = Zeroizing::new(password);
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        let session = match remote.sign_in_with_password(email, &password).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "sign-in rejected");
                return Err(e);
            }
        };
        info!(user_id = %session.user_id(), "session started");
        self.remember_refresh_token(&session);
        self.set_loading();
        Ok(self.resolve(remote, Some(session), AuthEvent::SignedIn).await)
    }

    /// End the session locally even when the server call fails.
    pub async fn sign_out(&self, remote: &dyn RemoteStore) -> SessionContext {
        let session = self.lock().session.take();
        if let Some(session) = &session {
            if let Err(e) = remote.sign_out(session).await {
                warn!(error = %e, "server sign-out failed, clearing local session anyway");
            }
            info!(user_id = %session.user_id(), "session ended");
        }
        self.forget_refresh_token();
        self.resolve(remote, None, AuthEvent::SignedOut).await
    }

    /// Settle on "signed out" without a backend, e.g. before one is set up.
    pub fn init_signed_out(&self) -> SessionContext {
        self.publish(SessionContext::signed_out(), AuthEvent::InitialSession)
    }

    /// Drop the session without telling the server. Used when the backend
    /// settings are wiped.
    pub fn sign_out_locally(&self) -> SessionContext {
        let had_session = self.lock().session.take().is_some();
        self.forget_refresh_token();
        if had_session {
            info!("session dropped locally");
        }
        self.publish(SessionContext::signed_out(), AuthEvent::SignedOut)
    }

    /// Exchange the current refresh token for a new session.
    pub async fn refresh(&self, remote: &dyn RemoteStore) -> AppResult<SessionContext> {
        let token = self
            .lock()
            .session
            .as_ref()
            .map(|s| Zeroizing::new(s.refresh_token.clone()))
            .ok_or(AppError::NotSignedIn)?;

        match remote.refresh_session(&token).await {
            Ok(session) => {
                self.remember_refresh_token(&session);
                Ok(self
                    .resolve(remote, Some(session), AuthEvent::TokenRefreshed)
                    .await)
            }
            Err(e @ AppError::Auth(_)) => {
                warn!(error = %e, "refresh token rejected, signing out");
                self.forget_refresh_token();
                self.resolve(remote, None, AuthEvent::SignedOut).await;
                Err(AppError::NotSignedIn)
            }
            Err(e) => Err(e),
        }
    }

    /// Current context, refreshing the access token first when it is about
    /// to expire.
    pub async fn current(&self, remote: &dyn RemoteStore) -> AppResult<SessionContext> {
        let expires_at = self.lock().session.as_ref().and_then(|s| s.expires_at);
        match expires_at {
            Some(at) if at - chrono::Utc::now().timestamp() < REFRESH_MARGIN_SECS => {
                debug!("access token near expiry, refreshing");
                self.refresh(remote).await
            }
            _ => Ok(self.snapshot()),
        }
    }

    fn set_loading(&self) {
        self.lock().phase = SessionPhase::Loading;
    }

    /// Look up the profile for `session`, store the new context and publish.
    async fn resolve(
        &self,
        remote: &dyn RemoteStore,
        session: Option<Session>,
        event: AuthEvent,
    ) -> SessionContext {
        let profile = match &session {
            Some(s) => match remote.fetch_profile(s).await {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(user_id = %s.user_id(), error = %e, "profile lookup failed");
                    None
                }
            },
            None => None,
        };

        self.publish(SessionContext::resolved(session, profile), event)
    }

    /// Store `context` and tell every subscriber.
    fn publish(&self, context: SessionContext, event: AuthEvent) -> SessionContext {
        *self.lock() = context.clone();
        debug!(?event, role = ?context.role(), "auth state changed");

        // No receivers is fine; the shell may not have subscribed yet.
        let _ = self.events.send(AuthChange {
            event,
            context: context.summary(),
        });
        context
    }

    fn remember_refresh_token(&self, session: &Session) {
        if let Err(e) = self
            .credentials
            .set(KEY_REFRESH_TOKEN, &session.refresh_token)
        {
            warn!(error = %e, "could not persist refresh token");
        }
    }

    fn forget_refresh_token(&self) {
        if let Err(e) = self.credentials.delete(KEY_REFRESH_TOKEN) {
            warn!(error = %e, "could not remove refresh token");
        }
    }
}
