//! Observable auth state for one session.
//!
//! Mounting a hook subscribes to the manager's session events *before* the
//! initial user fetch, so a sign-in or sign-out that lands while the fetch is
//! in flight is still applied. The snapshot starts with `loading: true` and
//! flips to `false` exactly once, when the initial fetch settles.
//!
//! Unmounting (or dropping) the hook cancels its background task; a fetch
//! that completes afterwards publishes nothing.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::SessionBackend;
use super::manager::{SessionEvent, SessionEventKind, SessionManager};
use super::middleware::SessionHandle;
use crate::types::Session;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthSnapshot {
    pub user: Option<Session>,
    pub loading: bool,
}

impl AuthSnapshot {
    fn initial() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

pub struct AuthHook<B: SessionBackend + 'static> {
    manager: Arc<SessionManager<B>>,
    state: watch::Receiver<AuthSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<B: SessionBackend + 'static> AuthHook<B> {
    pub fn mount(manager: Arc<SessionManager<B>>, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        let (tx, state) = watch::channel(AuthSnapshot::initial());
        let cancel = manager.shutdown_token();
        let events = manager.subscribe();

        let task = tokio::spawn(observe(
            manager.clone(),
            session_id,
            tx,
            events,
            cancel.clone(),
        ));

        Self {
            manager,
            state,
            cancel,
            task: Some(task),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Wait for the next published change. `None` once the hook has stopped.
    pub async fn changed(&mut self) -> Option<AuthSnapshot> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Wait until the initial fetch has settled.
    pub async fn loaded(&mut self) -> AuthSnapshot {
        if let Ok(snapshot) = self.state.wait_for(|s| !s.loading).await {
            return snapshot.clone();
        }
        self.snapshot()
    }

    /// Begin sign-in for the request's session. `None` if the provider is
    /// unreachable; the failure is logged.
    pub async fn login(&self, session: &SessionHandle) -> Option<String> {
        match self.manager.sign_in_redirect(session).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::error!("sign-in could not start: {}", e);
                None
            }
        }
    }

    pub async fn logout(&self, session: &SessionHandle) -> String {
        self.manager.sign_out(session).await
    }

    pub fn is_mounted(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop observing and wait for the background task to exit.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<B: SessionBackend + 'static> Drop for AuthHook<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn observe<B: SessionBackend + 'static>(
    manager: Arc<SessionManager<B>>,
    session_id: String,
    tx: watch::Sender<AuthSnapshot>,
    mut events: broadcast::Receiver<SessionEvent>,
    cancel: CancellationToken,
) {
    let user = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        user = manager.load_user(&session_id) => user,
    };
    if cancel.is_cancelled() {
        return;
    }
    tx.send_replace(AuthSnapshot {
        user,
        loading: false,
    });

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        let user = match event {
            Ok(SessionEvent { session_id: id, kind }) if id == session_id => match kind {
                SessionEventKind::UserLoaded(user) => Some(user),
                SessionEventKind::UserUnloaded => None,
            },
            Ok(_) => continue,
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "auth hook lagged, reloading user");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    user = manager.load_user(&session_id) => user,
                }
            }
            Err(RecvError::Closed) => break,
        };

        tx.send_if_modified(|snapshot| {
            if snapshot.user == user {
                return false;
            }
            snapshot.user = user;
            true
        });
    }

    tracing::debug!("auth hook stopped");
}
