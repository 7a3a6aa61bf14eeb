//! GET /auth/events

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;

use crate::session::hook::AuthHook;
use crate::session::middleware::SessionHandle;

/// Stream the session's auth state as `auth` events.
///
/// Each connection mounts one hook. The first event is sent once the initial
/// user fetch settles; later events follow sign-in, refresh and sign-out.
/// A disconnecting client drops the stream and with it the hook.
pub async fn auth_events(
    State(state): State<Arc<crate::AppState>>,
    session: SessionHandle,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let hook = AuthHook::mount(state.sessions.clone(), session.id.clone());

    let events = stream::unfold((hook, true), |(mut hook, first)| async move {
        let snapshot = if first {
            hook.loaded().await
        } else {
            hook.changed().await?
        };
        let event = match Event::default().event("auth").json_data(&snapshot) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("auth event encoding failed: {}", e);
                return None;
            }
        };
        Some((Ok(event), (hook, false)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
