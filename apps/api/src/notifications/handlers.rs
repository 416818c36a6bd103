use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::session::{ClientCommand, DashboardSession, ServerMessage, SessionEvent};
use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::notification::Notification;
use crate::state::AppState;

const HEARTBEAT_INTERVAL_SECS: u64 = 30;

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// GET /api/v1/notifications
pub async fn handle_list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.store.list_notifications_for(auth.user_id).await?))
}

/// GET /api/v1/notifications/unread-count
pub async fn handle_unread_count(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let unread_count = state.store.count_unread(auth.user_id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

/// POST /api/v1/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let marked = state
        .store
        .mark_notification_read(id, auth.user_id, auth.is_admin())
        .await?;
    if !marked {
        return Err(AppError::NotFound(format!("Notification {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn handle_mark_all_read(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let updated = state.store.mark_all_notifications_read(auth.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

#[derive(Debug, Deserialize)]
pub struct WsAuthParams {
    pub token: String,
}

/// GET /api/v1/notifications/ws?token=<jwt>
///
/// The session is opened before the upgrade, so a bad token or a failed
/// initial load is an ordinary HTTP error rather than a dropped socket.
pub async fn handle_notifications_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsAuthParams>,
) -> Result<impl IntoResponse, AppError> {
    let auth = AuthContext::from_token(&state, &params.token).await?;
    let user_id = auth.user_id;
    let session = DashboardSession::open(auth, state.store.clone(), &state.changes).await?;
    info!(%user_id, "notification socket accepted");
    Ok(ws.on_upgrade(move |socket| run_socket(socket, session)))
}

/// Liveness tracking for one socket: every ping must be answered before the next tick.
#[derive(Debug, Default)]
struct Heartbeat {
    awaiting_pong: bool,
}

impl Heartbeat {
    /// Returns false when the previous ping went unanswered.
    fn on_tick(&mut self) -> bool {
        if self.awaiting_pong {
            return false;
        }
        self.awaiting_pong = true;
        true
    }

    fn on_pong(&mut self) {
        self.awaiting_pong = false;
    }
}

async fn run_socket(socket: WebSocket, mut session: DashboardSession) {
    let (mut sender, mut receiver) = socket.split();

    if send(&mut sender, &session.snapshot()).await.is_err() {
        debug!("client left before the snapshot was sent");
        return;
    }

    let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    heartbeat.tick().await;
    let mut liveness = Heartbeat::default();

    loop {
        let outgoing = tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => session.handle_command(command).await,
                    Err(e) => vec![ServerMessage::Error {
                        code: "VALIDATION_ERROR",
                        message: format!("Unrecognised message: {e}"),
                    }],
                },
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                    continue;
                }
                Some(Ok(Message::Pong(_))) => {
                    liveness.on_pong();
                    continue;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("WebSocket error: {e}");
                    break;
                }
                Some(Ok(_)) => continue,
            },
            event = session.next_event() => {
                if matches!(event, SessionEvent::Closed) {
                    warn!("change feed closed, ending notification socket");
                    break;
                }
                session.handle_event(event).await
            }
            _ = heartbeat.tick() => {
                if !liveness.on_tick() {
                    info!("no pong since the last ping, closing notification socket");
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
                continue;
            }
        };

        for message in &outgoing {
            if send(&mut sender, message).await.is_err() {
                debug!("client disconnected mid-send");
                return;
            }
        }
    }

    let _ = sender.close().await;
    debug!("notification socket closed");
}

async fn send<S>(sender: &mut S, message: &ServerMessage) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(message) {
        Ok(text) => sender.send(Message::Text(text)).await,
        Err(e) => {
            warn!("failed to encode server message: {e}");
            Ok(())
        }
    }
}
