use crate::presentation::http::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

/// Streams moderation events (approved, rejected, requeued, dead-lettered) as JSON text frames.
pub async fn moderation_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| async move {
        let (mut sender, _) = socket.split();
        let mut rx = state.ws_broadcaster.subscribe();
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "moderation stream subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
