//! WebSocket fan-out of derived state.
//!
//! Every subscriber gets the current snapshot on connect, then every
//! snapshot published after a mutation. Slow or closed subscribers drop
//! out silently.

use crate::app::App;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<App>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(socket: WebSocket, app: App) {
    let mut updates = app.updates.subscribe();
    let (mut sink, mut stream) = socket.split();

    let initial = {
        let state = app.state.lock().await;
        state.snapshot().to_string()
    };
    if sink.send(Message::Text(initial.into())).await.is_err() {
        return;
    }
    debug!("websocket subscriber connected");

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // Missing a frame is fine; the next one is a full snapshot.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(_)) => continue,
                _ => break,
            },
        }
    }
    debug!("websocket subscriber dropped");
}
