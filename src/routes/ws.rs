//! WebSocket upgrade + message loop. Each connection owns one session, created on
//! connect and dropped on disconnect. Client messages are parsed as JSON and
//! forwarded to core logic; every applied intent is answered with a session snapshot.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug, warn};
use uuid::Uuid;

use crate::protocol::{ClientWsMessage, Intent, ServerWsMessage};
use crate::protocol::to_out;
use crate::logic::*;
use crate::state::{AppState, SharedSession};

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "madrasati_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let session = state.create_session().await;
  let id = session.lock().await.id();
  info!(target: "madrasati_backend", session = %id, "WebSocket connected");

  let hello = ServerWsMessage::Session { session: to_out(&*session.lock().await) };
  if send_json(&mut socket, &hello).await {
    while let Some(Ok(msg)) = socket.recv().await {
      match msg {
        Message::Text(txt) => {
          let keep_going = match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(incoming) => {
              debug!(target: "madrasati_backend", "WS received: {:?}", &incoming);
              handle_client_ws(&mut socket, incoming, &state, &session, id).await
            }
            Err(e) => {
              let reply = ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) };
              send_json(&mut socket, &reply).await
            }
          };
          if !keep_going {
            break;
          }
        }
        Message::Ping(payload) => {
          if let Err(e) = socket.send(Message::Pong(payload)).await {
            error!(target: "madrasati_backend", error = %e, "WS pong send error");
            break;
          }
        }
        Message::Close(_) => break,
        _ => {}
      }
    }
  }

  state.remove_session(id).await;
  info!(target: "madrasati_backend", session = %id, "WebSocket disconnected");
}

/// Handle one client message. Returns false once the socket can no longer be written.
#[instrument(level = "info", skip(socket, msg, state, session), fields(%id))]
async fn handle_client_ws(
  socket: &mut WebSocket,
  msg: ClientWsMessage,
  state: &AppState,
  session: &SharedSession,
  id: Uuid,
) -> bool {
  let intent = match msg {
    ClientWsMessage::Ping => return send_json(socket, &ServerWsMessage::Pong).await,
    ClientWsMessage::Intent { intent } => intent,
  };

  match transition(session, intent).await {
    Ok(Step::Done) => {}
    Ok(Step::Generate(call)) => {
      if !send_json(socket, &ServerWsMessage::Loading).await {
        return false;
      }
      run_generation(&state.generator, session, call).await;
    }
    Err(e) => {
      warn!(target: "navigation", session = %id, error = %e, "WS intent rejected");
      return send_json(socket, &ServerWsMessage::Error { message: e.to_string() }).await;
    }
  }

  let snapshot = ServerWsMessage::Session { session: to_out(&*session.lock().await) };
  send_json(socket, &snapshot).await
}

async fn transition(session: &SharedSession, intent: Intent) -> Result<Step, crate::navigation::NavError> {
  let mut guard = session.lock().await;
  apply_transition(&mut guard, intent)
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> bool {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });

  if let Err(e) = socket.send(Message::Text(out)).await {
    error!(target: "madrasati_backend", error = %e, "WS send error");
    return false;
  }
  true
}
