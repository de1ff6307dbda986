//! services/api/src/web/ws_handler.rs
//!
//! Live lesson generation over a WebSocket. The client sends one screenshot as a
//! binary frame and receives progress updates until the lesson is ready.
//! Sending `{"type":"cancel"}` or closing the socket abandons the run.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tutorial_core::{GenerationRun, Lesson, PipelineError, PipelineStatus, RawImage};

type WsSender = SplitSink<WebSocket, Message>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");
    let (mut sender, mut receiver) = socket.split();

    // --- 1. Wait for the screenshot ---
    let Some(raw) = receive_screenshot(&mut sender, &mut receiver).await else {
        return;
    };

    // --- 2. Run the pipeline in the background ---
    let run = Arc::new(GenerationRun::new());
    let mut updates = run.subscribe();
    let task = {
        let pipeline = app_state.pipeline.clone();
        let run = run.clone();
        tokio::spawn(async move { pipeline.run_with(raw, &run).await })
    };

    // --- 3. Forward progress until the run settles ---
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = updates.borrow_and_update().clone();
                if status.is_terminal() {
                    break;
                }
                if send_message(&mut sender, &ServerMessage::status(&status)).await.is_err() {
                    warn!("Client stopped listening. Cancelling generation.");
                    run.cancel();
                    let _ = task.await;
                    return;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Cancel) => {
                        info!("Client requested cancellation.");
                        run.cancel();
                    }
                    Err(e) => warn!("Ignoring unrecognized client message: {}", e),
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    info!("Client disconnected. Cancelling generation.");
                    run.cancel();
                    let _ = task.await;
                    return;
                }
                Some(Ok(_)) => {}
            }
        }
    }

    // --- 4. Report the outcome ---
    let final_message = match task.await {
        Ok(result) => outcome_message(result),
        Err(e) => {
            error!("Generation task panicked: {:?}", e);
            ServerMessage::Failed {
                message: PipelineStatus::Failed {
                    reason: e.to_string(),
                }
                .message(),
            }
        }
    };
    if send_message(&mut sender, &final_message).await.is_err() {
        warn!("Failed to deliver the final generation message.");
    }
    let _ = sender.close().await;
}

/// Reads frames until the client sends a binary screenshot. Returns `None` when the
/// client goes away or cancels first.
async fn receive_screenshot(
    sender: &mut WsSender,
    receiver: &mut SplitStream<WebSocket>,
) -> Option<RawImage> {
    while let Some(incoming) = receiver.next().await {
        match incoming {
            Ok(Message::Binary(data)) => return Some(RawImage::from_bytes(data.to_vec(), None)),
            Ok(Message::Text(text)) => {
                if let Ok(ClientMessage::Cancel) = serde_json::from_str::<ClientMessage>(&text) {
                    info!("Client cancelled before sending a screenshot.");
                    let _ = send_message(sender, &ServerMessage::Cancelled).await;
                    return None;
                }
                let err_msg = ServerMessage::Error {
                    message: "Send the screenshot as a binary message.".to_string(),
                };
                if send_message(sender, &err_msg).await.is_err() {
                    return None;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error while waiting for the screenshot: {}", e);
                return None;
            }
        }
    }
    info!("Client disconnected before sending a screenshot.");
    None
}

fn outcome_message(result: Result<Lesson, PipelineError>) -> ServerMessage {
    match result {
        Ok(lesson) => ServerMessage::Ready {
            lesson_id: lesson.id,
            has_video: lesson.video_url.is_some(),
        },
        Err(PipelineError::Cancelled) => ServerMessage::Cancelled,
        Err(e @ PipelineError::Encoding(_)) => ServerMessage::Failed {
            message: e.to_string(),
        },
        Err(e) => ServerMessage::Failed {
            message: PipelineStatus::Failed {
                reason: e.to_string(),
            }
            .message(),
        },
    }
}

async fn send_message(sender: &mut WsSender, msg: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
