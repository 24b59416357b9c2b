use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension, Json,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc,
    },
    task::JoinHandle,
};

use crate::{
    pkg::{
        internal::{
            adaptors::messages::{
                mutators::MessageMutator, selectors::MessageSelector, spec::MessageEntry,
            },
            auth::User,
            chat::{ChatHub, ChatMessage, ClientEvent, ServerEvent},
            validation::ensure_object_id,
        },
        server::state::{AppState, GetTxn},
    },
    prelude::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct PostMessageInput {
    pub text: String,
}

/// Rejects a bad job id or a blank message. Accepted text is kept as sent.
fn check_message(job_id: &str, text: &str) -> Result<()> {
    ensure_object_id(job_id, "jobId")?;
    if text.trim().is_empty() {
        return Err(AppError::field("text", "Message text is required"));
    }
    Ok(())
}

/// Persists a message and relays it to the job's room.
pub(crate) async fn store_message(
    state: &AppState,
    job_id: &str,
    sender_id: &str,
    text: &str,
) -> Result<MessageEntry> {
    check_message(job_id, text)?;
    let mut tx = state.db_pool.begin_txn().await?;
    let entry = MessageMutator::new(&mut tx)
        .create(job_id, sender_id, text)
        .await?;
    tx.commit().await?;
    state.chat.publish(ChatMessage {
        job_id: entry.job_id.clone(),
        sender_id: entry.sender_id.clone(),
        text: entry.text.clone(),
    });
    Ok(entry)
}

pub(crate) async fn load_history(state: &AppState, job_id: &str) -> Result<Vec<MessageEntry>> {
    ensure_object_id(job_id, "jobId")?;
    let mut conn = state.db_pool.acquire().await?;
    MessageSelector::new(&mut conn).get_for_job(job_id).await
}

pub async fn history(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<MessageEntry>>> {
    Ok(Json(load_history(&state, &job_id).await?))
}

pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<Arc<User>>,
    Path(job_id): Path<String>,
    Json(input): Json<PostMessageInput>,
) -> Result<(StatusCode, Json<MessageEntry>)> {
    let entry = store_message(&state, &job_id, &user.user_id, &input.text).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn ws(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| relay(state.chat.clone(), socket))
}

fn forward(
    mut room: broadcast::Receiver<ChatMessage>,
    out: mpsc::UnboundedSender<ChatMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match room.recv().await {
                Ok(message) => {
                    if out.send(message).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::warn!("socket fell behind by {} messages", n),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn relay(hub: Arc<ChatHub>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (out, mut inbox) = mpsc::unbounded_channel::<ChatMessage>();
    let writer = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            let Ok(frame) = serde_json::to_string(&ServerEvent::ReceiveMessage(message)) else {
                continue;
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut joined: HashMap<String, JoinHandle<()>> = HashMap::new();
    while let Some(Ok(frame)) = stream.next().await {
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        match serde_json::from_str::<ClientEvent>(text.as_str()) {
            Ok(ClientEvent::JoinRoom { job_id }) => {
                if !joined.contains_key(&job_id) {
                    tracing::debug!("socket joined room {}", &job_id);
                    let handle = forward(hub.join(&job_id), out.clone());
                    joined.insert(job_id, handle);
                }
            }
            Ok(ClientEvent::SendMessage(message)) => {
                let delivered = hub.publish(message);
                tracing::debug!("relayed message to {} sockets", delivered);
            }
            Err(e) => tracing::debug!("ignoring frame: {}", e),
        }
    }

    for (_, handle) in joined {
        handle.abort();
    }
    writer.abort();
    hub.prune();
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::internal::validation::new_object_id;

    #[test]
    fn test_check_message_rejects_blank_text() {
        let job_id = new_object_id();
        for text in ["", "   ", "\n\t"] {
            match check_message(&job_id, text) {
                Err(AppError::Validation(fields)) => {
                    assert_eq!(fields["text"], "Message text is required")
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(matches!(
            check_message("nope", "hello"),
            Err(AppError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_check_message_accepts_padded_text() {
        assert!(check_message(&new_object_id(), "  hello  ").is_ok());
    }

    #[traced_test]
    #[tokio::test]
    async fn test_forward_relays_room_messages() {
        let hub = ChatHub::default();
        let (out, mut inbox) = mpsc::unbounded_channel();
        let handle = forward(hub.join("job-1"), out);
        let sent = ChatMessage {
            job_id: "job-1".into(),
            sender_id: "u1".into(),
            text: "  spaced out  ".into(),
        };
        hub.publish(sent.clone());
        assert_eq!(inbox.recv().await, Some(sent));
        handle.abort();
    }
}
