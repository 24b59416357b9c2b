use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const ROOM_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub job_id: String,
    pub sender_id: String,
    pub text: String,
}

/// Frames a websocket client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        #[serde(rename = "jobId")]
        job_id: String,
    },
    SendMessage(ChatMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    ReceiveMessage(ChatMessage),
}

/// One broadcast room per job.
#[derive(Debug, Default)]
pub struct ChatHub {
    rooms: DashMap<String, broadcast::Sender<ChatMessage>>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, job_id: &str) -> broadcast::Receiver<ChatMessage> {
        self.rooms
            .entry(job_id.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Relays the message unmodified to everyone in its room. Returns how many
    /// receivers got it.
    pub fn publish(&self, message: ChatMessage) -> usize {
        let Some(room) = self.rooms.get(&message.job_id) else {
            tracing::debug!("no listeners in room {}", &message.job_id);
            return 0;
        };
        room.send(message).unwrap_or(0)
    }

    /// Drops rooms nobody listens to anymore.
    pub fn prune(&self) {
        self.rooms.retain(|_, tx| tx.receiver_count() > 0);
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(job: &str, text: &str) -> ChatMessage {
        ChatMessage {
            job_id: job.into(),
            sender_id: "507f1f77bcf86cd799439012".into(),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn test_room_isolation() {
        let hub = ChatHub::new();
        let mut a = hub.join("job-a");
        let mut b = hub.join("job-b");

        assert_eq!(hub.publish(message("job-a", "hello")), 1);
        assert_eq!(a.recv().await.unwrap(), message("job-a", "hello"));
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_room() {
        let hub = ChatHub::new();
        assert_eq!(hub.publish(message("nobody", "hi")), 0);
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn test_prune_drops_empty_rooms() {
        let hub = ChatHub::new();
        let rx = hub.join("job-a");
        hub.prune();
        assert_eq!(hub.room_count(), 1);
        drop(rx);
        hub.prune();
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let join: ClientEvent =
            serde_json::from_str(r#"{"event":"joinRoom","data":{"jobId":"j1"}}"#).unwrap();
        assert_eq!(join, ClientEvent::JoinRoom { job_id: "j1".into() });

        let send: ClientEvent = serde_json::from_str(
            r#"{"event":"sendMessage","data":{"jobId":"j1","senderId":"u1","text":"hey"}}"#,
        )
        .unwrap();
        assert!(matches!(send, ClientEvent::SendMessage(ref m) if m.text == "hey"));

        let out = serde_json::to_value(ServerEvent::ReceiveMessage(message("j1", "hey"))).unwrap();
        assert_eq!(out["event"], "receiveMessage");
        assert_eq!(out["data"]["jobId"], "j1");
    }
}
