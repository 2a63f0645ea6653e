use std::sync::Arc;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message as WsFrame;

use super::error::ClientResult;
use super::models::Message;
use super::store::Store;

// Inbound events pushed by the backend. Delivery is best-effort,
// at-most-once; there is no acknowledgment and no deduplication.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers(Vec<String>),
    #[serde(rename = "newMessage")]
    NewMessage(Message),
}

/* Realtime channel.
 * One websocket per authenticated session, opened with the user id as a
 * connection parameter. Pushed events bypass the cache and write
 * directly into the message/presence state. The handle owns the reader
 * task; closing it (the logout transition does this explicitly) tears
 * the connection down.
 */
#[derive(Debug)]
pub struct RealtimeChannel {
    task: JoinHandle<()>,
}

impl RealtimeChannel {
    pub async fn connect(ws_url: &str, user_id: &str, store: Arc<Store>) -> ClientResult<Self> {
        let url = format!("{}/?userId={}", ws_url.trim_end_matches('/'), user_id);
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        log::info!("Realtime channel connected for user {user_id}");

        let task = tokio::spawn(async move {
            let mut socket = socket;
            while let Some(frame) = socket.next().await {
                match frame {
                    Ok(WsFrame::Text(text)) => apply_event(&store, &text),
                    Ok(WsFrame::Close(_)) => {
                        log::info!("Realtime channel closed by server");
                        break;
                    }
                    // Control frames are handled by the transport.
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("Realtime channel read failed: {e}");
                        break;
                    }
                }
            }
        });

        Ok(Self { task })
    }

    pub fn close(&self) {
        log::info!("Closing realtime channel");
        self.task.abort();
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// Decodes one pushed frame and applies it to the store. Unknown events
// are logged and dropped.
fn apply_event(store: &Store, text: &str) {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(ServerEvent::OnlineUsers(ids)) => {
            log::debug!("Presence snapshot: {} online", ids.len());
            store.set_online_user_ids(ids);
        }
        Ok(ServerEvent::NewMessage(message)) => {
            log::debug!("Message pushed: {}", message.id);
            store.push_message(message);
        }
        Err(e) => log::debug!("Ignoring unknown realtime event: {e}"),
    }
}
