use reqwest::Method;
use serde_json::json;

use crate::client::chat::FetchTicket;
use crate::client::constants::MESSAGES_ENDPOINT;
use crate::client::context::AppContext;
use crate::client::error::{ClientError, ClientResult};
use crate::client::models::{Message, MessageResponse, MessagesResponse};

/* Message operations.
 * History fetches go through the chat controller's ticket so a response
 * that resolves after the user switched conversations is discarded
 * rather than replacing the current list.
 */
impl AppContext {
    pub async fn send_message(&self, receiver_id: &str, text: &str) -> ClientResult<Message> {
        if text.trim().is_empty() {
            return Err(ClientError::Validation(
                "Message cannot be empty".to_string(),
            ));
        }

        let body = json!({ "receiverId": receiver_id, "message": text });
        let value = self
            .http
            .send(Method::POST, MESSAGES_ENDPOINT, &body)
            .await?;
        let response: MessageResponse = serde_json::from_value(value)?;
        Ok(response.message)
    }

    // Opens a conversation: fetches its history and replaces the message
    // list wholesale, unless the active conversation changed meanwhile.
    // A stale fetch yields Ok(None) so callers never render a discarded
    // conversation's history.
    pub async fn open_conversation(&self, receiver_id: &str) -> ClientResult<Option<Vec<Message>>> {
        let ticket = self.chat.open(receiver_id);

        let endpoint = format!("{MESSAGES_ENDPOINT}/{receiver_id}");
        let value = self.http.get(&endpoint, &[]).await?;
        let response: MessagesResponse = serde_json::from_value(value)?;

        Ok(self.apply_history(&ticket, response.messages))
    }

    // Refreshes the open conversation after a send; same staleness rule.
    pub async fn refresh_conversation(&self) -> ClientResult<Option<Vec<Message>>> {
        match self.chat.active_receiver() {
            Some(receiver_id) => self.open_conversation(&receiver_id).await,
            None => Err(ClientError::Validation(
                "No conversation is open".to_string(),
            )),
        }
    }

    // Commits fetched history through the ticket; None when the active
    // conversation changed while the fetch was in flight.
    fn apply_history(&self, ticket: &FetchTicket, messages: Vec<Message>) -> Option<Vec<Message>> {
        if self.chat.commit(ticket, &self.store, messages.clone()) {
            Some(messages)
        } else {
            None
        }
    }
}
