use std::sync::Mutex;

use super::models::Message;
use super::store::Store;

#[derive(Debug, Default)]
struct Active {
    receiver_id: Option<String>,
    generation: u64,
}

// Issued when a conversation opens; a history fetch carries it to
// completion and commits only if it is still the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub receiver_id: String,
    generation: u64,
}

/* Conversation controller.
 * Tracks which conversation is active. Switching conversations does not
 * cancel an in-flight history fetch for the previous one, so each fetch
 * captures a ticket at dispatch; a response arriving after the active
 * conversation changed is discarded instead of replacing the current
 * list.
 */
#[derive(Debug, Default)]
pub struct ChatController {
    active: Mutex<Active>,
}

impl ChatController {
    pub fn new() -> Self {
        Self::default()
    }

    // Marks the conversation active and issues the fetch ticket.
    pub fn open(&self, receiver_id: &str) -> FetchTicket {
        let mut active = self.active.lock().unwrap();
        active.receiver_id = Some(receiver_id.to_string());
        active.generation += 1;
        FetchTicket {
            receiver_id: receiver_id.to_string(),
            generation: active.generation,
        }
    }

    pub fn active_receiver(&self) -> Option<String> {
        self.active.lock().unwrap().receiver_id.clone()
    }

    // Applies fetched history to the store, unless the conversation has
    // switched since the ticket was issued.
    pub fn commit(&self, ticket: &FetchTicket, store: &Store, messages: Vec<Message>) -> bool {
        let active = self.active.lock().unwrap();
        if active.generation != ticket.generation {
            log::debug!(
                "Discarding stale history for {} (conversation switched)",
                ticket.receiver_id
            );
            return false;
        }
        store.set_messages(messages);
        true
    }

    // Leaving the chat view; any outstanding fetch becomes stale.
    pub fn leave(&self) {
        let mut active = self.active.lock().unwrap();
        active.receiver_id = None;
        active.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn history_for(receiver: &str) -> Vec<Message> {
        vec![Message {
            id: format!("m-{receiver}"),
            sender_id: receiver.to_string(),
            receiver_id: "me".to_string(),
            message: "hello".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }]
    }

    #[test]
    fn test_delayed_response_for_previous_conversation_discarded() {
        let chat = ChatController::new();
        let store = Store::new();

        let ticket_a = chat.open("a");
        let ticket_b = chat.open("b");

        // B's history lands first, then A's delayed response resolves.
        assert!(chat.commit(&ticket_b, &store, history_for("b")));
        assert!(!chat.commit(&ticket_a, &store, history_for("a")));

        let state = store.message_state();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].id, "m-b");
    }

    #[test]
    fn test_reopening_same_conversation_invalidates_old_ticket() {
        let chat = ChatController::new();
        let store = Store::new();

        let stale = chat.open("a");
        let fresh = chat.open("a");

        assert!(!chat.commit(&stale, &store, history_for("a")));
        assert!(chat.commit(&fresh, &store, history_for("a")));
    }

    #[test]
    fn test_leave_makes_outstanding_fetch_stale() {
        let chat = ChatController::new();
        let store = Store::new();

        let ticket = chat.open("a");
        chat.leave();

        assert!(!chat.commit(&ticket, &store, history_for("a")));
        assert!(chat.active_receiver().is_none());
        assert!(store.message_state().messages.is_empty());
    }
}
