use std::collections::HashSet;

use tokio::sync::watch;

use super::models::{Message, User};

// Session slice: the authenticated user plus the admin-visible user list.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    pub all_users: Vec<User>,
}

// Message slice: one conversation's history plus global presence.
#[derive(Debug, Clone, Default)]
pub struct MessageState {
    pub messages: Vec<Message>,
    pub online_user_ids: HashSet<String>,
}

/* Application state container.
 * Process-wide, owned by the application context and handed to
 * controllers by reference. All writes go through the reducer methods
 * below; readers observe snapshots or subscribe for changes.
 */
#[derive(Debug)]
pub struct Store {
    session: watch::Sender<SessionState>,
    message: watch::Sender<MessageState>,
}

impl Store {
    pub fn new() -> Self {
        let (session, _) = watch::channel(SessionState::default());
        let (message, _) = watch::channel(MessageState::default());
        Self { session, message }
    }

    /* Session reducers */

    pub fn set_user(&self, user: User) {
        self.session.send_modify(|state| state.user = Some(user));
    }

    pub fn set_all_users(&self, users: Vec<User>) {
        self.session.send_modify(|state| state.all_users = users);
    }

    // Logout path: drops the user and the admin list together.
    pub fn clear_user(&self) {
        self.session.send_modify(|state| {
            state.user = None;
            state.all_users.clear();
        });
    }

    pub fn session(&self) -> SessionState {
        self.session.borrow().clone()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /* Message reducers */

    // Wholesale replacement: switching conversations must not leak the
    // previous conversation's tail through an incremental merge.
    pub fn set_messages(&self, messages: Vec<Message>) {
        self.message.send_modify(|state| state.messages = messages);
    }

    // Live push appends regardless of which conversation is open; the
    // consuming view filters by the active conversation.
    pub fn push_message(&self, message: Message) {
        self.message
            .send_modify(|state| state.messages.push(message));
    }

    // A presence snapshot is a complete membership list, never a diff.
    pub fn set_online_user_ids(&self, ids: Vec<String>) {
        self.message
            .send_modify(|state| state.online_user_ids = ids.into_iter().collect());
    }

    pub fn message_state(&self) -> MessageState {
        self.message.borrow().clone()
    }

    pub fn subscribe_messages(&self) -> watch::Receiver<MessageState> {
        self.message.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
