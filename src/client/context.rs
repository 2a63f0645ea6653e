use std::sync::Arc;

use tokio::sync::Mutex;

use super::cache::Cache;
use super::chat::ChatController;
use super::config::Config;
use super::error::{ClientError, ClientResult};
use super::http::Http;
use super::realtime::RealtimeChannel;
use super::store::Store;
use super::token::TokenStore;

/* Application context.
 * The single owned root of the client: configuration, transport, cache,
 * state container, chat controller, and the optional realtime channel.
 * Handed to UI controllers by reference; there are no ambient globals.
 */
pub struct AppContext {
    pub config: Config,
    pub http: Http,
    pub cache: Cache,
    pub store: Arc<Store>,
    pub chat: ChatController,
    realtime: Mutex<Option<RealtimeChannel>>,
}

impl AppContext {
    pub fn new(config: Config) -> ClientResult<Self> {
        let tokens = TokenStore::new(&config.token_file);
        let http = Http::new(&config.api_url, tokens)?;
        Ok(Self {
            config,
            http,
            cache: Cache::new(),
            store: Arc::new(Store::new()),
            chat: ChatController::new(),
            realtime: Mutex::new(None),
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        self.http.tokens()
    }

    // Opens the realtime channel for the current session. Idempotent:
    // a second call while a channel is up does nothing.
    pub async fn connect_realtime(&self) -> ClientResult<()> {
        let user_id = match self.store.session().user {
            Some(user) => user.id,
            None => return Err(ClientError::NoSession),
        };

        let mut slot = self.realtime.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        let channel =
            RealtimeChannel::connect(&self.config.ws_url, &user_id, self.store.clone()).await?;
        *slot = Some(channel);
        Ok(())
    }

    /* Logout transition.
     * Channel lifetime is scoped to session lifetime: the websocket is
     * closed first, then the persisted token is removed and the session
     * (user plus admin list) is cleared. The UI confirms with the user
     * before calling this.
     */
    pub async fn logout(&self) {
        if let Some(channel) = self.realtime.lock().await.take() {
            channel.close();
        }
        self.tokens().clear();
        self.store.clear_user();
        log::info!("Logged out");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::gates::{admin_required, Gate};
    use crate::client::models::Role;
    use crate::client::store::tests::sample_user;

    pub fn test_context() -> AppContext {
        let config = Config {
            api_url: "http://localhost:5000/api".to_string(),
            ws_url: "ws://localhost:5000".to_string(),
            token_file: std::env::temp_dir()
                .join(format!("expensio-ctx-{}.json", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
        };
        AppContext::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_logout_clears_session_token_and_admin_list() {
        let app = test_context();
        app.tokens().save("token123").unwrap();
        app.store.set_user(sample_user("u1", Role::Admin));
        app.store
            .set_all_users(vec![sample_user("u2", Role::Basic)]);

        app.logout().await;

        assert!(app.tokens().load().is_none());
        let session = app.store.session();
        assert!(session.user.is_none());
        assert!(session.all_users.is_empty());
        // Admin routes now bounce to login.
        assert_eq!(admin_required(&session), Gate::RedirectLogin);
    }

    #[tokio::test]
    async fn test_connect_realtime_requires_session() {
        let app = test_context();
        assert_eq!(
            app.connect_realtime().await,
            Err(ClientError::NoSession)
        );
    }
}
