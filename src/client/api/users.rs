use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::json;
use tokio::sync::watch;

use crate::client::cache::{QueryKey, QueryState, Tag};
use crate::client::constants::{
    PASSWORD_MIN_LEN, USERS_ENDPOINT, USERS_LOGIN_ENDPOINT, USERS_ME_ENDPOINT,
    USERS_REGISTER_ENDPOINT, USERS_UPDATE_AVATAR_ENDPOINT, USERS_UPDATE_PWD_ADMIN_ENDPOINT,
    USERS_UPDATE_PWD_ENDPOINT, USERS_UPDATE_ROLE_ENDPOINT,
};
use crate::client::context::AppContext;
use crate::client::error::{ClientError, ClientResult};
use crate::client::models::{
    DeleteResponse, LoginResponse, Role, User, UserResponse, UsersResponse,
};

/* User operations.
 * Validation failures are raised before any network call. Successful
 * responses that carry the session user are projected into the session
 * state (one-way: cache success -> state write).
 */
impl AppContext {
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: Option<&str>,
    ) -> ClientResult<User> {
        if name.trim().is_empty() || email.trim().is_empty() || password.len() < PASSWORD_MIN_LEN {
            return Err(ClientError::Validation(
                "Please fill all fields correctly (Password min 6 chars)".to_string(),
            ));
        }

        let body = json!({ "name": name, "email": email, "password": password, "phone": phone });
        let value = self
            .http
            .send(Method::POST, USERS_REGISTER_ENDPOINT, &body)
            .await?;
        let response: UserResponse = serde_json::from_value(value)?;
        Ok(response.user)
    }

    // Login success persists the token for 7 days, installs the session
    // user, and brings the realtime channel up.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        if email.trim().is_empty() || password.len() < PASSWORD_MIN_LEN {
            return Err(ClientError::Validation(
                "Please enter valid credentials".to_string(),
            ));
        }

        let body = json!({ "email": email, "password": password });
        let value = self
            .http
            .send(Method::POST, USERS_LOGIN_ENDPOINT, &body)
            .await?;
        let response: LoginResponse = serde_json::from_value(value)?;

        self.tokens().save(&response.access_token)?;
        self.store.set_user(response.user.clone());
        if let Err(e) = self.connect_realtime().await {
            log::warn!("Realtime channel unavailable after login: {e}");
        }

        Ok(response.user)
    }

    // Session bootstrap: resolves who-am-I from the persisted token
    // before the first render, so the access gates see a settled state.
    pub async fn load_user(&self) -> ClientResult<User> {
        let value = self.http.get(USERS_ME_ENDPOINT, &[]).await?;
        let response: UserResponse = serde_json::from_value(value)?;

        self.store.set_user(response.user.clone());
        if let Err(e) = self.connect_realtime().await {
            log::warn!("Realtime channel unavailable: {e}");
        }

        Ok(response.user)
    }

    pub async fn get_user_by_id(&self, id: &str) -> ClientResult<User> {
        let endpoint = format!("{USERS_ENDPOINT}/{id}");
        let value = self
            .cache
            .query_with(QueryKey::bare(&endpoint), &[], || async {
                self.http.get(&endpoint, &[]).await
            })
            .await?;
        let response: UserResponse = serde_json::from_value(value)?;
        Ok(response.user)
    }

    pub async fn update_user_info(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        active: bool,
    ) -> ClientResult<User> {
        let body = json!({ "name": name, "email": email, "phone": phone, "active": active });
        let value = self.http.send(Method::PATCH, USERS_ENDPOINT, &body).await?;
        let response: UserResponse = serde_json::from_value(value)?;

        self.store.set_user(response.user.clone());
        Ok(response.user)
    }

    pub async fn update_user_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> ClientResult<User> {
        if new_password.len() < PASSWORD_MIN_LEN {
            return Err(ClientError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let body = json!({ "oldPassword": old_password, "newPassword": new_password });
        let value = self
            .http
            .send(Method::PATCH, USERS_UPDATE_PWD_ENDPOINT, &body)
            .await?;
        let response: UserResponse = serde_json::from_value(value)?;
        Ok(response.user)
    }

    pub async fn update_user_avatar(&self, file_path: &Path) -> ClientResult<User> {
        let bytes = tokio::fs::read(file_path).await?;
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".to_string());
        let form = Form::new().part("avatar", Part::bytes(bytes).file_name(file_name));

        let value = self
            .http
            .send_multipart(USERS_UPDATE_AVATAR_ENDPOINT, form)
            .await?;
        let response: UserResponse = serde_json::from_value(value)?;

        self.store.set_user(response.user.clone());
        Ok(response.user)
    }

    // Admin list. Provides the User tag and projects into session state.
    pub async fn all_users(&self) -> ClientResult<Vec<User>> {
        let value = self
            .cache
            .query_with(QueryKey::bare(USERS_ENDPOINT), &[Tag::User], || async {
                self.http.get(USERS_ENDPOINT, &[]).await
            })
            .await?;
        let response: UsersResponse = serde_json::from_value(value)?;

        self.store.set_all_users(response.users.clone());
        Ok(response.users)
    }

    // Mounted variant of the admin list for the user-list page.
    pub fn watch_all_users(&self) -> watch::Receiver<QueryState> {
        let http = self.http.clone();
        self.cache.watch_query(
            QueryKey::bare(USERS_ENDPOINT),
            vec![Tag::User],
            move || {
                let http = http.clone();
                async move { http.get(USERS_ENDPOINT, &[]).await }
            },
        )
    }

    pub async fn update_user_role(&self, user_id: &str, role: Role) -> ClientResult<User> {
        let body = json!({ "userId": user_id, "role": role });
        let value = self
            .cache
            .mutate_with(&[Tag::User], || async {
                self.http
                    .send(Method::PATCH, USERS_UPDATE_ROLE_ENDPOINT, &body)
                    .await
            })
            .await?;
        let response: UserResponse = serde_json::from_value(value)?;
        Ok(response.user)
    }

    pub async fn update_user_password_by_admin(
        &self,
        user_id: &str,
        new_password: &str,
    ) -> ClientResult<User> {
        if new_password.len() < PASSWORD_MIN_LEN {
            return Err(ClientError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let body = json!({ "userId": user_id, "newPassword": new_password });
        let value = self
            .http
            .send(Method::PATCH, USERS_UPDATE_PWD_ADMIN_ENDPOINT, &body)
            .await?;
        let response: UserResponse = serde_json::from_value(value)?;
        Ok(response.user)
    }

    pub async fn delete_user(&self, id: &str) -> ClientResult<String> {
        let endpoint = format!("{USERS_ENDPOINT}/{id}");
        let value = self
            .cache
            .mutate_with(&[Tag::User], || async { self.http.delete(&endpoint).await })
            .await?;
        let response: DeleteResponse = serde_json::from_value(value)?;
        Ok(response.message)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::context::tests::test_context;
    use crate::client::error::ClientError;

    #[tokio::test]
    async fn test_register_rejects_short_password_without_network() {
        let app = test_context();
        let result = app.register("Aye", "aye@example.com", "12345", None).await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name() {
        let app = test_context();
        let result = app.register("  ", "aye@example.com", "123456", None).await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn test_login_rejects_short_password_without_network() {
        let app = test_context();
        let result = app.login("aye@example.com", "12345").await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }
}
