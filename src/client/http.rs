use reqwest::header;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;

use super::error::{ClientError, ClientResult};
use super::models::ErrorResponse;
use super::token::TokenStore;

/* HTTP transport.
 * Thin wrapper over reqwest: prefixes the configured base URL, attaches
 * the bearer token when one is persisted, and decodes backend failure
 * bodies into their message field. A missing token is not an error here;
 * the backend answers with 401/403 and that surfaces like any request
 * failure.
 */
#[derive(Debug, Clone)]
pub struct Http {
    client: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl Http {
    pub fn new(base_url: &str, tokens: TokenStore) -> ClientResult<Self> {
        let mut h = header::HeaderMap::new();
        h.insert(
            "Accept",
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder().default_headers(h).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some(token) = self.tokens.load() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    pub async fn get(&self, path: &str, query: &[(String, String)]) -> ClientResult<Value> {
        log::debug!("GET {path}");
        let response = self.builder(Method::GET, path).query(query).send().await?;
        decode(response).await
    }

    pub async fn send(&self, method: Method, path: &str, body: &Value) -> ClientResult<Value> {
        log::debug!("{method} {path}");
        let response = self.builder(method, path).json(body).send().await?;
        decode(response).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<Value> {
        log::debug!("DELETE {path}");
        let response = self.builder(Method::DELETE, path).send().await?;
        decode(response).await
    }

    pub async fn send_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ClientResult<Value> {
        log::debug!("PATCH {path} (multipart)");
        let response = self
            .builder(Method::PATCH, path)
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }
}

// Success bodies decode as-is; failure bodies surface their message field.
async fn decode(response: Response) -> ClientResult<Value> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) => Err(ClientError::Api(error.message)),
        Err(_) => Err(ClientError::Transport(format!(
            "Unexpected response: HTTP {status}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_message_extracted() {
        let body = r#"{"success": false, "message": "Invalid credentials"}"#;
        let error: ErrorResponse = serde_json::from_str(body).unwrap();
        assert!(!error.success);
        assert_eq!(error.message, "Invalid credentials");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let tokens = TokenStore::new(std::env::temp_dir().join("expensio-http-test.json"));
        let http = Http::new("http://localhost:5000/api/", tokens).unwrap();
        assert_eq!(http.base_url, "http://localhost:5000/api");
    }
}
