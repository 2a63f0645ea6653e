use reqwest::Method;
use serde_json::json;
use tokio::sync::watch;

use crate::client::cache::{QueryKey, QueryState, Tag};
use crate::client::constants::CATEGORIES_ENDPOINT;
use crate::client::context::AppContext;
use crate::client::error::{ClientError, ClientResult};
use crate::client::models::{
    CategoriesResponse, Category, CategoryResponse, DeleteResponse, ExpenseType,
};

/* Category operations.
 * All mutations invalidate the Category tag; the list query provides it,
 * so every mounted category list refetches after a successful write.
 */
impl AppContext {
    pub async fn create_category(
        &self,
        title: &str,
        description: Option<&str>,
        expense_type: ExpenseType,
    ) -> ClientResult<Category> {
        if title.trim().is_empty() {
            return Err(ClientError::Validation("Title is required".to_string()));
        }

        let body = json!({
            "title": title,
            "description": description,
            "type": expense_type,
        });
        let value = self
            .cache
            .mutate_with(&[Tag::Category], || async {
                self.http
                    .send(Method::POST, CATEGORIES_ENDPOINT, &body)
                    .await
            })
            .await?;
        let response: CategoryResponse = serde_json::from_value(value)?;
        Ok(response.category)
    }

    // The type is fixed at creation; updates only carry title and
    // description.
    pub async fn update_category(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
    ) -> ClientResult<Category> {
        if title.trim().is_empty() {
            return Err(ClientError::Validation("Title is required".to_string()));
        }

        let endpoint = format!("{CATEGORIES_ENDPOINT}/{id}");
        let body = json!({ "title": title, "description": description });
        let value = self
            .cache
            .mutate_with(&[Tag::Category], || async {
                self.http.send(Method::PATCH, &endpoint, &body).await
            })
            .await?;
        let response: CategoryResponse = serde_json::from_value(value)?;
        Ok(response.category)
    }

    pub async fn categories(&self) -> ClientResult<Vec<Category>> {
        let value = self
            .cache
            .query_with(
                QueryKey::bare(CATEGORIES_ENDPOINT),
                &[Tag::Category],
                || async { self.http.get(CATEGORIES_ENDPOINT, &[]).await },
            )
            .await?;
        let response: CategoriesResponse = serde_json::from_value(value)?;
        Ok(response.categories)
    }

    // Mounted category list for the category page.
    pub fn watch_categories(&self) -> watch::Receiver<QueryState> {
        let http = self.http.clone();
        self.cache.watch_query(
            QueryKey::bare(CATEGORIES_ENDPOINT),
            vec![Tag::Category],
            move || {
                let http = http.clone();
                async move { http.get(CATEGORIES_ENDPOINT, &[]).await }
            },
        )
    }

    pub async fn delete_category(&self, id: &str) -> ClientResult<String> {
        let endpoint = format!("{CATEGORIES_ENDPOINT}/{id}");
        let value = self
            .cache
            .mutate_with(&[Tag::Category], || async {
                self.http.delete(&endpoint).await
            })
            .await?;
        let response: DeleteResponse = serde_json::from_value(value)?;
        Ok(response.message)
    }
}
