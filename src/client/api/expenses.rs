use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use tokio::sync::watch;

use crate::client::cache::{QueryKey, QueryState, Tag};
use crate::client::constants::{EXPENSES_ENDPOINT, EXPENSES_PAGE_LIMIT_DEFAULT};
use crate::client::context::AppContext;
use crate::client::error::{ClientError, ClientResult};
use crate::client::models::{
    DeleteResponse, Expense, ExpenseResponse, ExpensesResponse, ExpenseType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    Date,
    DateRange,
    Month,
}

impl DateFilter {
    fn as_str(&self) -> &'static str {
        match self {
            DateFilter::Date => "date",
            DateFilter::DateRange => "dateRange",
            DateFilter::Month => "month",
        }
    }
}

// List filter. Every distinct combination is its own cache entry; pages
// are independent, never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseQuery {
    pub expense_type: Option<ExpenseType>,
    pub category_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub filter_by: Option<DateFilter>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub month: Option<String>,
}

impl ExpenseQuery {
    pub fn first_page() -> Self {
        Self {
            page: Some(1),
            limit: Some(EXPENSES_PAGE_LIMIT_DEFAULT),
            ..Self::default()
        }
    }

    // Serialized request parameters, also the cache identity.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(expense_type) = self.expense_type {
            params.push(("type".to_string(), expense_type.as_str().to_string()));
        }
        if let Some(category_id) = &self.category_id {
            params.push(("categoryId".to_string(), category_id.clone()));
        }
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(filter_by) = self.filter_by {
            params.push(("filterBy".to_string(), filter_by.as_str().to_string()));
        }
        if let Some(date) = &self.date {
            params.push(("date".to_string(), date.clone()));
        }
        if let Some(start_date) = &self.start_date {
            params.push(("startDate".to_string(), start_date.clone()));
        }
        if let Some(end_date) = &self.end_date {
            params.push(("endDate".to_string(), end_date.clone()));
        }
        if let Some(month) = &self.month {
            params.push(("month".to_string(), month.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub description: String,
    pub remark: Option<String>,
    pub qty: u32,
    pub unit: Option<String>,
    pub amount: f64,
    pub category_id: Option<String>,
    pub date: DateTime<Utc>,
}

// Update payload. Deliberately has no categoryId: the category (and the
// type denormalized from it) is fixed at creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    pub description: String,
    pub remark: Option<String>,
    pub qty: u32,
    pub unit: Option<String>,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/* Expense operations.
 * The backend owns totalAmount; responses are decoded verbatim and the
 * client never recomputes qty x amount for display.
 */
impl AppContext {
    pub async fn create_expense(&self, new: &NewExpense) -> ClientResult<Expense> {
        if new.category_id.is_none() {
            return Err(ClientError::Validation(
                "Please select a category".to_string(),
            ));
        }
        if new.description.trim().is_empty() {
            return Err(ClientError::Validation(
                "Description is required".to_string(),
            ));
        }
        if new.qty < 1 {
            return Err(ClientError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let body = serde_json::to_value(new)?;
        let value = self
            .cache
            .mutate_with(&[Tag::Expense], || async {
                self.http.send(Method::POST, EXPENSES_ENDPOINT, &body).await
            })
            .await?;
        let response: ExpenseResponse = serde_json::from_value(value)?;
        Ok(response.expense)
    }

    pub async fn update_expense(&self, id: &str, patch: &ExpensePatch) -> ClientResult<Expense> {
        if patch.qty < 1 {
            return Err(ClientError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let endpoint = format!("{EXPENSES_ENDPOINT}/{id}");
        let body = serde_json::to_value(patch)?;
        let value = self
            .cache
            .mutate_with(&[Tag::Expense], || async {
                self.http.send(Method::PATCH, &endpoint, &body).await
            })
            .await?;
        let response: ExpenseResponse = serde_json::from_value(value)?;
        Ok(response.expense)
    }

    pub async fn expenses(&self, query: &ExpenseQuery) -> ClientResult<Vec<Expense>> {
        let params = query.to_params();
        let key = QueryKey::with_params(EXPENSES_ENDPOINT, &params);
        let value = self
            .cache
            .query_with(key, &[Tag::Expense], || async {
                self.http.get(EXPENSES_ENDPOINT, &params).await
            })
            .await?;
        let response: ExpensesResponse = serde_json::from_value(value)?;
        Ok(response.expenses)
    }

    // Mounted expense list for the expense page.
    pub fn watch_expenses(&self, query: &ExpenseQuery) -> watch::Receiver<QueryState> {
        let http = self.http.clone();
        let params = query.to_params();
        let key = QueryKey::with_params(EXPENSES_ENDPOINT, &params);
        self.cache.watch_query(key, vec![Tag::Expense], move || {
            let http = http.clone();
            let params = params.clone();
            async move { http.get(EXPENSES_ENDPOINT, &params).await }
        })
    }

    pub async fn delete_expense(&self, id: &str) -> ClientResult<String> {
        let endpoint = format!("{EXPENSES_ENDPOINT}/{id}");
        let value = self
            .cache
            .mutate_with(&[Tag::Expense], || async {
                self.http.delete(&endpoint).await
            })
            .await?;
        let response: DeleteResponse = serde_json::from_value(value)?;
        Ok(response.message)
    }
}
