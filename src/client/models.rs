use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Access level ordinal as stored by the backend: 0 basic, 1 staff, 2 admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    Basic = 0,
    Staff = 1,
    Admin = 2,
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(ordinal: u8) -> Result<Role, Self::Error> {
        match ordinal {
            0 => Ok(Role::Basic),
            1 => Ok(Role::Staff),
            2 => Ok(Role::Admin),
            other => Err(format!("Unknown role ordinal: {other}")),
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> u8 {
        role as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpenseType {
    Income,
    Outcome,
}

impl ExpenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseType::Income => "INCOME",
            ExpenseType::Outcome => "OUTCOME",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    // Immutable after creation; update payloads carry no type field.
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub user_id: UserRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// The backend returns references either as a bare id or expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(String),
    Expanded(Box<User>),
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            UserRef::Id(id) => id,
            UserRef::Expanded(user) => &user.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(String),
    Expanded(Box<Category>),
}

impl CategoryRef {
    pub fn id(&self) -> &str {
        match self {
            CategoryRef::Id(id) => id,
            CategoryRef::Expanded(category) => &category.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub description: String,
    #[serde(default)]
    pub remark: Option<String>,
    pub qty: u32,
    #[serde(default)]
    pub unit: Option<String>,
    pub amount: f64,
    // Computed by the backend; carried verbatim, never recomputed here.
    pub total_amount: f64,
    pub category_id: CategoryRef,
    pub user_id: UserRef,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/* Response envelopes */

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryResponse {
    pub success: bool,
    pub category: Category,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoriesResponse {
    pub success: bool,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseResponse {
    pub success: bool,
    pub expense: Expense,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpensesResponse {
    pub success: bool,
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: Message,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

// Error body shape shared by all backend failure responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}
