pub use self::api::{DateFilter, ExpenseQuery, ExpensePatch, NewExpense};
pub use self::cache::{Cache, QueryKey, QueryState, Tag};
pub use self::config::Config;
pub use self::context::AppContext;
pub use self::error::{ClientError, ClientResult};
pub use self::gates::{admin_required, auth_required, guest_only, Gate};
pub use self::models::{Category, Expense, ExpenseType, Message, Role, User};
pub use self::store::{MessageState, SessionState, Store};

pub mod api;
pub mod cache;
pub mod chat;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod gates;
pub mod http;
pub mod models;
pub mod realtime;
pub mod store;
pub mod token;
