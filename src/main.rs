use expensio::client::{AppContext, Config, ExpenseQuery};

#[tokio::main]
pub async fn main() {
    pretty_env_logger::init();
    dotenv::dotenv().ok();

    let config = Config::from_env();
    let app = match AppContext::new(config) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Failed to start: {e}");
            return;
        }
    };

    // Smoke flow: restore the session from the persisted token, then
    // list categories and the first page of expenses.
    let user = match app.load_user().await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("No active session ({e}), log in first");
            return;
        }
    };
    log::info!("Signed in as {} <{}>", user.name, user.email);

    match app.categories().await {
        Ok(categories) => {
            for category in &categories {
                log::info!("Category: {} [{}]", category.title, category.expense_type.as_str());
            }
        }
        Err(e) => log::error!("Failed to fetch categories: {e}"),
    }

    match app.expenses(&ExpenseQuery::first_page()).await {
        Ok(expenses) => {
            for expense in &expenses {
                log::info!(
                    "Expense: {} x{} = {}",
                    expense.description,
                    expense.qty,
                    expense.total_amount
                );
            }
        }
        Err(e) => log::error!("Failed to fetch expenses: {e}"),
    }
}
