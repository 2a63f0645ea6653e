pub use self::expenses::{DateFilter, ExpenseQuery, ExpensePatch, NewExpense};

mod categories;
mod expenses;
mod messages;
mod users;
