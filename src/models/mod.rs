pub mod analytics;
pub mod expense;
pub mod insight;
pub mod user;

pub use analytics::{
    CategoryTotal, DayTotal, MonthCategoryTotal, MonthTotal, SpendingAnalytics, YearCategoryTotal,
    YearTotal,
};
pub use expense::{Expense, ExpenseInput, NewExpense, Recurrence};
pub use insight::Insight;
pub use user::{NewUser, User, UserRecord};
