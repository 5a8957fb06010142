pub mod analytics;
pub mod expenses;
pub mod users;
