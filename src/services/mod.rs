pub mod ai_client;
pub mod analytics;
pub mod insights;
pub mod prompt;
