use serde::{Deserialize, Serialize};

/// Response of the insights endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub insights: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}
