use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthTotal {
    /// `YYYY-MM`
    pub month: String,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    /// `YYYY-MM-DD`
    pub date: String,
    /// English weekday name, e.g. `Friday`.
    pub day: String,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCategoryTotal {
    pub month: String,
    pub category: String,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearTotal {
    /// `YYYY`
    pub year: String,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCategoryTotal {
    pub year: String,
    pub category: String,
    pub total_cents: i64,
}

/// All six aggregate collections for one user, computed over full history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingAnalytics {
    pub category_totals: Vec<CategoryTotal>,
    pub monthly_totals: Vec<MonthTotal>,
    pub daily_trend: Vec<DayTotal>,
    pub monthly_category_totals: Vec<MonthCategoryTotal>,
    pub yearly_totals: Vec<YearTotal>,
    pub yearly_category_totals: Vec<YearCategoryTotal>,
}

impl SpendingAnalytics {
    pub fn is_empty(&self) -> bool {
        self.category_totals.is_empty()
    }
}
