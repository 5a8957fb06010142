use rusqlite::Connection;

use crate::db::queries::analytics as queries;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CategoryTotal, DayTotal, SpendingAnalytics};

/// Compute all six bucket collections for `user_id`.
///
/// Either every query succeeds or the call fails with `DataFetch`; no
/// partial result is ever returned.
pub fn aggregate(conn: &Connection, user_id: i64) -> AppResult<SpendingAnalytics> {
    let analytics = SpendingAnalytics {
        category_totals: fetch(queries::category_totals(conn, user_id), "category totals")?,
        monthly_totals: fetch(queries::monthly_totals(conn, user_id), "monthly totals")?,
        daily_trend: fetch(queries::daily_totals(conn, user_id), "daily trend")?,
        monthly_category_totals: fetch(
            queries::monthly_category_totals(conn, user_id),
            "monthly category totals",
        )?,
        yearly_totals: fetch(queries::yearly_totals(conn, user_id), "yearly totals")?,
        yearly_category_totals: fetch(
            queries::yearly_category_totals(conn, user_id),
            "yearly category totals",
        )?,
    };

    tracing::debug!(
        user_id,
        categories = analytics.category_totals.len(),
        months = analytics.monthly_totals.len(),
        days = analytics.daily_trend.len(),
        "Aggregated spending analytics"
    );
    Ok(analytics)
}

/// Like [`aggregate`], checking a connection out of the pool first.
///
/// The connection is returned to the pool before this function returns.
pub fn aggregate_from_pool(pool: &DbPool, user_id: i64) -> AppResult<SpendingAnalytics> {
    let conn = pool
        .get()
        .map_err(|e| AppError::DataFetch(format!("connection unavailable: {}", e)))?;
    aggregate(&conn, user_id)
}

fn fetch<T>(result: rusqlite::Result<T>, what: &str) -> AppResult<T> {
    result.map_err(|e| AppError::DataFetch(format!("{}: {}", what, e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

/// Headline figures derived from a [`SpendingAnalytics`].
#[derive(Debug, Clone)]
pub struct SpendingSummary {
    pub total_cents: i64,
    pub top_category: Option<CategoryTotal>,
    pub peak_day: Option<DayTotal>,
    pub trend: Trend,
    pub months_recorded: usize,
}

impl SpendingSummary {
    pub fn from_analytics(analytics: &SpendingAnalytics) -> Self {
        let total_cents = analytics
            .category_totals
            .iter()
            .fold(0i64, |acc, c| acc.saturating_add(c.total_cents));

        // Ties go to the earliest entry in each collection's own order.
        let top_category = analytics
            .category_totals
            .iter()
            .fold(None::<&CategoryTotal>, |best, c| match best {
                Some(b) if b.total_cents >= c.total_cents => Some(b),
                _ => Some(c),
            })
            .cloned();
        let peak_day = analytics
            .daily_trend
            .iter()
            .fold(None::<&DayTotal>, |best, d| match best {
                Some(b) if b.total_cents >= d.total_cents => Some(b),
                _ => Some(d),
            })
            .cloned();

        let trend = match (
            analytics.monthly_totals.first(),
            analytics.monthly_totals.last(),
        ) {
            (Some(first), Some(last)) if analytics.monthly_totals.len() > 1 => {
                if last.total_cents > first.total_cents {
                    Trend::Increasing
                } else if last.total_cents < first.total_cents {
                    Trend::Decreasing
                } else {
                    Trend::Stable
                }
            }
            _ => Trend::Stable,
        };

        Self {
            total_cents,
            top_category,
            peak_day,
            trend,
            months_recorded: analytics.monthly_totals.len(),
        }
    }
}

pub fn format_cents(cents: i64) -> String {
    let is_negative = cents < 0;
    let abs_cents = cents.unsigned_abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;

    if is_negative {
        format!("-{}.{:02}", units, remainder)
    } else {
        format!("{}.{:02}", units, remainder)
    }
}
