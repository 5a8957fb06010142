//! Grouping queries behind the analytics endpoint.
//!
//! Every query is scoped by `user_id` and runs over the user's full history.
//! Dates are stored as `YYYY-MM-DD`, so month and year keys are prefixes.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::models::{
    CategoryTotal, DayTotal, MonthCategoryTotal, MonthTotal, YearCategoryTotal, YearTotal,
};

pub fn category_totals(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<CategoryTotal>> {
    let mut stmt = conn.prepare(
        "SELECT category, SUM(amount_cents) AS total
         FROM expenses WHERE user_id = ?
         GROUP BY category
         ORDER BY total DESC, category ASC",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        Ok(CategoryTotal {
            category: row.get(0)?,
            total_cents: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn monthly_totals(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<MonthTotal>> {
    let mut stmt = conn.prepare(
        "SELECT substr(date, 1, 7) AS month, SUM(amount_cents) AS total
         FROM expenses WHERE user_id = ?
         GROUP BY month
         ORDER BY month ASC",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        Ok(MonthTotal {
            month: row.get(0)?,
            total_cents: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn daily_totals(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<DayTotal>> {
    let mut stmt = conn.prepare(
        "SELECT date, SUM(amount_cents) AS total
         FROM expenses WHERE user_id = ?
         GROUP BY date
         ORDER BY date ASC",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        let date: String = row.get(0)?;
        Ok(DayTotal {
            day: weekday_name(&date),
            date,
            total_cents: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn monthly_category_totals(
    conn: &Connection,
    user_id: i64,
) -> rusqlite::Result<Vec<MonthCategoryTotal>> {
    let mut stmt = conn.prepare(
        "SELECT substr(date, 1, 7) AS month, category, SUM(amount_cents) AS total
         FROM expenses WHERE user_id = ?
         GROUP BY month, category
         ORDER BY month ASC, total DESC, category ASC",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        Ok(MonthCategoryTotal {
            month: row.get(0)?,
            category: row.get(1)?,
            total_cents: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn yearly_totals(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<YearTotal>> {
    let mut stmt = conn.prepare(
        "SELECT substr(date, 1, 4) AS year, SUM(amount_cents) AS total
         FROM expenses WHERE user_id = ?
         GROUP BY year
         ORDER BY year ASC",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        Ok(YearTotal {
            year: row.get(0)?,
            total_cents: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn yearly_category_totals(
    conn: &Connection,
    user_id: i64,
) -> rusqlite::Result<Vec<YearCategoryTotal>> {
    let mut stmt = conn.prepare(
        "SELECT substr(date, 1, 4) AS year, category, SUM(amount_cents) AS total
         FROM expenses WHERE user_id = ?
         GROUP BY year, category
         ORDER BY year ASC, total DESC, category ASC",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        Ok(YearCategoryTotal {
            year: row.get(0)?,
            category: row.get(1)?,
            total_cents: row.get(2)?,
        })
    })?;
    rows.collect()
}

fn weekday_name(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%A").to_string())
        .unwrap_or_default()
}
