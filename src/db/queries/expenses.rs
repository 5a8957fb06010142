use crate::models::expense::{Expense, NewExpense, Recurrence};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, trace};

const EXPENSE_COLUMNS: &str = "id, user_id, title, amount_cents, category, date, recurring, note,
     created_at, updated_at";

fn map_expense(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let recurring: String = row.get(6)?;
    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        amount_cents: row.get(3)?,
        category: row.get(4)?,
        date: row.get(5)?,
        recurring: recurring.parse().unwrap_or(Recurrence::None),
        note: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub fn list_expenses(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Expense>> {
    let sql = format!(
        "SELECT {} FROM expenses WHERE user_id = ? ORDER BY id ASC",
        EXPENSE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let expenses = stmt
        .query_map([user_id], map_expense)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(user_id, count = expenses.len(), "Listed expenses");
    Ok(expenses)
}

pub fn get_expense(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<Option<Expense>> {
    trace!(user_id, expense_id = id, "Fetching expense");
    let sql = format!(
        "SELECT {} FROM expenses WHERE id = ? AND user_id = ?",
        EXPENSE_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], map_expense)
        .optional()
}

pub fn create_expense(
    conn: &Connection,
    user_id: i64,
    expense: &NewExpense,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO expenses (user_id, title, amount_cents, category, date, recurring, note)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            user_id,
            expense.title,
            expense.amount_cents,
            expense.category,
            expense.date,
            expense.recurring.as_str(),
            expense.note,
        ],
    )?;

    let id = conn.last_insert_rowid();
    debug!(
        user_id,
        expense_id = id,
        amount_cents = expense.amount_cents,
        "Created expense"
    );
    Ok(id)
}

/// Returns `false` when no expense with this id belongs to the user.
pub fn update_expense(
    conn: &Connection,
    user_id: i64,
    id: i64,
    expense: &NewExpense,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE expenses SET title = ?, amount_cents = ?, category = ?, date = ?,
         recurring = ?, note = ?, updated_at = datetime('now')
         WHERE id = ? AND user_id = ?",
        params![
            expense.title,
            expense.amount_cents,
            expense.category,
            expense.date,
            expense.recurring.as_str(),
            expense.note,
            id,
            user_id,
        ],
    )?;

    if rows > 0 {
        debug!(user_id, expense_id = id, "Updated expense");
    }
    Ok(rows > 0)
}

pub fn delete_expense(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM expenses WHERE id = ? AND user_id = ?",
        params![id, user_id],
    )?;
    if rows > 0 {
        debug!(user_id, expense_id = id, "Deleted expense");
    }
    Ok(rows > 0)
}
