use crate::models::user::normalize_email;
use crate::models::{NewUser, User, UserRecord};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

pub fn create_user(conn: &Connection, user: &NewUser) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?)",
        params![user.name, normalize_email(&user.email), user.password_hash],
    )?;
    let id = conn.last_insert_rowid();
    debug!(user_id = id, "Created user");
    Ok(id)
}

pub fn email_exists(conn: &Connection, email: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)",
        [normalize_email(email)],
        |row| row.get(0),
    )
}

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT id, name, email, password_hash FROM users WHERE email = ?",
        [normalize_email(email)],
        |row| {
            Ok(UserRecord {
                user: User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                },
                password_hash: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn get_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, name, email FROM users WHERE id = ?",
        [id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
            })
        },
    )
    .optional()
}
