//! Shared database error helpers (SQLSTATE categorization, connectivity checks).

/// Returns true if the given SQLSTATE code represents a unique constraint violation
/// (Postgres 23505, SQLite 2067).
pub fn is_unique_violation_code(code: &str) -> bool {
    matches!(code, "23505" | "2067")
}

pub fn is_sqlx_unique_violation(db: &dyn sqlx::error::DatabaseError) -> bool {
    db.code()
        .map(|c| is_unique_violation_code(c.as_ref()))
        .unwrap_or(false)
}

/// True when the error means the store could not be reached at all
/// (pool exhausted or closed, socket or TLS failure) rather than a query failing.
pub fn is_connectivity_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Short label for a sqlx error, suitable for logs and error messages.
pub fn describe(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => format!("database error {code}: {}", db.message()),
            None => format!("database error: {}", db.message()),
        },
        e if is_connectivity_error(e) => format!("store unreachable: {e}"),
        other => other.to_string(),
    }
}
