//! Translation of `SeaORM` errors into [`StoreError`].

use sea_orm::{DbErr, RuntimeErr};

use kasir_core::store::StoreError;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a database error, keeping the constraint name of unique violations.
pub(crate) fn db_err(err: DbErr) -> StoreError {
    if let Some(constraint) = unique_constraint(&err) {
        return StoreError::UniqueViolation { constraint };
    }
    StoreError::Database(err.to_string())
}

fn unique_constraint(err: &DbErr) -> Option<String> {
    let (DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
    | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db)))) = err
    else {
        return None;
    };
    if db.code().as_deref() != Some(UNIQUE_VIOLATION) {
        return None;
    }
    Some(db.constraint().unwrap_or_default().to_string())
}
