use crate::domain_model::GrantPredicate;
use sqlx::mysql::MySqlDatabaseError;
use sqlx::{MySql, QueryBuilder};

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

/// Appends ` WHERE a = ? AND b = ? ...`. Column names come from
/// `GrantPredicate::column`, never from the caller.
pub fn push_predicates<'a>(qb: &mut QueryBuilder<'a, MySql>, predicates: &[GrantPredicate<'a>]) {
    for (i, predicate) in predicates.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(format!("`{}` = ", predicate.column()));
        qb.push_bind(predicate.value());
    }
}
