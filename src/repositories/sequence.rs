//! Named counters incremented atomically inside the caller's transaction.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};

use crate::models::sequence;

/// Increments the counter `name` and returns its new value (the first call yields 1).
///
/// The `UPDATE` takes a row lock that is held until the surrounding
/// transaction ends, so concurrent writers observe strictly increasing values.
pub async fn next_value<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i64, DbErr> {
    sequence::Entity::insert(sequence::ActiveModel {
        name: Set(name.to_string()),
        value: Set(0),
    })
    .on_conflict(
        OnConflict::column(sequence::Column::Name)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    sequence::Entity::update_many()
        .col_expr(
            sequence::Column::Value,
            Expr::col(sequence::Column::Value).add(1),
        )
        .filter(sequence::Column::Name.eq(name))
        .exec(conn)
        .await?;

    sequence::Entity::find_by_id(name.to_string())
        .one(conn)
        .await?
        .map(|row| row.value)
        .ok_or_else(|| DbErr::RecordNotFound(format!("sequence '{name}'")))
}

/// Reads a counter without advancing it; `0` when it was never used.
pub async fn current_value<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i64, DbErr> {
    Ok(sequence::Entity::find_by_id(name.to_string())
        .one(conn)
        .await?
        .map(|row| row.value)
        .unwrap_or(0))
}
