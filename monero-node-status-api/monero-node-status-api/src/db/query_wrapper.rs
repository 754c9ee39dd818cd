// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use sqlx::{sqlite::SqliteArguments, Sqlite};

/// Runtime-checked query with `?` placeholders
pub(crate) fn query(sql: &str) -> sqlx::query::Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(sql)
}

/// Runtime-checked query mapped into `O` through its `FromRow` impl
pub(crate) fn query_as<O>(sql: &str) -> sqlx::query::QueryAs<'_, Sqlite, O, SqliteArguments<'_>>
where
    O: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow>,
{
    sqlx::query_as(sql)
}
