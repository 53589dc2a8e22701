// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes `&Database` and runs its
//! statements inside a single `call` on the background connection.

pub mod display;
pub mod queue;

use chrono::{DateTime, Utc};
use daydream_core::parse_timestamp;

/// Reads a persisted timestamp column.
pub(crate) fn timestamp_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Reads a nullable persisted timestamp column.
pub(crate) fn optional_timestamp_at(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        parse_timestamp(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}
