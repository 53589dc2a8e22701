// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt queue operations: admission, head lookup, retention and likes.

use chrono::{DateTime, Utc};
use daydream_core::{
    DaydreamError, NewQueueEntry, QueueEntry, TrendingPrompt, format_timestamp,
};
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_tr_err};
use crate::queries::{optional_timestamp_at, timestamp_at};

const ENTRY_COLUMNS: &str = "id, stream_key, text, seed, is_user, session_id, position,
     timestamp, processed, processed_at, likes";

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        stream_key: row.get(1)?,
        text: row.get(2)?,
        seed: row.get(3)?,
        is_user: row.get(4)?,
        session_id: row.get(5)?,
        position: row.get(6)?,
        timestamp: timestamp_at(row, 7)?,
        processed: row.get(8)?,
        processed_at: optional_timestamp_at(row, 9)?,
        likes: row.get(10)?,
    })
}

/// Count unprocessed entries for a stream.
pub async fn count_unprocessed(db: &Database, stream_key: &str) -> Result<u64, DaydreamError> {
    let stream_key = stream_key.to_string();
    let count = db
        .connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM prompt_queue WHERE stream_key = ?1 AND processed = 0",
                params![stream_key],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(count.max(0) as u64)
}

/// Append an entry at the stream's next position unless the backlog is full.
///
/// The count check, the position allocation and the insert share one
/// IMMEDIATE transaction, so concurrent appends never see the same position
/// and never overshoot `max_outstanding`.
pub async fn append_entry(
    db: &Database,
    entry: NewQueueEntry,
    max_outstanding: u64,
) -> Result<Option<QueueEntry>, DaydreamError> {
    let id = uuid::Uuid::new_v4().to_string();
    let max_outstanding = i64::try_from(max_outstanding).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let outstanding: i64 = tx.query_row(
                "SELECT COUNT(*) FROM prompt_queue WHERE stream_key = ?1 AND processed = 0",
                params![entry.stream_key],
                |row| row.get(0),
            )?;
            if outstanding >= max_outstanding {
                return Ok(None);
            }

            let position: i64 = tx
                .query_row(
                    "SELECT next_position FROM prompt_sequence WHERE stream_key = ?1",
                    params![entry.stream_key],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0);

            tx.execute(
                "INSERT INTO prompt_sequence (stream_key, next_position) VALUES (?1, ?2)
                 ON CONFLICT(stream_key) DO UPDATE SET next_position = excluded.next_position",
                params![entry.stream_key, position + 1],
            )?;
            tx.execute(
                "INSERT INTO prompt_queue
                 (id, stream_key, text, seed, is_user, session_id, position, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    entry.stream_key,
                    entry.text,
                    entry.seed,
                    entry.is_user,
                    entry.session_id,
                    position,
                    format_timestamp(entry.timestamp),
                ],
            )?;
            tx.commit()?;

            Ok(Some(QueueEntry {
                id,
                stream_key: entry.stream_key,
                text: entry.text,
                seed: entry.seed,
                is_user: entry.is_user,
                session_id: entry.session_id,
                position,
                timestamp: entry.timestamp,
                processed: false,
                processed_at: None,
                likes: 0,
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// The unprocessed entry with the lowest position, if any.
pub async fn next_unprocessed(
    db: &Database,
    stream_key: &str,
) -> Result<Option<QueueEntry>, DaydreamError> {
    let mut head = pending_entries(db, stream_key, 1).await?;
    Ok(head.pop())
}

/// Up to `limit` unprocessed entries in position order.
pub async fn pending_entries(
    db: &Database,
    stream_key: &str,
    limit: usize,
) -> Result<Vec<QueueEntry>, DaydreamError> {
    let stream_key = stream_key.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<QueueEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM prompt_queue
                 WHERE stream_key = ?1 AND processed = 0
                 ORDER BY position ASC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![stream_key, limit], entry_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a single entry by id.
pub async fn get_entry(db: &Database, id: &str) -> Result<Option<QueueEntry>, DaydreamError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM prompt_queue WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete processed entries with `processed_at <= cutoff`.
pub async fn purge_processed_before(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<u64, DaydreamError> {
    let cutoff = format_timestamp(cutoff);
    let deleted = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM prompt_queue
                 WHERE processed = 1 AND processed_at IS NOT NULL AND processed_at <= ?1",
                params![cutoff],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(deleted as u64)
}

/// Add `delta` to an entry's likes, flooring at zero. `None` if the id is unknown.
pub async fn adjust_likes(
    db: &Database,
    id: &str,
    delta: i64,
) -> Result<Option<i64>, DaydreamError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE prompt_queue SET likes = MAX(likes + ?2, 0) WHERE id = ?1",
                params![id, delta],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let likes: i64 = tx.query_row(
                "SELECT likes FROM prompt_queue WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(Some(likes))
        })
        .await
        .map_err(map_tr_err)
}

/// Entries admitted after `since`, most liked first, newest breaking ties.
pub async fn trending(
    db: &Database,
    stream_key: &str,
    since: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<TrendingPrompt>, DaydreamError> {
    let stream_key = stream_key.to_string();
    let since = format_timestamp(since);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<TrendingPrompt>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT text, likes, timestamp FROM prompt_queue
                 WHERE stream_key = ?1 AND timestamp > ?2
                 ORDER BY likes DESC, timestamp DESC
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![stream_key, since, limit], |row| {
                Ok(TrendingPrompt {
                    text: row.get(0)?,
                    likes: row.get(1)?,
                    timestamp: timestamp_at(row, 2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn new_entry(text: &str, at: DateTime<Utc>) -> NewQueueEntry {
        NewQueueEntry {
            stream_key: "main".to_string(),
            text: text.to_string(),
            seed: format!("seed-{text}"),
            is_user: true,
            session_id: Some("session-1".to_string()),
            timestamp: at,
        }
    }

    async fn mark_processed(db: &Database, id: &str, at: DateTime<Utc>) {
        let id = id.to_string();
        let at = format_timestamp(at);
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE prompt_queue SET processed = 1, processed_at = ?2 WHERE id = ?1",
                    params![id, at],
                )?;
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn positions_start_at_zero_and_increase() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        let a = append_entry(&db, new_entry("a", now), 10).await.unwrap().unwrap();
        let b = append_entry(&db, new_entry("b", now), 10).await.unwrap().unwrap();
        let c = append_entry(&db, new_entry("c", now), 10).await.unwrap().unwrap();
        assert_eq!((a.position, b.position, c.position), (0, 1, 2));
        assert_eq!(count_unprocessed(&db, "main").await.unwrap(), 3);

        let head = next_unprocessed(&db, "main").await.unwrap().unwrap();
        assert_eq!(head.id, a.id);
        assert_eq!(head.session_id.as_deref(), Some("session-1"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn full_queue_rejects_without_consuming_a_position() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        append_entry(&db, new_entry("a", now), 2).await.unwrap().unwrap();
        let b = append_entry(&db, new_entry("b", now), 2).await.unwrap().unwrap();
        assert!(append_entry(&db, new_entry("c", now), 2).await.unwrap().is_none());

        mark_processed(&db, &b.id, now).await;
        let d = append_entry(&db, new_entry("d", now), 2).await.unwrap().unwrap();
        assert_eq!(d.position, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn positions_are_not_reused_after_purge() {
        let (db, _dir) = setup_db().await;
        let old = Utc::now() - Duration::hours(48);

        let a = append_entry(&db, new_entry("a", old), 10).await.unwrap().unwrap();
        mark_processed(&db, &a.id, old).await;
        assert_eq!(purge_processed_before(&db, Utc::now()).await.unwrap(), 1);

        let b = append_entry(&db, new_entry("b", Utc::now()), 10).await.unwrap().unwrap();
        assert_eq!(b.position, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_appends_get_unique_positions() {
        let (db, _dir) = setup_db().await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                append_entry(&db, new_entry(&format!("p{i}"), Utc::now()), 100)
                    .await
                    .unwrap()
                    .unwrap()
                    .position
            }));
        }
        let mut positions = Vec::new();
        for handle in handles {
            positions.push(handle.await.unwrap());
        }
        positions.sort_unstable();
        assert_eq!(positions, (0..20).collect::<Vec<i64>>());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_keeps_unprocessed_and_recent_rows() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let old = now - Duration::hours(25);

        let stale = append_entry(&db, new_entry("stale", old), 10).await.unwrap().unwrap();
        let recent = append_entry(&db, new_entry("recent", old), 10).await.unwrap().unwrap();
        let pending = append_entry(&db, new_entry("pending", old), 10).await.unwrap().unwrap();
        mark_processed(&db, &stale.id, old).await;
        mark_processed(&db, &recent.id, now).await;

        let purged = purge_processed_before(&db, now - Duration::hours(24)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(get_entry(&db, &stale.id).await.unwrap().is_none());
        assert!(get_entry(&db, &recent.id).await.unwrap().is_some());
        assert!(get_entry(&db, &pending.id).await.unwrap().is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn likes_floor_at_zero() {
        let (db, _dir) = setup_db().await;
        let entry = append_entry(&db, new_entry("a", Utc::now()), 10).await.unwrap().unwrap();

        assert_eq!(adjust_likes(&db, &entry.id, 1).await.unwrap(), Some(1));
        assert_eq!(adjust_likes(&db, &entry.id, -1).await.unwrap(), Some(0));
        assert_eq!(adjust_likes(&db, &entry.id, -1).await.unwrap(), Some(0));
        assert_eq!(adjust_likes(&db, "missing", 1).await.unwrap(), None);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn trending_orders_by_likes_within_window() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        let old = append_entry(&db, new_entry("old", now - Duration::hours(5)), 10)
            .await
            .unwrap()
            .unwrap();
        let quiet = append_entry(&db, new_entry("quiet", now), 10).await.unwrap().unwrap();
        let loud = append_entry(&db, new_entry("loud", now), 10).await.unwrap().unwrap();
        for _ in 0..3 {
            adjust_likes(&db, &loud.id, 1).await.unwrap();
        }
        adjust_likes(&db, &quiet.id, 1).await.unwrap();
        for _ in 0..9 {
            adjust_likes(&db, &old.id, 1).await.unwrap();
        }

        let top = trending(&db, "main", now - Duration::hours(3), 5).await.unwrap();
        let texts: Vec<_> = top.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["loud", "quiet"]);
        assert_eq!(top[0].likes, 3);

        db.close().await.unwrap();
    }
}
