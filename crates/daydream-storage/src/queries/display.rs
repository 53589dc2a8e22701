// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Display state operations, including the processing-flag compare-and-swap.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use daydream_core::{DaydreamError, DisplayState, DisplayedPrompt, format_timestamp};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::queries::timestamp_at;

fn state_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DisplayState> {
    let raw: String = row.get(1)?;
    let displayed: VecDeque<DisplayedPrompt> = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(DisplayState {
        id: row.get(0)?,
        displayed,
        highlighted_since: timestamp_at(row, 2)?,
        is_processing: row.get(3)?,
        last_updated: timestamp_at(row, 4)?,
    })
}

fn encode_displayed(state: &DisplayState) -> Result<String, DaydreamError> {
    serde_json::to_string(&state.displayed).map_err(DaydreamError::storage)
}

pub async fn load_display_state(
    db: &Database,
    id: &str,
) -> Result<Option<DisplayState>, DaydreamError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<DisplayState>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, displayed, highlighted_since, is_processing, last_updated
                 FROM prompt_state WHERE id = ?1",
                params![id],
                state_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert `state` unless one with the same id exists. Returns true on insert.
pub async fn create_display_state_if_absent(
    db: &Database,
    state: &DisplayState,
) -> Result<bool, DaydreamError> {
    let displayed = encode_displayed(state)?;
    let id = state.id.clone();
    let highlighted_since = format_timestamp(state.highlighted_since);
    let last_updated = format_timestamp(state.last_updated);
    let is_processing = state.is_processing;
    let inserted = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO prompt_state
                 (id, displayed, highlighted_since, is_processing, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, displayed, highlighted_since, is_processing, last_updated],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(inserted == 1)
}

/// Compare-and-swap `is_processing` from 0 to 1. Returns true if this caller won.
pub async fn try_claim(db: &Database, id: &str, now: DateTime<Utc>) -> Result<bool, DaydreamError> {
    let id = id.to_string();
    let now = format_timestamp(now);
    let claimed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE prompt_state SET is_processing = 1, last_updated = ?2
                 WHERE id = ?1 AND is_processing = 0",
                params![id, now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(claimed == 1)
}

/// Persist a promotion: the new window, cleared flag and processed entry, atomically.
pub async fn commit_promotion(
    db: &Database,
    state: &DisplayState,
    entry_id: &str,
    now: DateTime<Utc>,
) -> Result<(), DaydreamError> {
    let displayed = encode_displayed(state)?;
    let state_id = state.id.clone();
    let highlighted_since = format_timestamp(state.highlighted_since);
    let entry = entry_id.to_string();
    let now = format_timestamp(now);
    let committed = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let marked = tx.execute(
                "UPDATE prompt_queue SET processed = 1, processed_at = ?2
                 WHERE id = ?1 AND processed = 0",
                params![entry, now],
            )?;
            if marked != 1 {
                return Ok(false);
            }
            let updated = tx.execute(
                "UPDATE prompt_state
                 SET displayed = ?2, highlighted_since = ?3, is_processing = 0, last_updated = ?4
                 WHERE id = ?1 AND is_processing = 1",
                params![state_id, displayed, highlighted_since, now],
            )?;
            if updated != 1 {
                return Ok(false);
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)?;

    if committed {
        Ok(())
    } else {
        Err(DaydreamError::Internal(format!(
            "promotion of entry {entry_id} into state {} was not applied",
            state.id
        )))
    }
}

/// Clear the processing flag regardless of its current value.
pub async fn release_claim(db: &Database, id: &str, now: DateTime<Utc>) -> Result<(), DaydreamError> {
    let id = id.to_string();
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE prompt_state SET is_processing = 0, last_updated = ?2 WHERE id = ?1",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Clear flags whose `last_updated` is at or before `cutoff`.
pub async fn reclaim_stuck(
    db: &Database,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, DaydreamError> {
    let cutoff = format_timestamp(cutoff);
    let now = format_timestamp(now);
    let reclaimed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE prompt_state SET is_processing = 0, last_updated = ?2
                 WHERE is_processing = 1 AND last_updated <= ?1",
                params![cutoff, now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(reclaimed as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::queue;
    use chrono::{Duration, TimeZone};
    use daydream_core::NewQueueEntry;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn prompt(text: &str) -> DisplayedPrompt {
        DisplayedPrompt {
            text: text.to_string(),
            seed: format!("seed-{text}"),
            is_user: false,
            session_id: None,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn create_if_absent_keeps_existing_state() {
        let (db, _dir) = setup_db().await;
        let first = DisplayState::seeded("main", vec![prompt("a")], t0());
        let second = DisplayState::seeded("main", vec![prompt("b")], t0());

        assert!(create_display_state_if_absent(&db, &first).await.unwrap());
        assert!(!create_display_state_if_absent(&db, &second).await.unwrap());

        let loaded = load_display_state(&db, "main").await.unwrap().unwrap();
        assert_eq!(loaded, first);
        assert!(load_display_state(&db, "other").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_is_exclusive_until_released() {
        let (db, _dir) = setup_db().await;
        let state = DisplayState::seeded("main", Vec::new(), t0());
        create_display_state_if_absent(&db, &state).await.unwrap();

        assert!(try_claim(&db, "main", t0()).await.unwrap());
        assert!(!try_claim(&db, "main", t0()).await.unwrap());
        release_claim(&db, "main", t0()).await.unwrap();
        assert!(try_claim(&db, "main", t0()).await.unwrap());
        assert!(!try_claim(&db, "missing", t0()).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn commit_promotion_is_all_or_nothing() {
        let (db, _dir) = setup_db().await;
        let mut state = DisplayState::seeded("main", vec![prompt("a")], t0());
        create_display_state_if_absent(&db, &state).await.unwrap();

        let entry = queue::append_entry(
            &db,
            NewQueueEntry {
                stream_key: "main".to_string(),
                text: "b".to_string(),
                seed: "seed-b".to_string(),
                is_user: true,
                session_id: None,
                timestamp: t0(),
            },
            10,
        )
        .await
        .unwrap()
        .unwrap();

        assert!(try_claim(&db, "main", t0()).await.unwrap());
        let now = t0() + Duration::seconds(11);
        state.promote(DisplayedPrompt::from(&entry), now, 20);
        commit_promotion(&db, &state, &entry.id, now).await.unwrap();

        let loaded = load_display_state(&db, "main").await.unwrap().unwrap();
        assert!(!loaded.is_processing);
        assert_eq!(loaded.highlighted_since, now);
        assert_eq!(loaded.displayed[0].text, "b");
        let stored = queue::get_entry(&db, &entry.id).await.unwrap().unwrap();
        assert!(stored.processed);
        assert_eq!(stored.processed_at, Some(now));

        // A second commit of the same entry must not touch the state.
        assert!(try_claim(&db, "main", now).await.unwrap());
        let mut again = loaded.clone();
        again.promote(DisplayedPrompt::from(&entry), now + Duration::seconds(20), 20);
        assert!(commit_promotion(&db, &again, &entry.id, now).await.is_err());
        let unchanged = load_display_state(&db, "main").await.unwrap().unwrap();
        assert_eq!(unchanged.displayed.len(), 2);
        assert!(unchanged.is_processing);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn commit_after_reclaim_is_rejected() {
        let (db, _dir) = setup_db().await;
        let state = DisplayState::seeded("main", vec![prompt("a")], t0());
        create_display_state_if_absent(&db, &state).await.unwrap();
        let entry = queue::append_entry(
            &db,
            NewQueueEntry {
                stream_key: "main".to_string(),
                text: "late".to_string(),
                seed: "seed".to_string(),
                is_user: true,
                session_id: None,
                timestamp: t0(),
            },
            10,
        )
        .await
        .unwrap()
        .unwrap();

        // The holder stalls, its flag is reclaimed, and it commits anyway.
        assert!(try_claim(&db, "main", t0()).await.unwrap());
        let later = t0() + Duration::minutes(10);
        assert_eq!(reclaim_stuck(&db, later - Duration::minutes(5), later).await.unwrap(), 1);

        let mut stale = state.clone();
        stale.promote(DisplayedPrompt::from(&entry), later, 20);
        assert!(commit_promotion(&db, &stale, &entry.id, later).await.is_err());

        let unchanged = load_display_state(&db, "main").await.unwrap().unwrap();
        assert_eq!(unchanged.displayed.len(), 1);
        assert_eq!(unchanged.displayed[0].text, "a");
        let stored = queue::get_entry(&db, &entry.id).await.unwrap().unwrap();
        assert!(!stored.processed);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reclaim_only_touches_old_flags() {
        let (db, _dir) = setup_db().await;
        for id in ["stale", "fresh", "idle"] {
            let state = DisplayState::seeded(id, Vec::new(), t0());
            create_display_state_if_absent(&db, &state).await.unwrap();
        }
        try_claim(&db, "stale", t0()).await.unwrap();
        try_claim(&db, "fresh", t0() + Duration::minutes(9)).await.unwrap();

        let now = t0() + Duration::minutes(10);
        let reclaimed = reclaim_stuck(&db, now - Duration::minutes(5), now).await.unwrap();
        assert_eq!(reclaimed, 1);

        let stale = load_display_state(&db, "stale").await.unwrap().unwrap();
        assert!(!stale.is_processing);
        assert_eq!(stale.last_updated, now);
        assert!(load_display_state(&db, "fresh").await.unwrap().unwrap().is_processing);

        db.close().await.unwrap();
    }
}
