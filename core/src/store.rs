//! SQLite snapshot store.
//!
//! RULE: Only store.rs talks to the database. The engines work on
//! in-memory slices and never call into the store.

use crate::{
    complaint::Complaint,
    error::{DeskError, DeskResult},
    event::{DeskEvent, EventLogEntry},
    snapshot::{ComplaintSnapshot, RejectedRecord},
    types::Timestamp,
};
use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension};

pub struct ComplaintStore {
    conn: Connection,
}

impl ComplaintStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_complaints.sql"))?;
        Ok(())
    }

    // ── Complaint ──────────────────────────────────────────────────

    /// Insert or replace a complaint. Re-saving keeps its original position
    /// in `load_complaints`.
    pub fn upsert_complaint(&self, c: &Complaint) -> DeskResult<()> {
        upsert(&self.conn, c)
    }

    /// Upsert a whole snapshot in one transaction.
    pub fn upsert_all(&mut self, complaints: &[Complaint]) -> DeskResult<()> {
        let tx = self.conn.transaction()?;
        for complaint in complaints {
            upsert(&tx, complaint)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn complaint(&self, complaint_id: &str) -> DeskResult<Complaint> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM complaint WHERE complaint_id = ?1",
                params![complaint_id],
                |row| row.get(0),
            )
            .optional()?;
        let payload = payload.ok_or_else(|| DeskError::ComplaintNotFound {
            complaint_id: complaint_id.to_string(),
        })?;
        Ok(serde_json::from_str(&payload)?)
    }

    /// Every stored complaint, in first-insert order. Payloads that no longer
    /// decode are set aside in `rejected`; `index` is the row position.
    pub fn load_snapshot(&self) -> DeskResult<ComplaintSnapshot> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM complaint ORDER BY rowid ASC")?;
        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut values = Vec::with_capacity(payloads.len());
        let mut unreadable = Vec::new();
        for (index, payload) in payloads.iter().enumerate() {
            match serde_json::from_str::<serde_json::Value>(payload) {
                Ok(value) => values.push((index, value)),
                Err(e) => unreadable.push(RejectedRecord {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        let (positions, values): (Vec<usize>, Vec<_>) = values.into_iter().unzip();
        let mut snapshot = ComplaintSnapshot::from_values(values);
        for rejected in &mut snapshot.rejected {
            rejected.index = positions[rejected.index];
        }
        snapshot.rejected.extend(unreadable);
        snapshot.rejected.sort_by_key(|r| r.index);
        if !snapshot.rejected.is_empty() {
            log::warn!("{} stored complaints could not be decoded", snapshot.rejected.len());
        }
        Ok(snapshot)
    }

    /// The decodable part of [`ComplaintStore::load_snapshot`].
    pub fn load_complaints(&self) -> DeskResult<Vec<Complaint>> {
        Ok(self.load_snapshot()?.complaints)
    }

    pub fn complaint_count(&self) -> DeskResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM complaint", [], |row| row.get(0))?;
        Ok(count)
    }

    // ── Escalation event log ──────────────────────────────────────

    pub fn append_escalation_event(&self, event: &DeskEvent) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO escalation_event (complaint_id, event_type, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.complaint_id(),
                event.event_type(),
                serde_json::to_string(event)?,
                rfc3339(Some(event.at())),
            ],
        )?;
        Ok(())
    }

    pub fn escalation_events(&self, complaint_id: &str) -> DeskResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, complaint_id, event_type, payload, recorded_at
             FROM escalation_event WHERE complaint_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![complaint_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    complaint_id: row.get(1)?,
                    event_type: row.get(2)?,
                    payload: row.get(3)?,
                    recorded_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn escalation_event_count(&self) -> DeskResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM escalation_event", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn rfc3339(t: Option<Timestamp>) -> Option<String> {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn upsert(conn: &Connection, c: &Complaint) -> DeskResult<()> {
    conn.execute(
        "INSERT INTO complaint (
            complaint_id, category, severity, status, zone, created_at, updated_at, payload
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(complaint_id) DO UPDATE SET
            category = excluded.category,
            severity = excluded.severity,
            status = excluded.status,
            zone = excluded.zone,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            payload = excluded.payload",
        params![
            &c.id,
            c.category.as_str(),
            c.severity.as_str(),
            c.status.as_str(),
            c.zone(),
            rfc3339(c.created_at),
            rfc3339(c.updated_at),
            serde_json::to_string(c)?,
        ],
    )?;
    Ok(())
}
