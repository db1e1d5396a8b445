//! In-memory store for ephemeral demo sessions.
//!
//! Demo sessions never touch the database; they and their attendance records
//! live here until [`DemoSessionStore::sweep`] drops them. The sweep is
//! housekeeping only: expiry is always decided by the validator against the
//! session's own timestamps.
//!
//! Every lookup stamps the entry's last-use time. The sweep only removes
//! entries that are both past their retention window and idle, so a session
//! that is being looked up concurrently is never pulled out from under the
//! caller.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::checkin::{AttendanceDraft, SessionSnapshot};
use crate::recorder::RecordError;

#[derive(Debug)]
struct DemoEntry {
    session: SessionSnapshot,
    last_used_ms: AtomicI64,
    records: HashMap<i64, AttendanceDraft>,
}

impl DemoEntry {
    fn touch(&self, now: DateTime<Utc>) {
        self.last_used_ms
            .fetch_max(now.timestamp_millis(), Ordering::Relaxed);
    }

    fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        Duration::milliseconds(now.timestamp_millis() - self.last_used_ms.load(Ordering::Relaxed))
    }
}

#[derive(Clone, Debug, Default)]
pub struct DemoSessionStore {
    inner: Arc<RwLock<HashMap<Uuid, DemoEntry>>>,
}

impl DemoSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: SessionSnapshot, now: DateTime<Utc>) {
        let entry = DemoEntry {
            session,
            last_used_ms: AtomicI64::new(now.timestamp_millis()),
            records: HashMap::new(),
        };
        self.inner.write().await.insert(entry.session.id, entry);
    }

    /// Returns a copy of the session and marks it as used.
    pub async fn get(&self, id: Uuid, now: DateTime<Utc>) -> Option<SessionSnapshot> {
        let guard = self.inner.read().await;
        let entry = guard.get(&id)?;
        entry.touch(now);
        Some(entry.session.clone())
    }

    /// Marks the session inactive and returns the updated copy.
    pub async fn deactivate(&self, id: Uuid, now: DateTime<Utc>) -> Option<SessionSnapshot> {
        let mut guard = self.inner.write().await;
        let entry = guard.get_mut(&id)?;
        entry.session.active = false;
        entry.touch(now);
        Some(entry.session.clone())
    }

    pub async fn has_record(&self, session_id: Uuid, student_id: i64) -> bool {
        self.inner
            .read()
            .await
            .get(&session_id)
            .is_some_and(|e| e.records.contains_key(&student_id))
    }

    /// Check-and-insert under one write lock; the second writer for the same
    /// pair always gets [`RecordError::AlreadyPresent`].
    pub async fn insert_record(&self, draft: &AttendanceDraft) -> Result<(), RecordError> {
        let mut guard = self.inner.write().await;
        let entry = guard
            .get_mut(&draft.session_id)
            .ok_or(RecordError::SessionMissing)?;
        match entry.records.entry(draft.student_id) {
            Entry::Occupied(_) => Err(RecordError::AlreadyPresent),
            Entry::Vacant(slot) => {
                slot.insert(draft.clone());
                Ok(())
            }
        }
    }

    /// Records of a demo session in check-in order.
    pub async fn records(&self, session_id: Uuid) -> Vec<AttendanceDraft> {
        let guard = self.inner.read().await;
        let mut records: Vec<AttendanceDraft> = guard
            .get(&session_id)
            .map(|e| e.records.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.checked_in_at);
        records
    }

    /// Drops sessions that ended more than `retention` ago and have not been
    /// used for at least `idle`. Returns how many were removed.
    pub async fn sweep(&self, now: DateTime<Utc>, idle: Duration, retention: Duration) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, entry| {
            let stale = now > entry.session.ends_at + retention;
            !(stale && entry.idle_for(now) >= idle)
        });
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
