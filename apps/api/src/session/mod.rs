//! Per-session state: the course list, the chosen major and target, and the
//! last verification result.
//!
//! State lives in process and is mirrored to a `SessionStore`. A session is
//! hydrated from the store the first time it is touched; reads of a session
//! the store has never seen are answered with an empty state and hold no
//! memory. Sessions idle for `SESSION_IDLE_TTL` are dropped and re-hydrated
//! on the next request.
//!
//! Mirroring is fire-and-forget: a single writer task applies store writes
//! in the order the mutations happened, and store failures are logged and
//! never reach the caller.

pub mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::transcript::courses::{CourseDraft, CourseId, CourseList, CourseRecord};
use crate::verification::models::{AnalysisContext, VerificationResult};

use self::store::SessionStore;

const MAX_SESSION_ID_LEN: usize = 128;
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Session ids are client-chosen: 1-128 chars of ASCII alphanumerics, `-` or `_`.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub courses: CourseList,
    pub major: Option<String>,
    pub target_institution: Option<String>,
    pub last_verification: Option<VerificationResult>,
}

impl SessionState {
    /// Rebuilds state from a stored record. Unreadable fields are skipped.
    fn from_record(session_id: &str, record: &Value) -> Self {
        let courses: Vec<CourseRecord> = field(session_id, record, "transcript").unwrap_or_default();
        Self {
            courses: CourseList::from_records(courses),
            major: field(session_id, record, "major"),
            target_institution: field(session_id, record, "target_institution"),
            last_verification: field(session_id, record, "last_verification"),
        }
    }
}

fn field<T: DeserializeOwned>(session_id: &str, record: &Value, key: &str) -> Option<T> {
    let value = record.get(key).filter(|v| !v.is_null())?;
    serde_json::from_value(value.clone())
        .map_err(|e| warn!(session_id, "Ignoring unreadable stored '{key}': {e}"))
        .ok()
}

fn transcript_fields(courses: &CourseList) -> Value {
    json!({ "transcript": courses.snapshot() })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub major: Option<String>,
    pub target_institution: Option<String>,
}

struct SessionEntry {
    state: SessionState,
    touched: Instant,
}

impl SessionEntry {
    fn new(state: SessionState) -> Self {
        Self {
            state,
            touched: Instant::now(),
        }
    }
}

/// Drops sessions nobody has written to for `SESSION_IDLE_TTL`.
fn evict_idle(sessions: &mut HashMap<String, SessionEntry>) {
    let before = sessions.len();
    sessions.retain(|_, entry| entry.touched.elapsed() < SESSION_IDLE_TTL);
    let evicted = before - sessions.len();
    if evicted > 0 {
        debug!(evicted, held = sessions.len(), "Evicted idle sessions");
    }
}

#[derive(Debug)]
struct PendingWrite {
    session_id: String,
    fields: Value,
}

/// Folds queued writes into one merged write per session. Later fields win,
/// which matches applying them one by one with `merge = true`.
fn coalesce(writes: Vec<PendingWrite>) -> Vec<PendingWrite> {
    let mut merged: Vec<PendingWrite> = Vec::new();
    for write in writes {
        match merged.iter_mut().find(|m| m.session_id == write.session_id) {
            Some(existing) => match (&mut existing.fields, write.fields) {
                (Value::Object(acc), Value::Object(next)) => acc.extend(next),
                (slot, next) => *slot = next,
            },
            None => merged.push(write),
        }
    }
    merged
}

async fn run_writer(store: Arc<dyn SessionStore>, mut rx: mpsc::UnboundedReceiver<PendingWrite>) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        for write in coalesce(batch) {
            if let Err(e) = store.set(&write.session_id, write.fields, true).await {
                warn!(session_id = %write.session_id, "Session persistence failed: {e}");
            }
        }
    }
    debug!("Session writer stopped");
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    store: Arc<dyn SessionStore>,
    writes: mpsc::UnboundedSender<PendingWrite>,
}

impl SessionRegistry {
    /// Spawns the store writer, so this must run inside a Tokio runtime.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (writes, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&store), rx));
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            writes,
        }
    }

    /// Stored state for a session, if the store has a readable record.
    async fn fetch(&self, session_id: &str) -> Option<SessionState> {
        match self.store.get(session_id).await {
            Ok(Some(record)) => {
                debug!(session_id, "Hydrated session from store");
                Some(SessionState::from_record(session_id, &record))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(session_id, "Could not load session, treating as empty: {e}");
                None
            }
        }
    }

    async fn is_held(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    async fn read<T>(&self, session_id: &str, f: impl FnOnce(&SessionState) -> T) -> T {
        {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(session_id) {
                return f(&entry.state);
            }
        }

        let Some(state) = self.fetch(session_id).await else {
            return f(&SessionState::default());
        };

        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session_id) {
            evict_idle(&mut sessions);
        }
        // Another request may have loaded it meanwhile; keep the first.
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry::new(state));
        f(&entry.state)
    }

    /// Applies `f` and queues the store write it returns. The write is queued
    /// under the lock, so the writer sees mutations in the order they happened.
    async fn write<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState) -> (T, Option<Value>),
    ) -> T {
        let loaded = if self.is_held(session_id).await {
            None
        } else {
            self.fetch(session_id).await
        };

        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session_id) {
            evict_idle(&mut sessions);
        }
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry::new(loaded.unwrap_or_default()));
        entry.touched = Instant::now();

        let (out, fields) = f(&mut entry.state);
        if let Some(fields) = fields {
            let write = PendingWrite {
                session_id: session_id.to_string(),
                fields,
            };
            if self.writes.send(write).is_err() {
                warn!(session_id, "Session writer is gone; change kept in memory only");
            }
        }
        out
    }

    /// Immutable copy of the session's courses.
    pub async fn courses(&self, session_id: &str) -> Vec<CourseRecord> {
        self.read(session_id, |s| s.courses.snapshot()).await
    }

    pub async fn add_course(&self, session_id: &str, draft: CourseDraft) -> CourseRecord {
        self.write(session_id, |s| {
            let record = s.courses.add(draft);
            (record, Some(transcript_fields(&s.courses)))
        })
        .await
    }

    pub async fn add_courses(&self, session_id: &str, drafts: Vec<CourseDraft>) -> Vec<CourseRecord> {
        self.write(session_id, |s| {
            let added = s.courses.extend(drafts);
            (added, Some(transcript_fields(&s.courses)))
        })
        .await
    }

    pub async fn remove_course(&self, session_id: &str, id: CourseId) -> Option<CourseRecord> {
        self.write(session_id, |s| {
            let removed = s.courses.remove(id);
            let fields = removed.as_ref().map(|_| transcript_fields(&s.courses));
            (removed, fields)
        })
        .await
    }

    pub async fn clear_courses(&self, session_id: &str) {
        self.write(session_id, |s| {
            s.courses.clear();
            ((), Some(transcript_fields(&s.courses)))
        })
        .await
    }

    pub async fn profile(&self, session_id: &str) -> Profile {
        self.read(session_id, |s| Profile {
            major: s.major.clone(),
            target_institution: s.target_institution.clone(),
        })
        .await
    }

    pub async fn set_profile(&self, session_id: &str, profile: Profile) -> Profile {
        self.write(session_id, |s| {
            s.major = profile.major.clone();
            s.target_institution = profile.target_institution.clone();
            let fields = json!({
                "major": profile.major,
                "target_institution": profile.target_institution,
            });
            ((), Some(fields))
        })
        .await;
        profile
    }

    pub async fn last_verification(&self, session_id: &str) -> Option<VerificationResult> {
        self.read(session_id, |s| s.last_verification.clone()).await
    }

    /// Replaces the session's last result wholesale.
    pub async fn record_verification(
        &self,
        session_id: &str,
        result: &VerificationResult,
        ctx: &AnalysisContext,
    ) {
        self.write(session_id, |s| {
            s.last_verification = Some(result.clone());
            let fields = json!({
                "last_verification": result,
                "last_verification_at": Utc::now().to_rfc3339(),
                "last_verification_major": ctx.major,
                "last_verification_institution": ctx.target_institution,
            });
            ((), Some(fields))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Grade;
    use crate::verification::engine::local_determination;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use super::store::{MemorySessionStore, StoreError};

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn get(&self, _: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::NotAnObject)
        }

        async fn set(&self, _: &str, _: Value, _: bool) -> Result<(), StoreError> {
            Err(StoreError::NotAnObject)
        }
    }

    /// Holds the first write back so a later one could overtake it.
    #[derive(Default)]
    struct SlowFirstWrite {
        inner: MemorySessionStore,
        first_done: AtomicBool,
    }

    #[async_trait]
    impl SessionStore for SlowFirstWrite {
        async fn get(&self, session_id: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(session_id).await
        }

        async fn set(&self, session_id: &str, fields: Value, merge: bool) -> Result<(), StoreError> {
            if !self.first_done.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.set(session_id, fields, merge).await
        }
    }

    fn draft(code: &str) -> CourseDraft {
        CourseDraft {
            course_code: code.to_string(),
            course_name: format!("{code} course"),
            units: 4.0,
            grade: Grade::B,
            semester: "Spring 2024".to_string(),
        }
    }

    fn ctx() -> AnalysisContext {
        AnalysisContext {
            major: "Physics".to_string(),
            target_institution: "UC Irvine".to_string(),
        }
    }

    /// Lets spawned persistence tasks run on the current-thread runtime.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_session_id_validation() {
        assert!(is_valid_session_id("abc-123_XYZ"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("has space"));
        assert!(!is_valid_session_id("../etc"));
        assert!(!is_valid_session_id(&"a".repeat(129)));
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_list() {
        let registry = SessionRegistry::new(Arc::new(MemorySessionStore::new()));
        registry.add_course("s1", draft("MATH 1A")).await;
        let before = registry.courses("s1").await;

        let added = registry.add_course("s1", draft("PHYS 4A")).await;
        assert_eq!(registry.courses("s1").await.len(), 2);

        let removed = registry.remove_course("s1", added.id).await;
        assert_eq!(removed, Some(added));
        assert_eq!(registry.courses("s1").await, before);
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_none() {
        let registry = SessionRegistry::new(Arc::new(MemorySessionStore::new()));
        registry.add_course("s1", draft("MATH 1A")).await;
        assert!(registry.remove_course("s1", CourseId(1)).await.is_none());
        assert_eq!(registry.courses("s1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = SessionRegistry::new(Arc::new(MemorySessionStore::new()));
        registry.add_course("s1", draft("MATH 1A")).await;
        assert!(registry.courses("s2").await.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_are_mirrored_to_store() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = SessionRegistry::new(store.clone());

        registry.add_courses("s1", vec![draft("MATH 1A"), draft("CHEM 1A")]).await;
        registry
            .set_profile(
                "s1",
                Profile {
                    major: Some("Physics".to_string()),
                    target_institution: None,
                },
            )
            .await;
        settle().await;

        let record = store.get("s1").await.unwrap().unwrap();
        assert_eq!(record["transcript"].as_array().unwrap().len(), 2);
        assert_eq!(record["transcript"][0]["courseCode"], "MATH 1A");
        assert_eq!(record["major"], "Physics");
    }

    #[tokio::test]
    async fn test_new_registry_hydrates_from_store() {
        let store = Arc::new(MemorySessionStore::new());
        let first = SessionRegistry::new(store.clone());
        let added = first.add_course("s1", draft("MATH 1A")).await;
        let result = local_determination(&first.courses("s1").await, &ctx(), "offline");
        first.record_verification("s1", &result, &ctx()).await;
        settle().await;

        let second = SessionRegistry::new(store.clone());
        assert_eq!(second.courses("s1").await, vec![added.clone()]);
        assert_eq!(second.last_verification("s1").await, Some(result));

        // Ids keep increasing after hydration.
        let next = second.add_course("s1", draft("PHYS 4A")).await;
        assert!(next.id > added.id);

        let record = store.get("s1").await.unwrap().unwrap();
        assert_eq!(record["last_verification_major"], "Physics");
        assert!(record["last_verification_at"].is_string());
    }

    #[tokio::test]
    async fn test_unreadable_record_fields_start_empty() {
        let store = Arc::new(MemorySessionStore::new());
        store
            .set("s1", json!({"transcript": "garbage", "major": "Biology"}), true)
            .await
            .unwrap();

        let registry = SessionRegistry::new(store);
        assert!(registry.courses("s1").await.is_empty());
        assert_eq!(registry.profile("s1").await.major.as_deref(), Some("Biology"));
    }

    #[tokio::test]
    async fn test_store_failures_never_reach_caller() {
        let registry = SessionRegistry::new(Arc::new(FailingStore));
        let added = registry.add_course("s1", draft("MATH 1A")).await;
        registry.clear_courses("s1").await;
        settle().await;

        assert!(registry.courses("s1").await.is_empty());
        assert!(registry.remove_course("s1", added.id).await.is_none());
    }

    #[tokio::test]
    async fn test_slow_earlier_write_does_not_overwrite_later_one() {
        let store = Arc::new(SlowFirstWrite::default());
        let registry = SessionRegistry::new(store.clone());

        registry.add_course("s1", draft("MATH 1A")).await;
        settle().await;
        registry.add_course("s1", draft("PHYS 4A")).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let record = store.get("s1").await.unwrap().unwrap();
        assert_eq!(record["transcript"].as_array().unwrap().len(), 2);

        let restarted = SessionRegistry::new(store);
        assert_eq!(restarted.courses("s1").await.len(), 2);
    }

    #[test]
    fn test_coalesce_keeps_latest_fields_per_session() {
        let writes = vec![
            PendingWrite {
                session_id: "a".to_string(),
                fields: json!({"transcript": [1], "major": "Biology"}),
            },
            PendingWrite {
                session_id: "b".to_string(),
                fields: json!({"transcript": []}),
            },
            PendingWrite {
                session_id: "a".to_string(),
                fields: json!({"transcript": [1, 2]}),
            },
        ];

        let merged = coalesce(writes);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].session_id, "a");
        assert_eq!(merged[0].fields, json!({"transcript": [1, 2], "major": "Biology"}));
        assert_eq!(merged[1].fields, json!({"transcript": []}));
    }

    #[tokio::test]
    async fn test_reads_of_unknown_sessions_hold_nothing() {
        let registry = SessionRegistry::new(Arc::new(MemorySessionStore::new()));
        for i in 0..1000 {
            let id = format!("visitor-{i}");
            assert!(registry.courses(&id).await.is_empty());
            assert!(registry.last_verification(&id).await.is_none());
        }
        assert!(registry.sessions.read().await.is_empty());

        registry.add_course("s1", draft("MATH 1A")).await;
        assert_eq!(registry.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_read_of_stored_session_hydrates_it() {
        let store = Arc::new(MemorySessionStore::new());
        store.set("s1", json!({"major": "Biology"}), true).await.unwrap();

        let registry = SessionRegistry::new(store);
        assert_eq!(registry.profile("s1").await.major.as_deref(), Some("Biology"));
        assert!(registry.sessions.read().await.contains_key("s1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted_and_rehydrated() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = SessionRegistry::new(store);
        registry.add_course("old", draft("MATH 1A")).await;
        settle().await;

        tokio::time::advance(SESSION_IDLE_TTL + Duration::from_secs(1)).await;
        registry.add_course("new", draft("PHYS 4A")).await;

        {
            let sessions = registry.sessions.read().await;
            assert!(!sessions.contains_key("old"));
            assert!(sessions.contains_key("new"));
        }
        assert_eq!(registry.courses("old").await.len(), 1);
    }
}
