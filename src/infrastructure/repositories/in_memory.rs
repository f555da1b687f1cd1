//! Process-local store adapters.
//!
//! Same contracts as the sqlx adapters, backed by mutex-guarded maps. Used
//! with `STORAGE_BACKEND=memory` and throughout the test suites.

use crate::domain::{
    moderation::{
        entity::{ContentType, ModerationQueueItem, ModerationResult, QueueStatus},
        log::ModerationLogEntry,
        repository::{
            AccountActions, ContentModerationStatus, ContentStatusWriter, ModerationLogSink,
            QueueStore,
        },
    },
    reputation::{
        entity::UserReputation,
        repository::{ActivitySource, ActivityWindow, ReputationRepository},
    },
    shared::{errors::DomainError, pagination::PaginationRequest},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::InfrastructureError("in-memory store lock poisoned".into()))
}

fn fail_if(flag: &AtomicBool, what: &str) -> Result<(), DomainError> {
    if flag.load(Ordering::SeqCst) {
        return Err(DomainError::InfrastructureError(format!(
            "{} unavailable",
            what
        )));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
    items: Mutex<HashMap<Uuid, ModerationQueueItem>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn enqueue(&self, item: &ModerationQueueItem) -> Result<(), DomainError> {
        let mut items = lock(&self.items)?;
        if items.contains_key(&item.id) {
            return Err(DomainError::Conflict(format!("queue item {}", item.id)));
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ModerationQueueItem>, DomainError> {
        Ok(lock(&self.items)?.get(&id).cloned())
    }

    async fn list(
        &self,
        status: Option<QueueStatus>,
        page: &PaginationRequest,
    ) -> Result<Vec<ModerationQueueItem>, DomainError> {
        let items = lock(&self.items)?;
        let mut selected: Vec<ModerationQueueItem> = items
            .values()
            .filter(|item| status.is_none_or(|s| item.status == s))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(selected
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(0))
            .take(usize::try_from(page.limit).unwrap_or(0))
            .collect())
    }

    async fn count(&self, status: Option<QueueStatus>) -> Result<i64, DomainError> {
        let items = lock(&self.items)?;
        let n = items
            .values()
            .filter(|item| status.is_none_or(|s| item.status == s))
            .count();
        Ok(i64::try_from(n).unwrap_or(i64::MAX))
    }

    async fn fetch_pending(&self, limit: usize) -> Result<Vec<ModerationQueueItem>, DomainError> {
        let items = lock(&self.items)?;
        let mut pending: Vec<ModerationQueueItem> = items
            .values()
            .filter(|item| item.status == QueueStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.queue_order(b));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn claim(
        &self,
        ids: &[Uuid],
        claimed_at: DateTime<Utc>,
        token: Uuid,
    ) -> Result<HashSet<Uuid>, DomainError> {
        let mut items = lock(&self.items)?;
        let mut claimed = HashSet::new();
        for id in ids {
            if let Some(item) = items.get_mut(id) {
                if item.status == QueueStatus::Pending {
                    item.status = QueueStatus::Processing;
                    item.claimed_at = Some(claimed_at);
                    item.claim_token = Some(token);
                    claimed.insert(*id);
                }
            }
        }
        Ok(claimed)
    }

    async fn complete(
        &self,
        id: Uuid,
        token: Uuid,
        status: QueueStatus,
        result: &ModerationResult,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut items = lock(&self.items)?;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| DomainError::NotFound(format!("queue item {}", id)))?;
        if !holds(item, token) {
            return Err(DomainError::Conflict(format!(
                "queue item {} is no longer held by this claim",
                id
            )));
        }
        item.status = status;
        item.result = Some(result.clone());
        item.processed_at = Some(processed_at);
        Ok(())
    }

    async fn release(
        &self,
        ids: &[Uuid],
        token: Uuid,
    ) -> Result<Vec<ModerationQueueItem>, DomainError> {
        let mut items = lock(&self.items)?;
        let mut released = Vec::new();
        for id in ids {
            if let Some(item) = items.get_mut(id) {
                if holds(item, token) {
                    item.status = QueueStatus::Pending;
                    item.claimed_at = None;
                    item.claim_token = None;
                    item.retry_count += 1;
                    released.push(item.clone());
                }
            }
        }
        Ok(released)
    }

    async fn reclaim_stale(
        &self,
        claimed_before: DateTime<Utc>,
        claimed_at: DateTime<Utc>,
        token: Uuid,
    ) -> Result<Vec<ModerationQueueItem>, DomainError> {
        let mut items = lock(&self.items)?;
        let mut reclaimed = Vec::new();
        for item in items.values_mut() {
            let stale = item.status == QueueStatus::Processing
                && item.claimed_at.is_some_and(|at| at < claimed_before);
            if stale {
                item.claimed_at = Some(claimed_at);
                item.claim_token = Some(token);
                reclaimed.push(item.clone());
            }
        }
        reclaimed.sort_by(|a, b| a.queue_order(b));
        Ok(reclaimed)
    }
}

fn holds(item: &ModerationQueueItem, token: Uuid) -> bool {
    item.status == QueueStatus::Processing && item.claim_token == Some(token)
}

#[derive(Debug, Default)]
pub struct InMemoryModerationLog {
    entries: Mutex<Vec<ModerationLogEntry>>,
}

impl InMemoryModerationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ModerationLogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModerationLogSink for InMemoryModerationLog {
    async fn append(&self, entry: &ModerationLogEntry) -> Result<bool, DomainError> {
        let mut entries = lock(&self.entries)?;
        if entries.iter().any(|e| e.queue_item_id == entry.queue_item_id) {
            return Ok(false);
        }
        entries.push(entry.clone());
        Ok(true)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ModerationLogEntry>, DomainError> {
        let entries = lock(&self.entries)?;
        Ok(entries
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContentStatus {
    pub status: ContentModerationStatus,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suspension {
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Content-status and account-suspension targets, with switchable failures.
#[derive(Debug, Default)]
pub struct InMemoryContentActions {
    statuses: Mutex<HashMap<(ContentType, String), StoredContentStatus>>,
    suspensions: Mutex<HashMap<String, Suspension>>,
    fail_content_writes: AtomicBool,
    fail_suspensions: AtomicBool,
}

impl InMemoryContentActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_content_writes(&self, fail: bool) {
        self.fail_content_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_suspensions(&self, fail: bool) {
        self.fail_suspensions.store(fail, Ordering::SeqCst);
    }

    pub fn status_of(&self, content_type: ContentType, content_id: &str) -> Option<StoredContentStatus> {
        self.statuses
            .lock()
            .ok()
            .and_then(|s| s.get(&(content_type, content_id.to_string())).cloned())
    }

    pub fn suspension_of(&self, user_id: &str) -> Option<Suspension> {
        self.suspensions
            .lock()
            .ok()
            .and_then(|s| s.get(user_id).cloned())
    }
}

#[async_trait]
impl ContentStatusWriter for InMemoryContentActions {
    async fn set_moderation_status(
        &self,
        content_type: ContentType,
        content_id: &str,
        status: ContentModerationStatus,
        reason: &str,
    ) -> Result<(), DomainError> {
        fail_if(&self.fail_content_writes, "content store")?;
        lock(&self.statuses)?.insert(
            (content_type, content_id.to_string()),
            StoredContentStatus {
                status,
                reason: reason.to_string(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl AccountActions for InMemoryContentActions {
    async fn suspend_user(
        &self,
        user_id: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        fail_if(&self.fail_suspensions, "account store")?;
        lock(&self.suspensions)?.insert(
            user_id.to_string(),
            Suspension {
                reason: reason.to_string(),
                at,
            },
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryReputationRepository {
    records: Mutex<HashMap<String, UserReputation>>,
}

impl InMemoryReputationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReputationRepository for InMemoryReputationRepository {
    async fn get(&self, user_id: &str) -> Result<Option<UserReputation>, DomainError> {
        Ok(lock(&self.records)?.get(user_id).cloned())
    }

    async fn save(&self, reputation: &UserReputation) -> Result<(), DomainError> {
        lock(&self.records)?.insert(reputation.user_id.clone(), reputation.clone());
        Ok(())
    }
}

/// Fixed activity per user. Windowing is the caller's concern: the seeded
/// window is returned regardless of `since`.
#[derive(Debug, Default)]
pub struct InMemoryActivitySource {
    windows: Mutex<HashMap<String, ActivityWindow>>,
    failing_users: Mutex<HashSet<String>>,
}

impl InMemoryActivitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, user_id: &str, window: ActivityWindow) {
        if let Ok(mut windows) = self.windows.lock() {
            windows.insert(user_id.to_string(), window);
        }
    }

    pub fn fail_for(&self, user_id: &str) {
        if let Ok(mut failing) = self.failing_users.lock() {
            failing.insert(user_id.to_string());
        }
    }
}

#[async_trait]
impl ActivitySource for InMemoryActivitySource {
    async fn window(
        &self,
        user_id: &str,
        _since: DateTime<Utc>,
    ) -> Result<ActivityWindow, DomainError> {
        if lock(&self.failing_users)?.contains(user_id) {
            return Err(DomainError::InfrastructureError(format!(
                "activity unavailable for {}",
                user_id
            )));
        }
        Ok(lock(&self.windows)?.get(user_id).cloned().unwrap_or_default())
    }

    async fn user_ids(&self) -> Result<Vec<String>, DomainError> {
        let mut ids: HashSet<String> = lock(&self.windows)?.keys().cloned().collect();
        ids.extend(lock(&self.failing_users)?.iter().cloned());
        let mut ids: Vec<String> = ids.into_iter().collect();
        ids.sort();
        Ok(ids)
    }
}
