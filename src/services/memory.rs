//! In-memory collaborators.
//!
//! Usable for embedding the orchestrator without external systems and as test
//! doubles. Each collaborator can be scripted to fail its next N calls or to
//! stall, which is how retry and timeout behavior is exercised.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use uuid::Uuid;

use super::audit::{AuditEvent, AuditSink};
use super::errors::{CollaboratorError, CollaboratorResult};
use super::identity::{IdentityProvider, Profile};
use super::notifier::Notifier;
use super::storage::{ApplicationDataStore, BackupVault, FileStore, SessionStore};

/// Fails the next `n` calls with a fixed error
#[derive(Debug, Default)]
struct FailureScript {
    armed: Mutex<Option<(u32, CollaboratorError)>>,
}

impl FailureScript {
    fn arm(&self, times: u32, error: CollaboratorError) {
        *self.armed.lock() = (times > 0).then_some((times, error));
    }

    fn take(&self) -> Option<CollaboratorError> {
        let mut armed = self.armed.lock();
        let (remaining, error) = armed.as_mut()?;
        let error = error.clone();
        *remaining -= 1;
        if *remaining == 0 {
            *armed = None;
        }
        Some(error)
    }
}

async fn stall(delay: &Mutex<Option<Duration>>) {
    let delay = *delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

/// Identity provider backed by a map of profiles
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Profile>>,
    export_failures: FailureScript,
    delete_failures: FailureScript,
    lookup_failures: FailureScript,
    retain_on_delete: AtomicBool,
    delete_delay: Mutex<Option<Duration>>,
    delete_calls: AtomicU32,
    lookup_calls: AtomicU32,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts<I, S>(subject_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::new();
        for subject_id in subject_ids {
            provider.insert_account(Profile::new(subject_id));
        }
        provider
    }

    pub fn insert_account(&self, profile: Profile) {
        self.accounts
            .lock()
            .insert(profile.subject_id.clone(), profile);
    }

    pub fn contains(&self, subject_id: &str) -> bool {
        self.accounts.lock().contains_key(subject_id)
    }

    pub fn fail_exports(&self, times: u32, error: CollaboratorError) {
        self.export_failures.arm(times, error);
    }

    pub fn fail_deletes(&self, times: u32, error: CollaboratorError) {
        self.delete_failures.arm(times, error);
    }

    pub fn fail_lookups(&self, times: u32, error: CollaboratorError) {
        self.lookup_failures.arm(times, error);
    }

    /// Acknowledge deletes without removing the account
    pub fn retain_accounts_on_delete(&self, retain: bool) {
        self.retain_on_delete.store(retain, Ordering::SeqCst);
    }

    pub fn set_delete_delay(&self, delay: Option<Duration>) {
        *self.delete_delay.lock() = delay;
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> u32 {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn export_profile(&self, subject_id: &str) -> CollaboratorResult<Profile> {
        if let Some(error) = self.export_failures.take() {
            return Err(error);
        }
        self.accounts
            .lock()
            .get(subject_id)
            .cloned()
            .ok_or(CollaboratorError::NotFound)
    }

    async fn delete_account(&self, subject_id: &str) -> CollaboratorResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delete_delay).await;
        if let Some(error) = self.delete_failures.take() {
            return Err(error);
        }
        if self.retain_on_delete.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.accounts
            .lock()
            .remove(subject_id)
            .map(|_| ())
            .ok_or(CollaboratorError::NotFound)
    }

    async fn get_account(&self, subject_id: &str) -> CollaboratorResult<Profile> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.lookup_failures.take() {
            return Err(error);
        }
        self.accounts
            .lock()
            .get(subject_id)
            .cloned()
            .ok_or(CollaboratorError::NotFound)
    }
}

/// Per-subject record counts; serves as a file, session, or application data store
#[derive(Debug)]
pub struct InMemorySubjectStore {
    service: &'static str,
    records: Mutex<HashMap<String, u64>>,
    failures: FailureScript,
    delay: Mutex<Option<Duration>>,
    calls: AtomicU32,
}

impl InMemorySubjectStore {
    pub fn new(service: &'static str) -> Self {
        Self {
            service,
            records: Mutex::new(HashMap::new()),
            failures: FailureScript::default(),
            delay: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn insert(&self, subject_id: impl Into<String>, count: u64) {
        *self.records.lock().entry(subject_id.into()).or_insert(0) += count;
    }

    pub fn remaining(&self, subject_id: &str) -> u64 {
        self.records.lock().get(subject_id).copied().unwrap_or(0)
    }

    pub fn fail_next(&self, times: u32, reason: impl Into<String>) {
        self.failures
            .arm(times, CollaboratorError::unavailable(self.service, reason));
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn purge(&self, subject_id: &str) -> CollaboratorResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        if let Some(error) = self.failures.take() {
            return Err(error);
        }
        Ok(self.records.lock().remove(subject_id).unwrap_or(0))
    }
}

#[async_trait]
impl FileStore for InMemorySubjectStore {
    async fn delete_user_files(&self, subject_id: &str) -> CollaboratorResult<u64> {
        self.purge(subject_id).await
    }
}

#[async_trait]
impl SessionStore for InMemorySubjectStore {
    async fn terminate_user_sessions(&self, subject_id: &str) -> CollaboratorResult<u64> {
        self.purge(subject_id).await
    }
}

#[async_trait]
impl ApplicationDataStore for InMemorySubjectStore {
    async fn delete_user_data(&self, subject_id: &str) -> CollaboratorResult<u64> {
        self.purge(subject_id).await
    }
}

/// Keeps backup archives in memory
#[derive(Debug, Default)]
pub struct InMemoryBackupVault {
    archives: Mutex<HashMap<Uuid, Vec<u8>>>,
    failures: FailureScript,
}

impl InMemoryBackupVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archive(&self, request_id: Uuid) -> Option<Vec<u8>> {
        self.archives.lock().get(&request_id).cloned()
    }

    pub fn fail_next(&self, times: u32, reason: impl Into<String>) {
        self.failures
            .arm(times, CollaboratorError::unavailable("backup_vault", reason));
    }
}

#[async_trait]
impl BackupVault for InMemoryBackupVault {
    async fn store(&self, request_id: Uuid, archive: &[u8]) -> CollaboratorResult<String> {
        if let Some(error) = self.failures.take() {
            return Err(error);
        }
        self.archives.lock().insert(request_id, archive.to_vec());
        Ok(format!("memory://backups/{request_id}"))
    }
}

/// Records every notification it is asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Uuid, String)>>,
    failures: FailureScript,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Uuid, String)> {
        self.sent.lock().clone()
    }

    pub fn sent_for(&self, request_id: Uuid) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| *id == request_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn fail_next(&self, times: u32, reason: impl Into<String>) {
        self.failures
            .arm(times, CollaboratorError::unavailable("notifier", reason));
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, request_id: Uuid, event_type: &str) -> CollaboratorResult<()> {
        if let Some(error) = self.failures.take() {
            return Err(error);
        }
        self.sent.lock().push((request_id, event_type.to_string()));
        Ok(())
    }
}

/// Append-only in-memory audit log
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, request_id: Uuid) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.request_id == Some(request_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: AuditEvent) -> CollaboratorResult<()> {
        self.events.lock().push(event);
        Ok(())
    }
}
