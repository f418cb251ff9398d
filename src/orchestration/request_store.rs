//! # Deletion Request Store
//!
//! Live requests and their FIFO queue sit behind one mutex so enqueue,
//! claim, and cancel are atomic with respect to each other. History has its
//! own lock; pruning never waits on pipeline mutation. When both locks are
//! needed they are taken live first, then history, so a finishing request
//! is always visible in exactly one of the two.
//!
//! History is bounded by entry count, but the cooldown anchor of each
//! subject (its latest `requested_at`) is kept apart from the entries and
//! only dropped by retention pruning.
//!
//! Reads always hand out clones. The only writer of an `in_progress` request
//! is the queue processor, which pushes its working copy back via
//! [`RequestStore::update`].

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};
use uuid::Uuid;

use super::request_validator::RequestValidator;
use crate::error::{ConflictError, ErasureError};
use crate::models::DeletionRequest;
use crate::state_machine::{DeletionStatus, RequestEvent, RequestStateMachine};

#[derive(Debug, Default)]
struct LiveState {
    requests: HashMap<Uuid, DeletionRequest>,
    queue: VecDeque<Uuid>,
}

impl LiveState {
    fn active_for_subject(&self, subject_id: &str) -> Option<&DeletionRequest> {
        self.requests
            .values()
            .find(|request| request.subject_id == subject_id && request.is_active())
    }
}

#[derive(Debug, Default)]
struct HistoryState {
    entries: VecDeque<DeletionRequest>,
    /// Latest `requested_at` per subject, untouched by count-based eviction
    last_requested: HashMap<String, DateTime<Utc>>,
}

impl HistoryState {
    fn find(&self, request_id: Uuid) -> Option<&DeletionRequest> {
        self.entries
            .iter()
            .find(|request| request.request_id == request_id)
    }

    fn push(&mut self, request: DeletionRequest, max_entries: usize) {
        let requested_at = request.requested_at();
        self.last_requested
            .entry(request.subject_id.clone())
            .and_modify(|latest| *latest = (*latest).max(requested_at))
            .or_insert(requested_at);

        self.entries.push_back(request);
        while self.entries.len() > max_entries {
            if let Some(evicted) = self.entries.pop_front() {
                debug!(request_id = %evicted.request_id, "History full, evicted oldest entry");
            }
        }
    }
}

/// Result of asking the store for the next queued request
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// Queue was empty
    Empty,
    /// A queued id had no live pending request behind it
    Missing(Uuid),
    /// The request was dequeued and is now `in_progress`
    Claimed(DeletionRequest),
}

#[derive(Debug)]
pub struct RequestStore {
    live: Mutex<LiveState>,
    history: RwLock<HistoryState>,
    history_max_entries: usize,
    admission: RequestValidator,
}

impl RequestStore {
    /// `admission` supplies the conflict rules re-checked on every insert
    pub fn new(history_max_entries: usize, admission: RequestValidator) -> Self {
        Self {
            live: Mutex::new(LiveState::default()),
            history: RwLock::new(HistoryState::default()),
            history_max_entries: history_max_entries.max(1),
            admission,
        }
    }

    /// Insert a pending request and enqueue it.
    ///
    /// Re-checks the active-request and cooldown rules under the live lock,
    /// as of the request's own `requested_at`, so concurrent submissions and
    /// a request finishing mid-submission cannot slip a second one in.
    pub fn create(&self, request: DeletionRequest) -> Result<(), ConflictError> {
        let mut live = self.live.lock();
        let active: Vec<DeletionRequest> = live
            .active_for_subject(&request.subject_id)
            .cloned()
            .into_iter()
            .collect();
        let last_requested_at = self
            .history
            .read()
            .last_requested
            .get(&request.subject_id)
            .copied();
        self.admission
            .check_conflicts(&active, last_requested_at, request.requested_at())?;

        let request_id = request.request_id;
        live.requests.insert(request_id, request);
        live.queue.push_back(request_id);
        debug!(request_id = %request_id, queued = live.queue.len(), "Request enqueued");
        Ok(())
    }

    /// Snapshot of a live or historical request
    pub fn get(&self, request_id: Uuid) -> Option<DeletionRequest> {
        let live = self.live.lock();
        if let Some(request) = live.requests.get(&request_id) {
            return Some(request.clone());
        }
        self.history.read().find(request_id).cloned()
    }

    /// Dequeue the oldest id and start its request
    pub fn claim_next(&self, at: DateTime<Utc>) -> Claim {
        let mut live = self.live.lock();
        let Some(request_id) = live.queue.pop_front() else {
            return Claim::Empty;
        };

        let Some(request) = live.requests.get_mut(&request_id) else {
            return Claim::Missing(request_id);
        };

        match RequestStateMachine::transition(request, RequestEvent::Start, at) {
            Ok(_) => Claim::Claimed(request.clone()),
            Err(err) => {
                warn!(request_id = %request_id, error = %err, "Queued request could not be started");
                Claim::Missing(request_id)
            }
        }
    }

    /// Write back a working copy; ignored unless the request is still live
    pub fn update(&self, request: &DeletionRequest) -> bool {
        let mut live = self.live.lock();
        match live.requests.get_mut(&request.request_id) {
            Some(slot) => {
                *slot = request.clone();
                true
            }
            None => false,
        }
    }

    /// Remove a terminal request from the live map and append it to history
    pub fn move_to_history(&self, request_id: Uuid) -> Option<DeletionRequest> {
        let mut live = self.live.lock();
        live.queue.retain(|id| *id != request_id);
        let request = live.requests.remove(&request_id)?;
        self.history
            .write()
            .push(request.clone(), self.history_max_entries);
        Some(request)
    }

    /// Cancel a pending request on behalf of `cancelled_by`
    pub fn cancel(
        &self,
        request_id: Uuid,
        cancelled_by: &str,
        at: DateTime<Utc>,
    ) -> Result<DeletionRequest, ErasureError> {
        let mut live = self.live.lock();
        let Some(request) = live.requests.get_mut(&request_id) else {
            return Err(match self.history.read().find(request_id) {
                Some(settled) => ConflictError::IllegalCancellation {
                    request_id,
                    status: settled.status,
                }
                .into(),
                None => ErasureError::RequestNotFound(request_id),
            });
        };

        if request.status != DeletionStatus::Pending {
            return Err(ConflictError::IllegalCancellation {
                request_id,
                status: request.status,
            }
            .into());
        }

        RequestStateMachine::transition(request, RequestEvent::Cancel, at)?;
        request.cancelled_by = Some(cancelled_by.to_string());

        live.queue.retain(|id| *id != request_id);
        let cancelled = live
            .requests
            .remove(&request_id)
            .ok_or(ErasureError::RequestNotFound(request_id))?;
        self.history
            .write()
            .push(cancelled.clone(), self.history_max_entries);
        Ok(cancelled)
    }

    pub fn list_active_by_subject(&self, subject_id: &str) -> Vec<DeletionRequest> {
        self.live
            .lock()
            .requests
            .values()
            .filter(|request| request.subject_id == subject_id && request.is_active())
            .cloned()
            .collect()
    }

    /// Latest `requested_at` among the subject's settled requests, if still retained
    pub fn last_requested_at(&self, subject_id: &str) -> Option<DateTime<Utc>> {
        self.history.read().last_requested.get(subject_id).copied()
    }

    /// Drop history entries that reached their terminal status before `older_than`.
    ///
    /// Cooldown anchors requested before `older_than` go too; retention is
    /// never shorter than the cooldown, so those no longer block anything.
    pub fn prune_history(&self, older_than: DateTime<Utc>) -> usize {
        let mut history = self.history.write();
        let before = history.entries.len();
        history.entries.retain(|request| {
            request
                .terminal_at()
                .map_or(true, |terminal_at| terminal_at >= older_than)
        });
        history
            .last_requested
            .retain(|_, requested_at| *requested_at >= older_than);
        before - history.entries.len()
    }

    pub fn active_count(&self) -> usize {
        self.live.lock().requests.len()
    }

    pub fn queued_count(&self) -> usize {
        self.live.lock().queue.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().entries.len()
    }

    /// Active requests past their estimated completion time
    pub fn overdue_count(&self, now: DateTime<Utc>) -> usize {
        self.live
            .lock()
            .requests
            .values()
            .filter(|request| request.is_overdue(now))
            .count()
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_HISTORY_MAX_ENTRIES,
            RequestValidator::default(),
        )
    }
}
