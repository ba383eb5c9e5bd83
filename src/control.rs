//! Cooperative interruption for a running search.
//!
//! One status word is shared by every worker. The first source to set it
//! wins; later attempts are ignored so the reported reason never flips.
//! Searches poll [`GameControlInfo::check`] at every node and unwind with
//! `SearchError::Interrupted` once it reports a status.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::SearchError;

/// Why a search stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptionStatus {
    Cancelled,
    TimedOut,
    MoveNow,
    /// A worker failed, or the caller interrupted with a custom reason.
    Faulted,
}

const STATUS_NONE: u8 = 0;
const STATUS_CANCELLED: u8 = 1;
const STATUS_TIMED_OUT: u8 = 2;
const STATUS_MOVE_NOW: u8 = 3;
const STATUS_FAULTED: u8 = 4;

const NO_DEADLINE: u64 = u64::MAX;

impl InterruptionStatus {
    fn code(self) -> u8 {
        match self {
            InterruptionStatus::Cancelled => STATUS_CANCELLED,
            InterruptionStatus::TimedOut => STATUS_TIMED_OUT,
            InterruptionStatus::MoveNow => STATUS_MOVE_NOW,
            InterruptionStatus::Faulted => STATUS_FAULTED,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            STATUS_CANCELLED => Some(InterruptionStatus::Cancelled),
            STATUS_TIMED_OUT => Some(InterruptionStatus::TimedOut),
            STATUS_MOVE_NOW => Some(InterruptionStatus::MoveNow),
            STATUS_FAULTED => Some(InterruptionStatus::Faulted),
            _ => None,
        }
    }
}

/// Shared stop signals for one search request.
pub struct GameControlInfo {
    status: AtomicU8,
    move_now_requested: AtomicBool,
    move_now_allowed: AtomicBool,
    /// Origin for `deadline_nanos`.
    created: Instant,
    /// Nanoseconds after `created`; `NO_DEADLINE` when unlimited.
    deadline_nanos: AtomicU64,
    custom_reason: Mutex<Option<String>>,
}

impl GameControlInfo {
    pub fn new() -> Self {
        GameControlInfo {
            status: AtomicU8::new(STATUS_NONE),
            move_now_requested: AtomicBool::new(false),
            move_now_allowed: AtomicBool::new(false),
            created: Instant::now(),
            deadline_nanos: AtomicU64::new(NO_DEADLINE),
            custom_reason: Mutex::new(None),
        }
    }

    fn set_status(&self, status: InterruptionStatus) -> bool {
        self.status
            .compare_exchange(STATUS_NONE, status.code(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// The current status, if any source has stopped the search.
    pub fn status(&self) -> Option<InterruptionStatus> {
        InterruptionStatus::from_code(self.status.load(Ordering::Acquire))
    }

    /// Poll every stop source. Called at every search node.
    pub fn check(&self) -> Result<(), SearchError> {
        if let Some(status) = self.status() {
            return Err(SearchError::Interrupted(status));
        }
        if self.move_now_requested.load(Ordering::Relaxed)
            && self.move_now_allowed.load(Ordering::Relaxed)
        {
            self.set_status(InterruptionStatus::MoveNow);
        }
        let deadline = self.deadline_nanos.load(Ordering::Relaxed);
        if deadline != NO_DEADLINE && self.created.elapsed().as_nanos() >= u128::from(deadline) {
            self.set_status(InterruptionStatus::TimedOut);
        }
        match self.status() {
            Some(status) => Err(SearchError::Interrupted(status)),
            None => Ok(()),
        }
    }

    pub fn cancel(&self) {
        self.set_status(InterruptionStatus::Cancelled);
    }

    /// Ask for the best move found so far. Takes effect once a first
    /// iteration has completed; until then it stays pending.
    pub fn request_move_now(&self) {
        self.move_now_requested.store(true, Ordering::Relaxed);
    }

    pub fn allow_move_now(&self) {
        self.move_now_allowed.store(true, Ordering::Relaxed);
    }

    /// Stop the search with a caller-supplied reason.
    pub fn interrupt_with(&self, reason: impl Into<String>) {
        let mut slot = self.custom_reason.lock();
        if self.set_status(InterruptionStatus::Faulted) {
            *slot = Some(reason.into());
        }
    }

    pub fn custom_reason(&self) -> Option<String> {
        self.custom_reason.lock().clone()
    }

    /// Used by a failing worker to stop its siblings.
    pub fn abort_siblings(&self) {
        self.set_status(InterruptionStatus::Faulted);
    }

    /// Arm the deadline `budget` from now.
    pub fn start_deadline(&self, budget: Duration) {
        let deadline = self.created.elapsed().saturating_add(budget);
        let nanos = u64::try_from(deadline.as_nanos()).unwrap_or(NO_DEADLINE - 1);
        self.deadline_nanos.store(nanos.min(NO_DEADLINE - 1), Ordering::Relaxed);
    }
}

impl Default for GameControlInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GameControlInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameControlInfo")
            .field("status", &self.status())
            .field("deadline_armed", &(self.deadline_nanos.load(Ordering::Relaxed) != NO_DEADLINE))
            .finish()
    }
}
