//! Pending removal proposals.
//!
//! A removal is first shown to the user as a preview and only applied once they confirm
//! it. Each outstanding preview is a proposal in a process-wide table, ending in exactly
//! one of `Confirmed`, `Cancelled` or `Expired`.
//!
//! Every transition out of `Proposed` is a single compare-and-swap, so a confirm racing
//! the expiry timer (or a cancel) has exactly one winner and the order is mutated at most
//! once. A confirm holds the proposal in `Confirming` while the removal is written; a
//! retryable store failure puts it back to `Proposed` so the user can press confirm
//! again before the deadline. Expiry is driven by a Tokio timer per proposal; when it fires the registry emits
//! an [`ExpiredProposal`] so the bot can tell the user the window closed.

use crate::{
    core::{
        aggregate::OrderAggregate,
        order::{self, OrderItemRequest},
        period::OrderPeriod,
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

/// Default time a user has to confirm a removal.
pub const DEFAULT_REMOVAL_TTL: Duration = Duration::from_secs(30);

/// How long resolved proposals are kept so late button presses get a precise answer.
const RESOLVED_RETENTION: Duration = Duration::from_secs(600);

/// Opaque identifier of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProposalHandle(pub u64);

impl fmt::Display for ProposalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a proposal. `Confirmed`, `Cancelled` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProposalState {
    /// Waiting for confirm, cancel or expiry
    Proposed = 0,
    /// A confirm is writing the removal
    Confirming = 1,
    /// The removal was applied, or failed for a reason a retry cannot fix
    Confirmed = 2,
    /// The user cancelled
    Cancelled = 3,
    /// Nobody answered within the ttl
    Expired = 4,
}

impl ProposalState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Proposed,
            1 => Self::Confirming,
            2 => Self::Confirmed,
            3 => Self::Cancelled,
            _ => Self::Expired,
        }
    }

    /// Whether the proposal can still change state.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Proposed | Self::Confirming)
    }
}

/// Sent when a proposal expires without an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredProposal {
    /// The expired proposal
    pub handle: ProposalHandle,
    /// External id of the user who requested the removal
    pub external_user_id: String,
}

/// Everything needed to apply the removal later.
#[derive(Debug, Clone)]
pub struct ProposalPayload {
    /// Internal user id
    pub user_id: i64,
    /// External id, used for notifications and ownership checks
    pub external_user_id: String,
    /// Period the preview was computed for
    pub period: OrderPeriod,
    /// Normalized removal from the preview
    pub approved: Vec<OrderItemRequest>,
}

#[derive(Debug)]
struct Proposal {
    payload: ProposalPayload,
    deadline: Instant,
    state: AtomicU8,
    outcome: tokio::sync::Mutex<Option<OrderAggregate>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Proposal {
    fn state(&self) -> ProposalState {
        ProposalState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves `from` to `to`. Returns false if the proposal is no longer in `from`.
    fn transition(&self, from: ProposalState, to: ProposalState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves `Proposed` to `to`. Returns false if another transition already won.
    fn resolve(&self, to: ProposalState) -> bool {
        self.transition(ProposalState::Proposed, to)
    }

    fn stop_timer(&self) {
        let timer = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.abort();
        }
    }
}

#[derive(Debug)]
struct Inner {
    proposals: Mutex<HashMap<ProposalHandle, Arc<Proposal>>>,
    next_handle: AtomicU64,
    expired_tx: mpsc::UnboundedSender<ExpiredProposal>,
}

impl Inner {
    fn get(&self, handle: ProposalHandle) -> Result<Arc<Proposal>> {
        self.proposals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
            .ok_or(Error::ProposalNotFound { handle: handle.0 })
    }

    /// Expires the proposal if it is still open and notifies the listener.
    fn expire(&self, handle: ProposalHandle, proposal: &Proposal) -> bool {
        if !proposal.resolve(ProposalState::Expired) {
            return false;
        }
        info!(%handle, user = %proposal.payload.external_user_id, "Removal proposal expired");
        let notice = ExpiredProposal {
            handle,
            external_user_id: proposal.payload.external_user_id.clone(),
        };
        if self.expired_tx.send(notice).is_err() {
            debug!(%handle, "No listener for expired proposals");
        }
        true
    }

    fn prune(&self, now: Instant) {
        self.proposals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, p| p.state().is_open() || p.deadline + RESOLVED_RETENTION > now);
    }
}

/// Process-wide table of removal proposals. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RemovalRegistry {
    inner: Arc<Inner>,
}

impl RemovalRegistry {
    /// Creates an empty registry and the receiver for expiry notifications.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExpiredProposal>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let registry = Self {
            inner: Arc::new(Inner {
                proposals: Mutex::new(HashMap::new()),
                next_handle: AtomicU64::new(1),
                expired_tx,
            }),
        };
        (registry, expired_rx)
    }

    /// Stores a removal awaiting confirmation and starts its expiry timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn propose(&self, payload: ProposalPayload, ttl: Duration) -> ProposalHandle {
        let now = Instant::now();
        self.inner.prune(now);

        let handle = ProposalHandle(self.inner.next_handle.fetch_add(1, Ordering::Relaxed));
        let proposal = Arc::new(Proposal {
            payload,
            deadline: now + ttl,
            state: AtomicU8::new(ProposalState::Proposed as u8),
            outcome: tokio::sync::Mutex::new(None),
            timer: Mutex::new(None),
        });

        self.inner
            .proposals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, Arc::clone(&proposal));

        let inner = Arc::clone(&self.inner);
        let timed = Arc::clone(&proposal);
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(timed.deadline).await;
            inner.expire(handle, &timed);
        });
        *proposal
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(timer);

        info!(
            %handle,
            user = %proposal.payload.external_user_id,
            ttl_secs = ttl.as_secs_f64(),
            "Removal proposed"
        );
        handle
    }

    /// Confirms a proposal and applies its removal.
    ///
    /// Confirming an already confirmed proposal returns the earlier result without
    /// touching the order again. If the removal fails with a retryable error the
    /// proposal stays open and its expiry timer keeps running.
    ///
    /// # Errors
    /// - `ProposalNotFound` for an unknown handle
    /// - `ProposalNotActive` if the proposal was cancelled, expired, or its removal
    ///   failed on an earlier confirm with a non-retryable error
    /// - any error of [`order::commit_removal`]
    pub async fn confirm(
        &self,
        db: &DatabaseConnection,
        handle: ProposalHandle,
    ) -> Result<OrderAggregate> {
        let proposal = self.inner.get(handle)?;
        let mut outcome = proposal.outcome.lock().await;
        if let Some(previous) = outcome.as_ref() {
            debug!(%handle, "Proposal already confirmed, returning previous result");
            return Ok(previous.clone());
        }

        if Instant::now() >= proposal.deadline {
            self.inner.expire(handle, &proposal);
        }
        if !proposal.resolve(ProposalState::Confirming) {
            return Err(Error::ProposalNotActive {
                state: proposal.state(),
            });
        }

        let payload = &proposal.payload;
        match order::commit_removal(db, payload.user_id, &payload.period, &payload.approved).await
        {
            Ok(result) => {
                proposal.transition(ProposalState::Confirming, ProposalState::Confirmed);
                proposal.stop_timer();
                info!(%handle, user = %payload.external_user_id, "Removal confirmed");
                *outcome = Some(result.clone());
                Ok(result)
            }
            Err(e) if e.is_retryable() => {
                proposal.transition(ProposalState::Confirming, ProposalState::Proposed);
                warn!(%handle, error = %e, "Removal hit a conflict, proposal stays open");
                // The timer skips a proposal that is mid-confirm
                if Instant::now() >= proposal.deadline {
                    self.inner.expire(handle, &proposal);
                }
                Err(e)
            }
            Err(e) => {
                proposal.transition(ProposalState::Confirming, ProposalState::Confirmed);
                proposal.stop_timer();
                warn!(%handle, error = %e, "Confirmed removal could not be applied");
                Err(e)
            }
        }
    }

    /// Cancels a proposal. The order is left untouched.
    ///
    /// # Errors
    /// `ProposalNotFound` for an unknown handle, `ProposalNotActive` if already resolved.
    pub fn cancel(&self, handle: ProposalHandle) -> Result<()> {
        let proposal = self.inner.get(handle)?;
        if !proposal.resolve(ProposalState::Cancelled) {
            return Err(Error::ProposalNotActive {
                state: proposal.state(),
            });
        }
        proposal.stop_timer();
        info!(%handle, user = %proposal.payload.external_user_id, "Removal cancelled");
        Ok(())
    }

    /// Current state of a proposal.
    ///
    /// # Errors
    /// `ProposalNotFound` for an unknown handle.
    pub fn state(&self, handle: ProposalHandle) -> Result<ProposalState> {
        Ok(self.inner.get(handle)?.state())
    }

    /// External id of the user who owns the proposal.
    ///
    /// # Errors
    /// `ProposalNotFound` for an unknown handle.
    pub fn owner(&self, handle: ProposalHandle) -> Result<String> {
        Ok(self.inner.get(handle)?.payload.external_user_id.clone())
    }
}
