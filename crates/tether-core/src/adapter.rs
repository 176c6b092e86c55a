//! Host-facing lifecycle surface
//!
//! An adapter exposes five operations over one resource instance plus the
//! poll schedule its host should use. [`wait_until_ready`] implements the
//! host side of that schedule.

use crate::error::Result;
use crate::poll::PollConfig;
use crate::record::{Definition, State};
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::debug;

/// The lifecycle operations every adapter exposes to its host.
///
/// The host invokes at most one operation on a given resource instance at a
/// time; adapters perform no internal locking. A failed operation leaves
/// the caller's `State` unchanged. The readiness and liveness checks
/// refresh observed fields in place as their one documented side effect.
/// None of the operations support mid-call cancellation; an interrupted
/// create or delete is simply re-invoked, and idempotence makes that safe.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Resource kind label, used in messages and logs.
    fn kind(&self) -> &str;

    /// The schedule a host should use with [`Adapter::check_readiness`].
    fn poll_config(&self) -> PollConfig;

    /// Idempotent create-or-adopt. A resource already present under the
    /// definition's name is adopted without any remote mutation; repeated
    /// calls never create a duplicate.
    async fn create(&self, definition: &Definition) -> Result<State>;

    /// Converge the remote resource toward `definition`. A state without a
    /// live identifier behaves as [`Adapter::create`]; a definition that
    /// matches the observed state issues no remote writes.
    async fn update(&self, definition: &Definition, state: &State) -> Result<State>;

    /// Remove the remote resource, but only if this adapter created it,
    /// then return the cleared state.
    async fn delete(&self, state: &State) -> Result<State>;

    /// One readiness poll step: cheap, side-effect-free on desired state,
    /// safe to call repeatedly. Never raises for a resource that is merely
    /// absent or in a terminal failure status; those are `false` here and
    /// belong to [`Adapter::check_liveness`].
    async fn check_readiness(&self, state: &mut State) -> Result<bool>;

    /// Strict re-read: a resource that once existed but is now gone raises
    /// [`crate::TetherError::Vanished`], a terminal failure status raises
    /// [`crate::TetherError::Faulted`]. Otherwise interpreted as
    /// [`Adapter::check_readiness`].
    async fn check_liveness(&self, state: &mut State) -> Result<bool>;
}

/// Drive an adapter's readiness check on its declared schedule: wait the
/// initial delay, then check at most `attempts` times with `period`
/// between checks, returning early on the first `true`. Exhaustion returns
/// `false`; hard errors from a check propagate.
pub async fn wait_until_ready<A>(adapter: &A, state: &mut State) -> Result<bool>
where
    A: Adapter + ?Sized,
{
    let schedule = adapter.poll_config();
    sleep(schedule.initial_delay()).await;

    for attempt in 0..schedule.attempts {
        if adapter.check_readiness(state).await? {
            return Ok(true);
        }
        debug!(kind = adapter.kind(), attempt, "Not ready yet");
        if attempt + 1 < schedule.attempts {
            sleep(schedule.period()).await;
        }
    }

    Ok(false)
}
