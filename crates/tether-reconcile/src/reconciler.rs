//! The lifecycle reconciliation engine

use crate::provider::ResourceProvider;
use async_trait::async_trait;
use tether_core::{Adapter, Definition, Observed, PollConfig, Result, State, TetherError};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Default schedule for waiting on child deletion during a parent delete:
/// ten seconds between checks, thirty checks, five minutes in total.
const CHILD_DRAIN: PollConfig = PollConfig::new(0, 10, 30);

/// Generic lifecycle engine over a [`ResourceProvider`].
///
/// Implements the full [`Adapter`] contract: lookup-before-create with
/// adoption, a single adoption retry on create conflicts, delta-gated
/// updates, ownership-guarded deletion with children drained first, and
/// the readiness/liveness poll steps.
pub struct Reconciler<P> {
    provider: P,
    child_drain: PollConfig,
}

impl<P> Reconciler<P>
where
    P: ResourceProvider,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            child_drain: CHILD_DRAIN,
        }
    }

    /// Override the child-drain schedule. Mostly for tests and for
    /// providers whose children disappear much faster or slower than the
    /// default window.
    pub fn with_child_drain(mut self, schedule: PollConfig) -> Self {
        self.child_drain = schedule;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn readiness_of(&self, observed: &Observed) -> bool {
        let Some(status) = observed.status.as_deref() else {
            return false;
        };
        if self.provider.is_terminal(status) || !self.provider.is_stable(status) {
            return false;
        }
        // A stable status with missing derived attributes is not ready:
        // dependents need the endpoint, not just the status.
        self.provider
            .required_attributes()
            .iter()
            .all(|attr| observed.attributes.get(*attr).is_some_and(|v| !v.is_null()))
    }

    async fn adopt_after_conflict(&self, definition: &Definition) -> Result<State> {
        match self.provider.find_by_name(&definition.name).await? {
            Some(found) => {
                info!(
                    kind = self.provider.kind(),
                    name = %definition.name,
                    id = %found.id,
                    "Create conflicted, adopting the resource the remote reported"
                );
                Ok(State::adopted(found))
            }
            None => Err(TetherError::Conflict(format!(
                "{} '{}' was reported as already existing but cannot be found by name",
                self.provider.kind(),
                definition.name
            ))),
        }
    }

    async fn drain_children(&self, state: &State) -> Result<()> {
        let children = self.provider.children(state).await?;
        if children.is_empty() {
            return Ok(());
        }

        info!(
            kind = self.provider.kind(),
            count = children.len(),
            "Deleting children before parent"
        );
        for child_id in &children {
            self.provider.delete_child(state, child_id).await?;
        }

        // Children disappear asynchronously; wait until the remote reports
        // none remain, then give up and let the parent delete surface any
        // dependency error itself.
        let schedule = self.child_drain;
        sleep(schedule.initial_delay()).await;
        for attempt in 0..schedule.attempts {
            let remaining = self.provider.children(state).await?;
            if remaining.is_empty() {
                return Ok(());
            }
            debug!(
                kind = self.provider.kind(),
                attempt,
                remaining = remaining.len(),
                "Children still present"
            );
            if attempt + 1 < schedule.attempts {
                sleep(schedule.period()).await;
            }
        }

        warn!(
            kind = self.provider.kind(),
            "Children remain after the drain window, proceeding with parent delete"
        );
        Ok(())
    }
}

#[async_trait]
impl<P> Adapter for Reconciler<P>
where
    P: ResourceProvider,
{
    fn kind(&self) -> &str {
        self.provider.kind()
    }

    fn poll_config(&self) -> PollConfig {
        self.provider.poll_config()
    }

    async fn create(&self, definition: &Definition) -> Result<State> {
        // Lookup before create: the resource may already exist, from an
        // earlier pass whose state was lost or from outside this adapter.
        if let Some(found) = self.provider.find_by_name(&definition.name).await? {
            info!(
                kind = self.provider.kind(),
                name = %definition.name,
                id = %found.id,
                "Found existing resource, adopting"
            );
            return Ok(State::adopted(found));
        }

        match self.provider.create(definition).await {
            Ok(observed) => {
                info!(
                    kind = self.provider.kind(),
                    name = %definition.name,
                    id = %observed.id,
                    "Created resource"
                );
                Ok(State::created(observed))
            }
            // The resource appeared between lookup and create; re-attempt
            // adoption exactly once.
            Err(TetherError::Conflict(_)) => self.adopt_after_conflict(definition).await,
            Err(e) => Err(e),
        }
    }

    async fn update(&self, definition: &Definition, state: &State) -> Result<State> {
        if !state.is_live() {
            debug!(
                kind = self.provider.kind(),
                name = %definition.name,
                "No live identifier, updating via create"
            );
            return self.create(definition).await;
        }

        let delta = self.provider.diff(definition, state)?;
        if delta.is_empty() {
            debug!(
                kind = self.provider.kind(),
                name = %definition.name,
                "Definition matches observed state, nothing to update"
            );
            return Ok(state.clone());
        }

        info!(
            kind = self.provider.kind(),
            name = %definition.name,
            fields = delta.len(),
            "Applying update"
        );
        let observed = self.provider.apply(definition, state, &delta).await?;
        let mut updated = state.clone();
        updated.absorb(&observed);
        Ok(updated)
    }

    async fn delete(&self, state: &State) -> Result<State> {
        let Some(id) = state.remote_id.as_deref() else {
            debug!(kind = self.provider.kind(), "No live identifier, nothing to delete");
            return Ok(State::default());
        };

        if state.existing {
            // Adopted resources are never deleted remotely.
            info!(
                kind = self.provider.kind(),
                id,
                "Resource was adopted, leaving it in place"
            );
            return Ok(State::default());
        }

        self.drain_children(state).await?;
        self.provider.delete(state).await?;
        info!(kind = self.provider.kind(), id, "Deleted resource");
        Ok(State::default())
    }

    async fn check_readiness(&self, state: &mut State) -> Result<bool> {
        let Some(id) = state.remote_id.clone() else {
            return Ok(false);
        };
        let Some(observed) = self.provider.find_by_id(&id).await? else {
            debug!(
                kind = self.provider.kind(),
                id = %id,
                "Resource not found during readiness check"
            );
            return Ok(false);
        };
        state.absorb(&observed);
        Ok(self.readiness_of(&observed))
    }

    async fn check_liveness(&self, state: &mut State) -> Result<bool> {
        let Some(id) = state.remote_id.clone() else {
            return Ok(false);
        };
        let Some(observed) = self.provider.find_by_id(&id).await? else {
            return Err(TetherError::Vanished(format!(
                "{} {}",
                self.provider.kind(),
                id
            )));
        };
        state.absorb(&observed);
        if let Some(status) = observed.status.as_deref()
            && self.provider.is_terminal(status)
        {
            return Err(TetherError::Faulted {
                id,
                status: status.to_string(),
            });
        }
        Ok(self.readiness_of(&observed))
    }
}
