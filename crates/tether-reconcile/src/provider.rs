//! Provider-specific half of a reconciling adapter
//!
//! [`crate::Reconciler`] owns the lifecycle semantics. Everything the
//! remote system dictates (how to look a resource up, what a create
//! request looks like, which statuses mean "settled") lives behind
//! [`ResourceProvider`].

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tether_core::{Definition, Observed, PollConfig, Result, State, TetherError};

/// Field-level changes between a definition and the last-observed state.
///
/// Ordered, so update requests and log lines are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    changes: BTreeMap<String, Value>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field that must change to its desired value.
    pub fn change(&mut self, field: impl Into<String>, desired: Value) {
        self.changes.insert(field.into(), desired);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn desired(&self, field: &str) -> Option<&Value> {
        self.changes.get(field)
    }
}

/// Operations a provider supplies for [`crate::Reconciler`] to manage one
/// resource kind.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Resource kind label (e.g. "topic", "database-cluster").
    fn kind(&self) -> &str;

    /// Poll schedule the host should use for readiness checks on this
    /// kind.
    fn poll_config(&self) -> PollConfig;

    /// Exact-string lookup by the resource's declared unique name. Must
    /// return `Ok(None)` only when the remote system authoritatively
    /// reports absence; any other failure must propagate as an error,
    /// because treating it as absence risks creating a duplicate. When a
    /// scan yields several matches (it should not, under correct naming)
    /// the provider returns its first.
    async fn find_by_name(&self, name: &str) -> Result<Option<Observed>>;

    /// Re-read by live identifier. Same absence contract as
    /// [`ResourceProvider::find_by_name`].
    async fn find_by_id(&self, id: &str) -> Result<Option<Observed>>;

    /// Issue the provider's create request for `definition`.
    async fn create(&self, definition: &Definition) -> Result<Observed>;

    /// Compute which fields differ between `definition` and the
    /// last-observed `state`. A desired change to a field the remote
    /// system cannot mutate after creation must fail with
    /// [`TetherError::RequiresRecreation`] instead of being dropped.
    fn diff(&self, definition: &Definition, state: &State) -> Result<Delta>;

    /// Apply a non-empty delta. Only called when
    /// [`ResourceProvider::diff`] reported changes.
    async fn apply(&self, definition: &Definition, state: &State, delta: &Delta)
    -> Result<Observed>;

    /// Issue the provider's delete request.
    async fn delete(&self, state: &State) -> Result<()>;

    /// Identifiers of remote children that block parent deletion.
    async fn children(&self, state: &State) -> Result<Vec<String>> {
        let _ = state;
        Ok(Vec::new())
    }

    /// Delete one child. Only called for providers whose
    /// [`ResourceProvider::children`] returns identifiers.
    async fn delete_child(&self, state: &State, child_id: &str) -> Result<()> {
        let _ = (state, child_id);
        Err(TetherError::Config(format!(
            "{} providers cannot delete children",
            self.kind()
        )))
    }

    /// Whether `status` is this kind's designated stable value.
    fn is_stable(&self, status: &str) -> bool;

    /// Whether `status` is a terminal failure the resource cannot leave.
    fn is_terminal(&self, status: &str) -> bool;

    /// Attributes that must be present in a read before the resource
    /// counts as ready (e.g. a connection endpoint). A stable status with
    /// any of these missing is not readiness.
    fn required_attributes(&self) -> &[&str] {
        &[]
    }
}
