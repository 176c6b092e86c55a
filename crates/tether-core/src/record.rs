//! The desired/observed record pair every adapter operates over

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Desired configuration for one resource instance, supplied by the
/// operator. Immutable for the duration of a reconciliation pass.
///
/// `config` carries the provider-specific desired settings. It may name
/// secrets held in the secret store but never contains secret values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Resource kind (e.g. "topic", "database-cluster").
    pub kind: String,

    /// Unique remote name, used for lookup-before-create.
    pub name: String,

    /// Provider-specific desired configuration.
    #[serde(default)]
    pub config: Value,
}

impl Definition {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            config: Value::Null,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Get a configuration value as a specific type.
    pub fn config_field<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// One remote read of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observed {
    /// Provider-assigned identifier.
    pub id: String,

    /// Remote name.
    pub name: String,

    /// Remote status, when the provider reports one.
    pub status: Option<String>,

    /// Attributes of interest to dependent resources (endpoints, ARNs).
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Observed {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Observed configuration for one resource instance, persisted by the host
/// between reconciliation passes and mutated only by its adapter's
/// operations.
///
/// A `State` without a live identifier means the resource does not exist
/// from this adapter's point of view, whatever the definition says.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// True iff the resource was already present in the remote system when
    /// `create` ran (the adoption path). Set once at creation time, never
    /// flipped by update, cleared only by successful deletion. An adapter
    /// must never delete a resource it did not create.
    pub existing: bool,

    /// Live remote identifier.
    pub remote_id: Option<String>,

    /// Last observed remote status.
    pub status: Option<String>,

    /// Denormalized observed attributes. A cache of the last successful
    /// read, not a source of truth.
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl State {
    /// State for a resource discovered already present (adoption).
    pub fn adopted(observed: Observed) -> Self {
        Self::from_observed(observed, true)
    }

    /// State for a resource this adapter created.
    pub fn created(observed: Observed) -> Self {
        Self::from_observed(observed, false)
    }

    fn from_observed(observed: Observed, existing: bool) -> Self {
        Self {
            existing,
            remote_id: Some(observed.id),
            status: observed.status,
            attributes: observed.attributes,
        }
    }

    pub fn is_live(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Refresh the observed fields from a remote read. The ownership flag
    /// is left untouched.
    pub fn absorb(&mut self, observed: &Observed) {
        self.remote_id = Some(observed.id.clone());
        self.status = observed.status.clone();
        self.attributes = observed.attributes.clone();
    }

    /// Reset every field to its absent value.
    pub fn clear(&mut self) {
        *self = State::default();
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
