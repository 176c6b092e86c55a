//! End-to-end lifecycle scenarios against an in-memory provider.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tether_core::{Adapter, Definition, Observed, PollConfig, Result, State, TetherError};
use tether_reconcile::{Delta, Reconciler, ResourceProvider};

#[derive(Clone, Debug)]
struct RemoteResource {
    id: String,
    name: String,
    status: String,
    attributes: HashMap<String, Value>,
    children: Vec<String>,
}

impl RemoteResource {
    fn observed(&self) -> Observed {
        let mut observed = Observed::new(&self.id, &self.name).with_status(&self.status);
        observed.attributes = self.attributes.clone();
        observed
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ConflictMode {
    /// Create conflicts, and the conflicting resource is findable by name.
    Adoptable,
    /// Create conflicts but nothing shows up in the lookup.
    Phantom,
}

/// Fake database-cluster provider: clusters are stable at "available",
/// fail terminally at "failed", expose an "endpoint" attribute once fully
/// provisioned, and can own child replicas that block deletion.
struct FakeProvider {
    resources: Mutex<HashMap<String, RemoteResource>>,
    next_id: AtomicUsize,
    create_calls: AtomicUsize,
    apply_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    delete_log: Mutex<Vec<String>>,
    conflict: Mutex<Option<ConflictMode>>,
    keep_children: AtomicBool,
    initial_status: String,
}

impl FakeProvider {
    fn new() -> Self {
        Self::with_initial_status("available")
    }

    fn with_initial_status(status: &str) -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            apply_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            delete_log: Mutex::new(Vec::new()),
            conflict: Mutex::new(None),
            keep_children: AtomicBool::new(false),
            initial_status: status.to_string(),
        }
    }

    fn fresh_id(&self) -> String {
        format!("cluster-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn seed(&self, name: &str, status: &str) -> String {
        let id = self.fresh_id();
        let resource = RemoteResource {
            id: id.clone(),
            name: name.to_string(),
            status: status.to_string(),
            attributes: HashMap::new(),
            children: Vec::new(),
        };
        self.resources.lock().unwrap().insert(id.clone(), resource);
        id
    }

    fn set_status(&self, id: &str, status: &str) {
        let mut resources = self.resources.lock().unwrap();
        resources.get_mut(id).unwrap().status = status.to_string();
    }

    fn set_attribute(&self, id: &str, key: &str, value: Value) {
        let mut resources = self.resources.lock().unwrap();
        resources.get_mut(id).unwrap().attributes.insert(key.to_string(), value);
    }

    fn set_children(&self, id: &str, children: &[&str]) {
        let mut resources = self.resources.lock().unwrap();
        resources.get_mut(id).unwrap().children =
            children.iter().map(|c| c.to_string()).collect();
    }

    fn remove(&self, id: &str) {
        self.resources.lock().unwrap().remove(id);
    }

    fn contains(&self, id: &str) -> bool {
        self.resources.lock().unwrap().contains_key(id)
    }

    fn arm_conflict(&self, mode: ConflictMode) {
        *self.conflict.lock().unwrap() = Some(mode);
    }
}

#[async_trait]
impl ResourceProvider for FakeProvider {
    fn kind(&self) -> &str {
        "database-cluster"
    }

    fn poll_config(&self) -> PollConfig {
        PollConfig::new(0, 0, 5)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Observed>> {
        let resources = self.resources.lock().unwrap();
        Ok(resources
            .values()
            .find(|r| r.name == name)
            .map(RemoteResource::observed))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Observed>> {
        let resources = self.resources.lock().unwrap();
        Ok(resources.get(id).map(RemoteResource::observed))
    }

    async fn create(&self, definition: &Definition) -> Result<Observed> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(mode) = self.conflict.lock().unwrap().take() {
            if mode == ConflictMode::Adoptable {
                self.seed(&definition.name, "available");
            }
            return Err(TetherError::Conflict(definition.name.clone()));
        }

        let id = self.fresh_id();
        let mut attributes = HashMap::new();
        for field in ["display_name", "region"] {
            if let Some(value) = definition.config.get(field) {
                attributes.insert(field.to_string(), value.clone());
            }
        }
        let resource = RemoteResource {
            id: id.clone(),
            name: definition.name.clone(),
            status: self.initial_status.clone(),
            attributes,
            children: Vec::new(),
        };
        let observed = resource.observed();
        self.resources.lock().unwrap().insert(id, resource);
        Ok(observed)
    }

    fn diff(&self, definition: &Definition, state: &State) -> Result<Delta> {
        // The region is fixed at creation time.
        if let (Some(desired), Some(observed)) = (
            definition.config.get("region"),
            state.attributes.get("region"),
        ) && desired != observed
        {
            return Err(TetherError::RequiresRecreation {
                field: "region".to_string(),
            });
        }

        let mut delta = Delta::new();
        if let Some(desired) = definition.config.get("display_name")
            && state.attributes.get("display_name") != Some(desired)
        {
            delta.change("display_name", desired.clone());
        }
        Ok(delta)
    }

    async fn apply(
        &self,
        _definition: &Definition,
        state: &State,
        delta: &Delta,
    ) -> Result<Observed> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        let id = state.remote_id.clone().unwrap();
        let mut resources = self.resources.lock().unwrap();
        let resource = resources
            .get_mut(&id)
            .ok_or_else(|| TetherError::NotFound(id.clone()))?;
        for field in delta.fields() {
            if let Some(desired) = delta.desired(field) {
                resource.attributes.insert(field.to_string(), desired.clone());
            }
        }
        Ok(resource.observed())
    }

    async fn delete(&self, state: &State) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let id = state.remote_id.clone().unwrap();
        self.delete_log.lock().unwrap().push(format!("parent:{id}"));
        self.resources.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn children(&self, state: &State) -> Result<Vec<String>> {
        let id = state.remote_id.clone().unwrap();
        let resources = self.resources.lock().unwrap();
        Ok(resources
            .get(&id)
            .map(|r| r.children.clone())
            .unwrap_or_default())
    }

    async fn delete_child(&self, state: &State, child_id: &str) -> Result<()> {
        let id = state.remote_id.clone().unwrap();
        self.delete_log.lock().unwrap().push(format!("child:{child_id}"));
        if !self.keep_children.load(Ordering::SeqCst) {
            let mut resources = self.resources.lock().unwrap();
            if let Some(parent) = resources.get_mut(&id) {
                parent.children.retain(|c| c != child_id);
            }
        }
        Ok(())
    }

    fn is_stable(&self, status: &str) -> bool {
        status == "available"
    }

    fn is_terminal(&self, status: &str) -> bool {
        status == "failed"
    }

    fn required_attributes(&self) -> &[&str] {
        &["endpoint"]
    }
}

fn cluster_definition(name: &str) -> Definition {
    Definition::new("database-cluster", name)
        .with_config(json!({"display_name": "Orders", "region": "fra1"}))
}

fn quick_drain() -> PollConfig {
    PollConfig::new(0, 0, 3)
}

#[tokio::test]
async fn test_create_then_recreate_adopts() {
    let adapter = Reconciler::new(FakeProvider::new());
    let definition = cluster_definition("orders-db");

    let first = adapter.create(&definition).await.unwrap();
    assert!(!first.existing);
    assert_eq!(first.remote_id.as_deref(), Some("cluster-1"));

    // A second create (state lost, host restarted) must adopt, not POST.
    let second = adapter.create(&definition).await.unwrap();
    assert!(second.existing);
    assert_eq!(second.remote_id, first.remote_id);
    assert_eq!(adapter.provider().create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_adopted_resource_is_never_deleted() {
    let adapter = Reconciler::new(FakeProvider::new());
    let id = adapter.provider().seed("orders-db", "available");

    let state = adapter.create(&cluster_definition("orders-db")).await.unwrap();
    assert!(state.existing);

    let cleared = adapter.delete(&state).await.unwrap();
    assert_eq!(cleared, State::default());
    assert_eq!(adapter.provider().delete_calls.load(Ordering::SeqCst), 0);
    assert!(adapter.provider().contains(&id));
}

#[tokio::test]
async fn test_created_resource_is_deleted_exactly_once() {
    let adapter = Reconciler::new(FakeProvider::new());

    let state = adapter.create(&cluster_definition("orders-db")).await.unwrap();
    assert!(!state.existing);
    let id = state.remote_id.clone().unwrap();

    let cleared = adapter.delete(&state).await.unwrap();
    assert_eq!(cleared, State::default());
    assert_eq!(adapter.provider().delete_calls.load(Ordering::SeqCst), 1);
    assert!(!adapter.provider().contains(&id));
}

#[tokio::test]
async fn test_delete_without_identifier_is_a_noop() {
    let adapter = Reconciler::new(FakeProvider::new());

    let cleared = adapter.delete(&State::default()).await.unwrap();
    assert_eq!(cleared, State::default());
    assert_eq!(adapter.provider().delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_identical_definition_update_is_noop() {
    let adapter = Reconciler::new(FakeProvider::new());
    let definition = cluster_definition("orders-db");

    let state = adapter.create(&definition).await.unwrap();
    let updated = adapter.update(&definition, &state).await.unwrap();

    assert_eq!(updated, state);
    assert_eq!(adapter.provider().apply_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_applies_changed_fields() {
    let adapter = Reconciler::new(FakeProvider::new());
    let state = adapter.create(&cluster_definition("orders-db")).await.unwrap();

    let renamed = Definition::new("database-cluster", "orders-db")
        .with_config(json!({"display_name": "Orders (EU)", "region": "fra1"}));
    let updated = adapter.update(&renamed, &state).await.unwrap();

    assert_eq!(adapter.provider().apply_calls.load(Ordering::SeqCst), 1);
    assert_eq!(updated.remote_id, state.remote_id);
    assert!(!updated.existing);
    assert_eq!(
        updated.get_attribute::<String>("display_name").as_deref(),
        Some("Orders (EU)")
    );
}

#[tokio::test]
async fn test_immutable_field_change_requires_recreation() {
    let adapter = Reconciler::new(FakeProvider::new());
    let state = adapter.create(&cluster_definition("orders-db")).await.unwrap();

    let moved = Definition::new("database-cluster", "orders-db")
        .with_config(json!({"display_name": "Orders", "region": "nyc3"}));
    let err = adapter.update(&moved, &state).await.unwrap_err();

    assert!(matches!(
        err,
        TetherError::RequiresRecreation { field } if field == "region"
    ));
    assert_eq!(adapter.provider().apply_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_without_identifier_creates() {
    let adapter = Reconciler::new(FakeProvider::new());
    let definition = cluster_definition("orders-db");

    let state = adapter.update(&definition, &State::default()).await.unwrap();

    assert!(state.is_live());
    assert!(!state.existing);
    assert_eq!(adapter.provider().create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_create_conflict_adopts_after_one_retry() {
    let adapter = Reconciler::new(FakeProvider::new());
    adapter.provider().arm_conflict(ConflictMode::Adoptable);

    let state = adapter.create(&cluster_definition("orders-db")).await.unwrap();

    assert!(state.existing);
    assert!(state.is_live());
    assert_eq!(adapter.provider().create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_create_conflict_without_adoptable_resource_fails() {
    let adapter = Reconciler::new(FakeProvider::new());
    adapter.provider().arm_conflict(ConflictMode::Phantom);

    let err = adapter.create(&cluster_definition("orders-db")).await.unwrap_err();
    assert!(matches!(err, TetherError::Conflict(_)));
}

#[tokio::test]
async fn test_readiness_requires_endpoint_attribute() {
    let adapter = Reconciler::new(FakeProvider::new());
    let mut state = adapter.create(&cluster_definition("orders-db")).await.unwrap();
    let id = state.remote_id.clone().unwrap();

    // Status is already "available" but the endpoint has not appeared.
    assert!(!adapter.check_readiness(&mut state).await.unwrap());

    adapter
        .provider()
        .set_attribute(&id, "endpoint", json!("orders-db.example.net:5432"));
    assert!(adapter.check_readiness(&mut state).await.unwrap());
}

#[tokio::test]
async fn test_readiness_false_while_provisioning() {
    let adapter = Reconciler::new(FakeProvider::with_initial_status("provisioning"));
    let mut state = adapter.create(&cluster_definition("orders-db")).await.unwrap();
    let id = state.remote_id.clone().unwrap();

    assert!(!adapter.check_readiness(&mut state).await.unwrap());

    adapter.provider().set_status(&id, "available");
    adapter
        .provider()
        .set_attribute(&id, "endpoint", json!("orders-db.example.net:5432"));
    assert!(adapter.check_readiness(&mut state).await.unwrap());
}

#[tokio::test]
async fn test_readiness_without_identifier_is_false() {
    let adapter = Reconciler::new(FakeProvider::new());
    let mut state = State::default();

    assert!(!adapter.check_readiness(&mut state).await.unwrap());
}

#[tokio::test]
async fn test_terminal_status_reads_not_ready_but_faults_liveness() {
    let adapter = Reconciler::new(FakeProvider::new());
    let mut state = adapter.create(&cluster_definition("orders-db")).await.unwrap();
    let id = state.remote_id.clone().unwrap();
    adapter.provider().set_status(&id, "failed");

    // Readiness polls patiently; liveness raises.
    assert!(!adapter.check_readiness(&mut state).await.unwrap());
    let err = adapter.check_liveness(&mut state).await.unwrap_err();
    assert!(matches!(err, TetherError::Faulted { status, .. } if status == "failed"));
}

#[tokio::test]
async fn test_liveness_raises_for_vanished_resource() {
    let adapter = Reconciler::new(FakeProvider::new());
    let mut state = adapter.create(&cluster_definition("orders-db")).await.unwrap();
    let id = state.remote_id.clone().unwrap();
    adapter.provider().remove(&id);

    assert!(!adapter.check_readiness(&mut state).await.unwrap());
    let err = adapter.check_liveness(&mut state).await.unwrap_err();
    assert!(matches!(err, TetherError::Vanished(_)));
}

#[tokio::test]
async fn test_liveness_true_for_settled_resource() {
    let adapter = Reconciler::new(FakeProvider::new());
    let mut state = adapter.create(&cluster_definition("orders-db")).await.unwrap();
    let id = state.remote_id.clone().unwrap();
    adapter
        .provider()
        .set_attribute(&id, "endpoint", json!("orders-db.example.net:5432"));

    assert!(adapter.check_liveness(&mut state).await.unwrap());
}

#[tokio::test]
async fn test_readiness_refreshes_observed_state() {
    let adapter = Reconciler::new(FakeProvider::with_initial_status("provisioning"));
    let mut state = adapter.create(&cluster_definition("orders-db")).await.unwrap();
    let id = state.remote_id.clone().unwrap();

    adapter.provider().set_status(&id, "available");
    adapter
        .provider()
        .set_attribute(&id, "endpoint", json!("orders-db.example.net:5432"));
    adapter.check_readiness(&mut state).await.unwrap();

    assert_eq!(state.status.as_deref(), Some("available"));
    assert_eq!(
        state.get_attribute::<String>("endpoint").as_deref(),
        Some("orders-db.example.net:5432")
    );
    assert!(!state.existing);
}

#[tokio::test]
async fn test_children_deleted_before_parent() {
    let adapter = Reconciler::new(FakeProvider::new()).with_child_drain(quick_drain());
    let state = adapter.create(&cluster_definition("orders-project")).await.unwrap();
    let id = state.remote_id.clone().unwrap();
    adapter.provider().set_children(&id, &["db-1", "db-2"]);

    adapter.delete(&state).await.unwrap();

    let log = adapter.provider().delete_log.lock().unwrap().clone();
    assert_eq!(
        log,
        vec![
            "child:db-1".to_string(),
            "child:db-2".to_string(),
            format!("parent:{id}"),
        ]
    );
}

#[tokio::test]
async fn test_parent_delete_proceeds_when_children_never_drain() {
    let adapter = Reconciler::new(FakeProvider::new()).with_child_drain(quick_drain());
    let state = adapter.create(&cluster_definition("orders-project")).await.unwrap();
    let id = state.remote_id.clone().unwrap();
    adapter.provider().set_children(&id, &["db-1"]);
    adapter.provider().keep_children.store(true, Ordering::SeqCst);

    // The drain window closes without the children going away; the parent
    // delete is still attempted and its outcome is what surfaces.
    let cleared = adapter.delete(&state).await.unwrap();
    assert_eq!(cleared, State::default());
    assert_eq!(adapter.provider().delete_calls.load(Ordering::SeqCst), 1);
}
