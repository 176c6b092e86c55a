//! Webhook-backed adapter
//!
//! Forwards lifecycle decisions to an operator-supplied HTTP endpoint. The
//! endpoint receives the definition, the persisted state, and a context
//! naming the requested action, and answers with log output and its
//! updated state:
//!
//! ```text
//! -> { "definition": {..}, "state": {..},
//!      "context": { "status": "absent", "action": "create", "path": "/hooks/orders" } }
//! <- { "output": ["created topic"], "state": { "existing": false, "remote_id": "topic-123" } }
//! ```
//!
//! Conventions: the endpoint signals readiness with a returned status of
//! `"ready"` and a terminal fault with `"failed"`. Delete and the two
//! checks are invoked without a definition (the envelope omits the field).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tether_core::{
    Adapter, Definition, PollConfig, RemoteCall, RemoteRequest, Result, State, TetherError,
};
use tracing::info;

const ACTION_CREATE: &str = "create";
const ACTION_UPDATE: &str = "update";
const ACTION_DELETE: &str = "delete";
const ACTION_CHECK_READINESS: &str = "check-readiness";
const ACTION_CHECK_LIVENESS: &str = "check-liveness";

/// Returned status meaning the webhook's resource is fully provisioned.
const STATUS_READY: &str = "ready";
/// Returned status meaning the webhook's resource is broken for good.
const STATUS_FAILED: &str = "failed";

#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    definition: Option<&'a Definition>,
    state: &'a State,
    context: WebhookContext,
}

#[derive(Debug, Serialize)]
struct WebhookContext {
    status: String,
    action: &'static str,
    path: String,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    output: Vec<String>,
    state: Option<State>,
}

/// An [`Adapter`] whose lifecycle logic lives in an external HTTP
/// endpoint.
pub struct WebhookAdapter<R> {
    remote: R,
    kind: String,
    path: String,
    poll: PollConfig,
}

impl<R> WebhookAdapter<R>
where
    R: RemoteCall,
{
    pub fn new(remote: R, kind: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote,
            kind: kind.into(),
            path: path.into(),
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    async fn invoke(
        &self,
        action: &'static str,
        definition: Option<&Definition>,
        state: &State,
    ) -> Result<WebhookResponse> {
        let subject = definition
            .map(|d| d.name.clone())
            .or_else(|| state.remote_id.clone())
            .unwrap_or_else(|| self.kind.clone());

        let envelope = WebhookRequest {
            definition,
            state,
            context: WebhookContext {
                status: state
                    .status
                    .clone()
                    .unwrap_or_else(|| "absent".to_string()),
                action,
                path: self.path.clone(),
            },
        };
        let request = RemoteRequest::post(self.path.clone()).with_json(&envelope)?;
        let response = self.remote.call(request).await?;
        response.error_for_status(&format!("webhook {action} for {subject}"))?;

        let decoded: WebhookResponse = response.json()?;
        for line in &decoded.output {
            info!(kind = %self.kind, action, "{line}");
        }
        Ok(decoded)
    }

    fn returned_state(
        &self,
        action: &str,
        subject: &str,
        response: WebhookResponse,
    ) -> Result<State> {
        response.state.ok_or_else(|| TetherError::Api {
            status: 200,
            message: format!("webhook {action} for {subject} returned no state"),
        })
    }
}

#[async_trait]
impl<R> Adapter for WebhookAdapter<R>
where
    R: RemoteCall,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    fn poll_config(&self) -> PollConfig {
        self.poll
    }

    async fn create(&self, definition: &Definition) -> Result<State> {
        let response = self
            .invoke(ACTION_CREATE, Some(definition), &State::default())
            .await?;
        self.returned_state(ACTION_CREATE, &definition.name, response)
    }

    async fn update(&self, definition: &Definition, state: &State) -> Result<State> {
        if !state.is_live() {
            return self.create(definition).await;
        }
        let response = self.invoke(ACTION_UPDATE, Some(definition), state).await?;
        let mut updated = self.returned_state(ACTION_UPDATE, &definition.name, response)?;
        // The endpoint cannot reclaim ownership of an adopted resource.
        updated.existing |= state.existing;
        Ok(updated)
    }

    async fn delete(&self, state: &State) -> Result<State> {
        if !state.is_live() {
            return Ok(State::default());
        }
        if state.existing {
            info!(kind = %self.kind, "Resource was adopted, leaving it in place");
            return Ok(State::default());
        }
        self.invoke(ACTION_DELETE, None, state).await?;
        Ok(State::default())
    }

    async fn check_readiness(&self, state: &mut State) -> Result<bool> {
        if !state.is_live() {
            return Ok(false);
        }
        let response = self.invoke(ACTION_CHECK_READINESS, None, state).await?;
        let Some(fresh) = response.state else {
            return Ok(false);
        };
        let existing = state.existing;
        *state = fresh;
        state.existing = existing;
        Ok(state.status.as_deref() == Some(STATUS_READY))
    }

    async fn check_liveness(&self, state: &mut State) -> Result<bool> {
        if !state.is_live() {
            return Ok(false);
        }
        let id = state.remote_id.clone().unwrap_or_default();
        let response = self.invoke(ACTION_CHECK_LIVENESS, None, state).await?;
        let Some(fresh) = response.state else {
            return Err(TetherError::Vanished(format!("{} {}", self.kind, id)));
        };
        let existing = state.existing;
        *state = fresh;
        state.existing = existing;
        if state.status.as_deref() == Some(STATUS_FAILED) {
            return Err(TetherError::Faulted {
                id,
                status: STATUS_FAILED.to_string(),
            });
        }
        Ok(state.status.as_deref() == Some(STATUS_READY))
    }
}
