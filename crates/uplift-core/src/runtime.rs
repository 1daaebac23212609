//! Event loop that drives the update engine against a [`Transport`].
//!
//! `dispatch` applies one event, then executes the resulting effects
//! concurrently on scoped threads. Completions re-enter as events in arrival
//! order, one transition at a time, until no effects remain.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread;

use tracing::{debug, info};

use crate::auth::{AuthContext, AuthEvent, AuthorizedRequest, Credentials, RawResponse};
use crate::config::DashboardConfig;
use crate::error::FetchError;
use crate::remote::RemoteData;
use crate::update::{Effect, Event, Model, apply};

/// The authorized-request collaborator: signs and sends requests.
pub trait Transport: Sync {
    /// Send `request`, signed with `credentials` when present.
    ///
    /// Returns `Err` only when no response was received; HTTP error statuses
    /// come back as a [`RawResponse`].
    fn send(
        &self,
        request: &AuthorizedRequest,
        credentials: Option<&Credentials>,
    ) -> Result<RawResponse, FetchError>;

    /// Verify credentials, returning the identity they belong to.
    fn check(&self, credentials: &Credentials) -> Result<String, FetchError>;
}

pub struct Runtime<T> {
    transport: T,
    model: Model,
    auth: AuthContext,
    transitions: usize,
}

impl<T: Transport> Runtime<T> {
    #[must_use]
    pub fn new(transport: T, config: DashboardConfig) -> Self {
        Self {
            transport,
            model: Model::new(config),
            auth: AuthContext::default(),
            transitions: 0,
        }
    }

    #[must_use]
    pub const fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Number of transitions applied so far.
    #[must_use]
    pub const fn transitions(&self) -> usize {
        self.transitions
    }

    /// Log in with the configured credentials, if any.
    pub fn sign_in(&mut self) -> bool {
        let Some(credentials) = self.model.config.credentials.clone() else {
            debug!("no credentials configured");
            return false;
        };
        self.dispatch(Event::Auth(AuthEvent::Login(credentials)));
        self.auth.is_verified()
    }

    /// Apply `event` and every completion it causes.
    pub fn dispatch(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let transition = apply(
                event,
                std::mem::take(&mut self.model),
                std::mem::take(&mut self.auth),
            );
            self.transitions += 1;
            self.model = transition.model;
            self.auth = transition.auth;
            queue.extend(self.run_effects(transition.effects));
        }
    }

    fn run_effects(&self, effects: Vec<Effect>) -> Vec<Event> {
        if effects.is_empty() {
            return Vec::new();
        }
        debug!(count = effects.len(), "running effects");

        let credentials = self.auth.credentials.as_ref();
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            for effect in effects {
                let tx = tx.clone();
                scope.spawn(move || {
                    let _ = tx.send(self.execute(effect, credentials));
                });
            }
        });
        drop(tx);
        rx.into_iter().collect()
    }

    fn execute(&self, effect: Effect, credentials: Option<&Credentials>) -> Event {
        match effect {
            Effect::Request(request) => {
                debug!(method = %request.method, url = %request.url, "sending request");
                let response = self.transport.send(&request, credentials);
                match &response {
                    Ok(raw) => debug!(url = %request.url, status = raw.status, "response"),
                    Err(err) => info!(url = %request.url, "request failed: {err}"),
                }
                Event::Auth(AuthEvent::Completed {
                    purpose: request.purpose,
                    response,
                })
            }
            Effect::CheckCredentials(credentials) => Event::Auth(AuthEvent::CheckCompleted(
                RemoteData::from_result(self.transport.check(&credentials)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Method;
    use crate::model::{BugUpdateResult, EditorMode};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeTransport {
        responses: HashMap<(Method, String), RawResponse>,
        sent: Mutex<Vec<AuthorizedRequest>>,
    }

    impl FakeTransport {
        fn respond(mut self, method: Method, url: &str, status: u16, body: serde_json::Value) -> Self {
            self.responses.insert(
                (method, url.to_string()),
                RawResponse {
                    status,
                    body: body.to_string(),
                },
            );
            self
        }
    }

    impl Transport for FakeTransport {
        fn send(
            &self,
            request: &AuthorizedRequest,
            _credentials: Option<&Credentials>,
        ) -> Result<RawResponse, FetchError> {
            self.sent.lock().unwrap().push(request.clone());
            self.responses
                .get(&(request.method, request.url.clone()))
                .cloned()
                .ok_or_else(|| FetchError::Transport(format!("no route to {}", request.url)))
        }

        fn check(&self, credentials: &Credentials) -> Result<String, FetchError> {
            Ok(credentials.client_id.clone())
        }
    }

    fn config() -> DashboardConfig {
        DashboardConfig {
            backend_url: "http://backend".into(),
            bugzilla_url: "http://tracker".into(),
            credentials: Some(Credentials {
                client_id: "reviewer".into(),
                access_token: "t".into(),
            }),
            ..DashboardConfig::default()
        }
    }

    fn analysis_json() -> serde_json::Value {
        serde_json::json!({
            "id": 3, "name": "55", "count": 1,
            "bugs": [{"id": 9, "bugzilla_id": 1234, "summary": "Crash", "versions": {
                "beta": {"name": "approval-mozilla-beta", "status": "?", "attachments": ["a1", "a2"]}
            }}]
        })
    }

    #[test]
    fn fetch_then_quiescent() {
        let transport = FakeTransport::default()
            .respond(Method::Get, "http://backend/analysis/3", 200, analysis_json());
        let mut runtime = Runtime::new(transport, config());
        runtime.dispatch(Event::StartFetchAnalysis(3));
        assert_eq!(runtime.transitions(), 2);
        assert_eq!(runtime.model().bug(9).map(|b| b.bugzilla_id), Some(1234));
    }

    #[test]
    fn missing_route_surfaces_as_failure() {
        let mut runtime = Runtime::new(FakeTransport::default(), config());
        runtime.dispatch(Event::StartFetchAllAnalyses);
        assert!(runtime.model().all_analyses.failure().is_some());
    }

    #[test]
    fn approve_publishes_per_attachment_and_syncs() {
        let changed = serde_json::json!({"attachments": [{"id": 11, "changes": {"flagtypes.name": {"removed": "approval-mozilla-beta?", "added": "approval-mozilla-beta+"}}}]});
        let mut refreshed = analysis_json()["bugs"][0].clone();
        refreshed["summary"] = "Crash (approved)".into();
        let transport = FakeTransport::default()
            .respond(Method::Get, "http://backend/analysis/3", 200, analysis_json())
            .respond(Method::Put, "http://tracker/bug/attachment/a1", 200, changed.clone())
            .respond(Method::Put, "http://tracker/bug/attachment/a2", 200, changed)
            .respond(Method::Put, "http://backend/bugs/1234", 200, refreshed);
        let mut runtime = Runtime::new(transport, config());
        assert!(runtime.sign_in());
        runtime.dispatch(Event::StartFetchAnalysis(3));
        runtime.dispatch(Event::StartEditingBug(9, EditorMode::Approve));
        assert!(runtime.model().can_publish);

        let version = runtime.model().bug(9).unwrap().uplift_versions["beta"].clone();
        runtime.dispatch(Event::ToggleUpliftApproval {
            bug: 9,
            version,
            checked: true,
        });
        runtime.dispatch(Event::PublishEdits(9));

        let sent = runtime.transport.sent.lock().unwrap().clone();
        let puts: Vec<&str> = sent
            .iter()
            .filter(|r| r.method == Method::Put)
            .map(|r| r.url.as_str())
            .collect();
        assert_eq!(puts.iter().filter(|u| u.contains("/attachment/")).count(), 2);
        assert_eq!(puts.iter().filter(|u| u.ends_with("/bugs/1234")).count(), 2);

        let bug = runtime.model().bug(9).unwrap();
        assert_eq!(bug.summary, "Crash (approved)");
        assert_eq!(bug.editor_mode, EditorMode::None);
        assert!(matches!(
            bug.update_status,
            RemoteData::Success(BugUpdateResult::AttachmentChanged(_))
        ));
        assert!(bug.sync_status.is_success());
    }
}
