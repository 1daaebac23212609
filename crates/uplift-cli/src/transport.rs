//! Blocking HTTP transport over `ureq`.
//!
//! Tracker requests carry the API key header; backend requests carry a
//! bearer token. Error statuses are returned as responses so the update
//! engine can read tracker error bodies.

use serde::Deserialize;
use std::time::Duration;
use uplift_core::auth::{AuthorizedRequest, Credentials, RawResponse, RequestPurpose};
use uplift_core::config::DashboardConfig;
use uplift_core::error::FetchError;
use uplift_core::runtime::Transport;

const USER_AGENT: &str = concat!("uplift-cli/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    agent: ureq::Agent,
    bugzilla_url: String,
}

#[derive(Deserialize)]
struct WhoAmI {
    name: String,
}

impl HttpTransport {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(TIMEOUT)
                .user_agent(USER_AGENT)
                .build(),
            bugzilla_url: config.bugzilla_url.clone(),
        }
    }

    fn is_tracker(&self, url: &str) -> bool {
        url.starts_with(&self.bugzilla_url)
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: &AuthorizedRequest,
        credentials: Option<&Credentials>,
    ) -> Result<RawResponse, FetchError> {
        let mut call = self
            .agent
            .request(request.method.as_str(), &request.url)
            .set("Accept", "application/json");

        if let Some(creds) = credentials {
            call = if self.is_tracker(&request.url) {
                call.set("X-BUGZILLA-API-KEY", &creds.access_token)
            } else {
                call.set("Authorization", &format!("Bearer {}", creds.access_token))
            };
        }

        let result = match &request.body {
            Some(body) => call.send_json(body),
            None => call.call(),
        };
        match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => into_raw(response),
            Err(ureq::Error::Transport(err)) => Err(FetchError::Transport(err.to_string())),
        }
    }

    fn check(&self, credentials: &Credentials) -> Result<String, FetchError> {
        let whoami = AuthorizedRequest::get(
            format!("{}/whoami", self.bugzilla_url),
            RequestPurpose::Other("whoami".to_string()),
        );
        let who: WhoAmI = self.send(&whoami, Some(credentials))?.json()?;
        Ok(who.name)
    }
}

fn into_raw(response: ureq::Response) -> Result<RawResponse, FetchError> {
    let status = response.status();
    let body = response
        .into_string()
        .map_err(|err| FetchError::Transport(format!("failed to read body: {err}")))?;
    Ok(RawResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_urls_are_recognised() {
        let transport = HttpTransport::new(&DashboardConfig::default());
        assert!(transport.is_tracker("https://bugzilla.mozilla.org/rest/bug/1234"));
        assert!(!transport.is_tracker("http://localhost:5000/bugs/1234"));
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let transport = HttpTransport::new(&DashboardConfig::default());
        let request = AuthorizedRequest::get(
            "http://127.0.0.1:9/analysis",
            RequestPurpose::AllAnalyses,
        );
        assert!(matches!(
            transport.send(&request, None),
            Err(FetchError::Transport(_))
        ));
    }
}
