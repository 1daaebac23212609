//! Interface to the authorization collaborator.
//!
//! The update engine never signs anything itself. It describes requests as
//! [`AuthorizedRequest`] values tagged with a [`RequestPurpose`]; whoever runs
//! the effects signs them with the current [`Credentials`] and reports the
//! raw outcome back as [`AuthEvent::Completed`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FetchError;
use crate::model::{BugId, BugUpdateResult};
use crate::remote::RemoteData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was issued; decides where its completion is routed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestPurpose {
    AllAnalyses,
    Analysis,
    /// Flag or attachment update sent to the bug tracker.
    BugUpdate(BugId),
    /// Mirror of accepted changes sent to the backend.
    BugSync(BugId),
    /// Requests issued by other parts of the host application.
    Other(String),
}

/// A request waiting to be signed and sent.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
    pub purpose: RequestPurpose,
}

impl AuthorizedRequest {
    #[must_use]
    pub fn get(url: impl Into<String>, purpose: RequestPurpose) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            purpose,
        }
    }

    #[must_use]
    pub fn put(url: impl Into<String>, body: serde_json::Value, purpose: RequestPurpose) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            body: Some(body),
            purpose,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub access_token: String,
}

// Keep tokens out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Snapshot of the session as seen by the update engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthContext {
    pub credentials: Option<Credentials>,
    /// Result of the last credential check; holds the verified client id.
    pub check: RemoteData<String>,
}

impl AuthContext {
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            check: RemoteData::NotAsked,
        }
    }

    /// True only after a successful authorization check.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.check.is_success()
    }
}

/// Raw HTTP outcome handed back by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decode a fetch response; any non-2xx status is a failure.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        if !self.is_success() {
            return Err(self.http_error());
        }
        serde_json::from_str(&self.body).map_err(FetchError::from)
    }

    /// Decode a tracker update response.
    ///
    /// Error statuses still carry a `{message}` body, so the body is decoded
    /// first and the status only matters when that fails.
    pub fn update_result(&self) -> Result<BugUpdateResult, FetchError> {
        let decoded = serde_json::from_str::<serde_json::Value>(&self.body)
            .map_err(FetchError::from)
            .and_then(|value| BugUpdateResult::decode(&value));
        match decoded {
            Ok(result) => Ok(result),
            Err(_) if !self.is_success() => Err(self.http_error()),
            Err(err) => Err(err),
        }
    }

    fn http_error(&self) -> FetchError {
        FetchError::Http {
            status: self.status,
            body: self.body.clone(),
        }
    }
}

/// Events owned by the authorization workflow.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    Login(Credentials),
    Logout,
    CheckCompleted(RemoteData<String>),
    Completed {
        purpose: RequestPurpose,
        response: Result<RawResponse, FetchError>,
    },
}
