use std::fmt;

/// Machine-readable error codes surfaced by the CLI and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MissingEndpoint,
    AnalysisNotFound,
    BugNotFound,
    VersionNotFound,
    MissingCredentials,
    TransportFailed,
    HttpStatus,
    DecodeFailed,
    UpdateRejected,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::MissingEndpoint => "E1002",
            Self::AnalysisNotFound => "E2001",
            Self::BugNotFound => "E2002",
            Self::VersionNotFound => "E2003",
            Self::MissingCredentials => "E3001",
            Self::TransportFailed => "E4001",
            Self::HttpStatus => "E4002",
            Self::DecodeFailed => "E4003",
            Self::UpdateRejected => "E4004",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::MissingEndpoint => "Endpoint URL not configured",
            Self::AnalysisNotFound => "Analysis not found",
            Self::BugNotFound => "Bug not found in analysis",
            Self::VersionNotFound => "Uplift version not found on bug",
            Self::MissingCredentials => "No credentials available",
            Self::TransportFailed => "Request could not be sent",
            Self::HttpStatus => "Server returned an error status",
            Self::DecodeFailed => "Response could not be decoded",
            Self::UpdateRejected => "Bug tracker rejected the update",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to reviewers.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .uplift/config.toml and retry."),
            Self::MissingEndpoint => {
                Some("Set backend_url/bugzilla_url in config or UPLIFT_BACKEND_URL/UPLIFT_BUGZILLA_URL.")
            }
            Self::AnalysisNotFound => Some("Run `uplift analyses` to list available analyses."),
            Self::BugNotFound => Some("Run `uplift show <analysis>` to list its bugs."),
            Self::VersionNotFound => Some("Use a version name shown in the bug's uplift tags."),
            Self::MissingCredentials => {
                Some("Set UPLIFT_CLIENT_ID and UPLIFT_ACCESS_TOKEN, or add [credentials] to config.")
            }
            Self::TransportFailed => Some("Check network connectivity and endpoint URLs."),
            Self::HttpStatus | Self::DecodeFailed => None,
            Self::UpdateRejected => Some("Read the tracker message; the edit was not applied."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Transport or decode failure of a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status and no usable body.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The body did not match the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// No credentials were available to sign the request.
    #[error("not signed in: {0}")]
    Unauthenticated(String),
}

impl FetchError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Transport(_) => ErrorCode::TransportFailed,
            Self::Http { .. } => ErrorCode::HttpStatus,
            Self::Decode(_) => ErrorCode::DecodeFailed,
            Self::Unauthenticated(_) => ErrorCode::MissingCredentials,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
