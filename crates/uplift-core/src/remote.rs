//! `RemoteData`: the status of one asynchronous request.
//!
//! Every fetch or update result held in the model is exactly one of four
//! states. A request moves `NotAsked | Success | Failure -> Loading` when it
//! is issued and `Loading -> Success | Failure` when the response arrives.

use crate::error::FetchError;

/// Four-state wrapper around an asynchronous result.
#[derive(Debug, Clone)]
pub enum RemoteData<T, E = FetchError> {
    NotAsked,
    Loading,
    Success(T),
    Failure(E),
}

impl<T, E> RemoteData<T, E> {
    /// Wrap a completed request.
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err),
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Borrow the success value, if any.
    #[must_use]
    pub const fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the failure payload, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&E> {
        match self {
            Self::Failure(err) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_ref(&self) -> RemoteData<&T, &E> {
        match self {
            Self::NotAsked => RemoteData::NotAsked,
            Self::Loading => RemoteData::Loading,
            Self::Success(value) => RemoteData::Success(value),
            Self::Failure(err) => RemoteData::Failure(err),
        }
    }

    /// Transform the success value, leaving the other states untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteData<U, E> {
        match self {
            Self::NotAsked => RemoteData::NotAsked,
            Self::Loading => RemoteData::Loading,
            Self::Success(value) => RemoteData::Success(f(value)),
            Self::Failure(err) => RemoteData::Failure(err),
        }
    }

    /// Short tag used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotAsked => "not_asked",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
        }
    }
}

impl<T, E> Default for RemoteData<T, E> {
    fn default() -> Self {
        Self::NotAsked
    }
}

/// Equality by variant tag. Success values are compared by value; two
/// failures are equal regardless of their payloads.
impl<T: PartialEq, E> PartialEq for RemoteData<T, E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotAsked, Self::NotAsked)
            | (Self::Loading, Self::Loading)
            | (Self::Failure(_), Self::Failure(_)) => true,
            (Self::Success(a), Self::Success(b)) => a == b,
            _ => false,
        }
    }
}
