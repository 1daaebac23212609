//! uplift-core library.
//!
//! State, update engine and view projection of the uplift review dashboard.
//! The host feeds [`update::Event`]s through [`update::apply`] (or lets
//! [`runtime::Runtime`] do it) and renders [`view::project_page`].
//!
//! # Conventions
//!
//! - **Errors**: [`error::FetchError`] for request outcomes stored in the
//!   model; `anyhow::Result` for configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod approvals;
pub mod auth;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod runtime;
pub mod update;
pub mod view;

pub use remote::RemoteData;
pub use update::{Effect, Event, Model, Transition, apply};
