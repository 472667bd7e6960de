//! # kc-provision
//!
//! Idempotent provisioning tools for a Keycloak deployment.
//!
//! This crate provides:
//! - `kc-sdk-client`: the public SDK client and its default scope
//! - `kc-user-provisioner`: brokered users in the broker and main realms
//! - `kc-api-client`: a project's confidential API client and service account
//!
//! Every tool reads current state first and only writes what is missing, so
//! re-running with the same inputs changes nothing.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::future_not_send)]

pub mod applications;
pub mod blueprint;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod naming;
pub mod output;
pub mod reconcile;

pub use config::ProvisionConfig;
pub use error::{ProvisionError, ProvisionResult};
