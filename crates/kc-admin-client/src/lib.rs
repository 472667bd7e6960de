//! # kc-admin-client
//!
//! Thin client for the Keycloak Admin REST API.
//!
//! This crate provides:
//! - A password-grant [`TokenSession`] that caches the admin access token
//! - The [`AdminApi`] trait covering clients, client scopes, users, realm roles
//!   and federated identities
//! - [`KeycloakAdmin`], the reqwest implementation of [`AdminApi`]
//! - Admin representations in [`dto`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::doc_markdown)]

pub mod api;
pub mod dto;
pub mod error;
pub mod session;

pub use api::{single_match, AdminApi, KeycloakAdmin};
pub use error::{AdminError, AdminResult};
pub use session::{AccessToken, AdminCredentials, TokenSession};
