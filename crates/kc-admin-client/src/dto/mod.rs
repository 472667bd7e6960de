//! Keycloak admin representations.
//!
//! These mirror the JSON bodies the Admin REST API accepts and returns.
//! Fields this crate does not model are kept in a flattened `extra` map so that
//! a fetched representation can be sent back with `PUT` without losing data.

pub mod client;
pub mod identity;
pub mod role;
pub mod user;

pub use client::{ClientRepresentation, ClientScopeRepresentation, CredentialRepresentation};
pub use identity::{FederatedIdentityRepresentation, IdentityProviderRepresentation};
pub use role::RoleRepresentation;
pub use user::UserRepresentation;
