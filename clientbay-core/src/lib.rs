//! Domain core for a multi-tenant client portal: workspaces and plans,
//! clients with portal contacts, projects, approval and invoice state
//! machines, messaging, file storage, an append-only activity log, and
//! cross-entity search.
//!
//! Everything here is transport-agnostic. The HTTP surface lives in the
//! server crate and calls into the services exported from [`services`].

pub mod access;
pub mod db;
pub mod error;
pub mod models;
pub mod money;
pub mod notify;
pub mod services;
pub mod storage;
