//! Client directory module.
//!
//! Business rules for clients (the households and companies interventions are
//! performed for), as plain domain logic (no IO, no HTTP, no storage).

pub mod client;

pub use client::{directory_order, Client, ClientDetails, ClientFields, ClientFilter, ClientSummary};
