//! Order Tracker Core - shared types and access policy.
//!
//! This crate is used by:
//! - `dashboard` - Role-based dashboard server (Buyer, Manager, Admin)
//! - `cli` - Operator tools for inspecting accounts
//!
//! # Architecture
//!
//! The core crate contains only types and pure decision logic - no I/O, no
//! HTTP clients, no async runtime. Guards and navigation are plain functions
//! over resolved data so they can be tested exhaustively.
//!
//! # Modules
//!
//! - [`types`] - Emails, roles, account statuses, identities, user records
//! - [`guard`] - The route guard state machine (`IsLogin`, `IsAdminManager`, `IsSuspended`)
//! - [`nav`] - Role-filtered navigation for the dashboard shell

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod guard;
pub mod nav;
pub mod types;

pub use types::*;
