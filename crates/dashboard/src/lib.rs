//! Order tracker dashboard library.
//!
//! Role-based dashboard for Buyers, Managers and Admins. Authentication is
//! delegated to an external identity provider and authorization metadata is
//! read from the order tracking backend; the library exposes the router so
//! it can be driven in tests without a network listener.
//!
//! # Access model
//!
//! - Any signed-in account sees the overview, its own orders and its profile
//! - Managers and Admins additionally see the approval queue and user list
//! - Only Admins change accounts; Admin accounts are never suspendable

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod identity;
pub mod middleware;
pub mod notices;
pub mod resolver;
pub mod routes;
pub mod session;
pub mod shell;
pub mod state;
