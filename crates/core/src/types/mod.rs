//! Core types for the order tracker.
//!
//! This module provides type-safe wrappers for the authorization data model.

pub mod email;
pub mod identity;
pub mod role;
pub mod status;
pub mod user;

pub use email::{Email, EmailError};
pub use identity::Identity;
pub use role::{Role, RoleParseError};
pub use status::{AccountStatus, StatusParseError, StatusTransitionError};
pub use user::{ManagerAssignment, UserActions, UserRecord};
