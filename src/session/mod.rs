//! Session state and access gates

pub mod permission;
pub mod store;

pub use permission::{guard, has_permission, has_role, Navigation, ADMIN_ROLE, LOGIN_PATH};
pub use store::{MenuItem, SessionStore, Tab, UserProfile, HOME_PATH};
