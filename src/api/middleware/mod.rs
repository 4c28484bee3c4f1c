//! API middleware components

mod user;

pub use user::{ActingUser, DEFAULT_USER_ID, USER_ID_HEADER};
