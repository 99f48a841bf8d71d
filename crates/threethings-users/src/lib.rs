//! `threethings-users`: SQLite persistence for users and their status updates.
//!
//! Free functions in [`users`] and [`ledger`] take a `&Connection` so they can
//! run inside a caller's transaction; [`Store`] wraps a connection for
//! long-lived, shared use.

pub mod db;
pub mod error;
pub mod ledger;
pub mod store;
pub mod types;
pub mod users;

pub use error::{Result, StoreError};
pub use store::Store;
pub use types::{NewStatusUpdate, NewUser, StatusUpdate, User};
