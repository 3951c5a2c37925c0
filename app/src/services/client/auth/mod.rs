//! Credential endpoint operations: account creation, password sign-in,
//! sign-out, session probe, and email-link verification.

pub mod account;
pub mod login;

pub use account::{confirm_email_impl, create_account_impl};
pub use login::{create_session_impl, end_session_impl, fetch_account_impl};
