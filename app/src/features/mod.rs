//! Business flows built on the infrastructure services.

pub mod login;
pub mod registration;
