//! Data-access services.
//!
//! One async function per read or write the pages need. Every function
//! returns `Result<_, StoreError>`; nothing panics or escapes past it, and
//! the error's `Display` is the message shown to the user.

pub mod account_service;
pub mod auth_service;
pub mod debt_service;
pub mod people_service;
pub mod transaction_service;
