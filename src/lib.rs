pub mod authority;

pub mod config;

pub mod error;

pub mod flip;

pub mod identity;

pub mod notify;

pub mod session;

pub mod test_helpers;

pub mod validator;

pub mod wallet;

pub use error::{
    Error,
    Result,
};
