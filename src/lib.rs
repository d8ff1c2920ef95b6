//! Polaris - repeated on-chain payload broadcaster
//!
//! A run takes a set of accounts and one validated run config, then on every
//! tick submits one transaction per account, classifies the outcomes and
//! appends them to a newest-first log stream.

pub mod chains;
pub mod classify;
pub mod client;
pub mod controller;
pub mod dispatch;
pub mod domain;
pub mod error;

pub use error::{PolarisError, Result};
