//! Request dispatch and outcome classification.

pub mod classify;
pub mod dispatch;
pub mod engine;
pub mod error;
