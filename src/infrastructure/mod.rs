//! Infrastructure layer - store, credential and token implementations

pub mod auth;
pub mod logging;
pub mod user;
