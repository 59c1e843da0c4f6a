//! Access policy engine
//!
//! Decides which requester may read or change which account: the holder of an
//! active account may act on it, administrators may act on any account, and
//! directory-wide operations are reserved for administrators.

mod policy;

pub use policy::{evaluate, AccessPolicy, AccessScope, Requester, RequesterLookup, StoreLookup};

#[cfg(test)]
pub use policy::MockRequesterLookup;
