//! Data Transfer Objects
//!
//! Request bodies validated at the HTTP edge and small response envelopes.
//! Entity-shaped responses live next to their services.

pub mod request;
pub mod response;
