//! Canned-answer subsystem: keyword classification into a fixed set of
//! topic buckets, each backed by a static markdown document.

pub mod contact;
pub mod responses;
pub mod topics;

pub use contact::ContactInfo;
pub use responses::{FALLBACK_RESPONSE, resolve};
pub use topics::{TOPIC_RULES, Topic, classify};
