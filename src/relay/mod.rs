//! The relay core: request narrowing, upstream error extraction, and the event-stream
//! reframing worker. Upstream HTTP calls live in [`crate::proxy`].

pub mod request;
pub mod response;
pub mod streaming;
pub mod types;
