//! HTTP request pipeline.
//!
//! SYSTEM CONTEXT
//! ==============
//! `types` holds the request/response shapes, `transport` executes them,
//! `classify` maps every result into one outcome taxonomy, `messages` owns
//! the user-facing texts, and `pipeline` ties them to the session.

pub mod classify;
pub mod messages;
pub mod pipeline;
pub mod transport;
pub mod types;
