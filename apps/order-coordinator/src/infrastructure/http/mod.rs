//! HTTP/REST API adapter.
//!
//! Inbound adapter the agent uses to submit intents and read order state.

mod controller;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use request::*;
pub use response::*;
