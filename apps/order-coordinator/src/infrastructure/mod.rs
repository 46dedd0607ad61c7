//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - **Driven Adapters (Outbound)**
//!   - `gateway/`: Futu gateway bridge (session, codec, `GatewayPort`)
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST API the agent calls

pub mod gateway;
pub mod http;
