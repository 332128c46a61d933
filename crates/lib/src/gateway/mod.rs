//! Gateway: HTTP entry point for LINE webhook callbacks.
//!
//! Each callback is verified and decoded, then its events are dispatched to bus topics.
//! Success is 200 with an empty body; any decode or publish failure is 500 with
//! `{"message": "..."}`.

mod server;

pub use server::{build_router, run_gateway, run_gateway_with_publisher, GatewayState};
