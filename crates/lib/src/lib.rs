//! Tombot core library: LINE webhook decoding, command extraction, topic routing,
//! and publishing, used by the `tombot` CLI.

pub mod channels;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod publish;
pub mod routing;
