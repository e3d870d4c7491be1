//! Asynchronous task-dispatch gateway.
//!
//! A [`Gateway`] binds a named service to the message bus, receives tasks
//! through a queue-group subscription shared with other instances of the
//! same service, runs each task through the injected [`TaskHandler`] on a
//! bounded worker pool, and replies with a [`taskgate_core::TaskResult`]
//! per task. Failures are isolated per task; [`Gateway::stop`] drains
//! in-flight work before returning.
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskgate_bus::MemoryBus;
//! use taskgate_core::{Task, TaskResult};
//! use taskgate_gateway::Gateway;
//!
//! # async fn run() -> Result<(), taskgate_gateway::GatewayError> {
//! let gw = Gateway::builder(|task: Task| async move {
//!     match task.action.as_str() {
//!         "convert" => Some(TaskResult::ok()),
//!         other => Some(TaskResult::skip(format!("unknown action {other}"))),
//!     }
//! })
//! .name("my-service")
//! .bus(Arc::new(MemoryBus::new()))
//! .build()?;
//!
//! gw.start().await?;
//! // ... run until shutdown is requested ...
//! gw.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
mod files;
mod gateway;
mod handler;
mod poke;
mod worker;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayBuilder};
pub use handler::TaskHandler;
