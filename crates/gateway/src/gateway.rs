//! Gateway lifecycle: construction, worker pool start, graceful stop.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::task::TaskTracker;

use taskgate_bus::{Bus, SubscriptionId};
use taskgate_core::subject;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::handler::TaskHandler;
use crate::worker::Worker;

/// Task-dispatch gateway client.
///
/// Receives tasks for one named service over the bus, runs them through
/// the injected [`TaskHandler`] on a bounded worker pool, and replies with
/// a result per task. Construct with [`Gateway::builder`], then call
/// [`start`](Self::start); [`stop`](Self::stop) drains in-flight work
/// before returning.
pub struct Gateway {
    name: String,
    bus: Arc<dyn Bus>,
    handler: Arc<dyn TaskHandler>,
    worker_count: usize,
    task_timeout: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) silo_public_base_url: Option<String>,
    pub(crate) http: reqwest::Client,
    workers: TaskTracker,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("name", &self.name)
            .field("worker_count", &self.worker_count)
            .field("task_timeout", &self.task_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("silo_public_base_url", &self.silo_public_base_url)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Begin building a gateway around the given task handler.
    ///
    /// The handler is a constructor-time dependency: there is no way to
    /// start a gateway without one.
    pub fn builder(handler: impl TaskHandler) -> GatewayBuilder {
        GatewayBuilder {
            handler: Arc::new(handler),
            bus: None,
            config: GatewayConfig::default(),
        }
    }

    /// The bus this gateway is bound to, for callers that need the raw
    /// publish/request primitives.
    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.bus
    }

    /// Subscribe the queue-group consumer and start the worker pool.
    pub async fn start(&self) -> Result<(), GatewayError> {
        {
            let sub = self.subscription.lock().expect("subscription lock poisoned");
            if sub.is_some() {
                return Err(GatewayError::Config("gateway already started".into()));
            }
        }

        let subject = subject::task_subject(&self.name);
        let queue = subject::task_queue(&self.name);
        let sub = self.bus.queue_subscribe(&subject, &queue).await?;

        tracing::debug!(
            service = %self.name,
            subject = %subject,
            count = self.worker_count,
            "gateway: starting workers"
        );

        let inbound = Arc::new(tokio::sync::Mutex::new(sub.receiver));
        for _ in 0..self.worker_count {
            let worker = Worker {
                bus: Arc::clone(&self.bus),
                handler: Arc::clone(&self.handler),
                task_timeout: self.task_timeout,
            };
            let inbound = Arc::clone(&inbound);
            self.workers.spawn(worker.run(inbound));
        }

        *self.subscription.lock().expect("subscription lock poisoned") = Some(sub.id);
        Ok(())
    }

    /// Gracefully drain all in-flight tasks and wait for them to complete.
    ///
    /// Unsubscribes first so no new task is admitted, lets the workers
    /// finish whatever the bus had already buffered, then waits for every
    /// worker to exit.
    pub async fn stop(&self) {
        let started = Instant::now();
        tracing::debug!(service = %self.name, "gateway: shutting down");

        let sub = self
            .subscription
            .lock()
            .expect("subscription lock poisoned")
            .take();
        if let Some(id) = sub {
            if let Err(err) = self.bus.unsubscribe(id).await {
                tracing::warn!(error = %err, "gateway: unsubscribe failed");
            }
        }

        self.workers.close();
        self.workers.wait().await;

        tracing::info!(
            service = %self.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gateway: shutdown complete"
        );
    }
}

/// Builder for [`Gateway`]; see [`Gateway::builder`].
pub struct GatewayBuilder {
    handler: Arc<dyn TaskHandler>,
    bus: Option<Arc<dyn Bus>>,
    config: GatewayConfig,
}

impl GatewayBuilder {
    /// Set the service name tasks are addressed to. Required.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Bind the gateway to a bus. Required.
    pub fn bus(mut self, bus: Arc<dyn Bus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Apply a full configuration object (name, pool size, timeouts,
    /// silo base URL).
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the worker pool size (default: 8).
    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Override the per-task handler deadline (default: 1 minute).
    ///
    /// At the deadline the handler is cancelled at its next await point;
    /// a handler blocked in non-async code cannot be interrupted and
    /// keeps its background task alive until it returns.
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.config.task_timeout = timeout;
        self
    }

    /// Override the request/reply timeout for poke and file registration
    /// calls (default: 5 s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the public base URL of the silo. Only required for file
    /// uploads and downloads.
    pub fn silo_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.silo_public_base_url = Some(url.into());
        self
    }

    /// Validate the configuration and build the gateway.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        if self.config.name.is_empty() {
            return Err(GatewayError::Config("service name required".into()));
        }
        let Some(bus) = self.bus else {
            return Err(GatewayError::Config("bus connection required".into()));
        };
        if self.config.worker_count == 0 {
            return Err(GatewayError::Config("worker count must be at least 1".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(self.config.request_timeout)
            .build()
            .expect("failed to build reqwest HTTP client");

        Ok(Gateway {
            name: self.config.name,
            bus,
            handler: self.handler,
            worker_count: self.config.worker_count,
            task_timeout: self.config.task_timeout,
            request_timeout: self.config.request_timeout,
            silo_public_base_url: self.config.silo_public_base_url,
            http,
            workers: TaskTracker::new(),
            subscription: Mutex::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use taskgate_bus::MemoryBus;
    use taskgate_core::{Task, TaskResult};

    async fn noop(_: Task) -> Option<TaskResult> {
        None
    }

    #[test]
    fn build_requires_a_service_name() {
        let res = Gateway::builder(noop)
            .bus(Arc::new(MemoryBus::new()))
            .build();
        assert_matches!(res, Err(GatewayError::Config(msg)) if msg.contains("name"));
    }

    #[test]
    fn build_requires_a_bus() {
        let res = Gateway::builder(noop).name("svc").build();
        assert_matches!(res, Err(GatewayError::Config(msg)) if msg.contains("bus"));
    }

    #[test]
    fn build_rejects_an_empty_pool() {
        let res = Gateway::builder(noop)
            .name("svc")
            .bus(Arc::new(MemoryBus::new()))
            .worker_count(0)
            .build();
        assert_matches!(res, Err(GatewayError::Config(_)));
    }

    #[tokio::test]
    async fn start_twice_is_a_config_error() {
        let gw = Gateway::builder(noop)
            .name("svc")
            .bus(Arc::new(MemoryBus::new()))
            .build()
            .unwrap();

        gw.start().await.unwrap();
        assert_matches!(gw.start().await, Err(GatewayError::Config(_)));
        gw.stop().await;
    }
}
