//! Per-task processing pipeline.
//!
//! Each worker loops on the shared inbound channel until it is closed,
//! fully processing one message before taking the next. All failure modes
//! of a single task — malformed envelope, handler panic, deadline — end in
//! a synthesized result on the reply address; none of them escape the
//! worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use taskgate_bus::{self as bus, Bus, BusMessage};
use taskgate_core::{codec, Task, TaskResult};

use crate::handler::TaskHandler;

pub(crate) struct Worker {
    pub bus: Arc<dyn Bus>,
    pub handler: Arc<dyn TaskHandler>,
    pub task_timeout: Duration,
}

impl Worker {
    /// Receive from the shared inbound channel until it closes.
    ///
    /// The mutex is held only while waiting for the next message, never
    /// while processing one, so the other workers keep draining the
    /// channel in parallel.
    pub async fn run(self, inbound: Arc<Mutex<mpsc::Receiver<BusMessage>>>) {
        loop {
            let msg = { inbound.lock().await.recv().await };
            match msg {
                Some(msg) => self.process(msg).await,
                None => break,
            }
        }
    }

    /// Decode, execute, reply. This is the only place results are
    /// published: exactly once per received message.
    async fn process(&self, msg: BusMessage) {
        let result = match codec::decode::<Task>(&msg.payload) {
            Ok(task) => self.execute(task).await,
            Err(err) => TaskResult::error(format!("parsing incoming task: {err}")),
        };

        let Some(reply) = msg.reply else {
            tracing::error!(subject = %msg.subject, "task message has no reply address, dropping result");
            return;
        };

        // Encode or publish failures end here: redelivery is the bus's
        // concern, not this layer's.
        match codec::encode(&result) {
            Err(err) => {
                tracing::error!(error = %err, "unable to encode task result, dropping");
            }
            Ok(bytes) => {
                if let Err(err) = bus::publish(self.bus.as_ref(), &reply, bytes).await {
                    tracing::error!(error = %err, "unable to publish task result");
                }
            }
        }
    }

    /// Invoke the handler under a deadline and a fault boundary.
    async fn execute(&self, task: Task) -> TaskResult {
        let task_id = task.id.clone();
        let job_id = task.job_id.clone();
        let owner_id = task.owner_id.clone();
        let silo_entry_id = task.silo_entry_id.clone();
        let action = task.action.clone();
        let reference = task.r#ref.clone();

        // The handler runs in its own task so a panic is observed as a
        // join error instead of unwinding through the worker.
        let handler = Arc::clone(&self.handler);
        let mut invocation = tokio::spawn(async move { handler.handle(task).await });

        let mut result = match tokio::time::timeout(self.task_timeout, &mut invocation).await {
            Ok(Ok(Some(result))) => result,
            // No content from the handler means everything went fine.
            Ok(Ok(None)) => TaskResult::ok(),
            Ok(Err(join_err)) => {
                tracing::error!(
                    task_id = %task_id,
                    job_id = %job_id,
                    owner_id = %owner_id,
                    silo_entry_id = %silo_entry_id,
                    action = %action,
                    error = %join_err,
                    "task handler panicked"
                );
                // A panic is assumed non-transient: reply KO so the task
                // is not blindly retried until the input or config changes.
                TaskResult::ko("unexpected task handler failure")
            }
            Err(_elapsed) => {
                invocation.abort();
                tracing::error!(
                    task_id = %task_id,
                    job_id = %job_id,
                    action = %action,
                    timeout_secs = self.task_timeout.as_secs(),
                    "task handler deadline exceeded"
                );
                TaskResult::error("task handler deadline exceeded")
            }
        };

        // The caller correlates asynchronously through `ref`; it is always
        // mirrored from the task, whatever the handler did.
        result.r#ref = reference;
        result
    }
}
