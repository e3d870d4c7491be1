use taskgate_core::{Task, TaskResult};

/// The business callback invoked for every inbound task.
///
/// Owned by the caller and passed to the gateway at construction time;
/// the gateway never implements it. Returning `None` means the task
/// completed fine and an OK result is replied on the handler's behalf.
///
/// Handlers run under a per-task deadline; at the deadline the invocation
/// is cancelled at its next await point and an ERR result is replied. A
/// panic inside the handler is contained to that one task and replied as
/// KO.
#[async_trait::async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: Task) -> Option<TaskResult>;
}

/// Any async closure taking a [`Task`] works as a handler.
#[async_trait::async_trait]
impl<F, Fut> TaskHandler for F
where
    F: Fn(Task) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Option<TaskResult>> + Send + 'static,
{
    async fn handle(&self, task: Task) -> Option<TaskResult> {
        self(task).await
    }
}
