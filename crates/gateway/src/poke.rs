//! Poke channel: re-surface a previously queued task.

use taskgate_core::{codec, subject, TaskPoke, TaskPokeResponse};

use crate::error::GatewayError;
use crate::gateway::Gateway;

impl Gateway {
    /// Tell the gateway service that an external prompt arrived — a
    /// webhook, say — and the original queued task should be re-sent.
    ///
    /// This is a request/reply exchange independent of the task pipeline;
    /// it does not pass through the worker pool. A successful poke has an
    /// empty response; a non-empty error field surfaces as
    /// [`GatewayError::Remote`].
    pub async fn poke(&self, poke: &TaskPoke) -> Result<(), GatewayError> {
        let payload = codec::encode(poke)?;
        let reply = self
            .bus()
            .request(subject::SUBJECT_TASKS_POKE, payload, self.request_timeout)
            .await?;

        let response: TaskPokeResponse = codec::decode(&reply)?;
        match response.err {
            Some(err) => Err(GatewayError::Remote(err)),
            None => Ok(()),
        }
    }
}
