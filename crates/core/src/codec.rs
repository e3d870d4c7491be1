//! Envelope codec for bus payloads.
//!
//! Every payload crossing the bus — tasks, results, pokes, file
//! registrations — is a JSON document with the protocol's field names.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Error raised while encoding or decoding a bus envelope.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encoding envelope: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decoding envelope: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Serialize a value into envelope bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(CodecError::Encode)
}

/// Deserialize envelope bytes into a value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{File, Task, TaskResult, TaskStatus};
    use assert_matches::assert_matches;

    #[test]
    fn task_round_trip_with_all_fields() {
        let task = Task {
            id: "task-1".into(),
            job_id: "job-1".into(),
            silo_entry_id: "entry-1".into(),
            owner_id: "owner-1".into(),
            r#ref: "ref-1".into(),
            action: "convert".into(),
            token: "tok".into(),
            state: "draft".into(),
            envelope: vec![1, 2, 3],
            config: vec![4, 5],
            envelope_public_url: "https://silo.example.com/e/1".into(),
            files: vec![File {
                id: "f1".into(),
                silo_entry_id: "entry-1".into(),
                name: "doc.json".into(),
                hash: "abc".into(),
                mime: "application/json".into(),
                size: 3,
                sha256: "deadbeef".into(),
            }],
            ts: 1700000000.5,
        };

        let bytes = encode(&task).unwrap();
        let back: Task = decode(&bytes).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn task_round_trip_with_empty_optional_fields() {
        let task = Task::default();
        let bytes = encode(&task).unwrap();
        let back: Task = decode(&bytes).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn result_round_trip() {
        let res = TaskResult::error("transient").with_code("E42");
        let bytes = encode(&res).unwrap();
        let back: TaskResult = decode(&bytes).unwrap();
        assert_eq!(back, res);
        assert_eq!(back.status, TaskStatus::Err);
    }

    #[test]
    fn ref_field_uses_protocol_name() {
        let task = Task::new("t", "noop").with_ref("corr-7");
        let json: serde_json::Value = serde_json::from_slice(&encode(&task).unwrap()).unwrap();
        assert_eq!(json["ref"], "corr-7");
    }

    #[test]
    fn malformed_bytes_fail_to_decode() {
        let res: Result<Task, _> = decode(b"not json at all");
        assert_matches!(res, Err(CodecError::Decode(_)));
    }
}
