//! Well-known bus subject and queue-group names.
//!
//! These must match the subjects the upstream gateway services listen on;
//! changing them is a protocol break.

/// Request/reply subject for registering new silo files.
pub const SUBJECT_FILES_CREATE: &str = "gw.files.create";

/// Request/reply subject for poking queued tasks awake.
pub const SUBJECT_TASKS_POKE: &str = "gw.tasks.poke";

/// Subject a service's inbound tasks are published on.
pub fn task_subject(service: &str) -> String {
    format!("gw.{service}.task")
}

/// Queue group shared by all instances of a service, so each task is
/// delivered to exactly one instance.
pub fn task_queue(service: &str) -> String {
    format!("{service}.tasks")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_are_derived_from_the_service_name() {
        assert_eq!(task_subject("pdf-render"), "gw.pdf-render.task");
        assert_eq!(task_queue("pdf-render"), "pdf-render.tasks");
    }
}
