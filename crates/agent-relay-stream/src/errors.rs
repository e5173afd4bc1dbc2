/// Terminal failure of a coordinated run.
///
/// Every variant carries the events drained before the failure was
/// observed; the failure is only surfaced once draining has finished.
#[derive(Debug, thiserror::Error)]
pub enum CollectError<E, X> {
    /// The task returned its own error.
    #[error("task failed after {} events: {error}", .events.len())]
    TaskFailed { events: Vec<E>, error: X },
    /// The task panicked; the panic payload is kept as text when possible.
    #[error("task panicked after {} events: {message}", .events.len())]
    TaskPanicked { events: Vec<E>, message: String },
    /// The task was aborted before it produced a result.
    #[error("task cancelled after {} events", .events.len())]
    TaskCancelled { events: Vec<E> },
}

impl<E, X> CollectError<E, X> {
    /// Events drained before the failure, in arrival order.
    pub fn events(&self) -> &[E] {
        match self {
            Self::TaskFailed { events, .. }
            | Self::TaskPanicked { events, .. }
            | Self::TaskCancelled { events } => events,
        }
    }

    /// Consumes the error and returns the partial event sequence.
    pub fn into_events(self) -> Vec<E> {
        match self {
            Self::TaskFailed { events, .. }
            | Self::TaskPanicked { events, .. }
            | Self::TaskCancelled { events } => events,
        }
    }

    /// Returns the task's own error, if the task returned one.
    pub fn task_error(&self) -> Option<&X> {
        match self {
            Self::TaskFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Invalid coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An option value is out of range.
    #[error("invalid option {name}: {message}")]
    Invalid { name: &'static str, message: String },
    /// An environment variable could not be parsed.
    #[error("could not parse {key}={value:?}")]
    Env { key: &'static str, value: String },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_events_survive_every_variant() {
        let failed: CollectError<u8, String> = CollectError::TaskFailed {
            events: vec![1, 2],
            error: "boom".into(),
        };
        assert_eq!(failed.events(), &[1, 2]);
        assert_eq!(failed.events(), failed.events());
        assert_eq!(failed.task_error().map(String::as_str), Some("boom"));
        assert_eq!(failed.to_string(), "task failed after 2 events: boom");

        let cancelled: CollectError<u8, String> = CollectError::TaskCancelled { events: vec![7] };
        assert!(cancelled.task_error().is_none());
        assert_eq!(cancelled.into_events(), vec![7]);
    }
}
