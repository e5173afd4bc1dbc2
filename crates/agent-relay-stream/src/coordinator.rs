use std::any::Any;
use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::config::CollectOptions;
use crate::errors::{CollectError, ConfigError};
use crate::queue::{EventQueue, EventSink, PopOutcome, event_channel};
use crate::signal::completion_signal;

// Floor for unvalidated options, so a zero slice cannot spin.
const MIN_POLL_SLICE: Duration = Duration::from_millis(1);

/// Lifecycle of one coordinated run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Draining,
    Finished,
    Failed,
}

/// Why the drain loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainStop {
    /// Completion signal set and the queue was empty.
    Completed,
    /// Every sink was dropped and the queue was empty.
    ChannelClosed,
    /// A poll slice expired with nothing queued and the task had already
    /// finished.
    IdleAfterFinish,
}

/// Context handed to a task started through `StreamCoordinator::collect_with`.
#[derive(Debug)]
pub struct RunContext<E> {
    /// Id of the run, also attached to log lines.
    pub run_id: uuid::Uuid,
    /// Per-run timeout, passed explicitly instead of mutating shared state.
    pub timeout: Duration,
    /// Where the task publishes its events.
    pub sink: EventSink<E>,
}

/// Output of a successful run. Immutable once returned.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectedRun<E, T> {
    run_id: uuid::Uuid,
    events: Vec<E>,
    output: T,
    stop: DrainStop,
}

impl<E, T> CollectedRun<E, T> {
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Every event drained, in arrival order.
    pub fn events(&self) -> &[E] {
        &self.events
    }

    /// The task's result.
    pub fn output(&self) -> &T {
        &self.output
    }

    pub fn stop_reason(&self) -> DrainStop {
        self.stop
    }

    /// Splits the run into `(events, output)`.
    pub fn into_parts(self) -> (Vec<E>, T) {
        (self.events, self.output)
    }
}

/// Runs a task in the background while draining the events it publishes.
///
/// The foreground loop waits on the queue and the completion signal at the
/// same time, with a bounded poll slice as a fallback re-check. Draining
/// stops once the task has finished and the queue is empty; only then is
/// the task's result (or failure) observed.
///
/// Events published after the completion signal fires and after the loop's
/// final empty check (for example by a detached task the run spawned) are
/// not collected.
#[derive(Clone, Debug, Default)]
pub struct StreamCoordinator {
    pub(crate) options: CollectOptions,
}

impl StreamCoordinator {
    /// Creates a coordinator after validating `options`.
    pub fn new(options: CollectOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &CollectOptions {
        &self.options
    }

    /// Creates the event channel and run context, starts `task` with it and
    /// collects the run.
    pub async fn collect_with<E, T, X, F, Fut>(
        &self,
        task: F,
    ) -> Result<CollectedRun<E, T>, CollectError<E, X>>
    where
        F: FnOnce(RunContext<E>) -> Fut,
        Fut: Future<Output = Result<T, X>> + Send + 'static,
        T: Send + 'static,
        X: Send + 'static,
    {
        let (sink, queue) = event_channel();
        let ctx = RunContext {
            run_id: uuid::Uuid::new_v4(),
            timeout: self.options.timeout,
            sink,
        };
        let run_id = ctx.run_id;
        self.drive(run_id, task(ctx), queue).await
    }

    /// Runs `task` concurrently and drains `queue` until the task has
    /// finished and nothing is left to read.
    pub async fn run_and_collect<E, T, X, Fut>(
        &self,
        task: Fut,
        queue: EventQueue<E>,
    ) -> Result<CollectedRun<E, T>, CollectError<E, X>>
    where
        Fut: Future<Output = Result<T, X>> + Send + 'static,
        T: Send + 'static,
        X: Send + 'static,
    {
        self.drive(uuid::Uuid::new_v4(), task, queue).await
    }

    async fn drive<E, T, X, Fut>(
        &self,
        run_id: uuid::Uuid,
        task: Fut,
        mut queue: EventQueue<E>,
    ) -> Result<CollectedRun<E, T>, CollectError<E, X>>
    where
        Fut: Future<Output = Result<T, X>> + Send + 'static,
        T: Send + 'static,
        X: Send + 'static,
    {
        let slice = self.options.poll_slice().max(MIN_POLL_SLICE);
        let (guard, mut signal) = completion_signal();
        debug!(run_id = %run_id, state = ?RunState::Idle, "scheduling task");
        let handle = tokio::spawn(async move {
            let _guard = guard;
            task.await
        });
        debug!(run_id = %run_id, state = ?RunState::Running, "task scheduled");

        let mut events = Vec::new();
        let stop = loop {
            let signalled = signal.is_set();
            if signalled && queue.is_empty() {
                break DrainStop::Completed;
            }
            tokio::select! {
                biased;
                popped = queue.pop_timeout(slice) => match popped {
                    PopOutcome::Item(event) => {
                        if events.is_empty() {
                            debug!(run_id = %run_id, state = ?RunState::Draining, "first event received");
                        }
                        events.push(event);
                    }
                    PopOutcome::Closed => break DrainStop::ChannelClosed,
                    PopOutcome::Elapsed => {
                        if finished_and_drained(&handle, &queue) {
                            break DrainStop::IdleAfterFinish;
                        }
                    }
                },
                _ = signal.wait(), if !signalled => {}
            }
        };
        debug!(run_id = %run_id, events = events.len(), ?stop, "drain stopped");

        match handle.await {
            Ok(Ok(output)) => {
                debug!(run_id = %run_id, state = ?RunState::Finished, events = events.len(), "run finished");
                Ok(CollectedRun {
                    run_id,
                    events,
                    output,
                    stop,
                })
            }
            Ok(Err(error)) => {
                warn!(run_id = %run_id, state = ?RunState::Failed, events = events.len(), "task returned an error");
                Err(CollectError::TaskFailed { events, error })
            }
            Err(join) => {
                warn!(run_id = %run_id, state = ?RunState::Failed, events = events.len(), error = %join, "task did not complete");
                Err(join_failure(join, events))
            }
        }
    }
}

/// Runs `task` while draining `queue`, using default options with the given
/// timeout.
pub async fn run_and_collect<E, T, X, Fut>(
    task: Fut,
    queue: EventQueue<E>,
    timeout: Duration,
) -> Result<CollectedRun<E, T>, CollectError<E, X>>
where
    Fut: Future<Output = Result<T, X>> + Send + 'static,
    T: Send + 'static,
    X: Send + 'static,
{
    let coordinator = StreamCoordinator {
        options: CollectOptions::default().timeout(timeout),
    };
    coordinator.run_and_collect(task, queue).await
}

// An event can land between the expired slice and this check, so the
// queue is consulted again before giving up on it.
fn finished_and_drained<T, E>(handle: &JoinHandle<T>, queue: &EventQueue<E>) -> bool {
    handle.is_finished() && queue.is_empty()
}

fn join_failure<E, X>(join: JoinError, events: Vec<E>) -> CollectError<E, X> {
    if join.is_panic() {
        CollectError::TaskPanicked {
            events,
            message: panic_message(join.into_panic()),
        }
    } else {
        CollectError::TaskCancelled { events }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
