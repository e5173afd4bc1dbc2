use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::CollectOptions;
use crate::coordinator::{CollectedRun, RunContext, StreamCoordinator};
use crate::errors::CollectError;

/// A reusable, stateful task runner (typically a tool-calling agent).
///
/// The runner keeps a default timeout of its own. `stream_agent_response`
/// overrides it for one call and restores it afterward, so two concurrent
/// calls on the same runner would observe each other's override. Runners
/// that only read `RunContext::timeout` are not affected.
#[async_trait::async_trait]
pub trait AgentRunner: Send + Sync + 'static {
    /// Progress event published while running.
    type Event: Send + 'static;
    /// Final answer.
    type Output: Send + 'static;
    /// Failure returned by `run`.
    type Error: Send + 'static;

    /// Clears per-conversation state before a new request.
    fn reset(&self);

    /// Current default timeout.
    fn default_timeout(&self) -> Duration;

    /// Replaces the default timeout.
    fn set_default_timeout(&self, timeout: Duration);

    /// Handles one request, publishing events through `ctx.sink`.
    async fn run(
        &self,
        request: String,
        ctx: RunContext<Self::Event>,
    ) -> Result<Self::Output, Self::Error>;
}

/// Overrides a runner's default timeout until dropped.
pub struct ScopedTimeout<'a, R: AgentRunner + ?Sized> {
    runner: &'a R,
    previous: Duration,
}

impl<'a, R: AgentRunner + ?Sized> ScopedTimeout<'a, R> {
    pub fn apply(runner: &'a R, timeout: Duration) -> Self {
        let previous = runner.default_timeout();
        runner.set_default_timeout(timeout);
        Self { runner, previous }
    }

    /// The value restored on drop.
    pub fn previous(&self) -> Duration {
        self.previous
    }
}

impl<R: AgentRunner + ?Sized> Drop for ScopedTimeout<'_, R> {
    fn drop(&mut self) {
        self.runner.set_default_timeout(self.previous);
    }
}

/// Resets `runner`, runs `request` on it with the timeout from `options`,
/// and returns every event it published together with its answer.
///
/// The runner's previous default timeout is restored whether the run
/// succeeds, fails, panics or the returned future is dropped.
pub async fn stream_agent_response<R: AgentRunner>(
    runner: &Arc<R>,
    request: impl Into<String>,
    options: &CollectOptions,
) -> Result<CollectedRun<R::Event, R::Output>, CollectError<R::Event, R::Error>> {
    let coordinator = StreamCoordinator {
        options: options.clone(),
    };
    runner.reset();
    let scoped = ScopedTimeout::apply(runner.as_ref(), options.timeout);
    debug!(
        previous_timeout = ?scoped.previous(),
        timeout = ?options.timeout,
        "runner timeout overridden"
    );

    let agent = Arc::clone(runner);
    let request = request.into();
    coordinator
        .collect_with(move |ctx| async move { agent.run(request, ctx).await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedAgent {
        timeout: Mutex<Duration>,
        resets: Mutex<u32>,
        seen_timeout: Mutex<Option<Duration>>,
        fail: bool,
    }

    impl ScriptedAgent {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                timeout: Mutex::new(Duration::from_secs(60)),
                resets: Mutex::new(0),
                seen_timeout: Mutex::new(None),
                fail,
            })
        }
    }

    #[async_trait::async_trait]
    impl AgentRunner for ScriptedAgent {
        type Event = String;
        type Output = String;
        type Error = String;

        fn reset(&self) {
            *self.resets.lock().unwrap() += 1;
        }

        fn default_timeout(&self) -> Duration {
            *self.timeout.lock().unwrap()
        }

        fn set_default_timeout(&self, timeout: Duration) {
            *self.timeout.lock().unwrap() = timeout;
        }

        async fn run(&self, request: String, ctx: RunContext<String>) -> Result<String, String> {
            *self.seen_timeout.lock().unwrap() = Some(self.default_timeout());
            ctx.sink.emit(format!("received: {request}"));
            ctx.sink.emit("calling get_block_count".to_string());
            if self.fail {
                return Err("rpc timeout".into());
            }
            Ok("block count is 42".into())
        }
    }

    #[tokio::test]
    async fn override_is_visible_during_run_and_restored_after() {
        let agent = ScriptedAgent::new(false);
        let options = CollectOptions::default().timeout(Duration::from_secs(5));

        let run = stream_agent_response(&agent, "status?", &options)
            .await
            .expect("run succeeds");

        assert_eq!(run.events().len(), 2);
        assert_eq!(run.events()[0], "received: status?");
        assert_eq!(run.output(), "block count is 42");
        assert_eq!(*agent.seen_timeout.lock().unwrap(), Some(Duration::from_secs(5)));
        assert_eq!(agent.default_timeout(), Duration::from_secs(60));
        assert_eq!(*agent.resets.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn override_is_restored_when_run_fails() {
        let agent = ScriptedAgent::new(true);
        let options = CollectOptions::default().timeout(Duration::from_secs(5));

        let err = stream_agent_response(&agent, "status?", &options)
            .await
            .expect_err("run fails");

        assert_eq!(err.task_error().map(String::as_str), Some("rpc timeout"));
        assert_eq!(err.events().len(), 2);
        assert_eq!(agent.default_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn scoped_timeout_restores_on_drop() {
        let agent = ScriptedAgent::new(false);
        {
            let scoped = ScopedTimeout::apply(agent.as_ref(), Duration::from_secs(1));
            assert_eq!(scoped.previous(), Duration::from_secs(60));
            assert_eq!(agent.default_timeout(), Duration::from_secs(1));
        }
        assert_eq!(agent.default_timeout(), Duration::from_secs(60));
    }
}
