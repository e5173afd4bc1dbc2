//! Run an async task while draining the events it publishes.
//!
//! `StreamCoordinator` schedules the task in the background, drains its
//! event queue in the foreground and hands back every event together with
//! the task's result once both are settled. A failing task still returns
//! the events it managed to publish.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use agent_relay_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = StreamCoordinator::new(
//!     CollectOptions::default().timeout(Duration::from_secs(30)),
//! )?;
//!
//! let run = coordinator
//!     .collect_with(|ctx: RunContext<String>| async move {
//!         ctx.sink.emit("looking up block height".to_string());
//!         Ok::<_, String>(42_u64)
//!     })
//!     .await
//!     .map_err(|err| err.to_string())?;
//!
//! println!("{} events, answer {}", run.events().len(), run.output());
//! # Ok(())
//! # }
//! ```

/// Adapter for reusable agents with their own default timeout.
pub mod agent;
/// Coordinator options and environment loading.
pub mod config;
/// The drain loop and its result types.
pub mod coordinator;
/// Error types.
pub mod errors;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports.
pub mod prelude;
/// Event channel between the task and the drain loop.
pub mod queue;
/// Set-once completion flag.
pub mod signal;

pub use agent::{AgentRunner, ScopedTimeout, stream_agent_response};
pub use config::{CollectOptions, ObservabilityOptions};
pub use coordinator::{
    CollectedRun, DrainStop, RunContext, RunState, StreamCoordinator, run_and_collect,
};
pub use errors::{CollectError, ConfigError};
pub use observability::init_observability;
pub use queue::{EventQueue, EventSink, PopOutcome, event_channel};
pub use signal::{CompletionSignal, SignalGuard, completion_signal};
