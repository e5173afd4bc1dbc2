//! Common imports for driving a coordinated run.
pub use crate::{
    AgentRunner, CollectError, CollectOptions, CollectedRun, EventSink, RunContext,
    StreamCoordinator, event_channel, stream_agent_response,
};
