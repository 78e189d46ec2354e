//! Trigger adapters: translate an inbound HTTP request or queue message into
//! a pipeline invocation and the pipeline's outcome back into the trigger's
//! native acknowledgment contract.

pub mod http;
pub mod queue;
