#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-agent illness and movement state machine.
//!
//! Agents own their state and receive every collaborator they consult through
//! a [`StepContext`] on each call. All randomness flows through the generator
//! passed to [`Agent::step`], so a seeded generator replays a run exactly.

mod actions;
mod agent;
mod destination;

pub use actions::ActionTable;
pub use agent::{Agent, AgentSpec, StepContext};
pub use destination::DestinationPolicy;
