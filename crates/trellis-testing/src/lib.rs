//! Testing utilities and harness for Trellis

pub mod clock;
pub mod harness;
pub mod host;
pub mod scheduler;

pub use clock::ManualClock;
pub use harness::TestHarness;
pub use host::{ContainerId, HostOp, MemoryHost, NodeId, PropsDiff};
pub use scheduler::TestScheduler;

pub mod prelude {
    pub use crate::{ContainerId, HostOp, ManualClock, MemoryHost, NodeId, TestHarness, TestScheduler};
    pub use trellis_core::{
        Callback, Component, Dep, Element, Hooks, Lanes, Node, Props, ReconcileError, StateSetter,
        CONTINUOUS_EVENT_PRIORITY, DEFAULT_EVENT_PRIORITY, DISCRETE_EVENT_PRIORITY, IDLE_EVENT_PRIORITY,
    };
}
