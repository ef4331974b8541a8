#![doc = r"Interruptible, priority-scheduled tree reconciliation for Trellis."]

pub mod config;
pub mod element;
pub mod error;
pub mod event_priority;
pub mod flags;
pub mod hash;
pub mod hooks;
pub mod host;
pub mod lane;
pub mod platform;
pub mod runtime;
pub mod scheduler;

mod begin_work;
mod child_fiber;
mod commit_work;
mod complete_work;
mod concurrent_updates;
mod fiber;
mod reconciler;
mod root;
mod sync_queue;
mod update_queue;
mod work_loop;

pub use config::ReconcilerConfig;
pub use element::{
    Callback, Component, Element, ElementType, HostRef, Key, Node, PropValue, Props, RenderResult,
};
pub use error::{HostError, ReconcileError};
pub use event_priority::{
    EventPriority, CONTINUOUS_EVENT_PRIORITY, DEFAULT_EVENT_PRIORITY, DISCRETE_EVENT_PRIORITY,
    IDLE_EVENT_PRIORITY,
};
pub use fiber::{FiberId, RootState, WorkTag};
pub use hooks::{Cleanup, Dep, Dispatch, HookMode, Hooks, SetStateAction, StateSetter};
pub use host::HostAdapter;
pub use lane::{Lane, Lanes, Millis};
pub use platform::{Clock, RuntimeScheduler};
pub use reconciler::Reconciler;
pub use root::RootId;
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle, UpdatePriorityGuard};
pub use scheduler::{PriorityLevel, TaskId};

#[cfg(test)]
#[path = "tests/test_host.rs"]
pub(crate) mod test_host;

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod reconciler_tests;
