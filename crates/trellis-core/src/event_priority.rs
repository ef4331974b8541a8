//! Event priorities: the coarse priority classes hosts and callers speak in.
//!
//! Each class is represented by its lane, so converting an event priority to
//! an update lane is free.

use crate::lane::{Lane, Lanes};
use crate::scheduler::PriorityLevel;

pub type EventPriority = Lane;

pub const DISCRETE_EVENT_PRIORITY: EventPriority = Lanes::SYNC;
pub const CONTINUOUS_EVENT_PRIORITY: EventPriority = Lanes::INPUT_CONTINUOUS;
pub const DEFAULT_EVENT_PRIORITY: EventPriority = Lanes::DEFAULT;
pub const IDLE_EVENT_PRIORITY: EventPriority = Lanes::IDLE;

fn is_higher_event_priority(a: EventPriority, b: EventPriority) -> bool {
    !a.is_empty() && a.bits() < b.bits()
}

/// Maps the most urgent lane of `lanes` onto an event priority class.
pub fn lanes_to_event_priority(lanes: Lanes) -> EventPriority {
    let lane = lanes.highest_priority_lane();
    if !is_higher_event_priority(DISCRETE_EVENT_PRIORITY, lane) {
        return DISCRETE_EVENT_PRIORITY;
    }
    if !is_higher_event_priority(CONTINUOUS_EVENT_PRIORITY, lane) {
        return CONTINUOUS_EVENT_PRIORITY;
    }
    if lane.includes_non_idle_work() {
        return DEFAULT_EVENT_PRIORITY;
    }
    IDLE_EVENT_PRIORITY
}

/// Scheduler level used to run work for `lanes` on the task heap.
pub fn scheduler_priority_for_lanes(lanes: Lanes) -> PriorityLevel {
    match lanes_to_event_priority(lanes) {
        DISCRETE_EVENT_PRIORITY => PriorityLevel::Immediate,
        CONTINUOUS_EVENT_PRIORITY => PriorityLevel::UserBlocking,
        DEFAULT_EVENT_PRIORITY => PriorityLevel::Normal,
        IDLE_EVENT_PRIORITY => PriorityLevel::Idle,
        _ => PriorityLevel::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_map_to_their_class() {
        assert_eq!(lanes_to_event_priority(Lanes::SYNC), DISCRETE_EVENT_PRIORITY);
        assert_eq!(
            lanes_to_event_priority(Lanes::INPUT_CONTINUOUS_HYDRATION),
            CONTINUOUS_EVENT_PRIORITY
        );
        assert_eq!(
            lanes_to_event_priority(Lanes::DEFAULT | Lanes::IDLE),
            DEFAULT_EVENT_PRIORITY
        );
        assert_eq!(lanes_to_event_priority(Lanes::IDLE), IDLE_EVENT_PRIORITY);
        assert_eq!(lanes_to_event_priority(Lanes::OFFSCREEN), IDLE_EVENT_PRIORITY);
    }

    #[test]
    fn scheduler_levels() {
        assert_eq!(scheduler_priority_for_lanes(Lanes::SYNC), PriorityLevel::Immediate);
        assert_eq!(
            scheduler_priority_for_lanes(Lanes::INPUT_CONTINUOUS),
            PriorityLevel::UserBlocking
        );
        assert_eq!(scheduler_priority_for_lanes(Lanes::DEFAULT), PriorityLevel::Normal);
        assert_eq!(scheduler_priority_for_lanes(Lanes::IDLE), PriorityLevel::Idle);
    }
}
