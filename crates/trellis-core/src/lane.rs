//! Priority lanes.
//!
//! Work priority is encoded as bits of a 31-bit set. A lower bit means a
//! higher priority, so the highest priority lane of a set is its lowest set
//! bit. Roots keep a [`RootLanes`] record that tracks pending and expired
//! lanes together with a per-lane expiration table used for starvation
//! prevention.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use crate::config::ReconcilerConfig;

/// Milliseconds on the runtime clock.
pub type Millis = u64;

pub const TOTAL_LANES: usize = 31;

/// A set of priority lanes. A single-bit set is also used as "a lane".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Lanes(u32);

/// A single lane; alias kept for readability at call sites.
pub type Lane = Lanes;

impl Lanes {
    pub const NONE: Lanes = Lanes(0);
    pub const SYNC: Lane = Lanes(0b1);
    pub const INPUT_CONTINUOUS_HYDRATION: Lane = Lanes(0b10);
    pub const INPUT_CONTINUOUS: Lane = Lanes(0b100);
    pub const DEFAULT_HYDRATION: Lane = Lanes(0b1000);
    pub const DEFAULT: Lane = Lanes(0b1_0000);
    pub const SELECTIVE_HYDRATION: Lane = Lanes(1 << 27);
    pub const IDLE_HYDRATION: Lane = Lanes(1 << 28);
    pub const IDLE: Lane = Lanes(1 << 29);
    pub const OFFSCREEN: Lane = Lanes(1 << 30);
    pub const NON_IDLE: Lanes = Lanes((1 << 28) - 1);

    pub const fn from_bits(bits: u32) -> Self {
        Lanes(bits & ((1 << TOTAL_LANES) - 1))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn merge(self, other: Lanes) -> Lanes {
        Lanes(self.0 | other.0)
    }

    pub const fn remove(self, other: Lanes) -> Lanes {
        Lanes(self.0 & !other.0)
    }

    pub const fn intersects(self, other: Lanes) -> bool {
        self.0 & other.0 != 0
    }

    /// `(self & subset) == subset`. The empty set is a subset of every set.
    pub const fn is_superset_of(self, subset: Lanes) -> bool {
        self.0 & subset.0 == subset.0
    }

    pub const fn includes_non_idle_work(self) -> bool {
        self.0 & Self::NON_IDLE.0 != 0
    }

    /// Lowest set bit, i.e. the most urgent lane in the set.
    pub const fn highest_priority_lane(self) -> Lane {
        Lanes(self.0 & self.0.wrapping_neg())
    }

    /// Index of the least urgent lane in the set. `None` for the empty set.
    fn pick_arbitrary_lane_index(self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(31 - self.0.leading_zeros() as usize)
        }
    }

    /// Iterates the individual lanes of the set, least urgent first.
    pub fn iter(self) -> impl Iterator<Item = (usize, Lane)> {
        let mut remaining = self;
        std::iter::from_fn(move || {
            let index = remaining.pick_arbitrary_lane_index()?;
            let lane = Lanes(1 << index);
            remaining = remaining.remove(lane);
            Some((index, lane))
        })
    }
}

impl BitOr for Lanes {
    type Output = Lanes;
    fn bitor(self, rhs: Lanes) -> Lanes {
        self.merge(rhs)
    }
}

impl BitOrAssign for Lanes {
    fn bitor_assign(&mut self, rhs: Lanes) {
        *self = self.merge(rhs);
    }
}

impl BitAnd for Lanes {
    type Output = Lanes;
    fn bitand(self, rhs: Lanes) -> Lanes {
        Lanes(self.0 & rhs.0)
    }
}

impl BitAndAssign for Lanes {
    fn bitand_assign(&mut self, rhs: Lanes) {
        self.0 &= rhs.0;
    }
}

impl Not for Lanes {
    type Output = Lanes;
    fn not(self) -> Lanes {
        Lanes::from_bits(!self.0)
    }
}

impl fmt::Debug for Lanes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lanes({:#033b})", self.0)
    }
}

/// Per-lane table, indexed by bit position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneMap<T>([T; TOTAL_LANES]);

impl<T: Copy + Default> Default for LaneMap<T> {
    fn default() -> Self {
        LaneMap([T::default(); TOTAL_LANES])
    }
}

impl<T> LaneMap<T> {
    pub fn get(&self, index: usize) -> &T {
        &self.0[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut T {
        &mut self.0[index]
    }
}

/// Lane bookkeeping carried by every root.
#[derive(Clone, Debug, Default)]
pub struct RootLanes {
    pub pending: Lanes,
    pub expired: Lanes,
    pub expiration_times: LaneMap<Option<Millis>>,
}

impl RootLanes {
    pub fn mark_updated(&mut self, lane: Lane) {
        self.pending |= lane;
    }

    /// Returns the lanes the next render should work on.
    ///
    /// The highest pending lane wins unless it is lower priority than the
    /// lanes already being rendered, in which case the in-flight work keeps
    /// going.
    pub fn next_lanes(&self, wip_lanes: Lanes) -> Lanes {
        let next = self.pending.highest_priority_lane();
        if next.is_empty() {
            return Lanes::NONE;
        }
        if !wip_lanes.is_empty() && wip_lanes != next && next.bits() > wip_lanes.bits() {
            return wip_lanes;
        }
        next
    }

    /// Assigns expiration times to pending lanes that have none and marks
    /// every lane whose time has passed as expired.
    pub fn mark_starved_lanes_as_expired(&mut self, now: Millis, config: &ReconcilerConfig) {
        for (index, lane) in self.pending.iter() {
            let slot = self.expiration_times.get_mut(index);
            match *slot {
                None => *slot = compute_expiration_time(lane, now, config),
                Some(expiration) if expiration <= now => self.expired |= lane,
                Some(_) => {}
            }
        }
    }

    pub fn includes_expired_lane(&self, lanes: Lanes) -> bool {
        self.expired.intersects(lanes)
    }

    /// Drops bookkeeping for lanes that are no longer pending.
    pub fn mark_finished(&mut self, remaining: Lanes) {
        let no_longer_pending = self.pending.remove(remaining);
        self.pending = remaining;
        self.expired &= remaining;
        for (index, _) in no_longer_pending.iter() {
            *self.expiration_times.get_mut(index) = None;
        }
    }
}

fn compute_expiration_time(lane: Lane, now: Millis, config: &ReconcilerConfig) -> Option<Millis> {
    match lane {
        Lanes::SYNC | Lanes::INPUT_CONTINUOUS => Some(now + config.sync_lane_expiration_ms),
        Lanes::DEFAULT => Some(now + config.default_lane_expiration_ms),
        _ => None,
    }
}

/// Lanes that must not be time sliced unless concurrent rendering is the default.
pub fn includes_blocking_lane(lanes: Lanes, config: &ReconcilerConfig) -> bool {
    if config.allow_concurrent_by_default {
        return false;
    }
    lanes.intersects(Lanes::INPUT_CONTINUOUS | Lanes::DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_priority_is_lowest_bit() {
        let set = Lanes::DEFAULT | Lanes::INPUT_CONTINUOUS | Lanes::IDLE;
        assert_eq!(set.highest_priority_lane(), Lanes::INPUT_CONTINUOUS);
        assert_eq!(Lanes::NONE.highest_priority_lane(), Lanes::NONE);
    }

    #[test]
    fn subset_checks() {
        let set = Lanes::SYNC | Lanes::DEFAULT;
        assert!(set.is_superset_of(Lanes::SYNC));
        assert!(set.is_superset_of(Lanes::NONE));
        assert!(!set.is_superset_of(Lanes::IDLE));
        assert!(Lanes::DEFAULT.includes_non_idle_work());
        assert!(!Lanes::IDLE.includes_non_idle_work());
    }

    #[test]
    fn iter_visits_every_lane() {
        let set = Lanes::SYNC | Lanes::DEFAULT | Lanes::OFFSCREEN;
        let lanes: Vec<_> = set.iter().map(|(_, lane)| lane).collect();
        assert_eq!(lanes, vec![Lanes::OFFSCREEN, Lanes::DEFAULT, Lanes::SYNC]);
    }

    #[test]
    fn next_lanes_keeps_higher_priority_work_in_progress() {
        let mut lanes = RootLanes::default();
        lanes.mark_updated(Lanes::IDLE);
        assert_eq!(lanes.next_lanes(Lanes::DEFAULT), Lanes::DEFAULT);
        lanes.mark_updated(Lanes::SYNC);
        assert_eq!(lanes.next_lanes(Lanes::DEFAULT), Lanes::SYNC);
    }

    #[test]
    fn starved_lanes_expire() {
        let config = ReconcilerConfig::default();
        let mut lanes = RootLanes::default();
        lanes.mark_updated(Lanes::DEFAULT | Lanes::IDLE);
        lanes.mark_starved_lanes_as_expired(100, &config);
        assert_eq!(*lanes.expiration_times.get(4), Some(5100));
        assert_eq!(*lanes.expiration_times.get(29), None);
        assert!(lanes.expired.is_empty());

        lanes.mark_starved_lanes_as_expired(5100, &config);
        assert_eq!(lanes.expired, Lanes::DEFAULT);
        assert!(lanes.includes_expired_lane(Lanes::DEFAULT));

        lanes.mark_finished(Lanes::IDLE);
        assert_eq!(lanes.pending, Lanes::IDLE);
        assert!(lanes.expired.is_empty());
        assert_eq!(*lanes.expiration_times.get(4), None);
    }

    #[test]
    fn blocking_lanes_follow_config() {
        let mut config = ReconcilerConfig::default();
        assert!(!includes_blocking_lane(Lanes::DEFAULT, &config));
        config.allow_concurrent_by_default = false;
        assert!(includes_blocking_lane(Lanes::DEFAULT, &config));
        assert!(!includes_blocking_lane(Lanes::IDLE, &config));
    }
}
