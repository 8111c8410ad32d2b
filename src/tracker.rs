//! Scenic-spot transition tracking.
//!
//! The tracker turns per-cycle membership results into enter/leave edges by
//! comparing against the previous cycle. State is two region names; an empty
//! name means "outside every region".

use crate::geo::PositionFix;
use crate::geofence::GeofenceEngine;

/// Current and previous-cycle region names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenicSpotState {
    pub current: String,
    pub previous: String,
}

/// Edge observed during a single update cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// No change since the last cycle.
    None,
    Entered { region: String },
    /// Left `region` without entering another (includes loss of signal).
    Left { region: String },
    /// Moved straight from one region into another.
    Moved { from: String, to: String },
}

/// State machine over `{Outside, InRegion(name)}`.
#[derive(Debug, Default)]
pub struct ScenicSpotTracker {
    state: ScenicSpotState,
}

impl ScenicSpotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one cycle with the latest fix.
    pub fn update(&mut self, engine: &GeofenceEngine, fix: &PositionFix) -> Transition {
        let next = engine.test_membership(fix);
        self.advance(next)
    }

    /// Advance one cycle with an already computed membership result.
    pub fn advance(&mut self, membership: &str) -> Transition {
        self.state.previous = std::mem::take(&mut self.state.current);
        self.state.current.push_str(membership);

        let transition = self.transition();
        match &transition {
            Transition::Entered { region } => log::info!("entered region '{}'", region),
            Transition::Left { region } => log::info!("left region '{}'", region),
            Transition::Moved { from, to } => {
                log::info!("left region '{}', entered region '{}'", from, to)
            }
            Transition::None => {}
        }
        transition
    }

    pub fn current_region(&self) -> &str {
        &self.state.current
    }

    pub fn previous_region(&self) -> &str {
        &self.state.previous
    }

    /// True only in the cycle where a region was entered.
    pub fn has_just_entered(&self) -> bool {
        !self.state.current.is_empty() && self.state.current != self.state.previous
    }

    /// True only in the cycle where a region was left, whatever came next.
    pub fn has_just_left(&self) -> bool {
        !self.state.previous.is_empty() && self.state.current != self.state.previous
    }

    pub fn state(&self) -> &ScenicSpotState {
        &self.state
    }

    /// Forget all history; the next fix inside a region is a fresh entry.
    pub fn reset(&mut self) {
        self.state.current.clear();
        self.state.previous.clear();
    }

    fn transition(&self) -> Transition {
        let ScenicSpotState { current, previous } = &self.state;
        match (self.has_just_left(), self.has_just_entered()) {
            (true, true) => Transition::Moved {
                from: previous.clone(),
                to: current.clone(),
            },
            (false, true) => Transition::Entered {
                region: current.clone(),
            },
            (true, false) => Transition::Left {
                region: previous.clone(),
            },
            (false, false) => Transition::None,
        }
    }
}
