//! Trigger latch — turns independent entry/exit trigger streams into a
//! continuous position state.
//!
//! The latch holds its state until the opposing trigger releases it:
//! - Holding: `exits[t]` flips to Flat; entries are ignored (no re-entry).
//! - Flat: `entries[t]` flips to Holding; exits are ignored.
//!
//! When both triggers fire on the same bar the current state decides: exit
//! wins while holding, entry wins while flat.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Derived position state. Produced only by the latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Holding,
}

impl PositionState {
    pub fn is_holding(self) -> bool {
        self == Self::Holding
    }

    /// Apply one bar's triggers.
    #[inline]
    pub fn step(self, entry: bool, exit: bool) -> Self {
        match self {
            Self::Holding if exit => Self::Flat,
            Self::Holding => Self::Holding,
            Self::Flat if entry => Self::Holding,
            Self::Flat => Self::Flat,
        }
    }
}

impl From<bool> for PositionState {
    fn from(holding: bool) -> Self {
        if holding {
            Self::Holding
        } else {
            Self::Flat
        }
    }
}

/// Entry/exit triggers for one instrument, indexed by bar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerPair {
    pub dates: Vec<NaiveDate>,
    pub entries: Vec<bool>,
    pub exits: Vec<bool>,
}

impl TriggerPair {
    /// Build a pair from separately indexed entry and exit columns.
    ///
    /// The two columns must share exactly the same index; anything else would
    /// compare triggers from different days.
    pub fn from_indexed(
        entries: &[(NaiveDate, bool)],
        exits: &[(NaiveDate, bool)],
    ) -> Result<Self, EngineError> {
        if entries.len() != exits.len() {
            return Err(EngineError::ShapeMismatch {
                what: "exits",
                expected: entries.len(),
                actual: exits.len(),
            });
        }
        for (index, ((left, _), (right, _))) in entries.iter().zip(exits).enumerate() {
            if left != right {
                return Err(EngineError::DateMisalignment {
                    index,
                    left: *left,
                    right: *right,
                });
            }
        }
        Ok(Self {
            dates: entries.iter().map(|(d, _)| *d).collect(),
            entries: entries.iter().map(|(_, e)| *e).collect(),
            exits: exits.iter().map(|(_, x)| *x).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Latch two parallel trigger sequences into a holding mask.
pub fn latch(
    entries: &[bool],
    exits: &[bool],
    initial: PositionState,
) -> Result<Vec<bool>, EngineError> {
    Ok(latch_states(entries, exits, initial)?
        .into_iter()
        .map(PositionState::is_holding)
        .collect())
}

/// Latch two parallel trigger sequences into typed position states.
pub fn latch_states(
    entries: &[bool],
    exits: &[bool],
    initial: PositionState,
) -> Result<Vec<PositionState>, EngineError> {
    if entries.len() != exits.len() {
        return Err(EngineError::ShapeMismatch {
            what: "exits",
            expected: entries.len(),
            actual: exits.len(),
        });
    }

    let mut out = Vec::with_capacity(entries.len());
    let mut state = initial;
    for (&entry, &exit) in entries.iter().zip(exits) {
        state = state.step(entry, exit);
        out.push(state);
    }
    Ok(out)
}

/// Latch a `TriggerPair`, checking its columns share one length.
pub fn latch_pair(
    pair: &TriggerPair,
    initial: PositionState,
) -> Result<Vec<PositionState>, EngineError> {
    if pair.entries.len() != pair.dates.len() {
        return Err(EngineError::ShapeMismatch {
            what: "entries",
            expected: pair.dates.len(),
            actual: pair.entries.len(),
        });
    }
    latch_states(&pair.entries, &pair.exits, initial)
}

/// Latch several instruments independently. Every column starts Flat.
pub fn latch_columns(
    columns: &BTreeMap<String, TriggerPair>,
) -> Result<BTreeMap<String, Vec<PositionState>>, EngineError> {
    columns
        .iter()
        .map(|(symbol, pair)| {
            latch_pair(pair, PositionState::Flat).map(|states| (symbol.clone(), states))
        })
        .collect()
}

/// Map latched states to a raw target signal: `exposure` while holding,
/// `0.0` while flat.
pub fn states_to_signal(states: &[PositionState], exposure: f64) -> Vec<f64> {
    states
        .iter()
        .map(|s| if s.is_holding() { exposure } else { 0.0 })
        .collect()
}
