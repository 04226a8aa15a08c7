//! Per-bar events and the FIFO queue they drain through.
//!
//! Events are created and consumed within a single bar's step; the queue is
//! always empty when a bar finishes.

use std::collections::VecDeque;

use chrono::NaiveDate;

use crate::domain::{Fill, Order};

/// Tagged union of everything that happens inside one bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// New bar available; carries the execution reference price.
    Market { date: NaiveDate, open: f64 },
    /// Desired fractional exposure for the instrument.
    Signal {
        date: NaiveDate,
        symbol: String,
        target_exposure: f64,
    },
    Order { date: NaiveDate, order: Order },
    Fill { date: NaiveDate, fill: Fill },
}

impl Event {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Market { date, .. }
            | Self::Signal { date, .. }
            | Self::Order { date, .. }
            | Self::Fill { date, .. } => *date,
        }
    }
}

/// FIFO event queue owned by one simulation run.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(4),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Drop anything left over. Used when a run halts mid-bar.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
