//! Abstractions over "today" so date-driven logic can be tested.
//!
//! Every engine function takes its reference date as a parameter; the
//! `Clock` only decides where that date comes from at the edges.

use std::sync::{Arc, Mutex};

use chrono::{Days, Local, NaiveDate, Timelike};

// ==================== Clock Trait ====================

/// Trait for abstracting the user's calendar.
pub trait Clock: Send + Sync {
    /// The current date in the user's local timezone.
    fn today(&self) -> NaiveDate;

    /// The current local hour, `0..24`.
    fn hour(&self) -> u32;
}

/// System clock backed by the local timezone.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Mock clock for testing with a controllable date and hour.
#[derive(Debug, Clone)]
pub struct MockClock {
    state: Arc<Mutex<(NaiveDate, u32)>>,
}

impl MockClock {
    /// Create a mock clock fixed at noon on `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self::at(date, 12)
    }

    /// Create a mock clock fixed at `hour` on `date`.
    pub fn at(date: NaiveDate, hour: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new((date, hour.min(23)))),
        }
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.state.lock().unwrap().0 = date;
    }

    pub fn set_hour(&self, hour: u32) {
        self.state.lock().unwrap().1 = hour.min(23);
    }

    /// Move the clock forward by whole days.
    pub fn advance(&self, days: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(next) = state.0.checked_add_days(Days::new(days)) {
            state.0 = next;
        }
    }
}

impl Clock for MockClock {
    fn today(&self) -> NaiveDate {
        self.state.lock().unwrap().0
    }

    fn hour(&self) -> u32 {
        self.state.lock().unwrap().1
    }
}
