//! Source of "today" for everything that needs the current date.

use chrono::{Local, NaiveDate, Timelike};

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    /// Hour of day (0-23) in the same timezone as `today`.
    fn hour(&self) -> u32;
}

/// Local wall clock of the host.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// A clock stuck at one moment.
#[cfg(test)]
pub struct FixedClock {
    pub date: NaiveDate,
    pub hour: u32,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(date: NaiveDate, hour: u32) -> Self {
        Self { date, hour }
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date
    }

    fn hour(&self) -> u32 {
        self.hour
    }
}
