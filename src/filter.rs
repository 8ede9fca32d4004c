//! Time-of-day trip filtering driven by the slider.

use thiserror::Error;

use crate::model::Trip;
use crate::time::{MINUTES_PER_DAY, minute_of_day};

/// Half-width of the window around the focus minute, inclusive.
pub const WINDOW_MINUTES: i32 = 60;

/// Slider value that means "any time".
pub const UNSET_SLIDER_VALUE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeFilterError {
    #[error("time filter {0} is outside -1..=1439")]
    OutOfRange(i32),
}

/// Either no time restriction, or a focus minute-of-day in `0..1440`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeFilter {
    #[default]
    Unset,
    At(u16),
}

impl TimeFilter {
    /// Interprets a raw slider value, where `-1` disables the filter.
    pub fn from_slider(value: i32) -> Result<Self, TimeFilterError> {
        match value {
            UNSET_SLIDER_VALUE => Ok(TimeFilter::Unset),
            v if (0..i32::from(MINUTES_PER_DAY)).contains(&v) => Ok(TimeFilter::At(v as u16)),
            v => Err(TimeFilterError::OutOfRange(v)),
        }
    }

    pub fn to_slider(self) -> i32 {
        match self {
            TimeFilter::Unset => UNSET_SLIDER_VALUE,
            TimeFilter::At(m) => i32::from(m),
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, TimeFilter::At(_))
    }

    /// Returns true if `trip` starts or ends within [`WINDOW_MINUTES`] of the
    /// focus. The window does not wrap across midnight.
    pub fn matches(self, trip: &Trip) -> bool {
        match self {
            TimeFilter::Unset => true,
            TimeFilter::At(focus) => {
                let near = |m: u16| (i32::from(m) - i32::from(focus)).abs() <= WINDOW_MINUTES;
                near(minute_of_day(&trip.started_at)) || near(minute_of_day(&trip.ended_at))
            }
        }
    }
}

/// Selects the trips that survive `filter`, preserving input order.
pub fn filter_by_time(trips: &[Trip], filter: TimeFilter) -> Vec<&Trip> {
    match filter {
        TimeFilter::Unset => trips.iter().collect(),
        TimeFilter::At(_) => trips.iter().filter(|t| filter.matches(t)).collect(),
    }
}
