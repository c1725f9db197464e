//! Simulation calendar: the inclusive range of years a run covers.
//!
//! The calendar is the single source of truth for which years exist in a
//! run. Years are stepped strictly in ascending order, and every derivation
//! (previous year, span length) uses checked arithmetic.

use semisim_types::Year;

/// Errors that can occur when building or walking the calendar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// The start year lies after the end year.
    #[error("invalid year range: start year {start} is after end year {end}")]
    InvalidRange {
        /// Configured first year.
        start: Year,
        /// Configured last year.
        end: Year,
    },
}

/// Inclusive, validated range of simulation years (`start <= end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    start: Year,
    end: Year,
}

impl YearRange {
    /// Create a range covering `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidRange`] if `start > end`.
    pub const fn new(start: Year, end: Year) -> Result<Self, CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First simulated year.
    pub const fn start(&self) -> Year {
        self.start
    }

    /// Last simulated year (inclusive).
    pub const fn end(&self) -> Year {
        self.end
    }

    /// Whether `year` falls inside the range.
    pub const fn contains(&self, year: Year) -> bool {
        self.start <= year && year <= self.end
    }

    /// The year before `year`, if it is still inside the range.
    pub fn previous(&self, year: Year) -> Option<Year> {
        year.checked_sub(1).filter(|prev| self.contains(*prev))
    }

    /// Number of years in the range.
    pub fn len(&self) -> usize {
        self.years().count()
    }

    /// Always `false`: a valid range holds at least one year.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over every year in ascending order.
    pub fn years(&self) -> impl Iterator<Item = Year> + use<> {
        self.start..=self.end
    }
}
