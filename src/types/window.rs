//! Time windows and the block ranges they resolve to
//!
//! A run is bounded by a [`TimeWindow`] in UTC seconds. The window is turned
//! into an inclusive [`BlockRange`] by the external block resolver and that
//! range is handed unchanged to every candidate source.

use alloy_primitives::BlockNumber;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;

const SECONDS_PER_HOUR: i64 = 3_600;
const LAST_SECOND_OF_DAY: i64 = 86_399;

/// Unix timestamp in seconds (always UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimestamp(pub i64);

impl UnixTimestamp {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    /// Timestamp of 00:00:00 UTC on `date`
    pub fn start_of_day(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN).and_utc().timestamp())
    }

    /// Creates a UnixTimestamp from a u64 value, `None` past `i64::MAX`
    pub fn from_u64(ts: u64) -> Option<Self> {
        i64::try_from(ts).ok().map(Self)
    }

    /// Converts to u64 for use with block explorer queries
    pub fn as_u64(&self) -> u64 {
        self.0.max(0) as u64
    }

    /// Shifts the timestamp by `seconds` (may be negative)
    pub fn offset(&self, seconds: i64) -> Self {
        Self(self.0.saturating_add(seconds))
    }
}

impl std::fmt::Display for UnixTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive UTC time window `[start, end]` searched by a run
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use txfinder::TimeWindow;
///
/// let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
/// let window = TimeWindow::for_date(date);
/// assert_eq!(window.start().0, 0);
/// assert_eq!(window.end().0, 86_399);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: UnixTimestamp,
    end: UnixTimestamp,
}

impl TimeWindow {
    /// Creates a window, rejecting `start > end`
    pub fn new(start: UnixTimestamp, end: UnixTimestamp) -> Result<Self, ConfigurationError> {
        if start > end {
            return Err(ConfigurationError::invalid_parameter(
                "time_window",
                format!("start {start} is after end {end}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// The whole UTC day `date`, 00:00:00 through 23:59:59
    pub fn for_date(date: NaiveDate) -> Self {
        let start = UnixTimestamp::start_of_day(date);
        Self {
            start,
            end: start.offset(LAST_SECOND_OF_DAY),
        }
    }

    /// From 00:00:00 on `start` through 23:59:59 on `end` (inclusive end date)
    pub fn between_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigurationError> {
        Self::new(
            UnixTimestamp::start_of_day(start),
            UnixTimestamp::start_of_day(end).offset(LAST_SECOND_OF_DAY),
        )
    }

    /// An `hours`-wide window centered on `center`
    pub fn centered_on(center: DateTime<Utc>, hours: u32) -> Result<Self, ConfigurationError> {
        if hours == 0 {
            return Err(ConfigurationError::invalid_parameter(
                "hours",
                "window width must be at least one hour",
            ));
        }
        let half = i64::from(hours) * SECONDS_PER_HOUR / 2;
        let center = UnixTimestamp::from_datetime(center);
        Self::new(center.offset(-half), center.offset(half))
    }

    pub fn start(&self) -> UnixTimestamp {
        self.start
    }

    pub fn end(&self) -> UnixTimestamp {
        self.end
    }

    /// Whether `ts` falls inside the window (inclusive on both ends)
    pub fn contains(&self, ts: UnixTimestamp) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Inclusive block range passed to every source fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    /// First block number in the range (inclusive)
    pub start_block: BlockNumber,

    /// Last block number in the range (inclusive)
    pub end_block: BlockNumber,
}

impl BlockRange {
    /// Creates a block range, rejecting `end_block < start_block`
    pub fn new(start_block: BlockNumber, end_block: BlockNumber) -> Result<Self, ConfigurationError> {
        if end_block < start_block {
            return Err(ConfigurationError::invalid_parameter(
                "block_range",
                format!("end block {end_block} is before start block {start_block}"),
            ));
        }
        Ok(Self {
            start_block,
            end_block,
        })
    }

    /// Number of blocks in the range (inclusive)
    pub fn block_count(&self) -> u64 {
        self.end_block
            .saturating_sub(self.start_block)
            .saturating_add(1)
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start_block, self.end_block)
    }
}
