//! When the mock status progression fires.

use std::str::FromStr;
use std::time::Duration;

use jalapeno_core::OrderStatus;
use thiserror::Error;

/// Largest offset a step may have.
pub const MAX_OFFSET: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors building a [`ProgressionSchedule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("expected 3 delays (confirmed, shipped, delivered), got {0}")]
    WrongCount(usize),
    #[error("invalid delay {0:?}: must be a non-negative number of seconds")]
    InvalidSeconds(String),
    #[error("delays must not decrease: {later:?} comes before {earlier:?}")]
    Decreasing { earlier: Duration, later: Duration },
    #[error("the progression cannot move an order back to pending")]
    PendingStep,
    #[error("delay {0:?} is longer than {MAX_OFFSET:?}")]
    TooLong(Duration),
}

/// Ordered `(status, offset)` steps.
///
/// Offsets are measured from order creation, not from the previous step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressionSchedule {
    steps: Vec<(OrderStatus, Duration)>,
}

impl Default for ProgressionSchedule {
    /// Confirmed after 5s, shipped after 15s, delivered after 30s.
    fn default() -> Self {
        Self {
            steps: vec![
                (OrderStatus::Confirmed, Duration::from_secs(5)),
                (OrderStatus::Shipped, Duration::from_secs(15)),
                (OrderStatus::Delivered, Duration::from_secs(30)),
            ],
        }
    }
}

impl ProgressionSchedule {
    /// Build a schedule from explicit steps.
    ///
    /// # Errors
    ///
    /// Returns an error if an offset is smaller than the one before it or
    /// exceeds [`MAX_OFFSET`], or a step targets `pending`.
    pub fn new(steps: Vec<(OrderStatus, Duration)>) -> Result<Self, ScheduleError> {
        if steps.iter().any(|(status, _)| *status == OrderStatus::Pending) {
            return Err(ScheduleError::PendingStep);
        }
        if let Some((_, offset)) = steps.iter().find(|(_, offset)| *offset > MAX_OFFSET) {
            return Err(ScheduleError::TooLong(*offset));
        }
        for pair in steps.windows(2) {
            if let [(_, earlier), (_, later)] = pair
                && later < earlier
            {
                return Err(ScheduleError::Decreasing {
                    earlier: *earlier,
                    later: *later,
                });
            }
        }
        Ok(Self { steps })
    }

    /// The standard confirmed/shipped/delivered steps at custom offsets.
    ///
    /// # Errors
    ///
    /// Returns an error if the offsets decrease or one is too long.
    pub fn from_offsets(
        confirmed: Duration,
        shipped: Duration,
        delivered: Duration,
    ) -> Result<Self, ScheduleError> {
        Self::new(vec![
            (OrderStatus::Confirmed, confirmed),
            (OrderStatus::Shipped, shipped),
            (OrderStatus::Delivered, delivered),
        ])
    }

    #[must_use]
    pub fn steps(&self) -> &[(OrderStatus, Duration)] {
        &self.steps
    }

    /// Offset of the final step.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.steps
            .last()
            .map_or(Duration::ZERO, |(_, offset)| *offset)
    }
}

impl FromStr for ProgressionSchedule {
    type Err = ScheduleError;

    /// Parse `confirmed,shipped,delivered` offsets in seconds, e.g. `5,15,30`
    /// or `0.5,1.5,3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let offsets = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<f64>()
                    .ok()
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    .ok_or_else(|| ScheduleError::InvalidSeconds(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match offsets.as_slice() {
            [confirmed, shipped, delivered] => Self::from_offsets(*confirmed, *shipped, *delivered),
            other => Err(ScheduleError::WrongCount(other.len())),
        }
    }
}
