//! Bi-level projection of numeric signals.

use chrono::{Duration, NaiveDateTime};

use crate::error::Result;
use crate::signal::{DataSignal, NumericSignal, Signal};
use crate::types::SignalDefinition;

/// Per-sample classification against the two reference levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Transition,
    Low,
    High,
}

/// A numeric signal coerced into two levels
///
/// Without a tolerance every sample snaps to the nearer level (ties go to
/// `high`). With a tolerance a sample is `Low` or `High` only when it lies
/// strictly within `tolerance` of that level, otherwise `Transition`; when
/// the bands overlap `Low` wins.
///
/// # Examples
///
/// ```rust
/// use edfsignals::{BiLevelSignal, DataSignal, Level};
/// use edfsignals::testing::TestingSignal;
/// # use chrono::NaiveDate;
/// # let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// # let end = start + chrono::Duration::seconds(4);
///
/// let signal = TestingSignal::new(start, end, vec![0.1, 4.8, 2.5, 5.2]);
/// let bilevel = BiLevelSignal::with_tolerance(signal, 0.0, 5.0, 1.0);
///
/// let levels = bilevel.levels(start, end)?;
/// assert_eq!(levels, vec![Level::Low, Level::High, Level::Transition, Level::High]);
/// assert_eq!(bilevel.label(), "Testing signal (bilevel)");
/// # Ok::<(), edfsignals::EdfError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BiLevelSignal<S> {
    signal: S,
    low: f64,
    high: f64,
    tolerance: Option<f64>,
}

impl<S: DataSignal> BiLevelSignal<S> {
    /// Nearest-level projection.
    pub fn new(signal: S, low: f64, high: f64) -> Self {
        BiLevelSignal {
            signal,
            low,
            high,
            tolerance: None,
        }
    }

    /// Tolerance-band projection.
    pub fn with_tolerance(signal: S, low: f64, high: f64, tolerance: f64) -> Self {
        BiLevelSignal {
            signal,
            low,
            high,
            tolerance: Some(tolerance),
        }
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    pub fn inner(&self) -> &S {
        &self.signal
    }

    /// Whichever of `low`/`high` is closer to `value`; ties go to `high`.
    pub fn collapse(&self, value: f64) -> f64 {
        if (value - self.low).abs() < (value - self.high).abs() {
            self.low
        } else {
            self.high
        }
    }

    pub fn classify(&self, value: f64) -> Level {
        match self.tolerance {
            None => {
                if (value - self.low).abs() < (value - self.high).abs() {
                    Level::Low
                } else {
                    Level::High
                }
            }
            Some(tolerance) => {
                if (value - self.low).abs() < tolerance {
                    Level::Low
                } else if (value - self.high).abs() < tolerance {
                    Level::High
                } else {
                    Level::Transition
                }
            }
        }
    }

    /// Level of every sample in `[start, end)`.
    pub fn levels(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Level>> {
        let values = self.signal.recording(start, end)?;
        Ok(values.into_iter().map(|v| self.classify(v)).collect())
    }
}

impl<'a> BiLevelSignal<NumericSignal<'a>> {
    /// Wraps a signal of a decoded file; annotation channels are rejected
    /// with `EdfError::UnsupportedSignalKind`.
    pub fn from_signal(
        signal: Signal<'a>,
        low: f64,
        high: f64,
        tolerance: Option<f64>,
    ) -> Result<Self> {
        let numeric = signal.into_numeric()?;
        Ok(BiLevelSignal {
            signal: numeric,
            low,
            high,
            tolerance,
        })
    }
}

impl<S: DataSignal> DataSignal for BiLevelSignal<S> {
    fn label(&self) -> String {
        format!("{} (bilevel)", self.signal.label())
    }

    fn start_time(&self) -> NaiveDateTime {
        self.signal.start_time()
    }

    fn end_time(&self) -> NaiveDateTime {
        self.signal.end_time()
    }

    /// Always `None`: the projection is derived, not read from the header.
    fn definition(&self) -> Option<&SignalDefinition> {
        None
    }

    fn sample_period(&self) -> Duration {
        self.signal.sample_period()
    }

    /// Without a tolerance every value collapses to the nearer level. With a
    /// tolerance values inside a band snap to that level and the rest pass
    /// through unchanged.
    fn recording(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<f64>> {
        let values = self.signal.recording(start, end)?;
        Ok(values
            .into_iter()
            .map(|v| match self.classify(v) {
                Level::Low => self.low,
                Level::High => self.high,
                Level::Transition => v,
            })
            .collect())
    }
}
