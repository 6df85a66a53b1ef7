// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Wall-clock acquisition with a plausibility gate.
//!
//! A time service can answer "success" while the clock still holds its reset
//! default (1970, 2000, ...). Only a year at or after the configured minimum is
//! accepted; anything else is retried exactly like a transport failure.

use core::cell::RefCell;
use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{MIN_VALID_YEAR, RETRY_BACKOFF_MS};
use crate::fmt::Dbg;
use crate::indicator::StatusIndicator;

/// Broken-down local time as reported by the time source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CivilDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CivilDateTime {
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }
}

impl fmt::Display for CivilDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// The time-sync primitive.
pub trait TimeSource {
    type Error: fmt::Debug;

    /// Request a timestamp from the time service, apply it, and return the
    /// resulting local time.
    fn sync_clock(&mut self) -> Result<CivilDateTime, Self::Error>;
}

impl<T: TimeSource> TimeSource for &RefCell<T> {
    type Error = T::Error;

    fn sync_clock(&mut self) -> Result<CivilDateTime, T::Error> {
        self.borrow_mut().sync_clock()
    }
}

/// Verdict on one call of the time-sync primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncOutcome {
    Accepted(CivilDateTime),
    /// The call succeeded but the clock is not believable.
    Implausible(CivilDateTime),
    TransportFailure,
}

/// Apply the plausibility rule to a primitive result.
pub fn classify<E>(result: Result<CivilDateTime, E>, min_valid_year: u16) -> SyncOutcome {
    match result {
        Ok(now) if now.year >= min_valid_year => SyncOutcome::Accepted(now),
        Ok(now) => SyncOutcome::Implausible(now),
        Err(_) => SyncOutcome::TransportFailure,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeSyncAttempt {
    /// 1-based attempt number.
    pub index: u8,
    pub outcome: SyncOutcome,
}

impl TimeSyncAttempt {
    /// Candidate year, if the primitive produced one.
    pub fn year(&self) -> Option<u16> {
        match self.outcome {
            SyncOutcome::Accepted(now) | SyncOutcome::Implausible(now) => Some(now.year),
            SyncOutcome::TransportFailure => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Accepted(_))
    }
}

/// Borrows the time source and indicator for one synchronization run.
pub struct TimeSynchronizer<'a, T, P, D> {
    clock: &'a mut T,
    indicator: &'a mut StatusIndicator<P, D>,
    delay: &'a mut D,
    min_valid_year: u16,
    backoff_ms: u32,
}

impl<'a, T, P, D> TimeSynchronizer<'a, T, P, D>
where
    T: TimeSource,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(clock: &'a mut T, indicator: &'a mut StatusIndicator<P, D>, delay: &'a mut D) -> Self {
        Self {
            clock,
            indicator,
            delay,
            min_valid_year: MIN_VALID_YEAR,
            backoff_ms: RETRY_BACKOFF_MS,
        }
    }

    pub fn with_min_valid_year(mut self, year: u16) -> Self {
        self.min_valid_year = year;
        self
    }

    pub fn with_backoff_ms(mut self, backoff_ms: u32) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    /// `true` once a plausible time has been obtained within `max_retries` attempts.
    pub fn sync(&mut self, max_retries: u8) -> bool {
        self.synchronize(max_retries).is_some()
    }

    /// Like [`Self::sync`], returning the accepted time.
    pub fn synchronize(&mut self, max_retries: u8) -> Option<CivilDateTime> {
        info!("Time: attempting NTP sync");

        for index in 1..=max_retries {
            let attempt = self.attempt(index, max_retries);
            if let SyncOutcome::Accepted(now) = attempt.outcome {
                info!("Time: synced {}", now);
                return Some(now);
            }

            // Fixed backoff, only between attempts.
            if index < max_retries {
                self.indicator.retry_pulse();
                self.delay.delay_ms(self.backoff_ms);
            }
        }

        error!("Time: no plausible time after {} attempts", max_retries);
        None
    }

    fn attempt(&mut self, index: u8, max_retries: u8) -> TimeSyncAttempt {
        let result = self.clock.sync_clock();
        if let Err(e) = &result {
            warn!("Time: NTP attempt {}/{} failed: {}", index, max_retries, Dbg(e));
        }

        let attempt = TimeSyncAttempt {
            index,
            outcome: classify(result, self.min_valid_year),
        };
        if let SyncOutcome::Implausible(now) = attempt.outcome {
            warn!(
                "Time: NTP success but year invalid ({} < {}), retrying",
                now.year,
                self.min_valid_year
            );
        }
        debug!("Time: attempt {}", attempt);
        attempt
    }
}
