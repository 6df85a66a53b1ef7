// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot sequencing: link, then clock, then hand-off or restart.
//!
//! ```text
//! Init -> Connecting -> Connected -----> Syncing -> TimeOk -----> Ready
//!                   \-> NetworkFailed -> Reset   \-> TimeFailed -> Reset
//! ```
//!
//! There is no degraded mode. A boot that cannot prove both a network link and
//! a plausible clock ends in a hardware restart.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::BootConfig;
use crate::indicator::{PulsePattern, StatusIndicator};
use crate::network::{NetworkConnector, StationInterface};
use crate::time_sync::{TimeSource, TimeSynchronizer};

/// Unconditional hardware restart.
///
/// Real implementations do not return.
pub trait SystemReset {
    fn restart(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootState {
    Init,
    Connecting,
    Connected,
    NetworkFailed,
    Syncing,
    TimeOk,
    TimeFailed,
    Ready,
    Reset,
}

impl BootState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Reset)
    }
}

/// How the boot attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootVerdict {
    Ready,
    NetworkFailed,
    TimeFailed,
}

/// The boot session: owns every hardware service for the duration of one boot.
pub struct BootOrchestrator<N, T, P, D, R> {
    config: BootConfig,
    station: N,
    clock: T,
    indicator: StatusIndicator<P, D>,
    delay: D,
    reset: R,
    state: BootState,
    verdict: Option<BootVerdict>,
}

impl<N, T, P, D, R> BootOrchestrator<N, T, P, D, R>
where
    N: StationInterface,
    T: TimeSource,
    P: OutputPin,
    D: DelayNs,
    R: SystemReset,
{
    pub fn new(
        config: BootConfig,
        station: N,
        clock: T,
        indicator: StatusIndicator<P, D>,
        delay: D,
        reset: R,
    ) -> Self {
        Self {
            config,
            station,
            clock,
            indicator,
            delay,
            reset,
            state: BootState::Init,
            verdict: None,
        }
    }

    pub fn state(&self) -> BootState {
        self.state
    }

    pub fn verdict(&self) -> Option<BootVerdict> {
        self.verdict
    }

    /// Drive the state machine to a terminal state.
    pub fn run(&mut self) -> BootVerdict {
        loop {
            if let Some(verdict) = self.step() {
                return verdict;
            }
        }
    }

    /// Perform one transition. Returns the verdict once a terminal state is reached.
    pub fn step(&mut self) -> Option<BootVerdict> {
        let current = self.state;
        let next = match current {
            BootState::Init => BootState::Connecting,
            BootState::Connecting if self.connect_network() => BootState::Connected,
            BootState::Connecting => BootState::NetworkFailed,
            BootState::Connected => BootState::Syncing,
            BootState::Syncing if self.sync_time() => BootState::TimeOk,
            BootState::Syncing => BootState::TimeFailed,
            BootState::TimeOk => BootState::Ready,
            BootState::NetworkFailed => {
                self.restart_after_network_failure();
                BootState::Reset
            }
            BootState::TimeFailed => {
                self.restart_after_time_failure();
                BootState::Reset
            }
            BootState::Ready | BootState::Reset => return self.verdict,
        };

        self.enter(next);
        if next.is_terminal() {
            self.verdict
        } else {
            None
        }
    }

    /// Hand the services on to the next boot stage.
    pub fn into_parts(self) -> (N, T, StatusIndicator<P, D>, D, R) {
        (self.station, self.clock, self.indicator, self.delay, self.reset)
    }

    fn enter(&mut self, next: BootState) {
        debug!("Boot: {} -> {}", self.state, next);
        match next {
            BootState::Ready => {
                info!("Boot: system ready, starting application");
                self.verdict = Some(BootVerdict::Ready);
            }
            BootState::NetworkFailed => self.verdict = Some(BootVerdict::NetworkFailed),
            BootState::TimeFailed => self.verdict = Some(BootVerdict::TimeFailed),
            _ => {}
        }
        self.state = next;
    }

    fn connect_network(&mut self) -> bool {
        NetworkConnector::new(&mut self.station, &mut self.indicator, &mut self.delay)
            .with_policy(self.config.credential_policy)
            .connect(&self.config.networks, self.config.connect_timeout_secs)
    }

    fn sync_time(&mut self) -> bool {
        TimeSynchronizer::new(&mut self.clock, &mut self.indicator, &mut self.delay)
            .with_min_valid_year(self.config.min_valid_year)
            .with_backoff_ms(self.config.retry_backoff_ms)
            .sync(self.config.max_time_retries)
    }

    fn restart_after_network_failure(&mut self) {
        let delay_ms = self.config.network_failure_restart_delay_ms;
        error!("Boot: WiFi failure, rebooting in {} ms", delay_ms);
        self.delay.delay_ms(delay_ms);
        self.reset.restart();
    }

    fn restart_after_time_failure(&mut self) {
        let window_ms = self.config.time_failure_restart_delay_ms;
        error!("Boot: CRITICAL: time sync failed after retries");
        error!("Boot: halting to prevent bad data, rebooting in {} ms", window_ms);

        // The panic pattern plays inside the restart window.
        self.indicator.panic_pulse();
        let remaining_ms = window_ms.saturating_sub(PulsePattern::PANIC.duration_ms());
        if remaining_ms > 0 {
            self.delay.delay_ms(remaining_ms);
        }
        self.reset.restart();
    }
}
