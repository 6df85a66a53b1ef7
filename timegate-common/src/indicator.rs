// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Status LED patterns for boot progress.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// A blocking on/off pattern: `count` cycles, each phase held `interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulsePattern {
    pub count: u32,
    pub interval_ms: u32,
}

impl PulsePattern {
    /// Network link established.
    pub const SUCCESS: Self = Self::new(3, 100);
    /// Waiting between time-sync attempts.
    pub const RETRY: Self = Self::new(1, 500);
    /// Terminal failure, restart imminent.
    pub const PANIC: Self = Self::new(50, 50);

    pub const fn new(count: u32, interval_ms: u32) -> Self {
        Self { count, interval_ms }
    }

    /// Time the pattern blocks for.
    pub const fn duration_ms(&self) -> u32 {
        self.count.saturating_mul(self.interval_ms).saturating_mul(2)
    }
}

/// Drives a single digital output as the boot status indicator.
///
/// Pin errors are ignored: the indicator is diagnostic only.
pub struct StatusIndicator<P, D> {
    pin: P,
    delay: D,
}

impl<P: OutputPin, D: DelayNs> StatusIndicator<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    /// Toggle the output on then off `count` times.
    pub fn pulse(&mut self, count: u32, interval_ms: u32) {
        for _ in 0..count {
            self.pin.set_high().ok();
            self.delay.delay_ms(interval_ms);
            self.pin.set_low().ok();
            self.delay.delay_ms(interval_ms);
        }
    }

    pub fn show(&mut self, pattern: PulsePattern) {
        self.pulse(pattern.count, pattern.interval_ms);
    }

    pub fn success_pulse(&mut self) {
        self.show(PulsePattern::SUCCESS);
    }

    pub fn retry_pulse(&mut self) {
        self.show(PulsePattern::RETRY);
    }

    /// Rapid pattern reserved for the moments before a forced restart.
    pub fn panic_pulse(&mut self) {
        self.show(PulsePattern::PANIC);
    }

    /// Leave the output solidly on.
    pub fn hold_on(&mut self) {
        self.pin.set_high().ok();
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}
