// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Recording fakes for the boot collaborators.
//!
//! Every fake that has an observable side effect writes into one shared
//! [`Timeline`], so tests can assert on the exact order of indicator edges,
//! sleeps and restarts.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_nb::serial;

use timegate_common::{
    BootConfig, BootOrchestrator, CivilDateTime, Credential, NetworkCredentials, StationInterface,
    StatusIndicator, SystemReset, TimeSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    LedOn,
    LedOff,
    Sleep(u32),
    Restart,
}

#[derive(Clone, Default)]
pub struct Timeline {
    events: Rc<RefCell<Vec<Event>>>,
    micros: Rc<Cell<u64>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// On-phase length of every pulse, in order.
    pub fn pulses(&self) -> Vec<u32> {
        let events = self.events();
        events
            .windows(2)
            .filter_map(|pair| match pair {
                [Event::LedOn, Event::Sleep(ms)] => Some(*ms),
                _ => None,
            })
            .collect()
    }

    /// Sleeps that are not part of a pulse.
    pub fn waits(&self) -> Vec<u32> {
        let events = self.events();
        events
            .iter()
            .enumerate()
            .filter_map(|(i, event)| match event {
                Event::Sleep(ms) => {
                    let in_pulse = i > 0 && matches!(events[i - 1], Event::LedOn | Event::LedOff);
                    (!in_pulse).then_some(*ms)
                }
                _ => None,
            })
            .collect()
    }

    pub fn restarts(&self) -> usize {
        self.events().iter().filter(|e| **e == Event::Restart).count()
    }

    /// Total millisecond sleep time recorded between two event indices.
    pub fn sleep_ms_between(&self, from: usize, to: usize) -> u32 {
        self.events()[from..to]
            .iter()
            .map(|e| match e {
                Event::Sleep(ms) => *ms,
                _ => 0,
            })
            .sum()
    }

    pub fn total_sleep_ms(&self) -> u32 {
        let len = self.events().len();
        self.sleep_ms_between(0, len)
    }

    /// Sub-millisecond busy waits (UART polling), kept off the event list.
    pub fn micros(&self) -> u64 {
        self.micros.get()
    }
}

pub struct FakePin {
    timeline: Timeline,
}

impl FakePin {
    pub fn new(timeline: &Timeline) -> Self {
        Self {
            timeline: timeline.clone(),
        }
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.timeline.push(Event::LedOff);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.timeline.push(Event::LedOn);
        Ok(())
    }
}

/// Pin whose writes always fail; the indicator must not care.
pub struct BrokenPin;

impl ErrorType for BrokenPin {
    type Error = embedded_hal::digital::ErrorKind;
}

impl OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }
}

#[derive(Clone)]
pub struct FakeDelay {
    timeline: Timeline,
}

impl FakeDelay {
    pub fn new(timeline: &Timeline) -> Self {
        Self {
            timeline: timeline.clone(),
        }
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.timeline.micros.set(self.timeline.micros.get() + u64::from(ns / 1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.timeline.micros.set(self.timeline.micros.get() + u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.timeline.push(Event::Sleep(ms));
    }
}

pub struct FakeReset {
    timeline: Timeline,
}

impl FakeReset {
    pub fn new(timeline: &Timeline) -> Self {
        Self {
            timeline: timeline.clone(),
        }
    }
}

impl SystemReset for FakeReset {
    fn restart(&mut self) {
        self.timeline.push(Event::Restart);
    }
}

pub fn indicator(timeline: &Timeline) -> StatusIndicator<FakePin, FakeDelay> {
    StatusIndicator::new(FakePin::new(timeline), FakeDelay::new(timeline))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationError;

/// Scripted station: the link comes up on the `k`-th poll after a join request.
#[derive(Default)]
pub struct FakeStation {
    pub already_connected: bool,
    pub fail_activation: bool,
    pub fail_queries: bool,
    /// SSID that can join, and the poll at which its link comes up.
    pub joins: Option<(&'static str, u32)>,
    pub activations: u32,
    pub requests: Vec<String>,
    pub polls: u32,
    pub polls_since_request: u32,
    pub current: Option<String>,
}

impl FakeStation {
    pub fn connects_after(polls: u32) -> Self {
        Self::joins("home", polls)
    }

    pub fn joins(ssid: &'static str, polls: u32) -> Self {
        Self {
            joins: Some((ssid, polls)),
            ..Self::default()
        }
    }

    pub fn never_connects() -> Self {
        Self::default()
    }

    pub fn already_up() -> Self {
        Self {
            already_connected: true,
            ..Self::default()
        }
    }
}

impl StationInterface for FakeStation {
    type Error = StationError;

    fn is_connected(&mut self) -> Result<bool, StationError> {
        self.polls += 1;
        if self.already_connected {
            return Ok(true);
        }
        if self.fail_queries {
            return Err(StationError);
        }
        let Some(ssid) = &self.current else {
            return Ok(false);
        };
        self.polls_since_request += 1;
        Ok(matches!(self.joins, Some((target, k)) if target == ssid.as_str() && self.polls_since_request >= k))
    }

    fn activate(&mut self) -> Result<(), StationError> {
        self.activations += 1;
        if self.fail_activation {
            Err(StationError)
        } else {
            Ok(())
        }
    }

    fn request_connection(&mut self, credential: &Credential) -> Result<(), StationError> {
        self.requests.push(credential.ssid.as_str().to_owned());
        self.current = Some(credential.ssid.as_str().to_owned());
        self.polls_since_request = 0;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockError;

/// Replays scripted time-sync results; transport errors once exhausted.
pub struct FakeClock {
    script: VecDeque<Result<CivilDateTime, ClockError>>,
    pub calls: u32,
}

impl FakeClock {
    pub fn new(script: impl IntoIterator<Item = Result<CivilDateTime, ClockError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            calls: 0,
        }
    }

    pub fn years(years: &[u16]) -> Self {
        Self::new(years.iter().map(|&y| Ok(at_year(y))))
    }

    pub fn always_failing() -> Self {
        Self::new([])
    }
}

impl TimeSource for FakeClock {
    type Error = ClockError;

    fn sync_clock(&mut self) -> Result<CivilDateTime, ClockError> {
        self.calls += 1;
        self.script.pop_front().unwrap_or(Err(ClockError))
    }
}

pub fn at_year(year: u16) -> CivilDateTime {
    CivilDateTime::new(year, 6, 15, 12, 30, 0)
}

pub fn credentials(ssids: &[&str]) -> NetworkCredentials {
    ssids
        .iter()
        .map(|ssid| Credential::new(ssid, "secret").unwrap())
        .collect()
}

pub type FakeOrchestrator =
    BootOrchestrator<FakeStation, FakeClock, FakePin, FakeDelay, FakeReset>;

pub fn orchestrator(
    timeline: &Timeline,
    config: BootConfig,
    station: FakeStation,
    clock: FakeClock,
) -> FakeOrchestrator {
    BootOrchestrator::new(
        config,
        station,
        clock,
        indicator(timeline),
        FakeDelay::new(timeline),
        FakeReset::new(timeline),
    )
}

#[derive(Default)]
struct SerialState {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    sent: Vec<String>,
    script: VecDeque<(String, String)>,
    fail_reads: bool,
}

/// UART wired to a scripted ESP-AT module.
///
/// Each completed command line is checked against the next scripted entry and
/// the entry's reply is queued for reading.
#[derive(Clone, Default)]
pub struct FakeSerial {
    state: Rc<RefCell<SerialState>>,
}

impl FakeSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(&self, command: &str, reply: &str) -> &Self {
        self.state
            .borrow_mut()
            .script
            .push_back((command.to_owned(), reply.to_owned()));
        self
    }

    /// Bytes arriving without a command, e.g. late join events.
    pub fn inject(&self, text: &str) {
        self.state.borrow_mut().rx.extend(text.bytes());
    }

    pub fn fail_reads(&self) {
        self.state.borrow_mut().fail_reads = true;
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.borrow().sent.clone()
    }

    pub fn pending_script(&self) -> usize {
        self.state.borrow().script.len()
    }
}

impl serial::ErrorType for FakeSerial {
    type Error = serial::ErrorKind;
}

impl serial::Read<u8> for FakeSerial {
    fn read(&mut self) -> nb::Result<u8, serial::ErrorKind> {
        let mut state = self.state.borrow_mut();
        if state.fail_reads {
            return Err(nb::Error::Other(serial::ErrorKind::Overrun));
        }
        state.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl serial::Write<u8> for FakeSerial {
    fn write(&mut self, word: u8) -> nb::Result<(), serial::ErrorKind> {
        let mut state = self.state.borrow_mut();
        state.tx.push(word);
        if state.tx.ends_with(b"\r\n") {
            let line = String::from_utf8_lossy(&state.tx[..state.tx.len() - 2]).into_owned();
            state.tx.clear();
            if let Some((expected, reply)) = state.script.pop_front() {
                assert_eq!(line, expected, "unexpected AT command");
                state.rx.extend(reply.bytes());
            }
            state.sent.push(line);
        }
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), serial::ErrorKind> {
        Ok(())
    }
}
