// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! ESP32 coprocessor driven over UART with the ESP-AT command set.
//!
//! The modem implements both [`StationInterface`] and [`TimeSource`], so the
//! gatekeeper's network and clock collaborators are the same physical device.
//!
//! Joins are asynchronous: `AT+CWJAP` is sent without waiting for its final
//! result, and the link is then polled. While a join is pending, polls only
//! drain unsolicited lines (`WIFI GOT IP`, `+CWJAP:<code>`, the trailing
//! `OK`/`FAIL`); no new command is issued until the join has settled.

mod codec;

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal_nb::serial;
use heapless::{String, Vec};

pub use codec::{
    join_command, parse_line, parse_sntp_time, sntp_config_command, Command, ParseError, Response,
    COMMAND_CAPACITY, LINE_CAPACITY,
};

use crate::config::{Credential, DEFAULT_NTP_SERVER, HOST_CAPACITY};
use crate::network::StationInterface;
use crate::time_sync::{CivilDateTime, TimeSource};

/// Wait for the final result line of a command.
const RESPONSE_TIMEOUT_MS: u32 = 2_000;
/// Idle window that ends a drain of unsolicited lines.
const URC_DRAIN_MS: u32 = 20;
const POLL_STEP_US: u32 = 1_000;
/// `+CWSTATE` value for "connected and got an IPv4 address".
const STATION_CONNECTED: u8 = 2;

/// ESP-AT driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtError {
    /// UART read or write failed
    Serial,
    /// No final result line within the response timeout
    Timeout,
    /// Module answered `ERROR` or `FAIL`
    Rejected,
    /// Module is still processing a previous command
    Busy,
    /// Reply missing or not in the expected format
    Malformed,
    /// Command does not fit the command buffer
    CommandTooLong,
}

impl fmt::Display for AtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "UART error"),
            Self::Timeout => write!(f, "no response from module"),
            Self::Rejected => write!(f, "command rejected"),
            Self::Busy => write!(f, "module busy"),
            Self::Malformed => write!(f, "malformed response"),
            Self::CommandTooLong => write!(f, "command too long"),
        }
    }
}

impl core::error::Error for AtError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum LinkState {
    Unknown,
    Joining,
    Up,
    Down,
}

pub struct EspAtModem<S, D> {
    serial: S,
    delay: D,
    rx: Vec<u8, LINE_CAPACITY>,
    rx_overflow: bool,
    link: LinkState,
    ntp_server: String<HOST_CAPACITY>,
    utc_offset_hours: i8,
    sntp_configured: bool,
}

impl<S, D> EspAtModem<S, D>
where
    S: serial::Read<u8> + serial::Write<u8>,
    D: DelayNs,
{
    pub fn new(serial: S, delay: D) -> Self {
        Self {
            serial,
            delay,
            rx: Vec::new(),
            rx_overflow: false,
            link: LinkState::Unknown,
            ntp_server: String::try_from(DEFAULT_NTP_SERVER).unwrap_or_default(),
            utc_offset_hours: 0,
            sntp_configured: false,
        }
    }

    /// SNTP server and timezone applied before the first time request.
    pub fn with_sntp_server(mut self, server: String<HOST_CAPACITY>, utc_offset_hours: i8) -> Self {
        self.ntp_server = server;
        self.utc_offset_hours = utc_offset_hours;
        self.sntp_configured = false;
        self
    }

    /// Check the module answers and switch command echo off.
    pub fn probe(&mut self) -> Result<(), AtError> {
        self.execute("AT", |_| {})?;
        self.execute("ATE0", |_| {})?;
        info!("AT: module responding");
        Ok(())
    }

    pub fn release(self) -> (S, D) {
        (self.serial, self.delay)
    }

    /// Send `command` and collect lines until its final result.
    ///
    /// Intermediate lines that are not link events are handed to `on_line`.
    fn execute<F>(&mut self, command: &str, mut on_line: F) -> Result<(), AtError>
    where
        F: FnMut(Response<'_>),
    {
        self.send(command)?;
        loop {
            let Some(line) = self.read_line(RESPONSE_TIMEOUT_MS)? else {
                warn!("AT: timeout waiting for reply");
                return Err(AtError::Timeout);
            };
            match parse_line(&line) {
                Response::Ok => return Ok(()),
                Response::Error | Response::Fail => return Err(AtError::Rejected),
                Response::Busy => return Err(AtError::Busy),
                response => {
                    if !self.apply_urc(response) {
                        on_line(response);
                    }
                }
            }
        }
    }

    fn send(&mut self, command: &str) -> Result<(), AtError> {
        if command.starts_with("AT+CWJAP=") {
            debug!("AT: > AT+CWJAP=<redacted>");
        } else {
            debug!("AT: > {}", command);
        }
        for &byte in command.as_bytes().iter().chain(b"\r\n") {
            nb::block!(self.serial.write(byte)).map_err(|_| AtError::Serial)?;
        }
        nb::block!(self.serial.flush()).map_err(|_| AtError::Serial)
    }

    /// Next non-empty line, or `None` after `timeout_ms` without input.
    fn read_line(&mut self, timeout_ms: u32) -> Result<Option<String<LINE_CAPACITY>>, AtError> {
        let mut idle_polls = timeout_ms.saturating_mul(1_000) / POLL_STEP_US;
        loop {
            match self.serial.read() {
                Ok(b'\n') => {
                    if let Some(line) = self.take_line() {
                        return Ok(Some(line));
                    }
                }
                Ok(b'\r') => {}
                Ok(byte) => {
                    if self.rx.push(byte).is_err() {
                        self.rx_overflow = true;
                    }
                }
                Err(nb::Error::WouldBlock) => {
                    if idle_polls == 0 {
                        return Ok(None);
                    }
                    idle_polls -= 1;
                    self.delay.delay_us(POLL_STEP_US);
                }
                Err(nb::Error::Other(_)) => {
                    self.rx.clear();
                    self.rx_overflow = false;
                    return Err(AtError::Serial);
                }
            }
        }
    }

    fn take_line(&mut self) -> Option<String<LINE_CAPACITY>> {
        let bytes = core::mem::take(&mut self.rx);
        if core::mem::replace(&mut self.rx_overflow, false) {
            warn!("AT: discarded overlong line");
            return None;
        }
        if bytes.is_empty() {
            return None;
        }
        String::from_utf8(bytes).ok()
    }

    /// Drain unsolicited lines until the UART goes quiet.
    fn pump(&mut self) -> Result<(), AtError> {
        while let Some(line) = self.read_line(URC_DRAIN_MS)? {
            if !self.apply_urc(parse_line(&line)) {
                debug!("AT: ignoring {}", line.as_str());
            }
        }
        Ok(())
    }

    /// Track link events. Returns `false` for lines that are not one.
    fn apply_urc(&mut self, response: Response<'_>) -> bool {
        let joining = self.link == LinkState::Joining;
        self.link = match response {
            // The address, not the association, makes the link usable.
            Response::WifiConnected => return true,
            Response::WifiGotIp if joining => return true,
            Response::WifiGotIp => LinkState::Up,
            // Joins may disconnect and retry internally before settling.
            Response::WifiDisconnect if joining => return true,
            Response::WifiDisconnect => LinkState::Down,
            Response::Ok if joining => LinkState::Up,
            Response::JoinError(code) if joining => {
                warn!("AT: join failed, reason {}", code);
                LinkState::Down
            }
            Response::Fail | Response::Error | Response::Busy if joining => LinkState::Down,
            _ => return false,
        };
        debug!("AT: link {}", self.link);
        true
    }
}

impl<S, D> StationInterface for EspAtModem<S, D>
where
    S: serial::Read<u8> + serial::Write<u8>,
    D: DelayNs,
{
    type Error = AtError;

    fn is_connected(&mut self) -> Result<bool, AtError> {
        if self.link == LinkState::Joining {
            self.pump()?;
            return Ok(self.link == LinkState::Up);
        }

        let mut state = None;
        match self.execute("AT+CWSTATE?", |response| {
            if let Response::StationState(s) = response {
                state = Some(s);
            }
        }) {
            Ok(()) => {}
            Err(AtError::Busy) => return Ok(false),
            Err(e) => return Err(e),
        }

        let up = state == Some(STATION_CONNECTED);
        self.link = if up { LinkState::Up } else { LinkState::Down };
        Ok(up)
    }

    fn activate(&mut self) -> Result<(), AtError> {
        self.execute("AT+CWMODE=1", |_| {})
    }

    fn request_connection(&mut self, credential: &Credential) -> Result<(), AtError> {
        let command = join_command(credential)?;
        self.send(&command)?;
        self.link = LinkState::Joining;
        Ok(())
    }
}

impl<S, D> TimeSource for EspAtModem<S, D>
where
    S: serial::Read<u8> + serial::Write<u8>,
    D: DelayNs,
{
    type Error = AtError;

    fn sync_clock(&mut self) -> Result<CivilDateTime, AtError> {
        if !self.sntp_configured {
            let command = sntp_config_command(&self.ntp_server, self.utc_offset_hours)?;
            self.execute(&command, |_| {})?;
            self.sntp_configured = true;
        }

        let mut reply = None;
        self.execute("AT+CIPSNTPTIME?", |response| {
            if let Response::SntpTime(text) = response {
                reply = Some(parse_sntp_time(text));
            }
        })?;

        match reply {
            Some(Ok(now)) => Ok(now),
            Some(Err(e)) => {
                warn!("AT: unreadable SNTP time: {}", e);
                Err(AtError::Malformed)
            }
            None => Err(AtError::Malformed),
        }
    }
}
