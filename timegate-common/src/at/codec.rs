// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! ESP-AT command encoding and response line parsing.

use core::fmt::{self, Write};

use heapless::String;

use super::AtError;
use crate::config::Credential;
use crate::time_sync::CivilDateTime;

/// Longest response line kept; longer lines are discarded.
pub const LINE_CAPACITY: usize = 256;
pub const COMMAND_CAPACITY: usize = 256;

pub type Command = String<COMMAND_CAPACITY>;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One CRLF-terminated line from the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    Ok,
    Error,
    Fail,
    /// `busy p...` / `busy s...`: a previous command is still running.
    Busy,
    WifiConnected,
    WifiGotIp,
    WifiDisconnect,
    /// `+CWJAP:<code>` join failure reason.
    JoinError(u8),
    /// `+CWSTATE:<state>,"<ssid>"`
    StationState(u8),
    /// `+CIPSNTPTIME:<asctime>`
    SntpTime(&'a str),
    Other(&'a str),
}

pub fn parse_line(line: &str) -> Response<'_> {
    match line {
        "OK" => return Response::Ok,
        "ERROR" => return Response::Error,
        "FAIL" => return Response::Fail,
        "WIFI CONNECTED" => return Response::WifiConnected,
        "WIFI GOT IP" => return Response::WifiGotIp,
        "WIFI DISCONNECT" => return Response::WifiDisconnect,
        _ => {}
    }

    if line.starts_with("busy ") {
        Response::Busy
    } else if let Some(rest) = line.strip_prefix("+CWJAP:") {
        rest.trim()
            .parse()
            .map(Response::JoinError)
            .unwrap_or(Response::Other(line))
    } else if let Some(rest) = line.strip_prefix("+CWSTATE:") {
        rest.split(',')
            .next()
            .and_then(|state| state.trim().parse().ok())
            .map(Response::StationState)
            .unwrap_or(Response::Other(line))
    } else if let Some(rest) = line.strip_prefix("+CIPSNTPTIME:") {
        Response::SntpTime(rest.trim())
    } else {
        Response::Other(line)
    }
}

/// `AT+CWJAP="<ssid>","<password>"`
pub fn join_command(credential: &Credential) -> Result<Command, AtError> {
    build(|cmd| {
        cmd.write_str("AT+CWJAP=")?;
        push_quoted(cmd, &credential.ssid)?;
        cmd.write_char(',')?;
        push_quoted(cmd, &credential.password)
    })
}

/// `AT+CIPSNTPCFG=1,<offset>,"<server>"`
pub fn sntp_config_command(server: &str, utc_offset_hours: i8) -> Result<Command, AtError> {
    build(|cmd| {
        write!(cmd, "AT+CIPSNTPCFG=1,{},", utc_offset_hours)?;
        push_quoted(cmd, server)
    })
}

fn build(encode: impl FnOnce(&mut Command) -> fmt::Result) -> Result<Command, AtError> {
    let mut cmd = Command::new();
    encode(&mut cmd).map_err(|_| AtError::CommandTooLong)?;
    Ok(cmd)
}

/// Quote a string parameter; `"`, `,` and `\` must be escaped with `\`.
fn push_quoted(cmd: &mut Command, value: &str) -> fmt::Result {
    cmd.write_char('"')?;
    for c in value.chars() {
        if matches!(c, '"' | ',' | '\\') {
            cmd.write_char('\\')?;
        }
        cmd.write_char(c)?;
    }
    cmd.write_char('"')
}

/// SNTP time text the module could not have produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    MissingField,
    UnknownMonth,
    BadNumber,
    OutOfRange,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField => write!(f, "missing date/time field"),
            Self::UnknownMonth => write!(f, "unknown month name"),
            Self::BadNumber => write!(f, "non-numeric date/time field"),
            Self::OutOfRange => write!(f, "date/time field out of range"),
        }
    }
}

impl core::error::Error for ParseError {}

/// Parse the asctime payload of `+CIPSNTPTIME`, e.g. `Thu Jan  1 00:00:00 1970`.
pub fn parse_sntp_time(text: &str) -> Result<CivilDateTime, ParseError> {
    let mut fields = text.split_whitespace();
    let mut next = || fields.next().ok_or(ParseError::MissingField);

    let _weekday = next()?;
    let month = next()?;
    let month = MONTHS
        .iter()
        .position(|&name| name == month)
        .ok_or(ParseError::UnknownMonth)? as u8
        + 1;
    let day: u8 = number(next()?)?;
    let clock = next()?;
    let year: u16 = number(next()?)?;

    let mut hms = clock.split(':');
    let mut part = || hms.next().ok_or(ParseError::MissingField);
    let hour: u8 = number(part()?)?;
    let minute: u8 = number(part()?)?;
    let second: u8 = number(part()?)?;

    if !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 60 {
        return Err(ParseError::OutOfRange);
    }

    Ok(CivilDateTime::new(year, month, day, hour, minute, second))
}

fn number<T: core::str::FromStr>(field: &str) -> Result<T, ParseError> {
    field.parse().map_err(|_| ParseError::BadNumber)
}
