// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! ESP-AT line parsing and command encoding.

use timegate_common::at::{
    join_command, parse_line, parse_sntp_time, sntp_config_command, ParseError, Response,
};
use timegate_common::{CivilDateTime, Credential};

#[test]
fn test_parse_final_results() {
    assert_eq!(parse_line("OK"), Response::Ok);
    assert_eq!(parse_line("ERROR"), Response::Error);
    assert_eq!(parse_line("FAIL"), Response::Fail);
    assert_eq!(parse_line("busy p..."), Response::Busy);
    assert_eq!(parse_line("busy s..."), Response::Busy);
}

#[test]
fn test_parse_wifi_events() {
    assert_eq!(parse_line("WIFI CONNECTED"), Response::WifiConnected);
    assert_eq!(parse_line("WIFI GOT IP"), Response::WifiGotIp);
    assert_eq!(parse_line("WIFI DISCONNECT"), Response::WifiDisconnect);
    assert_eq!(parse_line("+CWJAP:3"), Response::JoinError(3));
}

#[test]
fn test_parse_station_state() {
    assert_eq!(parse_line("+CWSTATE:2,\"home\""), Response::StationState(2));
    assert_eq!(parse_line("+CWSTATE:0,\"\""), Response::StationState(0));
    assert_eq!(
        parse_line("+CWSTATE:x,\"home\""),
        Response::Other("+CWSTATE:x,\"home\"")
    );
}

#[test]
fn test_parse_sntp_reply() {
    assert_eq!(
        parse_line("+CIPSNTPTIME:Thu Jan  1 00:00:00 1970"),
        Response::SntpTime("Thu Jan  1 00:00:00 1970")
    );
}

#[test]
fn test_unknown_lines_pass_through() {
    assert_eq!(parse_line("ready"), Response::Other("ready"));
    assert_eq!(parse_line("+CWJAP:\"home\""), Response::Other("+CWJAP:\"home\""));
}

#[test]
fn test_parse_sntp_time() {
    assert_eq!(
        parse_sntp_time("Thu Jan  1 00:00:00 1970"),
        Ok(CivilDateTime::new(1970, 1, 1, 0, 0, 0))
    );
    assert_eq!(
        parse_sntp_time("Fri Dec 19 23:59:59 2025"),
        Ok(CivilDateTime::new(2025, 12, 19, 23, 59, 59))
    );
}

#[test]
fn test_parse_sntp_time_rejects_garbage() {
    assert_eq!(parse_sntp_time(""), Err(ParseError::MissingField));
    assert_eq!(
        parse_sntp_time("Thu Foo  1 00:00:00 1970"),
        Err(ParseError::UnknownMonth)
    );
    assert_eq!(
        parse_sntp_time("Thu Jan 32 00:00:00 2025"),
        Err(ParseError::OutOfRange)
    );
    assert_eq!(
        parse_sntp_time("Thu Jan  1 24:00:00 2025"),
        Err(ParseError::OutOfRange)
    );
    assert_eq!(
        parse_sntp_time("Thu Jan  1 00:00:00 year"),
        Err(ParseError::BadNumber)
    );
}

#[test]
fn test_join_command() {
    let credential = Credential::new("home", "p4ss").unwrap();
    assert_eq!(
        join_command(&credential).unwrap().as_str(),
        r#"AT+CWJAP="home","p4ss""#
    );

    let open = Credential::new("cafe", "").unwrap();
    assert_eq!(join_command(&open).unwrap().as_str(), r#"AT+CWJAP="cafe","""#);
}

#[test]
fn test_join_command_fits_longest_credential() {
    // Worst case: every character needs escaping.
    let credential = Credential::new(&",".repeat(32), &"\"".repeat(64)).unwrap();
    assert!(join_command(&credential).is_ok());
}

#[test]
fn test_sntp_config_command() {
    assert_eq!(
        sntp_config_command("pool.ntp.org", 0).unwrap().as_str(),
        r#"AT+CIPSNTPCFG=1,0,"pool.ntp.org""#
    );
    assert_eq!(
        sntp_config_command("ntp.local", -5).unwrap().as_str(),
        r#"AT+CIPSNTPCFG=1,-5,"ntp.local""#
    );
}
