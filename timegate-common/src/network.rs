// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Station-mode link bring-up with a counted poll budget.

use core::cell::RefCell;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{Credential, CredentialPolicy};
use crate::fmt::Dbg;
use crate::indicator::StatusIndicator;

const POLL_INTERVAL_MS: u32 = 1_000;

/// Connection primitives of the network stack.
///
/// Activation is process-wide and stays in effect after a failed attempt.
pub trait StationInterface {
    type Error: core::fmt::Debug;

    fn is_connected(&mut self) -> Result<bool, Self::Error>;

    /// Enable the interface in station mode.
    fn activate(&mut self) -> Result<(), Self::Error>;

    /// Start joining `credential`. Completion is observed via [`Self::is_connected`].
    fn request_connection(&mut self, credential: &Credential) -> Result<(), Self::Error>;
}

/// Lets one device act as both station and time source.
impl<N: StationInterface> StationInterface for &RefCell<N> {
    type Error = N::Error;

    fn is_connected(&mut self) -> Result<bool, N::Error> {
        self.borrow_mut().is_connected()
    }

    fn activate(&mut self) -> Result<(), N::Error> {
        self.borrow_mut().activate()
    }

    fn request_connection(&mut self, credential: &Credential) -> Result<(), N::Error> {
        self.borrow_mut().request_connection(credential)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionOutcome {
    pub connected: bool,
    /// Link-state polls spent after issuing connection requests.
    pub polls: u32,
    /// Index of the credential that came up, `None` on the fast path or failure.
    pub credential: Option<usize>,
}

impl ConnectionOutcome {
    const fn failed(polls: u32) -> Self {
        Self {
            connected: false,
            polls,
            credential: None,
        }
    }
}

/// Borrows the station and indicator for one connection attempt.
pub struct NetworkConnector<'a, N, P, D> {
    station: &'a mut N,
    indicator: &'a mut StatusIndicator<P, D>,
    delay: &'a mut D,
    policy: CredentialPolicy,
}

impl<'a, N, P, D> NetworkConnector<'a, N, P, D>
where
    N: StationInterface,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(
        station: &'a mut N,
        indicator: &'a mut StatusIndicator<P, D>,
        delay: &'a mut D,
    ) -> Self {
        Self {
            station,
            indicator,
            delay,
            policy: CredentialPolicy::FirstOnly,
        }
    }

    pub fn with_policy(mut self, policy: CredentialPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bring the link up within `timeout_secs` polls per credential.
    pub fn connect(&mut self, credentials: &[Credential], timeout_secs: u32) -> bool {
        self.establish(credentials, timeout_secs).connected
    }

    pub fn establish(&mut self, credentials: &[Credential], timeout_secs: u32) -> ConnectionOutcome {
        if self.link_up() {
            info!("Net: interface already connected");
            return ConnectionOutcome {
                connected: true,
                polls: 0,
                credential: None,
            };
        }

        if credentials.is_empty() {
            error!("Net: no network credentials configured");
            return ConnectionOutcome::failed(0);
        }

        if let Err(e) = self.station.activate() {
            error!("Net: station activation failed: {}", Dbg(&e));
            return ConnectionOutcome::failed(0);
        }

        let candidates = match self.policy {
            CredentialPolicy::FirstOnly => &credentials[..1],
            CredentialPolicy::InOrder => credentials,
        };

        let mut polls = 0;
        for (index, credential) in candidates.iter().enumerate() {
            info!("Net: connecting to {}...", credential.ssid.as_str());
            if let Err(e) = self.station.request_connection(credential) {
                warn!("Net: join request for {} failed: {}", credential.ssid.as_str(), Dbg(&e));
                continue;
            }

            for _ in 0..timeout_secs {
                polls += 1;
                if self.link_up() {
                    info!("Net: connected to {} after {} polls", credential.ssid.as_str(), polls);
                    self.indicator.success_pulse();
                    return ConnectionOutcome {
                        connected: true,
                        polls,
                        credential: Some(index),
                    };
                }
                self.delay.delay_ms(POLL_INTERVAL_MS);
            }
            warn!("Net: {} not up after {}s", credential.ssid.as_str(), timeout_secs);
        }

        error!("Net: connection failed");
        ConnectionOutcome::failed(polls)
    }

    fn link_up(&mut self) -> bool {
        match self.station.is_connected() {
            Ok(up) => up,
            Err(e) => {
                warn!("Net: link state query failed: {}", Dbg(&e));
                false
            }
        }
    }
}
