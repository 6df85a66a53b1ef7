// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! One-shot board bring-up.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use rp2040_hal as hal;

use hal::clocks::{init_clocks_and_plls, Clock};
use hal::fugit::RateExtU32;
use hal::gpio::bank0::{Gpio0, Gpio1};
use hal::gpio::{DynPinId, FunctionSioOutput, FunctionUart, Pin, PullDown};
use hal::pac;
use hal::uart::{DataBits, Enabled, StopBits, UartConfig, UartPeripheral};
use hal::{Sio, Timer, Watchdog};
use timegate_common::SystemReset;

const XOSC_CRYSTAL_FREQ: u32 = 12_000_000;
const ESP_AT_BAUD: u32 = 115_200;
/// Pull-up settle time before sampling the board strap.
const STRAP_SETTLE_US: u32 = 10;

pub type LedPin = Pin<DynPinId, FunctionSioOutput, PullDown>;

type UartPins = (
    Pin<Gpio0, FunctionUart, PullDown>,
    Pin<Gpio1, FunctionUart, PullDown>,
);
pub type EspUart = UartPeripheral<Enabled, pac::UART0, UartPins>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum BoardError {
    /// Peripherals already taken
    Taken,
    /// Crystal or PLL failed to lock
    Clocks,
    /// UART0 rejected the link settings
    Uart,
}

/// Identified by the GP22 strap: floating (pulled high) on a bare Pico,
/// tied low on the carrier board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum BoardKind {
    Pico,
    Carrier,
}

pub struct Board {
    pub kind: BoardKind,
    pub timer: Timer,
    pub led: LedPin,
    pub uart: EspUart,
}

pub fn init() -> Result<Board, BoardError> {
    let mut pac = pac::Peripherals::take().ok_or(BoardError::Taken)?;
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    let clocks = init_clocks_and_plls(
        XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .map_err(|_| BoardError::Clocks)?;

    let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let sio = Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut strap = pins.gpio22.into_pull_up_input();
    timer.delay_us(STRAP_SETTLE_US);
    let kind = if strap.is_high().unwrap_or(true) {
        BoardKind::Pico
    } else {
        BoardKind::Carrier
    };

    let led: LedPin = match kind {
        BoardKind::Pico => pins.gpio25.into_push_pull_output().into_dyn_pin(),
        BoardKind::Carrier => pins.gpio15.into_push_pull_output().into_dyn_pin(),
    };

    let uart_pins = (pins.gpio0.into_function(), pins.gpio1.into_function());
    let uart: EspUart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(ESP_AT_BAUD.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .map_err(|_| BoardError::Uart)?;

    Ok(Board {
        kind,
        timer,
        led,
        uart,
    })
}

/// Full chip reset through the SCB.
pub struct ChipReset;

impl SystemReset for ChipReset {
    fn restart(&mut self) {
        restart();
    }
}

pub fn restart() -> ! {
    defmt::println!("Restarting...");
    cortex_m::peripheral::SCB::sys_reset()
}
