// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

#![no_std]
#![no_main]

mod board;
mod boot;

use core::cell::RefCell;

use defmt_rtt as _;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;
use timegate_common::{BootConfig, BootOrchestrator, BootVerdict, EspAtModem, StatusIndicator};

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

/// Validated at build time from boot.toml.
static BOOT_CONFIG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/boot_config.bin"));

fn load_config() -> BootConfig {
    postcard::from_bytes(BOOT_CONFIG).unwrap_or_else(|_| {
        defmt::error!("Config: embedded configuration unreadable, no networks");
        BootConfig::default()
    })
}

#[entry]
fn main() -> ! {
    defmt::println!("Gatekeeper init");

    let board = board::init().unwrap_or_else(|e| {
        defmt::error!("Board: init failed: {}", e);
        board::restart()
    });
    defmt::println!("Board: {}", board.kind);

    let config = load_config();
    defmt::println!("Config: {} network(s)", config.networks.len());

    let mut modem = EspAtModem::new(board.uart, board.timer)
        .with_sntp_server(config.ntp_server.clone(), config.utc_offset_hours);
    if let Err(e) = modem.probe() {
        // Left to the connection budget: a silent module ends in a restart.
        defmt::warn!("AT: probe failed: {}", e);
    }
    let modem = RefCell::new(modem);

    let mut session = BootOrchestrator::new(
        config,
        &modem,
        &modem,
        StatusIndicator::new(board.led, board.timer),
        board.timer,
        board::ChipReset,
    );

    let verdict = session.run();
    if verdict != BootVerdict::Ready {
        defmt::error!("Boot: {} without restart", verdict);
        board::restart();
    }

    let (_, _, mut indicator, _, _) = session.into_parts();
    let base = boot::app_base();

    let Some((sp, reset)) = boot::validate_app(base) else {
        defmt::println!("No valid application at 0x{:08x}", base);
        indicator.hold_on();
        loop {
            cortex_m::asm::nop();
        }
    };

    defmt::println!("Application at 0x{:08x}", base);
    defmt::println!("  SP:    0x{:08x}", sp);
    defmt::println!("  Reset: 0x{:08x}", reset);
    defmt::println!("Jumping to application...");

    unsafe { boot::jump_to_app(base) }
}
