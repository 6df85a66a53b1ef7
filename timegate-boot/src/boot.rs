// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hand-off to the application image that follows the gatekeeper in flash.

const RAM_START: u32 = 0x2000_0000;
/// End of SRAM5; a stack pointer may sit exactly here.
const RAM_END: u32 = 0x2004_2000;
const FLASH_END: u32 = 0x1100_0000;

unsafe extern "C" {
    static __app_vector_table: u32;
}

macro_rules! linker_addr {
    ($sym:ident) => {
        unsafe { &$sym as *const u32 as u32 }
    };
}

pub fn app_base() -> u32 {
    linker_addr!(__app_vector_table)
}

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }

    /// Stack in RAM, Thumb entry point inside the image's flash window.
    fn is_valid_for_xip(&self, base: u32) -> bool {
        (RAM_START..=RAM_END).contains(&self.initial_sp)
            && (base..FLASH_END).contains(&self.reset_vector)
            && self.reset_vector & 1 == 1
    }
}

/// Initial SP and reset vector of a plausible image at `base`.
pub fn validate_app(base: u32) -> Option<(u32, u32)> {
    let vt = unsafe { VectorTable::read_from(base) };
    if vt.is_valid_for_xip(base) {
        Some((vt.initial_sp, vt.reset_vector))
    } else {
        None
    }
}

/// # Safety
/// `base` must hold a vector table accepted by [`validate_app`].
pub unsafe fn jump_to_app(base: u32) -> ! {
    relocate_vector_table(base);

    let vt = VectorTable::read_from(base);
    jump(vt.initial_sp, vt.reset_vector);
}

unsafe fn relocate_vector_table(base: u32) {
    cortex_m::interrupt::disable();

    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(base);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
