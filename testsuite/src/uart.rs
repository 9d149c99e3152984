//! UART0 of the LM3S6965 (QEMU `lm3s6965evb`) as an [`irq_serial::Hardware`].
//!
//! The UART is a PL011 with a single interrupt line for both directions; see
//! [`on_interrupt`] for the dispatch. QEMU transmits a byte as soon as it is written to
//! the data register and keeps the transmit interrupt asserted afterwards, which is the
//! level-style "ready for the next byte" interrupt the driver expects.
//!
//! QEMU never reports a busy transmitter, so [`Uart0`] only exercises the direct write
//! path. [`QueuedUart0`] sends through the transmit buffer and interrupt instead.
//!
//! QEMU serial port mapping: `qemu-system-arm ... -serial <uart0>`.

use core::{
    ptr::{with_exposed_provenance, with_exposed_provenance_mut},
    sync::atomic::{AtomicBool, Ordering},
};
use cortex_m::{interrupt::InterruptNumber, peripheral::NVIC};
use irq_serial::{Config, Hardware, Serial};

const UART0_BASE: usize = 0x4000_C000;

const UART_DR_OFFSET: usize = 0x000; // Data Register
const UART_FR_OFFSET: usize = 0x018; // Flag Register
const UART_IBRD_OFFSET: usize = 0x024; // Integer Baud Rate Divisor
const UART_FBRD_OFFSET: usize = 0x028; // Fractional Baud Rate Divisor
const UART_LCRH_OFFSET: usize = 0x02C; // Line Control
const UART_CR_OFFSET: usize = 0x030; // Control
const UART_IMSC_OFFSET: usize = 0x038; // Interrupt Mask
const UART_MIS_OFFSET: usize = 0x040; // Masked Interrupt Status

const UART_FR_TXFF: u32 = 1 << 5; // Transmit FIFO Full
const UART_LCRH_WLEN_8: u32 = 0b11 << 5; // 8 data bits, FIFOs off, no parity, 1 stop bit
const UART_CR_UARTEN: u32 = 1 << 0;
const UART_CR_TXE: u32 = 1 << 8;
const UART_CR_RXE: u32 = 1 << 9;
const UART_INT_RX: u32 = 1 << 4;
const UART_INT_TX: u32 = 1 << 5;

/// The LM3S6965 runs from its 12 MHz main oscillator out of reset.
const UART_CLOCK_HZ: u32 = 12_000_000;

/// UART0 interrupt number on the LM3S6965.
pub const UART0_IRQ: u16 = 5;

#[derive(Clone, Copy)]
struct Uart0Interrupt;

// SAFETY: 5 is UART0's position in the LM3S6965 vector table.
unsafe impl InterruptNumber for Uart0Interrupt {
    fn number(self) -> u16 {
        UART0_IRQ
    }
}

/// Register access to UART0.
pub struct Uart0;

impl Uart0 {
    fn read(&self, offset: usize) -> u32 {
        let reg = with_exposed_provenance::<u32>(UART0_BASE + offset);
        // SAFETY: UART0's register block is always mapped on the LM3S6965.
        unsafe { reg.read_volatile() }
    }

    fn write(&self, offset: usize, value: u32) {
        let reg = with_exposed_provenance_mut::<u32>(UART0_BASE + offset);
        // SAFETY: UART0's register block is always mapped on the LM3S6965.
        unsafe { reg.write_volatile(value) }
    }

    /// Read-modify-write of the interrupt mask.
    ///
    /// Mainline code only changes the mask inside a critical section or before the
    /// interrupt is unmasked, and the interrupt handler cannot be preempted by mainline
    /// code, so the two never interleave.
    fn set_mask(&self, bit: u32, enabled: bool) {
        let mask = self.read(UART_IMSC_OFFSET);
        let mask = if enabled { mask | bit } else { mask & !bit };
        self.write(UART_IMSC_OFFSET, mask);
    }

    /// Interrupt sources that are both pending and enabled.
    pub fn masked_status(&self) -> u32 {
        self.read(UART_MIS_OFFSET)
    }
}

impl Hardware for Uart0 {
    fn configure(&self, config: &Config) {
        self.write(UART_CR_OFFSET, 0);

        // Divisor in 1/64ths: UARTCLK / (16 * baud) * 64.
        let divisor = 4 * UART_CLOCK_HZ / config.baud_rate;
        self.write(UART_IBRD_OFFSET, divisor >> 6);
        self.write(UART_FBRD_OFFSET, divisor & 0x3f);
        self.write(UART_LCRH_OFFSET, UART_LCRH_WLEN_8);
        self.write(UART_IMSC_OFFSET, 0);
        self.write(UART_CR_OFFSET, UART_CR_UARTEN | UART_CR_TXE | UART_CR_RXE);

        // SAFETY: The handler bound by `bind_uart0!` only touches its line, which is set
        // up to receive interrupts by the time this runs.
        unsafe { NVIC::unmask(Uart0Interrupt) };
    }

    fn read_data(&self) -> u8 {
        self.read(UART_DR_OFFSET) as u8
    }

    fn write_data(&self, byte: u8) {
        self.write(UART_DR_OFFSET, u32::from(byte));
    }

    fn is_transmit_ready(&self) -> bool {
        self.read(UART_FR_OFFSET) & UART_FR_TXFF == 0
    }

    fn set_transmit_interrupt(&self, enabled: bool) {
        self.set_mask(UART_INT_TX, enabled);
    }

    fn set_receive_interrupt(&self, enabled: bool) {
        self.set_mask(UART_INT_RX, enabled);
    }
}

/// UART0 reporting a busy transmitter after its first byte.
///
/// QEMU's UART0 is always ready, so with [`Uart0`] every write takes the direct path.
/// The first byte here goes out directly, which makes QEMU latch the transmit
/// interrupt; every later byte is queued and sent by the transmit interrupt handler.
pub struct QueuedUart0 {
    uart: Uart0,
    primed: AtomicBool,
}

impl QueuedUart0 {
    pub const fn new() -> Self {
        QueuedUart0 {
            uart: Uart0,
            primed: AtomicBool::new(false),
        }
    }
}

impl Default for QueuedUart0 {
    fn default() -> Self {
        Self::new()
    }
}

impl Hardware for QueuedUart0 {
    fn configure(&self, config: &Config) {
        self.uart.configure(config);
    }

    fn read_data(&self) -> u8 {
        self.uart.read_data()
    }

    fn write_data(&self, byte: u8) {
        self.uart.write_data(byte);
        self.primed.store(true, Ordering::Relaxed);
    }

    fn is_transmit_ready(&self) -> bool {
        !self.primed.load(Ordering::Relaxed) && self.uart.is_transmit_ready()
    }

    fn set_transmit_interrupt(&self, enabled: bool) {
        self.uart.set_transmit_interrupt(enabled);
    }

    fn set_receive_interrupt(&self, enabled: bool) {
        self.uart.set_receive_interrupt(enabled);
    }
}

/// Runs `f` with the UART0 interrupt masked in the NVIC, so writes stay queued.
pub fn with_uart0_masked<R>(f: impl FnOnce() -> R) -> R {
    NVIC::mask(Uart0Interrupt);
    let r = f();
    // SAFETY: Restores the unmasked state set up by `Uart0::configure`.
    unsafe { NVIC::unmask(Uart0Interrupt) };
    r
}

/// Runs the receive and transmit handlers for whatever UART0 is signalling.
///
/// # Safety
///
/// Must only be called from the UART0 interrupt handler, and `serial` must be the line
/// driving UART0.
pub unsafe fn on_interrupt<H: Hardware, const N: usize>(serial: &Serial<H, N>) {
    let status = Uart0.masked_status();
    if status & UART_INT_RX != 0 {
        // SAFETY: The caller guarantees this is the UART0 interrupt, which handles reception.
        unsafe { serial.on_receive() };
    }
    if status & UART_INT_TX != 0 {
        // SAFETY: The caller guarantees this is the UART0 interrupt, which handles transmission.
        unsafe { serial.on_transmit_ready() };
    }
}
