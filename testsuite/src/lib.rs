#![no_std]

pub mod uart;

use cortex_m_semihosting::debug::{self, EXIT_FAILURE, EXIT_SUCCESS};
use irq_serial::{Hardware, Serial};
use panic_semihosting as _;
use uart::{QueuedUart0, Uart0};

pub use cortex_m_rt::{entry, exception};

/// The line under test, shared with the UART0 interrupt handler.
pub static SERIAL: Serial<Uart0> = Serial::new(Uart0);

/// UART0 with every byte after the first sent through the transmit buffer. Use either
/// this or [`SERIAL`] in an example, not both.
pub static QUEUED_SERIAL: Serial<QueuedUart0> = Serial::new(QueuedUart0::new());

pub fn exit_success() -> ! {
    debug::exit(EXIT_SUCCESS);
    #[allow(clippy::empty_loop)]
    loop {}
}

pub fn exit_failure() -> ! {
    debug::exit(EXIT_FAILURE);
    #[allow(clippy::empty_loop)]
    loop {}
}

/// Wait until everything queued on `serial` has been handed to UART0.
///
/// QEMU sends a byte as soon as it reaches the data register, so after this the output
/// is complete and it is safe to exit.
pub fn drain<H: Hardware, const N: usize>(serial: &Serial<H, N>) {
    while serial.pending() > 0 {
        core::hint::spin_loop();
    }
}

/// [`drain`] for [`SERIAL`].
pub fn drain_serial() {
    drain(&SERIAL);
}

/// Routes the UART0 interrupt to a line, [`SERIAL`] unless another is named.
///
/// Without a device crate every interrupt vector points at `DefaultHandler`, so the
/// handler is installed there. Invoke once in each example.
#[macro_export]
macro_rules! bind_uart0 {
    () => {
        $crate::bind_uart0!($crate::SERIAL);
    };
    ($serial:path) => {
        #[$crate::exception]
        unsafe fn DefaultHandler(irqn: i16) {
            if irqn == $crate::uart::UART0_IRQ as i16 {
                // SAFETY: Only UART0's interrupt reaches this branch.
                unsafe { $crate::uart::on_interrupt(&$serial) };
            }
        }
    };
}
