//! Many more bytes than the transmit buffer holds, all sent by the transmit interrupt,
//! so the buffer indices wrap many times.
//!
//! Each line is queued with the UART0 interrupt masked, so the buffer is seen holding
//! the whole line before the interrupt drains it.

#![no_std]
#![no_main]

use irq_serial::Config;
use testsuite::{
    QUEUED_SERIAL, bind_uart0, drain, entry, exit_failure, exit_success, uart::with_uart0_masked,
};

bind_uart0!(testsuite::QUEUED_SERIAL);

#[entry]
fn main() -> ! {
    let (mut tx, _rx) = QUEUED_SERIAL.init(&Config::default()).unwrap();

    let mut sent = 0;
    for i in 0..200u64 {
        let (written, queued) = with_uart0_masked(|| {
            let written = tx.write_string("line ") + tx.write_unsigned(i) + tx.write(b'\n');
            (written, tx.pending())
        });

        // Only the very first byte goes straight to the idle transmitter.
        let expected = if i == 0 { written - 1 } else { written };
        if queued != expected {
            exit_failure();
        }
        sent += written;
    }

    // "line " and a newline per line, plus 10 * 1 + 90 * 2 + 100 * 3 digits.
    if sent != 200 * 6 + 490 {
        exit_failure();
    }

    drain(&QUEUED_SERIAL);
    exit_success();
}
