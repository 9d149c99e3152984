//! Text and number output written straight to the idle UART0 transmitter.

#![no_std]
#![no_main]

use core::fmt::Write;

use irq_serial::Config;
use testsuite::{SERIAL, bind_uart0, drain_serial, entry, exit_success};

bind_uart0!();

#[entry]
fn main() -> ! {
    let (mut tx, _rx) = SERIAL.init(&Config::default()).unwrap();

    tx.write_string("hello from irq-serial\n");

    for value in [0, -42, i64::MIN] {
        tx.write_integer(value);
        tx.write(b'\n');
    }

    for (value, precision) in [(3.14159, 2), (-0.005, 2), (5.0, 0)] {
        tx.write_float(value, precision);
        tx.write(b'\n');
    }

    writeln!(tx, "fmt: {} {:#x}", 7, 255).unwrap();

    tx.flush();
    drain_serial();
    exit_success();
}
