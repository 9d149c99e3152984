//! A simulated UART for host tests.
//!
//! The transmitter has a single holding register: a written byte occupies it until the
//! test calls [`SimUart::shift_out`], which puts it on the "wire".

extern crate std;

use crate::{Config, Hardware, Serial};
use std::{sync::Mutex, vec::Vec};

#[derive(Default)]
struct State {
    configured: Option<Config>,
    rx_interrupt: bool,
    tx_interrupt: bool,
    rx_data: u8,
    /// Set by a received byte, cleared by reading the data register.
    rx_full: bool,
    holding: Option<u8>,
    wire: Vec<u8>,
}

pub(crate) struct SimUart {
    state: Mutex<State>,
}

impl SimUart {
    pub(crate) fn new() -> Self {
        SimUart {
            state: Mutex::new(State::default()),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Latches `byte` in the receive data register.
    pub(crate) fn receive(&self, byte: u8) {
        self.with(|s| {
            s.rx_data = byte;
            s.rx_full = true;
        });
    }

    /// Finishes sending the byte in the holding register. Returns `false` if it was empty.
    pub(crate) fn shift_out(&self) -> bool {
        self.with(|s| match s.holding.take() {
            Some(b) => {
                s.wire.push(b);
                true
            }
            None => false,
        })
    }

    /// Whether a received byte is still waiting in the data register.
    pub(crate) fn rx_full(&self) -> bool {
        self.with(|s| s.rx_full)
    }

    pub(crate) fn holding(&self) -> Option<u8> {
        self.with(|s| s.holding)
    }

    /// Every byte that has left the transmitter, in order.
    pub(crate) fn wire(&self) -> Vec<u8> {
        self.with(|s| s.wire.clone())
    }

    pub(crate) fn configured(&self) -> Option<Config> {
        self.with(|s| s.configured)
    }

    pub(crate) fn tx_interrupt_enabled(&self) -> bool {
        self.with(|s| s.tx_interrupt)
    }

    pub(crate) fn rx_interrupt_enabled(&self) -> bool {
        self.with(|s| s.rx_interrupt)
    }
}

impl Hardware for SimUart {
    fn configure(&self, config: &Config) {
        self.with(|s| s.configured = Some(*config));
    }

    fn read_data(&self) -> u8 {
        self.with(|s| {
            s.rx_full = false;
            s.rx_data
        })
    }

    fn write_data(&self, byte: u8) {
        self.with(|s| {
            assert!(s.holding.is_none(), "write to a busy transmitter");
            s.holding = Some(byte);
        });
    }

    fn is_transmit_ready(&self) -> bool {
        self.with(|s| s.holding.is_none())
    }

    fn set_transmit_interrupt(&self, enabled: bool) {
        self.with(|s| s.tx_interrupt = enabled);
    }

    fn set_receive_interrupt(&self, enabled: bool) {
        self.with(|s| s.rx_interrupt = enabled);
    }
}

/// Runs the line until the transmit buffer and the holding register are empty, calling
/// the transmit handler whenever the transmitter is free and the interrupt is enabled.
pub(crate) fn drain<const N: usize>(serial: &Serial<SimUart, N>) {
    loop {
        let shifted = serial.hardware().shift_out();
        if serial.hardware().tx_interrupt_enabled() {
            // SAFETY: Tests run the handler from one context at a time.
            unsafe { serial.on_transmit_ready() };
        } else if !shifted {
            break;
        }
    }
}
