//! The interrupt-driven transport: state shared with the interrupt handlers, the
//! handler entry points, and the mainline [`Writer`] and [`Reader`] handles.

use core::{
    fmt,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};

#[cfg(feature = "async-await")]
use crate::atomic_waker::AtomicWaker;
use crate::{
    InitError, WouldBlock,
    hardware::{Config, Hardware},
    ring_buffer::{DEFAULT_CAPACITY, RingBuffer},
};

/// One serial line: the hardware handle and a ring buffer per direction.
///
/// `Serial` is meant to live in a `static` so that the interrupt handlers can reach it:
///
/// ```ignore
/// static SERIAL: Serial<Uart0> = Serial::new(Uart0);
///
/// fn uart0_rx_interrupt() {
///     // SAFETY: This is the receive interrupt handler.
///     unsafe { SERIAL.on_receive() }
/// }
///
/// fn uart0_tx_interrupt() {
///     // SAFETY: This is the transmit interrupt handler.
///     unsafe { SERIAL.on_transmit_ready() }
/// }
/// ```
///
/// Mainline code calls [`Serial::init`] once to get the [`Writer`] and [`Reader`].
///
/// Each buffer holds `N - 1` bytes.
pub struct Serial<H, const N: usize = DEFAULT_CAPACITY> {
    hw: H,
    /// Filled by the receive interrupt, drained by the [`Reader`].
    rx: RingBuffer<N>,
    /// Filled by the [`Writer`], drained by the transmit interrupt.
    tx: RingBuffer<N>,
    /// Received bytes discarded because `rx` was full. Only the receive interrupt stores it.
    dropped: AtomicU32,
    initialized: AtomicBool,
    #[cfg(feature = "async-await")]
    rx_waker: AtomicWaker,
}

impl<H: Hardware, const N: usize> Serial<H, N> {
    /// Creates the driver state. Nothing touches the hardware until [`Serial::init`].
    pub const fn new(hw: H) -> Self {
        Serial {
            hw,
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            dropped: AtomicU32::new(0),
            initialized: AtomicBool::new(false),
            #[cfg(feature = "async-await")]
            rx_waker: AtomicWaker::new(),
        }
    }

    /// Configures the line and enables reception.
    ///
    /// Returns the only [`Writer`] and [`Reader`] for this line.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::AlreadyInitialized`] if called more than once.
    pub fn init(&self, config: &Config) -> Result<(Writer<'_, H, N>, Reader<'_, H, N>), InitError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(InitError::AlreadyInitialized);
        }

        self.hw.configure(config);
        self.hw.set_receive_interrupt(true);

        Ok((Writer { serial: self }, Reader { serial: self }))
    }

    /// The hardware handle, for platform code that has to inspect interrupt status.
    #[inline]
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Number of bytes waiting to be transmitted.
    #[inline]
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Receive interrupt handler: moves one byte from the data register into the receive
    /// buffer.
    ///
    /// The data register is always read, which frees the hardware for the next byte. If
    /// the receive buffer is full the byte is dropped and counted, see
    /// [`Reader::dropped`].
    ///
    /// # Safety
    ///
    /// Must only be called from the receive interrupt handler of this line, which must not
    /// preempt itself.
    #[inline]
    pub unsafe fn on_receive(&self) {
        let byte = self.hw.read_data();

        // SAFETY: The caller guarantees this is the receive interrupt, the only producer of `rx`.
        if unsafe { self.rx.push(byte) } {
            #[cfg(feature = "async-await")]
            self.rx_waker.wake();
        } else {
            // Load and store instead of `fetch_add`: this handler is the only writer, and
            // not every target has atomic read-modify-write.
            let dropped = self.dropped.load(Ordering::Relaxed);
            self.dropped.store(dropped.wrapping_add(1), Ordering::Relaxed);
        }
    }

    /// Transmit interrupt handler: feeds the next buffered byte to the hardware.
    ///
    /// Disables the transmit interrupt once the buffer is drained. The hardware keeps
    /// reporting "ready" while idle, so leaving it enabled would retrigger the handler
    /// forever.
    ///
    /// # Safety
    ///
    /// Must only be called from the transmit interrupt handler of this line, which must
    /// not preempt itself.
    #[inline]
    pub unsafe fn on_transmit_ready(&self) {
        // SAFETY: The caller guarantees this is the transmit interrupt, the only consumer of `tx`.
        let Some(byte) = (unsafe { self.tx.pop() }) else {
            // The interrupt is only enabled together with a committed byte.
            debug_assert!(false, "transmit interrupt enabled with an empty buffer");
            self.hw.set_transmit_interrupt(false);
            return;
        };

        self.hw.write_data(byte);

        if self.tx.is_empty() {
            self.hw.set_transmit_interrupt(false);
        }
    }

    /// Writes `byte` straight to the hardware if nothing is queued and the transmitter
    /// is idle.
    ///
    /// The check and the write share one critical section so the transmit interrupt
    /// cannot feed the hardware in between.
    #[inline]
    fn transmit_direct(&self, byte: u8) -> bool {
        critical_section::with(|_| {
            if self.tx.is_empty() && self.hw.is_transmit_ready() {
                self.hw.write_data(byte);
                true
            } else {
                false
            }
        })
    }

    /// Queues `byte` and enables the transmit interrupt.
    ///
    /// # Safety
    ///
    /// - The caller must own the producer side of `tx`.
    /// - `tx` must not be full.
    #[inline]
    unsafe fn enqueue(&self, byte: u8) {
        // SAFETY: The caller owns the producer side.
        unsafe { self.tx.write_slot(byte) };

        // The transmit handler may have just disabled the interrupt after draining the
        // buffer, so publishing the byte and re-enabling must not be split by it.
        critical_section::with(|_| {
            // SAFETY: The caller owns the producer side and guarantees there is a free slot.
            unsafe { self.tx.commit() };
            self.hw.set_transmit_interrupt(true);
        });
    }

    /// Transmits `byte`, spinning while the transmit buffer is full.
    ///
    /// # Safety
    ///
    /// The caller must own the producer side of `tx`.
    unsafe fn transmit(&self, byte: u8) {
        if self.transmit_direct(byte) {
            return;
        }
        while self.tx.is_full() {
            core::hint::spin_loop();
        }
        // SAFETY: Forwarded from the caller; the buffer was just seen not full.
        unsafe { self.enqueue(byte) };
    }

    /// Transmits `byte`, failing instead of waiting when the transmit buffer is full.
    ///
    /// # Safety
    ///
    /// The caller must own the producer side of `tx`.
    unsafe fn try_transmit(&self, byte: u8) -> Result<(), WouldBlock> {
        if self.transmit_direct(byte) {
            return Ok(());
        }
        if self.tx.is_full() {
            return Err(WouldBlock);
        }
        // SAFETY: Forwarded from the caller; the buffer was just seen not full.
        unsafe { self.enqueue(byte) };
        Ok(())
    }
}

/// Non-blocking transmit with the concrete [`Serial`] type erased.
///
/// Lets the global logger hold on to a line without naming its hardware type.
#[cfg(feature = "global-logger")]
pub(crate) trait Transmit: Sync {
    /// Queues as much of `bytes` as fits, discarding the rest.
    ///
    /// # Safety
    ///
    /// The caller must own the producer side of the transmit buffer, that is, it must
    /// have consumed the line's [`Writer`].
    unsafe fn transmit_lossy(&self, bytes: &[u8]);
}

#[cfg(feature = "global-logger")]
impl<H: Hardware + Sync, const N: usize> Transmit for Serial<H, N> {
    unsafe fn transmit_lossy(&self, bytes: &[u8]) {
        for &byte in bytes {
            // SAFETY: Forwarded from the caller.
            if unsafe { self.try_transmit(byte) }.is_err() {
                return;
            }
        }
    }
}

/// Sends bytes over the line.
///
/// Returned by [`Serial::init`]. There is exactly one `Writer` per [`Serial`], which makes
/// it the only producer of the transmit buffer.
///
/// Writes first try to hand the byte to an idle transmitter directly. Otherwise the byte
/// is queued for the transmit interrupt. When the queue is full, [`Writer::write`] spins
/// until the interrupt frees a slot, so it must not be called with interrupts disabled.
/// [`Writer::try_write`] returns [`WouldBlock`] instead.
pub struct Writer<'a, H, const N: usize = DEFAULT_CAPACITY> {
    pub(crate) serial: &'a Serial<H, N>,
}

impl<H: Hardware, const N: usize> Writer<'_, H, N> {
    /// Sends one byte, waiting for buffer space if needed. Always returns 1.
    #[inline]
    pub fn write(&mut self, byte: u8) -> usize {
        // SAFETY: A `Writer` is the unique producer of `tx`, and `&mut self` keeps it that way.
        unsafe { self.serial.transmit(byte) };
        1
    }

    /// Sends one byte if it fits, without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`WouldBlock`] if the transmit buffer is full. Nothing is queued.
    #[inline]
    pub fn try_write(&mut self, byte: u8) -> Result<(), WouldBlock> {
        // SAFETY: A `Writer` is the unique producer of `tx`, and `&mut self` keeps it that way.
        unsafe { self.serial.try_transmit(byte) }
    }

    /// Sends every byte of `bytes` in order and returns how many were sent.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().map(|&b| self.write(b)).sum()
    }

    /// Sends the UTF-8 bytes of `text`. An empty string sends nothing and returns 0.
    pub fn write_string(&mut self, text: &str) -> usize {
        self.write_bytes(text.as_bytes())
    }

    /// Number of bytes queued but not yet handed to the hardware.
    #[inline]
    pub fn pending(&self) -> usize {
        self.serial.pending()
    }

    /// Waits until every queued byte has been handed to the hardware.
    ///
    /// Spins; interrupts must be enabled.
    pub fn flush(&mut self) {
        while !self.serial.tx.is_empty() {
            core::hint::spin_loop();
        }
    }
}

impl<H: Hardware, const N: usize> fmt::Write for Writer<'_, H, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}

/// Receives bytes from the line.
///
/// Returned by [`Serial::init`]. There is exactly one `Reader` per [`Serial`], which makes
/// it the only consumer of the receive buffer. Reads never block.
pub struct Reader<'a, H, const N: usize = DEFAULT_CAPACITY> {
    serial: &'a Serial<H, N>,
}

impl<H: Hardware, const N: usize> Reader<'_, H, N> {
    /// Number of received bytes that have not been read yet.
    #[inline]
    pub fn available(&self) -> usize {
        self.serial.rx.len()
    }

    /// Takes the oldest received byte, or `None` if nothing has arrived.
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        // SAFETY: A `Reader` is the unique consumer of `rx`, and `&mut self` keeps it that way.
        unsafe { self.serial.rx.pop() }
    }

    /// Moves received bytes into `buf` until it is full or nothing is left.
    ///
    /// Returns the number of bytes copied.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        for slot in buf.iter_mut() {
            let Some(byte) = self.read() else { break };
            *slot = byte;
            n += 1;
        }
        n
    }

    /// Number of received bytes discarded because the receive buffer was full.
    ///
    /// The counter wraps around.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.serial.dropped.load(Ordering::Relaxed)
    }

    /// Waits until at least one received byte is available.
    #[cfg(feature = "async-await")]
    pub async fn wait_for_data(&mut self) {
        core::future::poll_fn(|cx| {
            self.serial.rx_waker.register(cx.waker());

            if self.serial.rx.is_empty() {
                core::task::Poll::Pending
            } else {
                core::task::Poll::Ready(())
            }
        })
        .await
    }
}
