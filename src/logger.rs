//! A `defmt` global logger that sends frames out over a [`Serial`](crate::Serial) line.
//!
//! Hand the line's [`Writer`] to [`init`]; from then on `defmt` frames are queued on the
//! transmit buffer and sent by the transmit interrupt.
//!
//! A frame is written while holding a critical section, so the transmit interrupt cannot
//! drain the buffer in the meantime. Bytes that do not fit are discarded. Size the
//! transmit buffer for the largest burst of logging you expect between interrupts.

use crate::{
    hardware::Hardware,
    serial::{Transmit, Writer},
};
use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering, compiler_fence},
};
use critical_section::RestoreState;
use defmt::Encoder;

/// Error returned by [`init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum LoggerError {
    /// A line has already been installed as the log output.
    AlreadyInstalled,
}

/// Installs `writer`'s line as the `defmt` output.
///
/// The writer is consumed: the logger becomes the only producer of the transmit buffer,
/// which also keeps raw writes from being interleaved with the encoded frames.
///
/// # Errors
///
/// Returns [`LoggerError::AlreadyInstalled`] if called more than once.
pub fn init<H, const N: usize>(writer: Writer<'static, H, N>) -> Result<(), LoggerError>
where
    H: Hardware + Sync + 'static,
{
    static INSTALLED: AtomicBool = AtomicBool::new(false);

    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(LoggerError::AlreadyInstalled);
    }

    // SAFETY: The atomic swap above guarantees this is called only once, and the
    // consumed `writer` hands over the producer side of the transmit buffer.
    unsafe { LOGGER_STATE.initialize(writer.serial) };
    Ok(())
}

#[defmt::global_logger]
struct Logger;

struct LoggerState {
    line: UnsafeCell<MaybeUninit<&'static dyn Transmit>>,
    cs_state: UnsafeCell<RestoreState>,
    encoder: UnsafeCell<Encoder>,
    initialized: AtomicBool,
    /// Reentrancy depth counter. 0 = not logging, 1 = logging (owner), 2+ = reentrant.
    /// Reentrant calls (from NMI, HardFault, or panic during logging) are silently dropped.
    ///
    /// Updated with a load and a store, not `fetch_add`, so targets without atomic
    /// read-modify-write are supported. A preempting context always restores the value
    /// before the preempted one resumes, so the split update loses nothing on one core.
    depth: AtomicUsize,
}

impl LoggerState {
    /// # Safety
    ///
    /// - Must only be called once per program execution.
    /// - `line`'s [`Writer`] must have been consumed, so no one else produces into its
    ///   transmit buffer.
    unsafe fn initialize(&self, line: &'static dyn Transmit) {
        // SAFETY: The caller guarantees this is called only once, so there is no data race
        // on the `line` field. The `UnsafeCell` provides interior mutability.
        unsafe { self.line.get().write(MaybeUninit::new(line)) };
        // Release: ensures the write to `line` is visible before `initialized` becomes true.
        self.initialized.store(true, Ordering::Release);
    }

    /// # Safety
    ///
    /// Must be called from within a critical section, which serializes all producers.
    #[inline]
    unsafe fn write(&self, bytes: &[u8]) {
        // Acquire: synchronizes with the Release store in `initialize`, ensuring we see
        // the fully initialized `line`.
        if self.initialized.load(Ordering::Acquire) {
            // SAFETY: The Acquire load ensures `line` is initialized, and it is never
            // written again.
            let line = unsafe { self.line.get().read().assume_init() };
            // SAFETY: `initialize` requires the line's `Writer` to be consumed, so the
            // logger is the only producer, and the caller's critical section keeps
            // logging contexts from overlapping.
            unsafe { line.transmit_lossy(bytes) };
        }
    }
}

// SAFETY: All mutable access to fields is protected by either:
// - `initialized` flag with Acquire/Release ordering (for `line`).
// - Critical sections (for `cs_state` and `encoder`).
unsafe impl Sync for LoggerState {}

static LOGGER_STATE: LoggerState = LoggerState {
    line: UnsafeCell::new(MaybeUninit::uninit()),
    cs_state: UnsafeCell::new(RestoreState::invalid()),
    encoder: UnsafeCell::new(Encoder::new()),
    initialized: AtomicBool::new(false),
    depth: AtomicUsize::new(0),
};

// SAFETY: This impl upholds the `defmt::Logger` safety contract:
// - `acquire` enters a critical section before any logging operations.
// - `release` exits the critical section after logging is complete.
// - All mutable state access is protected by the critical section.
// - Reentrant calls (from NMI, HardFault, or panic during logging) are detected and dropped.
unsafe impl defmt::Logger for Logger {
    fn acquire() {
        // Increment depth. If we weren't at 0, we're reentrant and skip all setup.
        let was_depth = LOGGER_STATE.depth.load(Ordering::Relaxed);
        LOGGER_STATE.depth.store(was_depth + 1, Ordering::Relaxed);
        compiler_fence(Ordering::SeqCst);
        if was_depth > 0 {
            return;
        }

        // SAFETY: This is the start of a logging operation. The critical section
        // will be released in `release()`. defmt guarantees balanced acquire/release calls.
        let restore = unsafe { critical_section::acquire() };

        compiler_fence(Ordering::SeqCst);

        // SAFETY: We're in a critical section, so exclusive access to `cs_state` is guaranteed.
        unsafe { LOGGER_STATE.cs_state.get().write(restore) };

        compiler_fence(Ordering::SeqCst);

        // SAFETY: We're in a critical section, so exclusive access to `encoder` is guaranteed.
        // The callback to `LOGGER_STATE.write` is also within the critical section.
        unsafe { &mut *LOGGER_STATE.encoder.get() }
            .start_frame(|b| unsafe { LOGGER_STATE.write(b) });
    }

    unsafe fn flush() {
        // Nothing to do: waiting for the transmit interrupt to drain the buffer would
        // deadlock inside the critical section.
    }

    unsafe fn release() {
        // Decrement depth. If we weren't at 1, we're reentrant and skip all cleanup.
        compiler_fence(Ordering::SeqCst);
        let was_depth = LOGGER_STATE.depth.load(Ordering::Relaxed);
        LOGGER_STATE.depth.store(was_depth - 1, Ordering::Relaxed);
        if was_depth != 1 {
            return;
        }

        // SAFETY: We're still in the critical section from `acquire()`.
        unsafe { &mut *LOGGER_STATE.encoder.get() }
            .end_frame(|b| unsafe { LOGGER_STATE.write(b) });

        compiler_fence(Ordering::SeqCst);

        // SAFETY: We read the restore state that was saved in `acquire()` and release
        // the critical section. The critical section guarantees exclusive access to `cs_state`.
        unsafe { critical_section::release(LOGGER_STATE.cs_state.get().read()) };

        compiler_fence(Ordering::SeqCst);
    }

    unsafe fn write(bytes: &[u8]) {
        // Skip if reentrant (depth != 1). The reentrant log is silently dropped.
        if LOGGER_STATE.depth.load(Ordering::Relaxed) != 1 {
            return;
        }

        // SAFETY: defmt guarantees this is called between acquire() and release(),
        // so we're within a critical section.
        unsafe { &mut *LOGGER_STATE.encoder.get() }.write(bytes, |b| unsafe { LOGGER_STATE.write(b) });
    }
}
