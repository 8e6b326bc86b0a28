//! Process signal handling.
//!
//! Handlers only touch a process-wide atomic: `SIGINT`/`SIGTERM` request a
//! cooperative shutdown that the main loop observes and turns into a stop
//! broadcast; fault signals print a one-line diagnostic and re-raise with
//! the default disposition.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};

// Layer 2: Third-party crate imports
// (nix, unix only, imported in the functions below)

// Layer 3: Internal module imports
// (none)

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Whether a shutdown signal has been observed.
pub(crate) fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Acquire)
}

#[cfg(unix)]
extern "C" fn handle_shutdown_signal(_signal: i32) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
}

#[cfg(unix)]
extern "C" fn handle_fault_signal(raw: i32) {
    use nix::sys::signal::{self, SigHandler, Signal};
    use std::io::Write;

    // One unbuffered write, then the default disposition.
    let _ = std::io::stderr().write_all(b"thorium: fatal signal received\n");
    if let Ok(signal) = Signal::try_from(raw) {
        // SAFETY: resetting to the default handler inside the handler is
        // the documented way to re-deliver a fault signal.
        unsafe {
            let _ = signal::signal(signal, SigHandler::SigDfl);
        }
        let _ = signal::raise(signal);
    }
}

/// Install the engine's signal handlers.
#[cfg(unix)]
pub(crate) fn install() {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    let shutdown = SigAction::new(
        SigHandler::Handler(handle_shutdown_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let fault = SigAction::new(
        SigHandler::Handler(handle_fault_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handlers above only perform async-signal-safe work.
    unsafe {
        let _ = sigaction(Signal::SIGINT, &shutdown);
        let _ = sigaction(Signal::SIGTERM, &shutdown);
        let _ = sigaction(Signal::SIGSEGV, &fault);
        let _ = sigaction(Signal::SIGBUS, &fault);
    }
}

#[cfg(not(unix))]
pub(crate) fn install() {}
