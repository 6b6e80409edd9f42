// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal-safe critical sections
//!
//! A [`SignalGuard`] runs a future while holding a [`Mutex`], with SIGINT
//! and SIGTERM intercepted. When one arrives the section is dropped, the
//! lock is released, the previous dispositions are put back and the signal
//! is raised again so whatever was installed before (by default, process
//! termination) still happens.
//!
//! The handler only writes the signal number to a socket. Guards are
//! process-wide and must nest LIFO: an inner guard treats the outer guard's
//! handler as the previous disposition, so a signal unwinds innermost first.

use crate::error::GuardError;
use crate::mutex::Mutex;
use lk_adapters::StoreClient;
use lk_core::{TokenSource, UuidTokens};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::ffi::c_int;
use std::future::Future;
use std::io::Read;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::sync::atomic::{AtomicI32, Ordering};

/// Signals intercepted unless configured otherwise
pub const DEFAULT_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

/// Write end of the innermost armed guard's wake-up socket, or -1
static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

#[allow(unsafe_code)]
extern "C" fn on_signal(signum: c_int) {
    let fd = WAKE_FD.load(Ordering::SeqCst);
    if fd < 0 {
        return;
    }
    // SAFETY: the armed guard publishing `fd` keeps it open until after it
    // has reset WAKE_FD.
    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
    let _ = nix::unistd::write(fd, &[signum as u8]);
}

/// How a guarded section ended
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<R> {
    /// The section ran to completion and the lock was released
    Completed(R),
    /// The lock was held elsewhere; the section never ran
    NotAcquired,
    /// A signal cut the section short and the process survived re-raising it
    Interrupted(Signal),
}

impl<R> Outcome<R> {
    pub fn completed(self) -> Option<R> {
        match self {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Handlers installed by one guard, restored on drop
struct Armed {
    saved: Vec<(Signal, SigAction)>,
    previous_fd: RawFd,
    _writer: std::os::unix::net::UnixStream,
}

impl Armed {
    #[allow(unsafe_code)]
    fn install(signals: &[Signal]) -> Result<(Self, WakeSocket), GuardError> {
        let (reader, writer) = std::os::unix::net::UnixStream::pair()?;
        reader.set_nonblocking(true)?;
        writer.set_nonblocking(true)?;
        let wake = WakeSocket {
            raw: reader.try_clone()?,
            stream: tokio::net::UnixStream::from_std(reader)?,
        };

        let previous_fd = WAKE_FD.swap(writer.as_raw_fd(), Ordering::SeqCst);
        let mut armed = Armed {
            saved: Vec::with_capacity(signals.len()),
            previous_fd,
            _writer: writer,
        };

        let action = SigAction::new(
            SigHandler::Handler(on_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        for &sig in signals {
            // SAFETY: on_signal only loads an atomic and calls write(2)
            let previous = unsafe { signal::sigaction(sig, &action) }?;
            armed.saved.push((sig, previous));
        }
        tracing::trace!(?signals, "signal handlers installed");
        Ok((armed, wake))
    }
}

impl Drop for Armed {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // Handlers go back before the socket is unpublished so no signal
        // lands on a handler with nowhere to write.
        for (sig, previous) in self.saved.iter().rev() {
            // SAFETY: `previous` is exactly what sigaction returned for `sig`
            if let Err(e) = unsafe { signal::sigaction(*sig, previous) } {
                tracing::warn!(signal = %sig, error = %e, "failed to restore signal handler");
            }
        }
        WAKE_FD.store(self.previous_fd, Ordering::SeqCst);
        tracing::trace!("signal handlers restored");
    }
}

/// Read end of the wake-up socket
struct WakeSocket {
    stream: tokio::net::UnixStream,
    /// Same socket, read without the reactor once the guard is disarmed
    raw: std::os::unix::net::UnixStream,
}

impl WakeSocket {
    /// Wait for the next intercepted signal
    async fn next(&self) -> Signal {
        let mut buf = [0u8; 1];
        loop {
            if let Err(e) = self.stream.readable().await {
                tracing::warn!(error = %e, "signal wake-up socket failed");
                return std::future::pending().await;
            }
            match self.stream.try_read(&mut buf) {
                Ok(1) => {
                    if let Ok(sig) = Signal::try_from(i32::from(buf[0])) {
                        return sig;
                    }
                }
                Ok(_) => return std::future::pending().await,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    tracing::warn!(error = %e, "signal wake-up socket failed");
                    return std::future::pending().await;
                }
            }
        }
    }

    /// Signals that arrived but were not waited for
    fn pending(&mut self) -> Vec<Signal> {
        let mut buf = [0u8; 16];
        let mut signals = Vec::new();
        while let Ok(n) = self.raw.read(&mut buf) {
            if n == 0 {
                break;
            }
            signals.extend(
                buf[..n]
                    .iter()
                    .filter_map(|b| Signal::try_from(i32::from(*b)).ok()),
            );
        }
        signals
    }
}

/// Runs critical sections under a lock, releasing it on termination signals
pub struct SignalGuard<S, T: TokenSource = UuidTokens> {
    mutex: Mutex<S, T>,
    signals: Vec<Signal>,
}

impl<S: StoreClient, T: TokenSource> SignalGuard<S, T> {
    pub fn new(mutex: Mutex<S, T>) -> Self {
        Self {
            mutex,
            signals: DEFAULT_SIGNALS.to_vec(),
        }
    }

    /// Intercept `signals` instead of SIGINT and SIGTERM
    pub fn with_signals(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.signals = signals.into_iter().collect();
        self
    }

    pub fn mutex(&self) -> &Mutex<S, T> {
        &self.mutex
    }

    pub fn into_inner(self) -> Mutex<S, T> {
        self.mutex
    }

    /// Acquire the lock, run `section`, release.
    ///
    /// Handlers are installed before acquiring, so a signal while waiting
    /// for the lock also unwinds, clearing the lock if the interrupted
    /// attempt took it after all. If the returned future is dropped
    /// mid-section the handlers are restored but the lock stays until its
    /// lease runs out.
    pub async fn run<F, Fut, R>(&mut self, section: F) -> Result<Outcome<R>, GuardError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let (armed, mut wake) = Armed::install(&self.signals)?;

        let waited = tokio::select! {
            biased;
            sig = wake.next() => Err(sig),
            acquired = self.mutex.acquire() => Ok(acquired),
        };
        let acquired = match waited {
            Ok(acquired) => acquired?,
            Err(sig) => {
                tracing::info!(lock = %self.mutex.name(), signal = %sig, "signal while waiting for lock");
                // The abandoned SET may still have been applied
                let released = self.mutex.release().await;
                return finish_interrupted(armed, wake, sig, released);
            }
        };
        if !acquired {
            drop(armed);
            reraise_pending(&mut wake)?;
            return Ok(Outcome::NotAcquired);
        }

        let ended = tokio::select! {
            biased;
            sig = wake.next() => Err(sig),
            value = section() => Ok(value),
        };

        let released = self.mutex.release().await;
        match ended {
            Ok(value) => {
                drop(armed);
                reraise_pending(&mut wake)?;
                released?;
                Ok(Outcome::Completed(value))
            }
            Err(sig) => {
                tracing::info!(lock = %self.mutex.name(), signal = %sig, "section interrupted");
                finish_interrupted(armed, wake, sig, released)
            }
        }
    }
}

/// Restore handlers, then let the original disposition see `sig`
fn finish_interrupted<R>(
    armed: Armed,
    mut wake: WakeSocket,
    sig: Signal,
    released: Result<(), crate::error::LockError>,
) -> Result<Outcome<R>, GuardError> {
    if let Err(e) = released {
        tracing::warn!(signal = %sig, error = %e, "lock release failed during signal unwind");
    }
    drop(armed);
    signal::raise(sig)?;
    reraise_pending(&mut wake)?;
    Ok(Outcome::Interrupted(sig))
}

/// Forward signals that raced with disarming
fn reraise_pending(wake: &mut WakeSocket) -> Result<(), GuardError> {
    for sig in wake.pending() {
        tracing::debug!(signal = %sig, "forwarding signal caught during unwind");
        signal::raise(sig)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
