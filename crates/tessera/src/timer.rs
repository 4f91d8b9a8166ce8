//! # Timer Producer
//!
//! A background thread that publishes [`TimerFired`] at a fixed interval.
//! Systems react to it on their next tick, the same way they react to
//! input: by draining the event router.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use tessera_core::Publisher;

use crate::error::{RuntimeError, RuntimeResult};

/// Published each time a timer interval elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerFired {
    /// Name the timer was spawned with.
    pub timer: &'static str,
    /// Firing count, starting at `1`.
    pub sequence: u64,
}

/// Handle on a running timer thread. Stops the thread when dropped.
pub struct TimerProducer {
    name: &'static str,
    shutdown: Sender<()>,
    handle: Option<JoinHandle<u64>>,
}

impl TimerProducer {
    /// Starts a thread publishing through `publisher` every `interval`.
    pub fn spawn(
        name: &'static str,
        interval: Duration,
        publisher: Publisher<TimerFired>,
    ) -> RuntimeResult<Self> {
        let (shutdown, stop) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(format!("timer-{name}"))
            .spawn(move || {
                let ticks = tick(interval);
                let mut sequence = 0;
                loop {
                    select! {
                        recv(ticks) -> _ => {
                            sequence += 1;
                            publisher.publish(TimerFired { timer: name, sequence });
                        }
                        recv(stop) -> _ => break,
                    }
                }
                sequence
            })
            .map_err(|source| RuntimeError::Spawn {
                name: format!("timer-{name}"),
                source,
            })?;

        tracing::debug!(timer = name, interval_ms = interval.as_millis(), "timer started");
        Ok(Self {
            name,
            shutdown,
            handle: Some(handle),
        })
    }

    /// Stops the thread and returns how many times it fired.
    pub fn stop(mut self) -> u64 {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> u64 {
        let Some(handle) = self.handle.take() else {
            return 0;
        };
        // Full only if a stop is already queued; either way the thread exits.
        let _ = self.shutdown.try_send(());
        match handle.join() {
            Ok(fired) => {
                tracing::debug!(timer = self.name, fired, "timer stopped");
                fired
            }
            Err(_) => {
                tracing::warn!(timer = self.name, "timer thread panicked");
                0
            }
        }
    }
}

impl Drop for TimerProducer {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
