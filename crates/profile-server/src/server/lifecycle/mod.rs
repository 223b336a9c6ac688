//! Process lifecycle coordination.
//!
//! [`Lifecycle`] starts every transport as an independent task, owns the
//! single cancellation signal they all observe, and acts as the completion
//! barrier the process waits on before it exits.
//!
//! ## Phases
//!
//! `Idle -> Starting -> Running -> Draining -> Stopped`
//!
//! - `Starting`: listeners are being bound. A bind failure aborts startup
//!   before anything is served.
//! - `Running`: every transport serves on its own task.
//! - `Draining`: entered on the first shutdown request, whether it came from
//!   an OS signal, a [`ShutdownHandle`] call, or a transport that stopped on
//!   its own. The cancellation token is broadcast once; later requests are
//!   no-ops. Transports stop accepting, finish in-flight calls and report.
//! - `Stopped`: every transport has reported, or the drain deadline passed
//!   and the stragglers were aborted.
//!
//! A transport failure or a missed drain deadline makes [`Lifecycle::wait`]
//! return an error, which the binary turns into a non-zero exit.

pub mod signal;

use core::{fmt, future::Future, time::Duration};
use std::sync::Arc;
use tokio::{sync::watch, task::JoinSet, time::timeout};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Cloneable handle that requests a graceful shutdown.
#[derive(Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
    phase: Arc<watch::Sender<Phase>>,
}

impl ShutdownHandle {
    /// Requests a drain. Returns `true` for the request that started it.
    pub fn shutdown(&self, reason: &str) -> bool {
        let first = self.phase.send_if_modified(|phase| match phase {
            Phase::Draining | Phase::Stopped => false,
            _ => {
                *phase = Phase::Draining;
                true
            }
        });
        if first {
            tracing::info!(reason, "Shutdown requested, draining transports");
        }
        self.token.cancel();
        first
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a shutdown has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

struct UnitReport {
    name: &'static str,
    result: anyhow::Result<()>,
}

pub struct Lifecycle {
    handle: ShutdownHandle,
    units: JoinSet<UnitReport>,
    drain_timeout: Duration,
}

impl Lifecycle {
    pub fn new(drain_timeout: Duration) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            handle: ShutdownHandle {
                token: CancellationToken::new(),
                phase: Arc::new(phase),
            },
            units: JoinSet::new(),
            drain_timeout,
        }
    }

    pub fn phase(&self) -> Phase {
        *self.handle.phase.borrow()
    }

    /// Observes phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.handle.phase.subscribe()
    }

    pub fn handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// The token every transport watches for the drain broadcast.
    pub fn token(&self) -> CancellationToken {
        self.handle.token.clone()
    }

    fn advance(&self, from: Phase, to: Phase) {
        self.handle.phase.send_if_modified(|phase| {
            if *phase == from {
                *phase = to;
                true
            } else {
                false
            }
        });
    }

    pub fn starting(&self) {
        self.advance(Phase::Idle, Phase::Starting);
    }

    /// Marks startup complete. Has no effect if a drain already began.
    pub fn running(&self) {
        self.advance(Phase::Starting, Phase::Running);
        tracing::debug!(phase = %self.phase(), units = self.units.len(), "Startup complete");
    }

    /// Runs `unit` as an independent task.
    ///
    /// A unit is expected to return only after the shutdown token fires. If it
    /// returns earlier, successfully or not, that is treated as a failure and
    /// triggers a drain of every other unit.
    pub fn spawn<F>(&mut self, name: &'static str, unit: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handle = self.handle();
        self.units.spawn(async move {
            let result = match unit.await {
                Ok(()) if handle.is_shutting_down() => {
                    tracing::info!(transport = name, "Transport drained");
                    Ok(())
                }
                Ok(()) => {
                    tracing::error!(transport = name, "Transport stopped unexpectedly");
                    handle.shutdown("transport stopped");
                    Err(anyhow::anyhow!(
                        "{name} stopped before shutdown was requested"
                    ))
                }
                Err(err) => {
                    tracing::error!(transport = name, "Transport failed: {err:#}");
                    handle.shutdown("transport failed");
                    Err(err.context(format!("{name} transport failed")))
                }
            };
            UnitReport { name, result }
        });
    }

    /// Waits for a shutdown request, then for every unit to report, for at
    /// most the drain timeout. Units still running after the deadline are
    /// aborted.
    pub async fn wait(mut self) -> anyhow::Result<()> {
        self.handle.cancelled().await;

        let mut failures = Vec::new();
        let drained = timeout(self.drain_timeout, async {
            while let Some(joined) = self.units.join_next().await {
                match joined {
                    Ok(UnitReport { result: Ok(()), .. }) => {}
                    Ok(UnitReport {
                        name,
                        result: Err(err),
                    }) => failures.push(format!("{name}: {err:#}")),
                    Err(err) => failures.push(format!("transport task panicked: {err}")),
                }
            }
        })
        .await;

        if drained.is_err() {
            let stuck = self.units.len();
            tracing::warn!(
                stuck,
                timeout = ?self.drain_timeout,
                "Drain deadline passed, aborting remaining transports"
            );
            self.units.abort_all();
            while self.units.join_next().await.is_some() {}
            failures.push(format!(
                "{stuck} transport(s) did not drain within {:?}",
                self.drain_timeout
            ));
        }

        self.advance(Phase::Draining, Phase::Stopped);

        if failures.is_empty() {
            tracing::info!("All transports stopped");
            Ok(())
        } else {
            anyhow::bail!("shutdown completed with errors: {}", failures.join("; "))
        }
    }
}
