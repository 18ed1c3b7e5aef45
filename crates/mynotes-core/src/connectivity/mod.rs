//! Online/offline state machine.
//!
//! The monitor holds one of two states and changes it only through
//! [`ConnectivityMonitor::handle`]. Subscribers see every committed state over
//! a `watch` channel; the data service uses that to replay the sync queue once
//! per offline-to-online transition.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::remote::RemoteService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Network status signal from the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    Online,
    Offline,
}

/// State change produced by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Offline to online; the sync queue should be replayed.
    Reconnected,
    /// Online to offline.
    Disconnected,
}

/// Pure transition function of the connectivity state machine.
///
/// Returns the new state and the transition, if the state changed.
pub const fn transition(
    state: ConnectivityState,
    event: NetworkEvent,
) -> (ConnectivityState, Option<Transition>) {
    match (state, event) {
        (ConnectivityState::Offline, NetworkEvent::Online) => {
            (ConnectivityState::Online, Some(Transition::Reconnected))
        }
        (ConnectivityState::Online, NetworkEvent::Offline) => {
            (ConnectivityState::Offline, Some(Transition::Disconnected))
        }
        (state, _) => (state, None),
    }
}

/// Tracks whether the remote service is reachable.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<ConnectivityState>>,
}

impl ConnectivityMonitor {
    pub fn new(initial: ConnectivityState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn online() -> Self {
        Self::new(ConnectivityState::Online)
    }

    pub fn offline() -> Self {
        Self::new(ConnectivityState::Offline)
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state().is_online()
    }

    /// Apply a network event. Repeated events for the current state are
    /// no-ops and return `None`.
    pub fn handle(&self, event: NetworkEvent) -> Option<Transition> {
        let mut change = None;
        self.state.send_if_modified(|state| {
            let (next, fired) = transition(*state, event);
            *state = next;
            change = fired;
            fired.is_some()
        });

        match change {
            Some(Transition::Reconnected) => tracing::info!("Connectivity restored"),
            Some(Transition::Disconnected) => tracing::info!("Connectivity lost; working offline"),
            None => tracing::debug!("Ignoring {:?} event; state unchanged", event),
        }
        change
    }

    /// Receiver that is notified on every committed state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }
}

/// Periodically probes the remote service and feeds the result to a monitor.
///
/// Native processes have no browser `online`/`offline` events; the probe
/// stands in for that host signal.
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    interval: Duration,
}

impl ConnectivityProbe {
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Probe once and apply the result.
    pub async fn probe_once<R: RemoteService>(
        remote: &R,
        monitor: &ConnectivityMonitor,
    ) -> Option<Transition> {
        let event = match remote.health().await {
            Ok(()) => NetworkEvent::Online,
            Err(error) => {
                tracing::debug!("Connectivity probe failed: {}", error);
                NetworkEvent::Offline
            }
        };
        monitor.handle(event)
    }

    /// Run the probe loop until the returned task is aborted.
    pub fn spawn<R>(self, remote: R, monitor: ConnectivityMonitor) -> JoinHandle<()>
    where
        R: RemoteService + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                Self::probe_once(&remote, &monitor).await;
            }
        })
    }
}
