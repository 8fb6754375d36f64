//! Event fan-out: turning engine activity into outbound envelopes.
//!
//! Delivery is explicit and synchronous: for each event the helpers
//! here build one notification per current binding and push it through
//! the transport, preserving engine emission order as a hard contract.
//! Nothing here mutates registry state.

use crate::clients::ClientRegistry;
use crate::coalesce::Binding;
use crate::engine::SessionEvent;
use crate::messages::{FaultReport, Notification, OutboundEnvelope};
use crate::swarms::SwarmSession;
use crate::transport::Transport;

/// Deliver a snapshot-class event (`identity`/`metadata`/`progress`/
/// `done`) to every current binding of the session.
///
/// The caller refreshes `session.snapshot` from the engine handle
/// before calling, so the message reflects state as of the event.
pub(crate) fn deliver<S, T: Transport>(
    session: &SwarmSession<S>,
    event: &SessionEvent,
    transport: &mut T,
) {
    let notification = match event {
        SessionEvent::IdentityKnown => Notification::Identity {
            torrent: session.snapshot.clone(),
        },
        SessionEvent::MetadataKnown => Notification::Metadata {
            torrent: session.snapshot.clone(),
        },
        SessionEvent::ProgressChanged => Notification::Progress {
            progress: session.snapshot.progress.clone(),
        },
        SessionEvent::Completed => Notification::Done {
            progress: session.snapshot.progress.clone(),
        },
        // Faults have their own severity split; see `fault`.
        SessionEvent::Warning(report) | SessionEvent::Error(report) => {
            let fatal = matches!(event, SessionEvent::Error(_));
            fault(session, report.clone(), fatal, transport);
            return;
        }
    };
    to_bindings(session, notification, transport);
}

/// Deliver a session-scoped fault to the session's bindings only.
pub(crate) fn fault<S, T: Transport>(
    session: &SwarmSession<S>,
    report: FaultReport,
    fatal: bool,
    transport: &mut T,
) {
    let notification = if fatal {
        Notification::Error { error: report }
    } else {
        Notification::Warning { error: report }
    };
    to_bindings(session, notification, transport);
}

/// Synthesize the "current snapshot" pair for a subscriber that just
/// bound to an already-active session: identity then progress, so the
/// late joiner does not wait for the next natural event.
pub(crate) fn welcome<S, T: Transport>(
    session: &SwarmSession<S>,
    binding: &Binding,
    transport: &mut T,
) {
    transport.send(OutboundEnvelope::scoped(
        &binding.client,
        &binding.torrent_key,
        Notification::Identity {
            torrent: session.snapshot.clone(),
        },
    ));
    transport.send(OutboundEnvelope::scoped(
        &binding.client,
        &binding.torrent_key,
        Notification::Progress {
            progress: session.snapshot.progress.clone(),
        },
    ));
}

/// Periodic progress broadcast to the session's bindings.
pub(crate) fn update<S, T: Transport>(session: &SwarmSession<S>, transport: &mut T) {
    to_bindings(
        session,
        Notification::Update {
            progress: session.snapshot.progress.clone(),
        },
        transport,
    );
}

/// Engine-wide fault: one envelope per registered client, no
/// subscription scope.
pub(crate) fn broadcast_global<T: Transport>(
    clients: &ClientRegistry,
    fault: FaultReport,
    fatal: bool,
    transport: &mut T,
) {
    for client in clients.keys() {
        let notification = if fatal {
            Notification::Error {
                error: fault.clone(),
            }
        } else {
            Notification::Warning {
                error: fault.clone(),
            }
        };
        transport.send(OutboundEnvelope::global(client, notification));
    }
}

fn to_bindings<S, T: Transport>(
    session: &SwarmSession<S>,
    notification: Notification,
    transport: &mut T,
) {
    for binding in &session.bindings {
        transport.send(OutboundEnvelope::scoped(
            &binding.client,
            &binding.torrent_key,
            notification.clone(),
        ));
    }
}
