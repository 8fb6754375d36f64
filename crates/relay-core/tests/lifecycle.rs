//! Heartbeat expiry, drain grace, session teardown and engine-instance
//! lifetime, driven through ticks of the liveness sweeper.

mod common;

use std::time::Duration;

use common::*;
use relay_core::coordinator::CoordinatorConfig;
use relay_core::keys::InfoHash;
use relay_core::messages::Notification;

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        heartbeat_timeout: Duration::from_secs(30),
        update_interval: Duration::from_secs(1),
        drain_grace: Duration::from_secs(5),
    }
}

#[test]
fn end_to_end_shared_session_lifecycle() {
    let mut fx = fixture(config());
    let (a, ka) = (client("a"), key("ka"));
    let (b, kb) = (client("b"), key("kb"));
    let hash = InfoHash::from("hash-x");

    // A creates, B reuses and gets the synthesized snapshot.
    fx.coordinator.receive(add(&a, &ka, "hash-x"));
    fx.coordinator.receive(add(&b, &kb, "hash-x"));
    assert_eq!(fx.engine.opens(), 1);
    fx.transport.take();

    // A goes silent past the timeout; B keeps heartbeating.
    fx.clock.advance(Duration::from_secs(31));
    fx.coordinator.receive(heartbeat(&b));
    fx.coordinator.tick();

    assert!(!fx.coordinator.clients().contains(&a));
    assert!(fx.coordinator.clients().contains(&b));
    assert!(fx.engine.closed().is_empty(), "B still holds a binding");

    // The periodic update still flows to the survivor.
    let updates: Vec<_> = fx
        .transport
        .take()
        .into_iter()
        .filter(|e| matches!(e.notification, Notification::Update { .. }))
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].client_key, b);

    // B goes silent too: the session drains, then dies, and with it
    // the shared engine instance.
    fx.clock.advance(Duration::from_secs(31));
    fx.coordinator.tick();
    assert!(fx.engine.closed().is_empty(), "grace window still open");

    fx.clock.advance(Duration::from_secs(5));
    fx.coordinator.tick();
    assert_eq!(fx.engine.closed(), vec![hash]);
    assert_eq!(fx.engine.shutdowns(), 1);
    assert!(fx.coordinator.swarms().is_empty());
}

#[test]
fn destroy_immediate_tears_down_at_once() {
    let mut fx = fixture(config());
    let (a, ka) = (client("a"), key("ka"));

    fx.coordinator.receive(add(&a, &ka, "hash-x"));
    fx.coordinator.receive(destroy(&a, true));

    assert_eq!(fx.engine.closed(), vec![InfoHash::from("hash-x")]);
    assert_eq!(fx.engine.shutdowns(), 1);
    assert!(!fx.coordinator.clients().contains(&a));
}

#[test]
fn draining_session_is_revived_by_a_new_binding() {
    let mut fx = fixture(config());
    let (a, ka) = (client("a"), key("ka"));
    let (b, kb) = (client("b"), key("kb"));

    fx.coordinator.receive(add(&a, &ka, "hash-x"));
    fx.coordinator.receive(destroy(&a, false));
    assert!(fx.engine.closed().is_empty(), "grace absorbs the destroy");

    // B arrives inside the grace window: same session, no reopen.
    fx.clock.advance(Duration::from_secs(2));
    fx.coordinator.receive(add(&b, &kb, "hash-x"));
    assert_eq!(fx.engine.opens(), 1);

    // Long after the original grace would have fired, B keeps it alive.
    fx.clock.advance(Duration::from_secs(60));
    fx.coordinator.receive(heartbeat(&b));
    fx.coordinator.tick();
    assert!(fx.engine.closed().is_empty());
}

#[test]
fn zero_grace_destroys_on_last_unbind() {
    let mut fx = fixture(CoordinatorConfig {
        drain_grace: Duration::ZERO,
        ..config()
    });
    let (a, ka) = (client("a"), key("ka"));

    fx.coordinator.receive(add(&a, &ka, "hash-x"));
    fx.coordinator.receive(destroy(&a, false));

    assert_eq!(fx.engine.closed(), vec![InfoHash::from("hash-x")]);
}

#[test]
fn disabled_tick_means_immediate_teardown() {
    // With no sweeper nothing would ever advance the grace timer, so
    // teardown happens at unbind time.
    let mut fx = fixture(CoordinatorConfig {
        update_interval: Duration::ZERO,
        ..config()
    });
    let (a, ka) = (client("a"), key("ka"));

    fx.coordinator.receive(add(&a, &ka, "hash-x"));
    fx.coordinator.receive(destroy(&a, false));

    assert_eq!(fx.engine.closed(), vec![InfoHash::from("hash-x")]);
}

#[test]
fn zero_heartbeat_timeout_disables_expiry() {
    let mut fx = fixture(CoordinatorConfig {
        heartbeat_timeout: Duration::ZERO,
        ..config()
    });
    let (a, ka) = (client("a"), key("ka"));

    fx.coordinator.receive(add(&a, &ka, "hash-x"));
    fx.transport.take();

    fx.clock.advance(Duration::from_secs(3600));
    fx.coordinator.tick();

    assert!(fx.coordinator.clients().contains(&a));
    assert!(fx.engine.closed().is_empty());
    // A still gets its periodic update.
    assert_eq!(tags(&fx.transport.take()), vec!["update"]);
}

#[test]
fn pending_endpoint_defers_teardown() {
    let mut fx = fixture(config());
    let (a, ka) = (client("a"), key("ka"));
    let hash = InfoHash::from("hash-x");

    fx.coordinator.receive(add(&a, &ka, "hash-x"));
    fx.coordinator.receive(create_server(&a, &ka));
    fx.coordinator.receive(destroy(&a, true));

    // Even an immediate destroy waits for the in-flight creation.
    assert!(fx.engine.closed().is_empty());
    fx.transport.take();

    // The waiter still gets its answer, then the drain can complete.
    fx.coordinator.endpoint_ready(
        &hash,
        Ok(relay_core::messages::EndpointInfo {
            url: "http://127.0.0.1:9999/hash-x".to_string(),
            address: "127.0.0.1:9999".to_string(),
        }),
    );
    assert_eq!(tags(&fx.transport.take()), vec!["server-ready"]);
    assert!(fx.engine.closed().is_empty(), "grace window still open");

    fx.clock.advance(Duration::from_secs(6));
    fx.coordinator.tick();
    assert_eq!(fx.engine.closed(), vec![hash]);
}

#[test]
fn engine_instance_outlives_all_but_the_last_session() {
    let mut fx = fixture(config());
    let (a, ka) = (client("a"), key("ka"));
    let (b, kb) = (client("b"), key("kb"));

    fx.coordinator.receive(add(&a, &ka, "hash-x"));
    fx.coordinator.receive(add(&b, &kb, "hash-y"));

    fx.coordinator.receive(destroy(&a, true));
    assert_eq!(fx.engine.closed(), vec![InfoHash::from("hash-x")]);
    assert_eq!(fx.engine.shutdowns(), 0, "hash-y is still live");

    fx.coordinator.receive(destroy(&b, true));
    assert_eq!(fx.engine.shutdowns(), 1);
}

#[test]
fn tick_broadcasts_fresh_progress() {
    let mut fx = fixture(config());
    let (a, ka) = (client("a"), key("ka"));
    let hash = InfoHash::from("hash-x");

    fx.coordinator.receive(add(&a, &ka, "hash-x"));
    fx.transport.take();

    fx.engine.set_progress(&hash, 0.5);
    fx.coordinator.tick();

    let sent = fx.transport.take();
    assert_eq!(tags(&sent), vec!["update"]);
    match &sent[0].notification {
        Notification::Update { progress } => assert_eq!(progress.progress, 0.5),
        other => panic!("expected update, got {other:?}"),
    }
}
