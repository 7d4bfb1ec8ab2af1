use std::cell::{Cell, RefCell};
use std::time::Duration;

use killstreaks_core::{
    BridgeProbe, GlueError, Handshake, HandshakeState, HostBridge, RetryPolicy, TickOutcome,
    CHASE_MODE_LOADED,
};

#[derive(Default)]
struct RecordingBridge {
    sent: RefCell<Vec<String>>,
    fail: bool,
}

impl HostBridge for RecordingBridge {
    fn send(&self, command: &str) -> Result<(), GlueError> {
        if self.fail {
            return Err(GlueError::BridgeCall {
                command: command.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        self.sent.borrow_mut().push(command.to_string());
        Ok(())
    }
}

/// Probe that reports ready from the given check onwards (1-based).
struct ReadyOnCheck {
    ready_on: u32,
    checks: Cell<u32>,
}

impl ReadyOnCheck {
    fn new(ready_on: u32) -> Self {
        Self {
            ready_on,
            checks: Cell::new(0),
        }
    }
}

impl BridgeProbe for ReadyOnCheck {
    fn bridge_ready(&self) -> bool {
        let check = self.checks.get() + 1;
        self.checks.set(check);
        check >= self.ready_on
    }
}

struct NeverReady;

impl BridgeProbe for NeverReady {
    fn bridge_ready(&self) -> bool {
        false
    }
}

#[test]
fn immediate_bridge_sends_exactly_one_signal() {
    let probe = ReadyOnCheck::new(1);
    let bridge = RecordingBridge::default();
    let mut handshake = Handshake::default();

    let outcome = handshake.tick(&probe, &bridge).expect("first tick");
    assert_eq!(outcome, TickOutcome::SignalSent);
    assert_eq!(handshake.state(), HandshakeState::Ready);
    assert_eq!(bridge.sent.borrow().as_slice(), [CHASE_MODE_LOADED]);

    let outcome = handshake.tick(&probe, &bridge).expect("tick after ready");
    assert_eq!(outcome, TickOutcome::AlreadyDone);
    assert_eq!(bridge.sent.borrow().len(), 1);
}

#[test]
fn late_bridge_still_gets_exactly_one_signal() {
    let probe = ReadyOnCheck::new(8);
    let bridge = RecordingBridge::default();
    let mut handshake = Handshake::default();

    let mut retries = 0;
    for _ in 0..32 {
        match handshake.tick(&probe, &bridge).expect("tick") {
            TickOutcome::RetryAfter(_) => retries += 1,
            TickOutcome::SignalSent => break,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(retries, 7);
    assert_eq!(handshake.state(), HandshakeState::Ready);
    assert_eq!(bridge.sent.borrow().as_slice(), [CHASE_MODE_LOADED]);

    let outcome = handshake.tick(&probe, &bridge).expect("tick after ready");
    assert_eq!(outcome, TickOutcome::AlreadyDone);
    assert_eq!(bridge.sent.borrow().len(), 1);
}

#[test]
fn missing_bridge_stops_after_ten_scheduled_retries() {
    let probe = NeverReady;
    let bridge = RecordingBridge::default();
    let mut handshake = Handshake::default();

    let mut delays = Vec::new();
    for _ in 0..32 {
        match handshake.tick(&probe, &bridge).expect("tick") {
            TickOutcome::RetryAfter(delay) => delays.push(delay),
            TickOutcome::GaveUp => break,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(delays.len(), 10);
    assert!(delays.iter().all(|delay| *delay == Duration::from_millis(100)));
    assert_eq!(handshake.state(), HandshakeState::TimedOut);
    assert!(bridge.sent.borrow().is_empty());

    let outcome = handshake.tick(&probe, &bridge).expect("tick after timeout");
    assert_eq!(outcome, TickOutcome::AlreadyDone);
    assert!(bridge.sent.borrow().is_empty());
}

#[test]
fn custom_policy_changes_budget_and_spacing() {
    let policy = RetryPolicy {
        max_retries: 3,
        poll_interval_ms: 250,
    };
    let probe = NeverReady;
    let bridge = RecordingBridge::default();
    let mut handshake = Handshake::new(policy);

    let mut delays = Vec::new();
    for _ in 0..8 {
        match handshake.tick(&probe, &bridge).expect("tick") {
            TickOutcome::RetryAfter(delay) => delays.push(delay),
            TickOutcome::GaveUp => break,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(delays, [Duration::from_millis(250); 3]);
    assert_eq!(handshake.state(), HandshakeState::TimedOut);
}

#[test]
fn zero_retry_budget_times_out_on_first_missed_check() {
    let policy = RetryPolicy {
        max_retries: 0,
        poll_interval_ms: 100,
    };
    let probe = NeverReady;
    let bridge = RecordingBridge::default();
    let mut handshake = Handshake::new(policy);

    let outcome = handshake.tick(&probe, &bridge).expect("first tick");
    assert_eq!(outcome, TickOutcome::GaveUp);
    assert_eq!(handshake.state(), HandshakeState::TimedOut);
}

#[test]
fn failed_send_does_not_retry_the_signal() {
    let probe = ReadyOnCheck::new(1);
    let bridge = RecordingBridge {
        sent: RefCell::new(Vec::new()),
        fail: true,
    };
    let mut handshake = Handshake::default();

    let err = handshake
        .tick(&probe, &bridge)
        .expect_err("send should fail");
    assert!(matches!(err, GlueError::BridgeCall { .. }));
    assert_eq!(handshake.state(), HandshakeState::Ready);

    let outcome = handshake.tick(&probe, &bridge).expect("tick after failure");
    assert_eq!(outcome, TickOutcome::AlreadyDone);
    assert!(bridge.sent.borrow().is_empty());
}
