//! Core logic for the killstreaks browser glue: the medal filter predicate
//! and the host-bridge handshake state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Option value of the game dropdown meaning "show every game".
pub const ALL_GAMES_SENTINEL: &str = "_all";

/// Readiness signal sent to the host once the bridge is confirmed available.
pub const CHASE_MODE_LOADED: &str = "chaseModeLoaded";

/// Parsed state of the game selection control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameSelection {
    /// The `"_all"` sentinel option.
    All,
    /// A single game identifier.
    Game(String),
}

impl GameSelection {
    /// Interpret the raw option value of the selection control.
    pub fn parse(raw: &str) -> Self {
        if raw == ALL_GAMES_SENTINEL {
            Self::All
        } else {
            Self::Game(raw.to_string())
        }
    }

    /// Whether a medal panel tagged with `game_id` should be marked current.
    pub fn shows(&self, game_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Game(selected) => selected == game_id,
        }
    }
}

/// Retry schedule for the bridge poll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Scheduled re-checks allowed after the initial one before giving up.
    pub max_retries: u32,
    /// Delay between re-checks, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            poll_interval_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Delay between re-checks as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Answers whether the host bridge is defined right now.
pub trait BridgeProbe {
    fn bridge_ready(&self) -> bool;
}

/// Host-provided callable carrying messages from the web content to the
/// native application.
pub trait HostBridge {
    fn send(&self, command: &str) -> Result<(), GlueError>;
}

/// Progress of the one-time readiness handshake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HandshakeState {
    /// Still polling; counts the re-checks already scheduled.
    Waiting { retries_used: u32 },
    /// Bridge found and the readiness signal sent.
    Ready,
    /// Retry budget exhausted without finding the bridge.
    TimedOut,
}

/// What the driver must do after a poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Bridge detected; the readiness signal went out on this tick.
    SignalSent,
    /// Bridge still missing; check again after the given delay.
    RetryAfter(Duration),
    /// Retry budget exhausted; polling stops for good.
    GaveUp,
    /// The handshake already finished; nothing to do.
    AlreadyDone,
}

/// One-shot handshake with the host bridge.
///
/// The machine owns its retry counter; drivers move the whole value from one
/// scheduled tick to the next instead of sharing ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    state: HandshakeState,
    policy: RetryPolicy,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl Handshake {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: HandshakeState::Waiting { retries_used: 0 },
            policy,
        }
    }

    /// Current state, for reporting.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Run one poll step: probe the bridge and either send the readiness
    /// signal, ask for another check after the policy delay, or give up.
    ///
    /// The signal is sent at most once; `Ready` and `TimedOut` absorb every
    /// later tick.
    pub fn tick<P, B>(&mut self, probe: &P, bridge: &B) -> Result<TickOutcome, GlueError>
    where
        P: BridgeProbe + ?Sized,
        B: HostBridge + ?Sized,
    {
        let HandshakeState::Waiting { retries_used } = self.state else {
            return Ok(TickOutcome::AlreadyDone);
        };

        if probe.bridge_ready() {
            // Ready is entered before the call; a failed send still used up
            // the single signal attempt.
            self.state = HandshakeState::Ready;
            bridge.send(CHASE_MODE_LOADED)?;
            return Ok(TickOutcome::SignalSent);
        }

        if retries_used < self.policy.max_retries {
            self.state = HandshakeState::Waiting {
                retries_used: retries_used + 1,
            };
            Ok(TickOutcome::RetryAfter(self.policy.interval()))
        } else {
            self.state = HandshakeState::TimedOut;
            Ok(TickOutcome::GaveUp)
        }
    }
}

/// Errors crossing the host boundary.
#[derive(Debug, thiserror::Error)]
pub enum GlueError {
    #[error("host bridge rejected {command:?}: {reason}")]
    BridgeCall { command: String, reason: String },
}
