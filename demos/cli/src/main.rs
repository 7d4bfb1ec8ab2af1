use std::cell::{Cell, RefCell};
use std::thread;

use clap::Parser;
use killstreaks_core::{
    BridgeProbe, GlueError, Handshake, HostBridge, RetryPolicy, TickOutcome,
};

#[derive(Parser, Debug)]
#[command(
    name = "killstreaks-cli",
    about = "Drive the pycmd handshake against a scripted bridge."
)]
struct Args {
    /// Probe check (1-based) on which the fake bridge appears; omit for a
    /// host that never comes up.
    #[arg(short, long)]
    ready_on_check: Option<u32>,

    /// Scheduled re-checks before giving up.
    #[arg(long, default_value_t = 10)]
    max_retries: u32,

    /// Delay between re-checks in milliseconds.
    #[arg(long, default_value_t = 100)]
    poll_interval_ms: u64,
}

struct ScriptedBridge {
    ready_on_check: Option<u32>,
    checks: Cell<u32>,
    sent: RefCell<Vec<String>>,
}

impl BridgeProbe for ScriptedBridge {
    fn bridge_ready(&self) -> bool {
        let check = self.checks.get() + 1;
        self.checks.set(check);
        self.ready_on_check.is_some_and(|ready| check >= ready)
    }
}

impl HostBridge for ScriptedBridge {
    fn send(&self, command: &str) -> Result<(), GlueError> {
        self.sent.borrow_mut().push(command.to_string());
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let policy = RetryPolicy {
        max_retries: args.max_retries,
        poll_interval_ms: args.poll_interval_ms,
    };
    let bridge = ScriptedBridge {
        ready_on_check: args.ready_on_check,
        checks: Cell::new(0),
        sent: RefCell::new(Vec::new()),
    };
    let mut handshake = Handshake::new(policy);

    loop {
        match handshake.tick(&bridge, &bridge)? {
            TickOutcome::SignalSent => {
                println!(
                    "check {}: bridge found, sent {:?}",
                    bridge.checks.get(),
                    bridge.sent.borrow().as_slice()
                );
                break;
            }
            TickOutcome::RetryAfter(delay) => {
                println!(
                    "check {}: bridge missing, retrying in {delay:?}",
                    bridge.checks.get()
                );
                thread::sleep(delay);
            }
            TickOutcome::GaveUp => {
                println!("check {}: giving up, no signal sent", bridge.checks.get());
                break;
            }
            TickOutcome::AlreadyDone => break,
        }
    }

    println!("final state: {:?}", handshake.state());
    Ok(())
}
