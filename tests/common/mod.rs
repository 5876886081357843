//! Shared integration-test helpers: fixture paths, running the
//! `heistbench` binary, and a freshly deployed delay queue.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

use heistbench::chain::{Account, Address, Payload, World};
use heistbench::error::CallError;
use heistbench::governance::{DelayQueue, QueueCall, ReadinessCheck};

/// Chain clock at which test worlds start.
pub const START: u64 = 1_700_000_000;

/// Returns the absolute path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Runs the binary to completion with `args` and captures its output.
#[allow(clippy::missing_panics_doc)]
pub fn run_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_heistbench"))
        .args(args)
        .env_remove("HEISTBENCH_LOG_LEVEL")
        .env_remove("HEISTBENCH_CONFIG")
        .output()
        .expect("failed to run heistbench")
}

/// Stdout of a finished command, lossily decoded.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of a finished command, lossily decoded.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A world with a delay queue and its three principals.
pub struct QueueFixture {
    pub world: World,
    pub queue: Address,
    pub admin: Address,
    pub proposer: Address,
    pub outsider: Address,
}

impl QueueFixture {
    pub fn new(delay: u64, readiness: ReadinessCheck) -> Self {
        let mut world = World::new(START);
        let admin = world.create_external("admin");
        let proposer = world.create_external("proposer");
        let outsider = world.create_external("outsider");
        let queue = Address::derive("queue");
        world.deploy(
            queue,
            Account::Queue(DelayQueue::new(queue, admin, proposer, delay, readiness).unwrap()),
        );
        Self {
            world,
            queue,
            admin,
            proposer,
            outsider,
        }
    }

    /// Sends `call` to the queue as a top-level transaction from `from`.
    pub fn send(&mut self, from: Address, call: &QueueCall) -> Result<Payload, CallError> {
        let queue = self.queue;
        self.world.transact(from, queue, 0, &Payload::encode(call))
    }

    pub fn queue(&self) -> &DelayQueue {
        self.world.queue(self.queue).unwrap()
    }
}
