//! All-or-nothing execution of call units.

mod common;

use heistbench::chain::{Account, Address, Amount, Payload, World};
use heistbench::error::{CallError, ExecutionError, TargetError};
use heistbench::exec::{BatchExecutor, Call, CallUnit, ExecutorCall, run_unit};
use heistbench::targets::TokenCall;
use heistbench::targets::TokenLedger;
use heistbench::targets::token::balance_of;
use proptest::prelude::*;

const FUNDS: Amount = 1_000;

struct Bench {
    world: World,
    owner: Address,
    token: Address,
    executor: Address,
    recipients: Vec<Address>,
}

fn bench(recipients: usize) -> Bench {
    let mut world = World::new(common::START);
    let owner = world.create_external("owner");
    let executor = world.deploy(
        Address::derive("executor"),
        Account::Executor(BatchExecutor::new(owner)),
    );
    let token = world.deploy(
        Address::derive("token"),
        Account::Token(TokenLedger::new("DVT", executor, FUNDS)),
    );
    let recipients = (0..recipients)
        .map(|i| world.create_external(&format!("recipient-{i}")))
        .collect();
    Bench {
        world,
        owner,
        token,
        executor,
        recipients,
    }
}

fn transfer(to: Address, amount: Amount) -> Payload {
    Payload::encode(&TokenCall::Transfer { to, amount })
}

/// Queues one transfer per recipient; the one at `failing` overdraws.
fn queue_transfers(b: &mut Bench, failing: Option<usize>) {
    let (owner, executor, token) = (b.owner, b.executor, b.token);
    for (i, to) in b.recipients.clone().into_iter().enumerate() {
        let amount = if Some(i) == failing { FUNDS + 1 } else { 1 };
        let add = ExecutorCall::AddCall {
            target: token,
            value: 0,
            payload: transfer(to, amount),
        };
        b.world
            .transact(owner, executor, 0, &Payload::encode(&add))
            .unwrap();
    }
}

fn run(b: &mut Bench) -> Result<Payload, CallError> {
    let (owner, executor) = (b.owner, b.executor);
    b.world
        .transact(owner, executor, 0, &Payload::encode(&ExecutorCall::Run))
}

#[test]
fn successful_unit_applies_every_call() {
    let mut b = bench(3);
    queue_transfers(&mut b, None);
    run(&mut b).unwrap();

    for to in &b.recipients {
        assert_eq!(balance_of(&b.world, b.token, *to).unwrap(), 1);
    }
    assert_eq!(balance_of(&b.world, b.token, b.executor).unwrap(), FUNDS - 3);
    assert!(b.world.executor(b.executor).unwrap().is_sealed());
}

#[test]
fn failing_last_call_reverts_earlier_transfers() {
    let mut b = bench(3);
    queue_transfers(&mut b, Some(2));
    let logs_before = b.world.logs().len();

    let err = run(&mut b).unwrap_err();
    let CallError::Execution(ExecutionError::SubCallFailed { index, source }) = &err else {
        panic!("expected SubCallFailed, got {err:?}");
    };
    assert_eq!(*index, 2);
    assert!(matches!(
        **source,
        CallError::Target(TargetError::InsufficientBalance { .. })
    ));

    for to in &b.recipients {
        assert_eq!(balance_of(&b.world, b.token, *to).unwrap(), 0);
    }
    assert_eq!(balance_of(&b.world, b.token, b.executor).unwrap(), FUNDS);
    assert_eq!(b.world.logs().len(), logs_before);
}

#[test]
fn reverted_run_leaves_executor_unsealed() {
    let mut b = bench(2);
    queue_transfers(&mut b, Some(0));
    run(&mut b).unwrap_err();

    let executor = b.world.executor(b.executor).unwrap();
    assert!(!executor.is_sealed());
    assert_eq!(executor.pending().len(), 2);
}

#[test]
fn sealed_executor_rejects_changes_and_reruns() {
    let mut b = bench(1);
    queue_transfers(&mut b, None);
    run(&mut b).unwrap();

    let err = run(&mut b).unwrap_err();
    assert_eq!(
        err,
        CallError::Execution(ExecutionError::UnitAlreadySealed {
            executor: b.executor
        })
    );

    let (owner, executor, token) = (b.owner, b.executor, b.token);
    let add = ExecutorCall::AddCall {
        target: token,
        value: 0,
        payload: transfer(owner, 1),
    };
    let err = b
        .world
        .transact(owner, executor, 0, &Payload::encode(&add))
        .unwrap_err();
    assert!(matches!(
        err,
        CallError::Execution(ExecutionError::UnitAlreadySealed { .. })
    ));
}

#[test]
fn empty_run_is_rejected() {
    let mut b = bench(0);
    let err = run(&mut b).unwrap_err();
    assert_eq!(err, CallError::Execution(ExecutionError::EmptyUnit));
}

#[test]
fn run_unit_returns_results_in_order() {
    let mut b = bench(2);
    let (executor, token) = (b.executor, b.token);
    let unit = CallUnit::new(vec![
        Call::new(token, transfer(b.recipients[0], 5)),
        Call::new(
            token,
            Payload::encode(&TokenCall::BalanceOf {
                holder: b.recipients[0],
            }),
        ),
    ])
    .unwrap();

    let results = run_unit(&mut b.world, executor, &unit).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].decode::<bool>().unwrap());
    assert_eq!(results[1].decode::<Amount>().unwrap(), 5);
}

#[test]
fn native_value_is_reverted_with_the_unit() {
    let mut b = bench(1);
    let (owner, executor, token) = (b.owner, b.executor, b.token);
    let sink = b.recipients[0];
    b.world.set_native_balance(executor, 10);

    let unit = CallUnit::new(vec![
        Call::with_value(sink, 4, Payload::empty()),
        Call::new(token, transfer(owner, FUNDS + 1)),
    ])
    .unwrap();
    run_unit(&mut b.world, executor, &unit).unwrap_err();

    assert_eq!(b.world.native_balance(executor), 10);
    assert_eq!(b.world.native_balance(sink), 0);
}

proptest! {
    #[test]
    fn any_failing_index_restores_all_balances(len in 1usize..8, seed in any::<usize>()) {
        let failing = seed % len;
        let mut b = bench(len);
        queue_transfers(&mut b, Some(failing));

        let err = run(&mut b).unwrap_err();
        let is_expected_index = matches!(
            err,
            CallError::Execution(ExecutionError::SubCallFailed { index, .. }) if index == failing
        );
        prop_assert!(is_expected_index, "unexpected error: {err:?}");

        for to in &b.recipients {
            prop_assert_eq!(balance_of(&b.world, b.token, *to).unwrap(), 0);
        }
        prop_assert_eq!(balance_of(&b.world, b.token, b.executor).unwrap(), FUNDS);
    }
}
