//! Delay queue: propose, wait, execute.
//!
//! An operation is a call unit plus a salt, identified by their content
//! hash. Proposers schedule it, the delay elapses, then anyone may execute
//! it once. The delay parameter and the role set can only change through
//! the queue itself (or an admin, for roles), which in practice means
//! through a unit the queue is executing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chain::{Address, CallContext, LogEvent, OperationId, Payload, Timestamp, World};
use crate::error::{CallError, ExecutionError, Requirement};
use crate::exec::{Call, CallUnit, run_unit};
use crate::governance::roles::{Role, RoleSet};
use crate::observability::metrics;

/// Largest accepted delay, in seconds (14 days).
pub const MAX_DELAY: u64 = 14 * 24 * 60 * 60;

/// When `execute` compares the operation against the delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessCheck {
    /// Once, before the first call of the unit runs.
    #[default]
    BeforeUnit,
    /// Once, after the whole unit ran, against the parameters it left
    /// behind.
    AfterUnit,
}

impl fmt::Display for ReadinessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeforeUnit => "before-unit",
            Self::AfterUnit => "after-unit",
        })
    }
}

/// Lifecycle state of an operation identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Unseen,
    Scheduled,
    Ready,
    Executed,
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unseen => "unseen",
            Self::Scheduled => "scheduled",
            Self::Ready => "ready",
            Self::Executed => "executed",
        })
    }
}

/// Stored facts about a scheduled operation. Everything else is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationRecord {
    pub scheduled_at: Timestamp,
    pub executed: bool,
}

/// Functions exposed by a [`DelayQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueueCall {
    /// Proposer only.
    Schedule { calls: Vec<Call>, salt: u64 },
    /// Anyone, once the operation is ready.
    Execute { calls: Vec<Call>, salt: u64 },
    /// The queue itself only.
    UpdateDelay { delay: u64 },
    /// The queue itself or a holder of the role's admin role.
    GrantRole { role: Role, account: Address },
    /// The queue itself or a holder of the role's admin role.
    RevokeRole { role: Role, account: Address },
    HasRole { role: Role, account: Address },
    GetDelay,
    GetOperationState { id: OperationId },
    GetOperationId { calls: Vec<Call>, salt: u64 },
}

/// Timelocked governance state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayQueue {
    roles: RoleSet,
    delay: u64,
    operations: BTreeMap<OperationId, OperationRecord>,
    readiness: ReadinessCheck,
}

impl DelayQueue {
    /// Creates the queue that will live at `this`.
    ///
    /// `this` and `admin` receive the admin role, `proposer` the proposer
    /// role.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::DelayAboveMax`] if `delay` is too large.
    pub fn new(
        this: Address,
        admin: Address,
        proposer: Address,
        delay: u64,
        readiness: ReadinessCheck,
    ) -> Result<Self, ExecutionError> {
        check_delay(delay)?;
        let mut roles = RoleSet::new();
        roles.grant(Role::Admin, this);
        roles.grant(Role::Admin, admin);
        roles.grant(Role::Proposer, proposer);
        Ok(Self {
            roles,
            delay,
            operations: BTreeMap::new(),
            readiness,
        })
    }

    #[must_use]
    pub const fn delay(&self) -> u64 {
        self.delay
    }

    #[must_use]
    pub const fn readiness(&self) -> ReadinessCheck {
        self.readiness
    }

    #[must_use]
    pub const fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// State of `id` at time `now`, against the current delay.
    #[must_use]
    pub fn state_of(&self, id: OperationId, now: Timestamp) -> OperationState {
        match self.operations.get(&id) {
            None => OperationState::Unseen,
            Some(record) if record.executed => OperationState::Executed,
            Some(record) if now.saturating_sub(record.scheduled_at) >= self.delay => {
                OperationState::Ready
            }
            Some(_) => OperationState::Scheduled,
        }
    }

    fn authorize_role_admin(&self, ctx: &CallContext, role: Role) -> Result<(), ExecutionError> {
        let admin = role.admin_role();
        if ctx.caller == ctx.this || self.roles.has(admin, ctx.caller) {
            Ok(())
        } else {
            Err(ExecutionError::CapabilityDenied {
                caller: ctx.caller,
                required: Requirement::Role(admin),
            })
        }
    }

    fn mark_executed(world: &mut World, this: Address, id: OperationId) -> Result<(), CallError> {
        if let Some(record) = world.queue_mut(this)?.operations.get_mut(&id) {
            record.executed = true;
        }
        world.emit(this, LogEvent::OperationExecuted { id });
        metrics::record_operation("executed");
        info!(%id, "operation executed");
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    pub(crate) fn handle(
        world: &mut World,
        ctx: &CallContext,
        payload: &Payload,
    ) -> Result<Payload, CallError> {
        let now = world.now();
        match payload.decode::<QueueCall>()? {
            QueueCall::Schedule { calls, salt } => {
                let queue = world.queue_mut(ctx.this)?;
                if !queue.roles.has(Role::Proposer, ctx.caller) {
                    return Err(ExecutionError::CapabilityDenied {
                        caller: ctx.caller,
                        required: Requirement::Role(Role::Proposer),
                    }
                    .into());
                }
                let unit = CallUnit::new(calls)?;
                let id = unit.operation_id(salt);
                if queue.operations.contains_key(&id) {
                    return Err(ExecutionError::OperationAlreadyKnown { id }.into());
                }
                queue.operations.insert(
                    id,
                    OperationRecord {
                        scheduled_at: now,
                        executed: false,
                    },
                );
                world.emit(
                    ctx.this,
                    LogEvent::OperationScheduled {
                        id,
                        calls: unit.len(),
                        scheduled_at: now,
                    },
                );
                metrics::record_operation("scheduled");
                info!(%id, proposer = %ctx.caller, calls = unit.len(), "operation scheduled");
                Ok(Payload::encode(&id))
            }
            QueueCall::Execute { calls, salt } => {
                let unit = CallUnit::new(calls)?;
                let id = unit.operation_id(salt);
                let queue = world.queue(ctx.this)?;
                let readiness = queue.readiness;
                let state = queue.state_of(id, now);
                if state == OperationState::Executed {
                    return Err(ExecutionError::AlreadyExecuted { id }.into());
                }

                let results = match readiness {
                    ReadinessCheck::BeforeUnit => {
                        if state != OperationState::Ready {
                            return Err(ExecutionError::NotReady { id, state }.into());
                        }
                        Self::mark_executed(world, ctx.this, id)?;
                        run_unit(world, ctx.this, &unit)?
                    }
                    ReadinessCheck::AfterUnit => {
                        let results = run_unit(world, ctx.this, &unit)?;
                        match world.queue(ctx.this)?.state_of(id, world.now()) {
                            OperationState::Ready => Self::mark_executed(world, ctx.this, id)?,
                            state => return Err(ExecutionError::NotReady { id, state }.into()),
                        }
                        results
                    }
                };
                Ok(Payload::encode(&results))
            }
            QueueCall::UpdateDelay { delay } => {
                if ctx.caller != ctx.this {
                    return Err(ExecutionError::CapabilityDenied {
                        caller: ctx.caller,
                        required: Requirement::SelfCall,
                    }
                    .into());
                }
                check_delay(delay)?;
                let queue = world.queue_mut(ctx.this)?;
                let old_delay = std::mem::replace(&mut queue.delay, delay);
                world.emit(
                    ctx.this,
                    LogEvent::DelayUpdated {
                        old_delay,
                        new_delay: delay,
                    },
                );
                info!(old_delay, new_delay = delay, "delay updated");
                Ok(Payload::empty())
            }
            QueueCall::GrantRole { role, account } => {
                let queue = world.queue_mut(ctx.this)?;
                queue.authorize_role_admin(ctx, role)?;
                if queue.roles.grant(role, account) {
                    world.emit(
                        ctx.this,
                        LogEvent::RoleGranted {
                            role,
                            account,
                            sender: ctx.caller,
                        },
                    );
                    info!(%role, %account, sender = %ctx.caller, "role granted");
                }
                Ok(Payload::empty())
            }
            QueueCall::RevokeRole { role, account } => {
                let queue = world.queue_mut(ctx.this)?;
                queue.authorize_role_admin(ctx, role)?;
                if queue.roles.revoke(role, account) {
                    world.emit(
                        ctx.this,
                        LogEvent::RoleRevoked {
                            role,
                            account,
                            sender: ctx.caller,
                        },
                    );
                }
                Ok(Payload::empty())
            }
            QueueCall::HasRole { role, account } => Ok(Payload::encode(
                &world.queue(ctx.this)?.roles.has(role, account),
            )),
            QueueCall::GetDelay => Ok(Payload::encode(&world.queue(ctx.this)?.delay)),
            QueueCall::GetOperationState { id } => Ok(Payload::encode(
                &world.queue(ctx.this)?.state_of(id, now),
            )),
            QueueCall::GetOperationId { calls, salt } => {
                Ok(Payload::encode(&CallUnit::new(calls)?.operation_id(salt)))
            }
        }
    }
}

const fn check_delay(delay: u64) -> Result<(), ExecutionError> {
    if delay > MAX_DELAY {
        return Err(ExecutionError::DelayAboveMax {
            requested: delay,
            max: MAX_DELAY,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Account;

    const DELAY: u64 = 3600;

    struct Fixture {
        world: World,
        queue: Address,
        admin: Address,
        proposer: Address,
        stranger: Address,
    }

    fn setup(readiness: ReadinessCheck) -> Fixture {
        let mut world = World::new(1_000_000);
        let admin = world.create_external("admin");
        let proposer = world.create_external("proposer");
        let stranger = world.create_external("stranger");
        let queue = Address::derive("queue");
        world.deploy(
            queue,
            Account::Queue(DelayQueue::new(queue, admin, proposer, DELAY, readiness).unwrap()),
        );
        Fixture {
            world,
            queue,
            admin,
            proposer,
            stranger,
        }
    }

    fn grant_unit(queue: Address, account: Address) -> Vec<Call> {
        vec![Call::new(
            queue,
            Payload::encode(&QueueCall::GrantRole {
                role: Role::Proposer,
                account,
            }),
        )]
    }

    fn send(f: &mut Fixture, from: Address, call: &QueueCall) -> Result<Payload, CallError> {
        f.world.transact(from, f.queue, 0, &Payload::encode(call))
    }

    fn state(f: &Fixture, calls: Vec<Call>, salt: u64) -> OperationState {
        let id = CallUnit::new(calls).unwrap().operation_id(salt);
        f.world.queue(f.queue).unwrap().state_of(id, f.world.now())
    }

    #[test]
    fn bootstrap_roles() {
        let f = setup(ReadinessCheck::BeforeUnit);
        let roles = f.world.queue(f.queue).unwrap().roles();
        assert!(roles.has(Role::Admin, f.queue));
        assert!(roles.has(Role::Admin, f.admin));
        assert!(roles.has(Role::Proposer, f.proposer));
        assert!(!roles.has(Role::Proposer, f.admin));
    }

    #[test]
    fn new_rejects_excessive_delay() {
        let a = Address::derive("a");
        let err = DelayQueue::new(a, a, a, MAX_DELAY + 1, ReadinessCheck::default()).unwrap_err();
        assert_eq!(
            err,
            ExecutionError::DelayAboveMax {
                requested: MAX_DELAY + 1,
                max: MAX_DELAY
            }
        );
    }

    #[test]
    fn lifecycle_scheduled_ready_executed() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let calls = grant_unit(f.queue, f.stranger);
        assert_eq!(state(&f, calls.clone(), 7), OperationState::Unseen);

        let proposer = f.proposer;
        send(&mut f, proposer, &QueueCall::Schedule { calls: calls.clone(), salt: 7 }).unwrap();
        assert_eq!(state(&f, calls.clone(), 7), OperationState::Scheduled);

        f.world.advance_time(DELAY - 1);
        assert_eq!(state(&f, calls.clone(), 7), OperationState::Scheduled);
        f.world.advance_time(1);
        assert_eq!(state(&f, calls.clone(), 7), OperationState::Ready);

        let stranger = f.stranger;
        send(&mut f, stranger, &QueueCall::Execute { calls: calls.clone(), salt: 7 }).unwrap();
        assert_eq!(state(&f, calls, 7), OperationState::Executed);
        assert!(f.world.queue(f.queue).unwrap().roles().has(Role::Proposer, stranger));
    }

    #[test]
    fn schedule_requires_proposer() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let calls = grant_unit(f.queue, f.stranger);
        let stranger = f.stranger;
        let err = send(&mut f, stranger, &QueueCall::Schedule { calls, salt: 0 }).unwrap_err();
        assert_eq!(
            err,
            CallError::Execution(ExecutionError::CapabilityDenied {
                caller: stranger,
                required: Requirement::Role(Role::Proposer),
            })
        );
    }

    #[test]
    fn schedule_rejects_known_identity() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let calls = grant_unit(f.queue, f.stranger);
        let proposer = f.proposer;
        send(&mut f, proposer, &QueueCall::Schedule { calls: calls.clone(), salt: 0 }).unwrap();
        let err = send(&mut f, proposer, &QueueCall::Schedule { calls: calls.clone(), salt: 0 })
            .unwrap_err();
        assert!(matches!(
            err,
            CallError::Execution(ExecutionError::OperationAlreadyKnown { .. })
        ));
        send(&mut f, proposer, &QueueCall::Schedule { calls, salt: 1 }).unwrap();
    }

    #[test]
    fn schedule_rejects_empty_unit() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let proposer = f.proposer;
        let err = send(&mut f, proposer, &QueueCall::Schedule { calls: vec![], salt: 0 })
            .unwrap_err();
        assert_eq!(err, CallError::Execution(ExecutionError::EmptyUnit));
    }

    #[test]
    fn execute_before_delay_is_not_ready() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let calls = grant_unit(f.queue, f.stranger);
        let proposer = f.proposer;
        send(&mut f, proposer, &QueueCall::Schedule { calls: calls.clone(), salt: 0 }).unwrap();
        let err = send(&mut f, proposer, &QueueCall::Execute { calls, salt: 0 }).unwrap_err();
        assert!(matches!(
            err,
            CallError::Execution(ExecutionError::NotReady {
                state: OperationState::Scheduled,
                ..
            })
        ));
    }

    #[test]
    fn execute_unseen_is_not_ready() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let calls = grant_unit(f.queue, f.stranger);
        let stranger = f.stranger;
        let err = send(&mut f, stranger, &QueueCall::Execute { calls, salt: 0 }).unwrap_err();
        assert!(matches!(
            err,
            CallError::Execution(ExecutionError::NotReady {
                state: OperationState::Unseen,
                ..
            })
        ));
        assert!(!f.world.queue(f.queue).unwrap().roles().has(Role::Proposer, stranger));
    }

    #[test]
    fn after_unit_still_rejects_unscheduled_operations() {
        let mut f = setup(ReadinessCheck::AfterUnit);
        let calls = grant_unit(f.queue, f.stranger);
        let stranger = f.stranger;
        let logs_before = f.world.logs().len();
        let err = send(&mut f, stranger, &QueueCall::Execute { calls, salt: 0 }).unwrap_err();
        assert!(matches!(
            err,
            CallError::Execution(ExecutionError::NotReady {
                state: OperationState::Unseen,
                ..
            })
        ));
        assert!(!f.world.queue(f.queue).unwrap().roles().has(Role::Proposer, stranger));
        assert_eq!(f.world.logs().len(), logs_before);
    }

    #[test]
    fn update_delay_requires_self_call() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let admin = f.admin;
        let err = send(&mut f, admin, &QueueCall::UpdateDelay { delay: 0 }).unwrap_err();
        assert_eq!(
            err,
            CallError::Execution(ExecutionError::CapabilityDenied {
                caller: admin,
                required: Requirement::SelfCall,
            })
        );
        assert_eq!(f.world.queue(f.queue).unwrap().delay(), DELAY);
    }

    #[test]
    fn update_delay_through_queue_respects_max() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let queue = f.queue;
        let err = f
            .world
            .call(queue, queue, 0, &Payload::encode(&QueueCall::UpdateDelay { delay: MAX_DELAY + 1 }))
            .unwrap_err();
        assert!(matches!(
            err,
            CallError::Execution(ExecutionError::DelayAboveMax { .. })
        ));
        f.world
            .call(queue, queue, 0, &Payload::encode(&QueueCall::UpdateDelay { delay: 60 }))
            .unwrap();
        assert_eq!(f.world.queue(queue).unwrap().delay(), 60);
    }

    #[test]
    fn admin_may_grant_and_revoke() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let (admin, stranger) = (f.admin, f.stranger);
        send(&mut f, admin, &QueueCall::GrantRole { role: Role::Proposer, account: stranger })
            .unwrap();
        assert!(f.world.queue(f.queue).unwrap().roles().has(Role::Proposer, stranger));
        send(&mut f, admin, &QueueCall::RevokeRole { role: Role::Proposer, account: stranger })
            .unwrap();
        assert!(!f.world.queue(f.queue).unwrap().roles().has(Role::Proposer, stranger));
    }

    #[test]
    fn proposer_may_not_grant() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let (proposer, stranger) = (f.proposer, f.stranger);
        let err = send(
            &mut f,
            proposer,
            &QueueCall::GrantRole { role: Role::Proposer, account: stranger },
        )
        .unwrap_err();
        assert_eq!(
            err,
            CallError::Execution(ExecutionError::CapabilityDenied {
                caller: proposer,
                required: Requirement::Role(Role::Admin),
            })
        );
    }

    #[test]
    fn views_report_state() {
        let mut f = setup(ReadinessCheck::BeforeUnit);
        let (proposer, stranger) = (f.proposer, f.stranger);
        let delay: u64 = send(&mut f, stranger, &QueueCall::GetDelay)
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(delay, DELAY);

        let has: bool = send(&mut f, stranger, &QueueCall::HasRole { role: Role::Proposer, account: proposer })
            .unwrap()
            .decode()
            .unwrap();
        assert!(has);

        let calls = grant_unit(f.queue, stranger);
        let id: OperationId = send(&mut f, stranger, &QueueCall::GetOperationId { calls: calls.clone(), salt: 3 })
            .unwrap()
            .decode()
            .unwrap();
        let scheduled: OperationId = send(&mut f, proposer, &QueueCall::Schedule { calls, salt: 3 })
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(id, scheduled);

        let state: OperationState = send(&mut f, stranger, &QueueCall::GetOperationState { id })
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(state, OperationState::Scheduled);
    }
}
