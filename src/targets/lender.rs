//! Flash-loan pool with an arbitrary-call window.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{Address, Amount, CallContext, LogEvent, Payload, World};
use crate::error::{CallError, TargetError};
use crate::targets::token::{TokenCall, balance_of};

/// Functions exposed by a [`LenderPool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoolCall {
    /// Lends `amount` to `borrower`, then calls `target` with `data` as the
    /// pool, then checks that the pool was repaid.
    FlashLoan {
        amount: Amount,
        borrower: Address,
        target: Address,
        data: Payload,
    },
    Token,
}

/// Pool lending out its whole balance of one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LenderPool {
    token: Address,
    entered: bool,
}

impl LenderPool {
    #[must_use]
    pub const fn new(token: Address) -> Self {
        Self {
            token,
            entered: false,
        }
    }

    #[must_use]
    pub const fn token(&self) -> Address {
        self.token
    }

    pub(crate) fn handle(
        world: &mut World,
        ctx: &CallContext,
        payload: &Payload,
    ) -> Result<Payload, CallError> {
        match payload.decode::<PoolCall>()? {
            PoolCall::FlashLoan {
                amount,
                borrower,
                target,
                data,
            } => {
                let pool = world.pool_mut(ctx.this)?;
                if pool.entered {
                    return Err(TargetError::Reentrancy.into());
                }
                pool.entered = true;
                let token = pool.token;

                let expected = balance_of(world, token, ctx.this)?;
                world.call(
                    ctx.this,
                    token,
                    0,
                    &Payload::encode(&TokenCall::Transfer {
                        to: borrower,
                        amount,
                    }),
                )?;
                debug!(pool = %ctx.this, %target, "flash loan callback");
                world.call(ctx.this, target, 0, &data)?;

                let actual = balance_of(world, token, ctx.this)?;
                if actual < expected {
                    return Err(TargetError::RepayFailed { expected, actual }.into());
                }
                world.pool_mut(ctx.this)?.entered = false;
                world.emit(ctx.this, LogEvent::FlashLoan { borrower, amount });
                Ok(Payload::encode(&true))
            }
            PoolCall::Token => Ok(Payload::encode(&world.pool(ctx.this)?.token)),
        }
    }
}
