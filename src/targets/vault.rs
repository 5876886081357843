//! Upgradeable vault behind a proxy.
//!
//! The proxy holds the storage (owner, sweeper, implementation pointer,
//! withdrawal timestamp) and the tokens. Behaviour comes from whichever
//! [`VaultLogic`] the implementation pointer names, so upgrading swaps the
//! rules while keeping the funds.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chain::{Address, Amount, CallContext, LogEvent, Payload, Timestamp, World, tokens};
use crate::error::{CallError, TargetError};
use crate::targets::token::{TokenCall, balance_of};

/// Largest amount a single `withdraw` may move.
pub const WITHDRAWAL_LIMIT: Amount = tokens(1);

/// Minimum time between withdrawals, in seconds (15 days).
pub const WAITING_PERIOD: u64 = 15 * 24 * 60 * 60;

/// Logic an implementation account provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultLogic {
    /// Rate-limited owner withdrawals; only the sweeper may sweep.
    Guarded,
    /// Same as `Guarded`, except anyone may sweep and funds go to
    /// `beneficiary`.
    Sweeping { beneficiary: Address },
}

/// Functions exposed by a [`VaultProxy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VaultCall {
    Withdraw {
        token: Address,
        recipient: Address,
        amount: Amount,
    },
    SweepFunds {
        token: Address,
    },
    UpgradeTo {
        implementation: Address,
    },
    TransferOwnership {
        new_owner: Address,
    },
    Owner,
    Sweeper,
    Implementation,
    LastWithdrawal,
}

/// Proxy storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultProxy {
    implementation: Address,
    owner: Address,
    sweeper: Address,
    last_withdrawal: Timestamp,
}

impl VaultProxy {
    #[must_use]
    pub const fn new(
        implementation: Address,
        owner: Address,
        sweeper: Address,
        deployed_at: Timestamp,
    ) -> Self {
        Self {
            implementation,
            owner,
            sweeper,
            last_withdrawal: deployed_at,
        }
    }

    #[must_use]
    pub const fn implementation(&self) -> Address {
        self.implementation
    }

    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub const fn sweeper(&self) -> Address {
        self.sweeper
    }

    #[must_use]
    pub const fn last_withdrawal(&self) -> Timestamp {
        self.last_withdrawal
    }

    fn only_owner(&self, caller: Address) -> Result<(), TargetError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(TargetError::Unauthorized {
                caller,
                reason: "caller is not the owner",
            })
        }
    }

    pub(crate) fn handle(
        world: &mut World,
        ctx: &CallContext,
        payload: &Payload,
    ) -> Result<Payload, CallError> {
        let call = payload.decode::<VaultCall>()?;
        let proxy = world.proxy(ctx.this)?.clone();
        let logic = *world.implementation(proxy.implementation)?;

        match call {
            VaultCall::Withdraw {
                token,
                recipient,
                amount,
            } => {
                proxy.only_owner(ctx.caller)?;
                if amount > WITHDRAWAL_LIMIT {
                    return Err(TargetError::WithdrawalLimitExceeded {
                        requested: amount,
                        limit: WITHDRAWAL_LIMIT,
                    }
                    .into());
                }
                let now = world.now();
                let earliest = proxy.last_withdrawal.saturating_add(WAITING_PERIOD);
                if now <= earliest {
                    return Err(TargetError::WithdrawalTooSoon {
                        next_allowed: earliest.saturating_add(1),
                    }
                    .into());
                }
                world.proxy_mut(ctx.this)?.last_withdrawal = now;
                transfer(world, ctx.this, token, recipient, amount)?;
                Ok(Payload::empty())
            }
            VaultCall::SweepFunds { token } => {
                let recipient = match logic {
                    VaultLogic::Guarded => {
                        if ctx.caller != proxy.sweeper {
                            return Err(TargetError::Unauthorized {
                                caller: ctx.caller,
                                reason: "caller is not the sweeper",
                            }
                            .into());
                        }
                        proxy.sweeper
                    }
                    VaultLogic::Sweeping { beneficiary } => beneficiary,
                };
                let amount = balance_of(world, token, ctx.this)?;
                transfer(world, ctx.this, token, recipient, amount)?;
                info!(vault = %ctx.this, %recipient, amount, "vault swept");
                Ok(Payload::encode(&amount))
            }
            VaultCall::UpgradeTo { implementation } => {
                proxy.only_owner(ctx.caller)?;
                world.implementation(implementation)?;
                world.proxy_mut(ctx.this)?.implementation = implementation;
                world.emit(ctx.this, LogEvent::Upgraded { implementation });
                info!(vault = %ctx.this, %implementation, "vault upgraded");
                Ok(Payload::empty())
            }
            VaultCall::TransferOwnership { new_owner } => {
                proxy.only_owner(ctx.caller)?;
                world.proxy_mut(ctx.this)?.owner = new_owner;
                world.emit(
                    ctx.this,
                    LogEvent::OwnershipTransferred {
                        previous: proxy.owner,
                        new_owner,
                    },
                );
                Ok(Payload::empty())
            }
            VaultCall::Owner => Ok(Payload::encode(&proxy.owner)),
            VaultCall::Sweeper => Ok(Payload::encode(&proxy.sweeper)),
            VaultCall::Implementation => Ok(Payload::encode(&proxy.implementation)),
            VaultCall::LastWithdrawal => Ok(Payload::encode(&proxy.last_withdrawal)),
        }
    }
}

fn transfer(
    world: &mut World,
    from: Address,
    token: Address,
    to: Address,
    amount: Amount,
) -> Result<Payload, CallError> {
    world.call(from, token, 0, &Payload::encode(&TokenCall::Transfer { to, amount }))
}
