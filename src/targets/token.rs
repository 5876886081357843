//! Fungible token ledger with allowances.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chain::{Address, Amount, CallContext, LogEvent, Payload, World};
use crate::error::{CallError, TargetError};

/// Functions exposed by a [`TokenLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenCall {
    Transfer {
        to: Address,
        amount: Amount,
    },
    TransferFrom {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Approve {
        spender: Address,
        amount: Amount,
    },
    BalanceOf {
        holder: Address,
    },
    Allowance {
        owner: Address,
        spender: Address,
    },
    TotalSupply,
}

/// Balances and allowances of one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLedger {
    symbol: String,
    total_supply: Amount,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
}

impl TokenLedger {
    /// A ledger whose whole supply starts with `holder`.
    #[must_use]
    pub fn new(symbol: &str, holder: Address, supply: Amount) -> Self {
        let mut balances = BTreeMap::new();
        if supply > 0 {
            balances.insert(holder, supply);
        }
        Self {
            symbol: symbol.to_owned(),
            total_supply: supply,
            balances,
            allowances: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub const fn total_supply(&self) -> Amount {
        self.total_supply
    }

    #[must_use]
    pub fn balance_of(&self, holder: Address) -> Amount {
        self.balances.get(&holder).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TargetError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TargetError::InsufficientBalance {
                holder: from,
                needed: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }

    fn spend_allowance(&mut self, owner: Address, spender: Address, amount: Amount) -> Result<(), TargetError> {
        let available = self.allowance(owner, spender);
        if available == Amount::MAX {
            return Ok(());
        }
        if available < amount {
            return Err(TargetError::InsufficientAllowance {
                owner,
                spender,
                needed: amount,
                available,
            });
        }
        self.allowances.insert((owner, spender), available - amount);
        Ok(())
    }

    pub(crate) fn handle(
        world: &mut World,
        ctx: &CallContext,
        payload: &Payload,
    ) -> Result<Payload, CallError> {
        let call = payload.decode::<TokenCall>()?;
        let ledger = world.token_mut(ctx.this)?;
        let (ret, event) = match call {
            TokenCall::Transfer { to, amount } => {
                ledger.move_balance(ctx.caller, to, amount)?;
                let event = LogEvent::Transfer {
                    from: ctx.caller,
                    to,
                    amount,
                };
                (Payload::encode(&true), Some(event))
            }
            TokenCall::TransferFrom { from, to, amount } => {
                if from != ctx.caller {
                    ledger.spend_allowance(from, ctx.caller, amount)?;
                }
                ledger.move_balance(from, to, amount)?;
                (
                    Payload::encode(&true),
                    Some(LogEvent::Transfer { from, to, amount }),
                )
            }
            TokenCall::Approve { spender, amount } => {
                ledger.allowances.insert((ctx.caller, spender), amount);
                (
                    Payload::encode(&true),
                    Some(LogEvent::Approval {
                        owner: ctx.caller,
                        spender,
                        amount,
                    }),
                )
            }
            TokenCall::BalanceOf { holder } => (Payload::encode(&ledger.balance_of(holder)), None),
            TokenCall::Allowance { owner, spender } => {
                (Payload::encode(&ledger.allowance(owner, spender)), None)
            }
            TokenCall::TotalSupply => (Payload::encode(&ledger.total_supply), None),
        };
        if let Some(event) = event {
            world.emit(ctx.this, event);
        }
        Ok(ret)
    }
}

/// Token balance of `holder` on the ledger deployed at `token`.
///
/// # Errors
///
/// Fails if `token` is not a token ledger.
pub fn balance_of(world: &World, token: Address, holder: Address) -> Result<Amount, TargetError> {
    Ok(world.token(token)?.balance_of(holder))
}
