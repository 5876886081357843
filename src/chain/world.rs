//! In-process chain: account registry, clock, native balances and call
//! dispatch.
//!
//! Every call is one frame. A frame snapshots the mutable state, moves the
//! attached native value, dispatches the payload to the callee and restores
//! the snapshot if the callee fails. Nested calls open nested frames, so a
//! failure anywhere unwinds exactly the effects of the failing frame and
//! propagates upward as an ordinary `Err`.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chain::log::{Log, LogEvent};
use crate::chain::payload::Payload;
use crate::chain::types::{Address, Amount, Timestamp};
use crate::error::{CallError, TargetError};
use crate::exec::BatchExecutor;
use crate::governance::DelayQueue;
use crate::observability::metrics;
use crate::targets::{LenderPool, TokenLedger, VaultLogic, VaultProxy};

/// Maximum nesting of call frames.
pub const MAX_CALL_DEPTH: usize = 64;

// ============================================================================
// Accounts
// ============================================================================

/// State stored at an address.
#[derive(Debug, Clone)]
pub enum Account {
    /// Externally owned account; accepts plain value transfers only.
    External {
        /// Human-readable label the address was derived from.
        label: String,
    },
    /// Fungible token ledger.
    Token(TokenLedger),
    /// Delay queue governance contract.
    Queue(DelayQueue),
    /// Upgradeable vault proxy.
    Proxy(VaultProxy),
    /// Vault logic that a proxy can point at. Not callable directly.
    Implementation(VaultLogic),
    /// Flash-loan pool.
    Pool(LenderPool),
    /// Batch executor.
    Executor(BatchExecutor),
}

impl Account {
    /// The kind tag of this account.
    #[must_use]
    pub const fn kind(&self) -> AccountKind {
        match self {
            Self::External { .. } => AccountKind::External,
            Self::Token(_) => AccountKind::Token,
            Self::Queue(_) => AccountKind::Queue,
            Self::Proxy(_) => AccountKind::Proxy,
            Self::Implementation(_) => AccountKind::Implementation,
            Self::Pool(_) => AccountKind::Pool,
            Self::Executor(_) => AccountKind::Executor,
        }
    }
}

/// Kind of an [`Account`], without its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    External,
    Token,
    Queue,
    Proxy,
    Implementation,
    Pool,
    Executor,
}

impl AccountKind {
    /// Stable lowercase name, also used as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Token => "token",
            Self::Queue => "queue",
            Self::Proxy => "proxy",
            Self::Implementation => "implementation",
            Self::Pool => "pool",
            Self::Executor => "executor",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a callee sees about the frame it runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Caller-of-record.
    pub caller: Address,
    /// Address of the callee.
    pub this: Address,
    /// Native value attached to the call.
    pub value: Amount,
}

// ============================================================================
// World
// ============================================================================

/// Saved copy of the mutable chain state.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    accounts: BTreeMap<Address, Account>,
    native: BTreeMap<Address, Amount>,
    logs_len: usize,
}

/// The whole chain.
#[derive(Debug, Clone)]
pub struct World {
    now: Timestamp,
    accounts: BTreeMap<Address, Account>,
    native: BTreeMap<Address, Amount>,
    logs: Vec<Log>,
    depth: usize,
}

macro_rules! account_accessors {
    ($($variant:ident => $ty:ty, $get:ident, $get_mut:ident;)*) => {
        $(
            #[doc = concat!("Borrows the `", stringify!($variant), "` account at `address`.")]
            ///
            /// # Errors
            ///
            /// Fails if nothing is deployed there or the account is of another kind.
            pub fn $get(&self, address: Address) -> Result<&$ty, TargetError> {
                match self.accounts.get(&address) {
                    Some(Account::$variant(inner)) => Ok(inner),
                    Some(other) => Err(TargetError::UnexpectedAccount {
                        address,
                        expected: AccountKind::$variant,
                        found: other.kind(),
                    }),
                    None => Err(TargetError::UnknownAccount(address)),
                }
            }

            #[doc = concat!("Mutably borrows the `", stringify!($variant), "` account at `address`.")]
            ///
            /// # Errors
            ///
            /// Fails if nothing is deployed there or the account is of another kind.
            pub fn $get_mut(&mut self, address: Address) -> Result<&mut $ty, TargetError> {
                match self.accounts.get_mut(&address) {
                    Some(Account::$variant(inner)) => Ok(inner),
                    Some(other) => Err(TargetError::UnexpectedAccount {
                        address,
                        expected: AccountKind::$variant,
                        found: other.kind(),
                    }),
                    None => Err(TargetError::UnknownAccount(address)),
                }
            }
        )*
    };
}

impl World {
    /// Creates an empty chain with the clock at `start`.
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            now: start,
            accounts: BTreeMap::new(),
            native: BTreeMap::new(),
            logs: Vec::new(),
            depth: 0,
        }
    }

    /// Current block timestamp.
    #[must_use]
    pub const fn now(&self) -> Timestamp {
        self.now
    }

    /// Moves the clock forward.
    pub const fn advance_time(&mut self, seconds: u64) {
        self.now = self.now.saturating_add(seconds);
    }

    /// Sets the clock. Time never moves backwards.
    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.now = self.now.max(timestamp);
    }

    /// Places `account` at `address`, replacing whatever was there.
    pub fn deploy(&mut self, address: Address, account: Account) -> Address {
        debug!(%address, kind = %account.kind(), "deploy");
        self.accounts.insert(address, account);
        address
    }

    /// Creates an externally owned account whose address derives from `label`.
    pub fn create_external(&mut self, label: &str) -> Address {
        self.deploy(
            Address::derive(label),
            Account::External {
                label: label.to_owned(),
            },
        )
    }

    /// Account stored at `address`, if any.
    #[must_use]
    pub fn account(&self, address: Address) -> Option<&Account> {
        self.accounts.get(&address)
    }

    /// Kind of the account at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::UnknownAccount`] if nothing is deployed there.
    pub fn kind_of(&self, address: Address) -> Result<AccountKind, TargetError> {
        self.accounts
            .get(&address)
            .map(Account::kind)
            .ok_or(TargetError::UnknownAccount(address))
    }

    account_accessors! {
        Token => TokenLedger, token, token_mut;
        Queue => DelayQueue, queue, queue_mut;
        Proxy => VaultProxy, proxy, proxy_mut;
        Pool => LenderPool, pool, pool_mut;
        Executor => BatchExecutor, executor, executor_mut;
    }

    /// Borrows the vault logic stored at an implementation account.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::NotAnImplementation`] if `address` holds
    /// anything else.
    pub fn implementation(&self, address: Address) -> Result<&VaultLogic, TargetError> {
        match self.accounts.get(&address) {
            Some(Account::Implementation(logic)) => Ok(logic),
            _ => Err(TargetError::NotAnImplementation(address)),
        }
    }

    /// Native value held by `address`.
    #[must_use]
    pub fn native_balance(&self, address: Address) -> Amount {
        self.native.get(&address).copied().unwrap_or(0)
    }

    /// Overwrites the native value held by `address`.
    pub fn set_native_balance(&mut self, address: Address, amount: Amount) {
        if amount == 0 {
            self.native.remove(&address);
        } else {
            self.native.insert(address, amount);
        }
    }

    /// All logs emitted so far, in order.
    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Appends a log entry.
    pub fn emit(&mut self, emitter: Address, event: LogEvent) {
        self.logs.push(Log { emitter, event });
    }

    /// Current call nesting depth. Zero outside any transaction.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Snapshots the mutable state.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            accounts: self.accounts.clone(),
            native: self.native.clone(),
            logs_len: self.logs.len(),
        }
    }

    /// Restores a snapshot. The clock and depth are not part of it.
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        self.accounts = checkpoint.accounts;
        self.native = checkpoint.native;
        self.logs.truncate(checkpoint.logs_len);
    }

    // ------------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------------

    /// Runs one call frame.
    ///
    /// # Errors
    ///
    /// Returns the callee's failure. All effects of the frame, including
    /// the value transfer and logs, are rolled back before returning.
    pub fn call(
        &mut self,
        caller: Address,
        target: Address,
        value: Amount,
        payload: &Payload,
    ) -> Result<Payload, CallError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(TargetError::CallDepthExceeded {
                limit: MAX_CALL_DEPTH,
            }
            .into());
        }
        let kind = self.kind_of(target)?;
        let ctx = CallContext {
            caller,
            this: target,
            value,
        };

        debug!(
            depth = self.depth,
            %caller,
            %target,
            %kind,
            value,
            function = payload.function_name().as_deref().unwrap_or("?"),
            "call"
        );

        let checkpoint = self.checkpoint();
        self.depth += 1;
        let result = self
            .move_native(caller, target, value)
            .map_err(CallError::from)
            .and_then(|()| self.dispatch(kind, &ctx, payload));
        self.depth -= 1;

        metrics::record_call(kind.as_str(), result.is_ok());
        if let Err(err) = &result {
            debug!(depth = self.depth, %target, error = %err, "call reverted");
            self.revert_to(checkpoint);
        }
        result
    }

    /// Submits a top-level transaction from `from`.
    ///
    /// # Errors
    ///
    /// Returns the failure of the outermost call. Nothing it did is kept.
    pub fn transact(
        &mut self,
        from: Address,
        target: Address,
        value: Amount,
        payload: &Payload,
    ) -> Result<Payload, CallError> {
        debug_assert_eq!(self.depth, 0, "transactions cannot nest");
        let span = tracing::info_span!("transaction", %from, %target);
        let _guard = span.enter();

        let logs_before = self.logs.len();
        let result = self.call(from, target, value, payload);
        match &result {
            Ok(_) => info!(
                function = payload.function_name().as_deref().unwrap_or("?"),
                logs = self.logs.len() - logs_before,
                "transaction committed"
            ),
            Err(err) => warn!(error = %err, "transaction reverted"),
        }
        result
    }

    fn move_native(
        &mut self,
        from: Address,
        to: Address,
        value: Amount,
    ) -> Result<(), TargetError> {
        if value == 0 || from == to {
            return Ok(());
        }
        let available = self.native_balance(from);
        if available < value {
            return Err(TargetError::InsufficientValue {
                holder: from,
                needed: value,
                available,
            });
        }
        self.set_native_balance(from, available - value);
        let credited = self.native_balance(to).saturating_add(value);
        self.set_native_balance(to, credited);
        Ok(())
    }

    fn dispatch(
        &mut self,
        kind: AccountKind,
        ctx: &CallContext,
        payload: &Payload,
    ) -> Result<Payload, CallError> {
        match kind {
            AccountKind::External if payload.is_empty() => Ok(Payload::empty()),
            AccountKind::External | AccountKind::Implementation => {
                Err(TargetError::NotCallable(ctx.this).into())
            }
            AccountKind::Token => TokenLedger::handle(self, ctx, payload),
            AccountKind::Queue => DelayQueue::handle(self, ctx, payload),
            AccountKind::Proxy => VaultProxy::handle(self, ctx, payload),
            AccountKind::Pool => LenderPool::handle(self, ctx, payload),
            AccountKind::Executor => BatchExecutor::handle(self, ctx, payload),
        }
    }
}
