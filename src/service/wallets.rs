//! User and wallet administration.
//!
//! The casino-style surrounding operations (credit/debit) write the same
//! ledger the core writes; a user and their wallet are created together and
//! the wallet lives as long as the user.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::{CoreError, CoreResult};
use crate::events::{ExchangeEvent, SharedSink};
use crate::models::{LedgerEntry, LedgerKind, Role, User, Wallet};
use crate::money;
use crate::persistence::{
    begin_with_timeout, ledger, users, wallets, ORDER_TX_BUDGET,
};

pub struct WalletService {
    pool: PgPool,
    events: SharedSink,
}

impl WalletService {
    pub fn new(pool: PgPool, events: SharedSink) -> Self {
        Self { pool, events }
    }

    /// Create a user together with their (empty) wallet.
    pub async fn create_user(
        &self,
        acting_user: i64,
        email: &str,
        name: &str,
        role: Role,
        parent_id: Option<i64>,
    ) -> CoreResult<User> {
        let mut tx = begin_with_timeout(&self.pool, ORDER_TX_BUDGET).await?;
        super::require_admin(&mut tx, acting_user).await?;

        let user = users::insert(&mut tx, email, name, role, parent_id).await?;
        wallets::create_wallet(&mut tx, user.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = user.id, email, role = ?role, "user created");
        Ok(user)
    }

    /// Credit a wallet. Admin-only; the CREDIT ledger entry anchors the new
    /// balance.
    pub async fn credit(
        &self,
        acting_user: i64,
        user_id: i64,
        amount: Decimal,
        notes: Option<&str>,
    ) -> CoreResult<Wallet> {
        let amount =
            money::validate_amount(amount).map_err(|e| CoreError::InvalidInput(e.to_string()))?;

        let mut tx = begin_with_timeout(&self.pool, ORDER_TX_BUDGET).await?;
        super::require_admin(&mut tx, acting_user).await?;

        let wallet = wallets::lock_wallet(&mut tx, user_id).await?;
        let balance = wallet.balance + amount;
        wallets::update_wallet(&mut tx, user_id, balance, wallet.exposure).await?;
        ledger::append(&mut tx, user_id, amount, LedgerKind::Credit, balance, notes).await?;
        tx.commit().await?;

        let wallet = Wallet { balance, ..wallet };
        tracing::info!(user_id, amount = %amount, balance = %balance, "wallet credited");
        self.events.emit(ExchangeEvent::BalanceUpdate {
            user_id,
            balance: wallet.balance,
            exposure: wallet.exposure,
            available_balance: wallet.available(),
            changed_by: "credit",
            amount,
        });
        Ok(wallet)
    }

    /// Debit a wallet. Fails with insufficient funds if the amount exceeds
    /// the available balance (locked exposure is not spendable).
    pub async fn debit(
        &self,
        acting_user: i64,
        user_id: i64,
        amount: Decimal,
        notes: Option<&str>,
    ) -> CoreResult<Wallet> {
        let amount =
            money::validate_amount(amount).map_err(|e| CoreError::InvalidInput(e.to_string()))?;

        let mut tx = begin_with_timeout(&self.pool, ORDER_TX_BUDGET).await?;
        super::require_admin(&mut tx, acting_user).await?;

        let wallet = wallets::lock_wallet(&mut tx, user_id).await?;
        if wallet.available() < amount {
            return Err(CoreError::InsufficientFunds {
                required: amount,
                available: wallet.available(),
            });
        }
        let balance = wallet.balance - amount;
        wallets::update_wallet(&mut tx, user_id, balance, wallet.exposure).await?;
        ledger::append(&mut tx, user_id, -amount, LedgerKind::Debit, balance, notes).await?;
        tx.commit().await?;

        let wallet = Wallet { balance, ..wallet };
        tracing::info!(user_id, amount = %amount, balance = %balance, "wallet debited");
        self.events.emit(ExchangeEvent::BalanceUpdate {
            user_id,
            balance: wallet.balance,
            exposure: wallet.exposure,
            available_balance: wallet.available(),
            changed_by: "debit",
            amount,
        });
        Ok(wallet)
    }

    /// Current wallet snapshot.
    pub async fn wallet(&self, user_id: i64) -> CoreResult<Wallet> {
        let mut conn = self.pool.acquire().await?;
        wallets::get_wallet(&mut conn, user_id).await
    }

    /// Newest-first ledger page.
    pub async fn ledger_entries(&self, user_id: i64, limit: i64) -> CoreResult<Vec<LedgerEntry>> {
        ledger::entries_for_user(&self.pool, user_id, limit).await
    }
}
