//! Wallet Service: the only path by which balances change.

use crate::config::SettlementConfig;
use crate::db::repo::{wallets, LedgerTx};
use crate::db::Repository;
use crate::domain::{
    CallerContext, Decimal, Direction, TimeMs, Transaction, TransactionStatus, TransactionType,
    UserId, Wallet,
};
use crate::error::LedgerError;
use sqlx::sqlite::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of one balance mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub transaction: Transaction,
    pub balance_after: Decimal,
}

/// One requested balance mutation.
#[derive(Debug, Clone)]
pub(crate) struct PostingRequest<'a> {
    pub owner_id: &'a UserId,
    pub direction: Direction,
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct WalletService {
    repo: Arc<Repository>,
    settlement: SettlementConfig,
}

impl WalletService {
    pub fn new(repo: Arc<Repository>, settlement: SettlementConfig) -> Self {
        Self { repo, settlement }
    }

    /// Create the owner's wallet if it does not exist yet.
    pub async fn open_wallet(&self, owner_id: &UserId) -> Result<Wallet, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        let created =
            wallets::insert_if_absent(&mut tx, &Uuid::new_v4().to_string(), owner_id, TimeMs::now())
                .await?;
        let wallet = wallets::fetch(&mut tx, owner_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("wallet for {}", owner_id)))?;
        tx.commit().await?;

        if created {
            info!(owner_id = %owner_id, wallet_id = %wallet.id, "Wallet opened");
        }
        Ok(wallet)
    }

    pub async fn wallet(&self, owner_id: &UserId) -> Result<Wallet, LedgerError> {
        self.repo
            .wallet(owner_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("wallet for {}", owner_id)))
    }

    pub async fn get_balance(&self, owner_id: &UserId) -> Result<Decimal, LedgerError> {
        Ok(self.wallet(owner_id).await?.balance)
    }

    /// Transaction trail of a wallet, newest first.
    pub async fn transactions(&self, owner_id: &UserId) -> Result<Vec<Transaction>, LedgerError> {
        self.wallet(owner_id).await?;
        Ok(self.repo.transactions(owner_id).await?)
    }

    pub async fn credit(
        &self,
        owner_id: &UserId,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Transaction, LedgerError> {
        self.post(PostingRequest {
            owner_id,
            direction: Direction::Credit,
            amount,
            tx_type,
            description: description.to_string(),
            metadata,
        })
        .await
    }

    pub async fn debit(
        &self,
        owner_id: &UserId,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Transaction, LedgerError> {
        self.post(PostingRequest {
            owner_id,
            direction: Direction::Debit,
            amount,
            tx_type,
            description: description.to_string(),
            metadata,
        })
        .await
    }

    /// Caller tops up their own wallet.
    pub async fn deposit(
        &self,
        caller: &CallerContext,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        self.credit(
            &caller.user_id,
            amount,
            TransactionType::Deposit,
            "Wallet deposit",
            None,
        )
        .await
    }

    /// Caller withdraws from their own wallet.
    pub async fn withdraw(
        &self,
        caller: &CallerContext,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        self.debit(
            &caller.user_id,
            amount,
            TransactionType::Withdrawal,
            "Wallet withdrawal",
            None,
        )
        .await
    }

    async fn post(&self, request: PostingRequest<'_>) -> Result<Transaction, LedgerError> {
        check_currency_amount(request.amount, self.settlement.currency_scale)?;

        let owner_id = request.owner_id.clone();
        let direction = request.direction;
        let amount = request.amount;

        let outcome = async {
            let mut tx: LedgerTx = self.repo.begin_write().await?;
            let posting = post_in(&mut tx, request, TimeMs::now()).await?;
            tx.commit().await?;
            Ok::<_, LedgerError>(posting)
        }
        .await;

        match outcome {
            Ok(posting) => {
                info!(
                    owner_id = %owner_id,
                    direction = direction.as_str(),
                    tx_type = posting.transaction.tx_type.as_str(),
                    amount = %amount,
                    balance = %posting.balance_after,
                    reference = %posting.transaction.reference,
                    "Wallet posting committed"
                );
                Ok(posting.transaction)
            }
            Err(err) => {
                warn!(
                    owner_id = %owner_id,
                    direction = direction.as_str(),
                    amount = %amount,
                    kind = err.kind(),
                    error = %err,
                    "Wallet posting rejected"
                );
                Err(err)
            }
        }
    }
}

/// Reject non-positive amounts and amounts finer than the currency allows.
pub(crate) fn check_currency_amount(amount: Decimal, scale: u32) -> Result<(), LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be greater than zero, got {}",
            amount
        )));
    }
    if amount.fractional_digits() > scale {
        return Err(LedgerError::InvalidAmount(format!(
            "amount {} has more than {} decimal places",
            amount, scale
        )));
    }
    Ok(())
}

/// Apply one balance mutation inside an open unit of work.
///
/// The caller must hold the ledger write lock (see `Repository::begin_write`).
/// The balance write is still compare-and-swap against the value read here.
pub(crate) async fn post_in(
    conn: &mut SqliteConnection,
    request: PostingRequest<'_>,
    now: TimeMs,
) -> Result<Posting, LedgerError> {
    if !request.amount.is_positive() {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be greater than zero, got {}",
            request.amount
        )));
    }

    let wallet = wallets::fetch(conn, request.owner_id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("wallet for {}", request.owner_id)))?;

    let new_balance = match request.direction {
        Direction::Credit => wallet.balance.checked_add(request.amount).ok_or_else(|| {
            LedgerError::InvalidAmount(format!(
                "crediting {} would overflow the balance of {}",
                request.amount, request.owner_id
            ))
        })?,
        Direction::Debit => {
            if wallet.balance < request.amount {
                return Err(LedgerError::InsufficientFunds {
                    balance: wallet.balance.to_canonical_string(),
                    requested: request.amount.to_canonical_string(),
                });
            }
            wallet.balance - request.amount
        }
    };

    let swapped =
        wallets::swap_balance(conn, request.owner_id, wallet.balance, new_balance, now).await?;
    if !swapped {
        return Err(LedgerError::Conflict(format!(
            "wallet for {} changed during update",
            request.owner_id
        )));
    }

    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        wallet_owner_id: request.owner_id.clone(),
        tx_type: request.tx_type,
        direction: request.direction,
        status: TransactionStatus::Completed,
        amount: request.amount,
        description: request.description,
        reference: new_reference(),
        metadata: request.metadata,
        created_at: now,
        completed_at: Some(now),
    };
    wallets::insert_transaction(conn, &transaction).await?;

    debug!(
        owner_id = %request.owner_id,
        from = %wallet.balance,
        to = %new_balance,
        "Balance swapped"
    );

    Ok(Posting {
        transaction,
        balance_after: new_balance,
    })
}

fn new_reference() -> String {
    format!("TXN-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}
