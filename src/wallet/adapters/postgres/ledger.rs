//! `PostgreSQL` ledger: each posting is one database transaction.

use super::{
    models::{LedgerTransactionRow, NewLedgerTransactionRow, NewPostingRow, WalletRow},
    schema::{ledger_postings, ledger_transactions, wallets},
};
use crate::identity::UserId;
use crate::postgres::{BlockingError, PgPool, run_blocking};
use crate::task::domain::TaskId;
use crate::wallet::{
    domain::{
        EntryKind, IdempotencyKey, LedgerEntry, LedgerPosting, Money, PostingReceipt,
        TransactionId, Wallet, apply_posting,
    },
    ports::{WalletLedger, WalletLedgerError, WalletLedgerResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

/// `PostgreSQL`-backed wallet ledger.
///
/// Wallet rows touched by a posting are locked with `SELECT … FOR UPDATE`
/// in user-id order, and the idempotency key row is inserted in the same
/// transaction, so concurrent postings neither tear nor double-apply.
#[derive(Debug, Clone)]
pub struct PostgresWalletLedger {
    pool: PgPool,
}

impl PostgresWalletLedger {
    /// Creates a ledger from a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<diesel::result::Error> for WalletLedgerError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}

impl From<BlockingError> for WalletLedgerError {
    fn from(err: BlockingError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl WalletLedger for PostgresWalletLedger {
    async fn wallet(
        &self,
        user_id: &UserId,
        provisioned_at: DateTime<Utc>,
    ) -> WalletLedgerResult<Wallet> {
        let owner = user_id.as_str().to_owned();
        run_blocking(&self.pool, move |connection| -> WalletLedgerResult<Wallet> {
            provision_wallets(connection, std::slice::from_ref(&owner), provisioned_at)?;
            let row = wallets::table
                .find(owner.as_str())
                .select(WalletRow::as_select())
                .first::<WalletRow>(connection)?;
            row_to_wallet(row)
        })
        .await
    }

    async fn post(
        &self,
        posting: &LedgerPosting,
        at: DateTime<Utc>,
    ) -> WalletLedgerResult<PostingReceipt> {
        let posting = posting.clone();
        run_blocking(&self.pool, move |connection| {
            connection.transaction::<_, WalletLedgerError, _>(|tx| post_in_transaction(tx, &posting, at))
        })
        .await
    }

    async fn find_posting(
        &self,
        key: &IdempotencyKey,
    ) -> WalletLedgerResult<Option<PostingReceipt>> {
        let key = key.clone();
        run_blocking(&self.pool, move |connection| -> WalletLedgerResult<Option<PostingReceipt>> {
            let exists = ledger_postings::table
                .find(key.as_str())
                .count()
                .get_result::<i64>(connection)?
                > 0;
            if !exists {
                return Ok(None);
            }
            load_receipt(connection, &key).map(Some)
        })
        .await
    }

    async fn entries_for_user(&self, user_id: &UserId) -> WalletLedgerResult<Vec<LedgerEntry>> {
        let owner = user_id.as_str().to_owned();
        run_blocking(&self.pool, move |connection| -> WalletLedgerResult<Vec<LedgerEntry>> {
            ledger_transactions::table
                .filter(ledger_transactions::user_id.eq(owner))
                .order(ledger_transactions::seq.asc())
                .select(LedgerTransactionRow::as_select())
                .load::<LedgerTransactionRow>(connection)?
                .into_iter()
                .map(row_to_entry)
                .collect()
        })
        .await
    }

    async fn entries_for_task(&self, task_id: TaskId) -> WalletLedgerResult<Vec<LedgerEntry>> {
        run_blocking(&self.pool, move |connection| -> WalletLedgerResult<Vec<LedgerEntry>> {
            ledger_transactions::table
                .filter(ledger_transactions::task_id.eq(task_id.into_inner()))
                .order(ledger_transactions::seq.asc())
                .select(LedgerTransactionRow::as_select())
                .load::<LedgerTransactionRow>(connection)?
                .into_iter()
                .map(row_to_entry)
                .collect()
        })
        .await
    }
}

fn post_in_transaction(
    tx: &mut PgConnection,
    posting: &LedgerPosting,
    at: DateTime<Utc>,
) -> WalletLedgerResult<PostingReceipt> {
    if let Some(key) = posting.idempotency_key() {
        // A concurrent poster holding the same key blocks this insert until it
        // commits; zero inserted rows then means the posting already exists.
        let inserted = diesel::insert_into(ledger_postings::table)
            .values(NewPostingRow {
                idempotency_key: key.as_str().to_owned(),
                created_at: at,
            })
            .on_conflict_do_nothing()
            .execute(tx)?;
        if inserted == 0 {
            return load_receipt(tx, key);
        }
    }

    let owners: Vec<String> = posting
        .participants()
        .iter()
        .map(|user_id| user_id.as_str().to_owned())
        .collect();
    provision_wallets(tx, &owners, at)?;

    let mut working = wallets::table
        .filter(wallets::user_id.eq_any(owners))
        .order(wallets::user_id.asc())
        .for_update()
        .select(WalletRow::as_select())
        .load::<WalletRow>(tx)?
        .into_iter()
        .map(row_to_wallet)
        .collect::<WalletLedgerResult<Vec<_>>>()?;

    let entries = apply_posting(posting, &mut working, at)?;

    for wallet in &working {
        diesel::update(wallets::table.find(wallet.user_id().as_str()))
            .set((
                wallets::balance_cents.eq(wallet.balance().cents()),
                wallets::updated_at.eq(wallet.updated_at()),
            ))
            .execute(tx)?;
    }

    let posting_key = posting.idempotency_key().map(|key| key.as_str().to_owned());
    let rows: Vec<NewLedgerTransactionRow> = entries
        .iter()
        .map(|entry| to_new_row(entry, posting_key.clone()))
        .collect();
    diesel::insert_into(ledger_transactions::table)
        .values(&rows)
        .execute(tx)?;

    Ok(PostingReceipt {
        entries,
        replayed: false,
    })
}

fn provision_wallets(
    connection: &mut PgConnection,
    owners: &[String],
    at: DateTime<Utc>,
) -> WalletLedgerResult<()> {
    let fresh: Vec<WalletRow> = owners
        .iter()
        .map(|owner| WalletRow {
            user_id: owner.clone(),
            balance_cents: 0,
            updated_at: at,
        })
        .collect();
    diesel::insert_into(wallets::table)
        .values(&fresh)
        .on_conflict_do_nothing()
        .execute(connection)?;
    Ok(())
}

fn load_receipt(
    connection: &mut PgConnection,
    key: &IdempotencyKey,
) -> WalletLedgerResult<PostingReceipt> {
    let entries = ledger_transactions::table
        .filter(ledger_transactions::posting_key.eq(key.as_str()))
        .order(ledger_transactions::seq.asc())
        .select(LedgerTransactionRow::as_select())
        .load::<LedgerTransactionRow>(connection)?
        .into_iter()
        .map(row_to_entry)
        .collect::<WalletLedgerResult<Vec<_>>>()?;
    Ok(PostingReceipt {
        entries,
        replayed: true,
    })
}

fn to_new_row(entry: &LedgerEntry, posting_key: Option<String>) -> NewLedgerTransactionRow {
    NewLedgerTransactionRow {
        id: entry.id.into_inner(),
        user_id: entry.user_id.as_str().to_owned(),
        task_id: entry.task_id.map(TaskId::into_inner),
        amount_cents: entry.amount.cents(),
        kind: entry.kind.as_str().to_owned(),
        description: entry.description.clone(),
        posting_key,
        created_at: entry.created_at,
    }
}

fn row_to_wallet(row: WalletRow) -> WalletLedgerResult<Wallet> {
    let user_id = UserId::new(row.user_id).map_err(WalletLedgerError::persistence)?;
    Ok(Wallet::from_persisted(
        user_id,
        Money::from_cents(row.balance_cents),
        row.updated_at,
    ))
}

pub(super) fn row_to_entry(row: LedgerTransactionRow) -> WalletLedgerResult<LedgerEntry> {
    let LedgerTransactionRow {
        id,
        user_id,
        task_id,
        amount_cents,
        kind,
        description,
        created_at,
    } = row;
    Ok(LedgerEntry {
        id: TransactionId::from_uuid(id),
        user_id: UserId::new(user_id).map_err(WalletLedgerError::persistence)?,
        task_id: task_id.map(TaskId::from_uuid),
        amount: Money::from_cents(amount_cents),
        kind: EntryKind::try_from(kind.as_str()).map_err(WalletLedgerError::persistence)?,
        description,
        created_at,
    })
}
