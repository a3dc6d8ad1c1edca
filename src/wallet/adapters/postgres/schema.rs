//! Diesel schema for wallet persistence.

diesel::table! {
    /// One balance row per user.
    wallets (user_id) {
        /// Wallet owner.
        #[max_length = 128]
        user_id -> Varchar,
        /// Balance in cents.
        balance_cents -> Int8,
        /// Last balance change.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only ledger entries.
    ledger_transactions (id) {
        /// Transaction identifier.
        id -> Uuid,
        /// Insertion order, used to keep posting legs ordered.
        seq -> Int8,
        /// Wallet owner.
        #[max_length = 128]
        user_id -> Varchar,
        /// Related task, if any.
        task_id -> Nullable<Uuid>,
        /// Signed amount in cents.
        amount_cents -> Int8,
        /// `credit` or `debit`.
        #[max_length = 16]
        kind -> Varchar,
        /// Human-readable description.
        description -> Text,
        /// Idempotency key of the posting that wrote the entry.
        #[max_length = 255]
        posting_key -> Nullable<Varchar>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Idempotency keys of completed postings.
    ledger_postings (idempotency_key) {
        /// Caller-chosen posting key.
        #[max_length = 255]
        idempotency_key -> Varchar,
        /// Posting timestamp.
        created_at -> Timestamptz,
    }
}
