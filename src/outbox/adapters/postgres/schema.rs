//! Diesel schema for the outbox.

diesel::table! {
    /// Side effects waiting to be replayed.
    outbox_entries (id) {
        /// Entry identifier.
        id -> Uuid,
        /// Insertion order.
        seq -> Int8,
        /// Effect name, for operators.
        #[max_length = 64]
        effect -> Varchar,
        /// Tagged JSON encoding of the effect.
        payload -> Jsonb,
        /// Attempts made so far.
        attempts -> Int4,
        /// Error from the most recent attempt.
        last_error -> Text,
        /// When the effect was first deferred.
        enqueued_at -> Timestamptz,
        /// When the entry last changed.
        updated_at -> Timestamptz,
    }
}
