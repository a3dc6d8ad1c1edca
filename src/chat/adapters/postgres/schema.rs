//! Diesel schema for chat persistence.

diesel::table! {
    /// One row per unordered participant pair.
    chat_threads (id) {
        /// Thread identifier.
        id -> Uuid,
        /// Smaller participant id.
        #[max_length = 128]
        participant_low -> Varchar,
        /// Larger participant id.
        #[max_length = 128]
        participant_high -> Varchar,
        /// Most recently bound task.
        last_task_id -> Nullable<Uuid>,
        /// Latest message summary.
        last_message -> Nullable<Text>,
        /// Latest message time.
        last_message_time -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Canonical message log.
    chat_messages (id) {
        /// Message identifier.
        id -> Uuid,
        /// Insertion order.
        seq -> Int8,
        /// Owning thread.
        thread_id -> Uuid,
        /// Author.
        #[max_length = 128]
        sender_id -> Varchar,
        /// Other participant.
        #[max_length = 128]
        recipient_id -> Varchar,
        /// Text.
        content -> Text,
        /// Attachment reference.
        attachment -> Nullable<Text>,
        /// Related task.
        task_id -> Nullable<Uuid>,
        /// Send time.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(chat_messages -> chat_threads (thread_id));
diesel::allow_tables_to_appear_in_same_query!(chat_threads, chat_messages);
