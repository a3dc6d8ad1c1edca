//! Diesel schema for task lifecycle persistence.

diesel::table! {
    /// Task records.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Title.
        #[max_length = 255]
        title -> Varchar,
        /// Description.
        description -> Text,
        /// Listing category.
        #[max_length = 64]
        category -> Varchar,
        /// Location text.
        location -> Text,
        /// Price in cents.
        price_cents -> Int8,
        /// Effort estimate as entered.
        #[max_length = 64]
        estimated_time -> Nullable<Varchar>,
        /// Creator.
        #[max_length = 128]
        created_by -> Varchar,
        /// Performer, once accepted.
        #[max_length = 128]
        accepted_by -> Nullable<Varchar>,
        /// Lifecycle status.
        #[max_length = 32]
        status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Cancellation timestamp.
        cancelled_at -> Nullable<Timestamptz>,
        /// Cancellation reason.
        cancellation_reason -> Nullable<Text>,
    }
}

diesel::table! {
    /// Append-only progress log.
    task_progress (id) {
        /// Entry identifier.
        id -> Uuid,
        /// Insertion order.
        seq -> Int8,
        /// Owning task.
        task_id -> Uuid,
        /// Status reached.
        #[max_length = 32]
        status -> Varchar,
        /// Optional note.
        notes -> Nullable<Text>,
        /// Actor.
        #[max_length = 128]
        actor_id -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-user cancellation counters.
    cancellation_counters (user_id) {
        /// Counted user.
        #[max_length = 128]
        user_id -> Varchar,
        /// Number of cancellations.
        count -> Int4,
        /// Last increment.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-performer completion counters.
    completion_counters (user_id) {
        /// Performer.
        #[max_length = 128]
        user_id -> Varchar,
        /// Number of completed tasks.
        count -> Int8,
        /// Last increment.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(task_progress -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, task_progress);
