//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a migration
//! changes the schema, regenerate them with `diesel print-schema` or update
//! them by hand.

diesel::table! {
    /// User contacts mirrored from the identity service.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Display name shown in chat and notifications.
        nickname -> Varchar,
        /// Mobile push registration token, if the user has one.
        push_token -> Nullable<Varchar>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Companion-request boards with their capacity counters.
    boards (id) {
        id -> Uuid,
        owner_id -> Uuid,
        title -> Varchar,
        /// Accepted guests, never above `max_person`.
        current_person -> Int4,
        max_person -> Int4,
        is_completed -> Bool,
        created_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Join requests. At most one active row per (board, applicant).
    enrollments (id) {
        id -> Uuid,
        board_id -> Uuid,
        applicant_id -> Uuid,
        status -> Varchar,
        is_new -> Bool,
        description -> Text,
        created_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Chat rooms, one per board, with the last-message summary.
    chat_rooms (id) {
        id -> Uuid,
        board_id -> Uuid,
        participant_count -> Int4,
        image_url -> Nullable<Varchar>,
        last_message_at -> Nullable<Timestamptz>,
        last_message_content -> Nullable<Text>,
        created_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Room memberships with per-member read markers.
    room_memberships (id) {
        id -> Uuid,
        user_id -> Uuid,
        chat_room_id -> Uuid,
        joined_at -> Timestamptz,
        last_read_at -> Timestamptz,
        notifications_enabled -> Bool,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// In-app notification history.
    notifications (id) {
        id -> Uuid,
        recipient_id -> Uuid,
        sender_id -> Nullable<Uuid>,
        board_id -> Uuid,
        enrollment_id -> Nullable<Uuid>,
        title -> Varchar,
        body -> Text,
        accept_status -> Nullable<Varchar>,
        is_read -> Bool,
        created_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Append-only chat message log ordered by `seq`.
    chat_messages (seq) {
        seq -> Int8,
        id -> Uuid,
        chat_room_id -> Uuid,
        sender_id -> Nullable<Uuid>,
        content -> Text,
        message_type -> Varchar,
        sent_at -> Timestamptz,
    }
}

diesel::joinable!(boards -> users (owner_id));
diesel::joinable!(chat_rooms -> boards (board_id));
diesel::joinable!(enrollments -> boards (board_id));
diesel::joinable!(room_memberships -> chat_rooms (chat_room_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    boards,
    enrollments,
    chat_rooms,
    room_memberships,
    notifications,
    chat_messages,
);
