// Kept in sync by hand with `SCHEMA_SQL` in lib.rs.

diesel::table! {
    admin_sessions (id) {
        id -> Integer,
        token -> Text,
        created_at -> Timestamp,
        expires_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    pools (week_key) {
        week_key -> Text,
        kind -> Text,
        record -> Text,
        updated_at -> Timestamp,
    }
}
