diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Varchar,
        email -> Nullable<Varchar>,
        display_name -> Nullable<Varchar>,
        password_hash -> Text,
        role -> Varchar,
        is_active -> Bool,
        date_joined -> Timestamptz,
    }
}
