diesel::table! {
    courses (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Text,
        category -> Varchar,
        created_by -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    lessons (id) {
        id -> Uuid,
        course_id -> Uuid,
        title -> Varchar,
        content -> Nullable<Text>,
        video_url -> Nullable<Text>,
        category -> Varchar,
        difficulty -> Varchar,
        lesson_order -> Int4,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    enrollments (id) {
        id -> Uuid,
        user_id -> Uuid,
        course_id -> Uuid,
        full_name -> Varchar,
        phone_number -> Varchar,
        enrolled_at -> Timestamptz,
    }
}

diesel::table! {
    progress (id) {
        id -> Uuid,
        enrollment_id -> Uuid,
        lesson_id -> Uuid,
        completed -> Bool,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    certificates (id) {
        id -> Uuid,
        enrollment_id -> Uuid,
        verification_code -> Uuid,
        issued_at -> Timestamptz,
        revoked -> Bool,
        revoked_at -> Nullable<Timestamptz>,
        downloaded -> Bool,
    }
}

diesel::joinable!(lessons -> courses (course_id));
diesel::joinable!(enrollments -> courses (course_id));
diesel::joinable!(progress -> enrollments (enrollment_id));
diesel::joinable!(progress -> lessons (lesson_id));
diesel::joinable!(certificates -> enrollments (enrollment_id));
