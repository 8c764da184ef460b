/// Server-rendered page routes.
#[derive(Debug)]
pub struct PageUrls;

impl PageUrls {
    pub const HOME: &'static str = "/";

    // Accounts
    pub const LOGIN: &'static str = "/accounts/login";
    pub const REGISTER: &'static str = "/accounts/register";
    pub const LOGOUT: &'static str = "/accounts/logout";

    // Courses & lessons
    pub const COURSE_DETAIL: &'static str = "/courses/:course_id";
    pub const COURSE_ENROLL: &'static str = "/courses/:course_id/enroll";
    pub const LESSON_DETAIL: &'static str = "/courses/:course_id/lessons/:lesson_id";
    pub const LESSON_COMPLETE: &'static str = "/lessons/:lesson_id/complete";

    // Dashboards
    pub const STUDENT_DASHBOARD: &'static str = "/dashboard/student";
    pub const TEACHER_DASHBOARD: &'static str = "/dashboard/teacher";

    // Teaching tools
    pub const TEACHER_NEW_COURSE: &'static str = "/teacher/new-course";
    pub const TEACHER_NEW_LESSON: &'static str = "/teacher/courses/:course_id/lessons/new";
    pub const TEACHER_TOGGLE_LESSON: &'static str = "/teacher/lessons/:lesson_id/toggle";

    // Certificates
    pub const CERTIFICATE_VERIFY_FORM: &'static str = "/certificates/verify";
    pub const CERTIFICATE_VERIFY: &'static str = "/certificates/verify/:code";
    pub const CERTIFICATE_QR: &'static str = "/certificates/qr/:code";
    pub const MY_CERTIFICATES: &'static str = "/certificates/my";
    pub const CERTIFICATE_DETAIL: &'static str = "/certificates/view/:certificate_id";
    pub const CERTIFICATE_FOR_COURSE: &'static str = "/certificates/course/:course_id";
    pub const CERTIFICATE_DOWNLOAD: &'static str = "/certificates/download/:certificate_id";
    pub const CERTIFICATE_ADMIN: &'static str = "/certificates/admin-dashboard";
    pub const CERTIFICATE_REVOKE: &'static str = "/certificates/revoke/:certificate_id";
    pub const CERTIFICATE_REISSUE: &'static str = "/certificates/reissue/:certificate_id";

    // Administration
    pub const ADMIN_DASHBOARD: &'static str = "/admin";
    pub const ADMIN_USERS: &'static str = "/admin/users";
    pub const ADMIN_COURSES: &'static str = "/admin/courses";
    pub const ADMIN_ENROLLMENTS: &'static str = "/admin/enrollments";
}

/// JSON routes.
#[derive(Debug)]
pub struct ApiUrls;

impl ApiUrls {
    pub const HEALTH: &'static str = "/health";
    pub const HEALTHZ: &'static str = "/healthz";

    pub const COURSES: &'static str = "/api/courses";
    pub const CERTIFICATE_VERIFY: &'static str = "/api/certificates/:code/verify";
    pub const PROGRESS: &'static str = "/api/progress";
}

/// Fills the `:name` segments of a route template.
///
/// ```
/// use eduvillage::core::urls::{url_for, PageUrls};
/// let id = "42";
/// assert_eq!(url_for(PageUrls::COURSE_DETAIL, &[("course_id", id)]), "/courses/42");
/// ```
pub fn url_for(template: &str, params: &[(&str, &str)]) -> String {
    template
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .unwrap_or(segment),
            None => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn course_url(course_id: &uuid::Uuid) -> String {
    url_for(PageUrls::COURSE_DETAIL, &[("course_id", &course_id.to_string())])
}

pub fn enroll_url(course_id: &uuid::Uuid) -> String {
    url_for(PageUrls::COURSE_ENROLL, &[("course_id", &course_id.to_string())])
}

pub fn lesson_url(course_id: &uuid::Uuid, lesson_id: &uuid::Uuid) -> String {
    url_for(
        PageUrls::LESSON_DETAIL,
        &[
            ("course_id", &course_id.to_string()),
            ("lesson_id", &lesson_id.to_string()),
        ],
    )
}
