#[cfg(test)]
mod learn_flow_integration_tests {
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::PgConnection;
    use uuid::Uuid;

    use eduvillage::accounts::{AccountEngine, RegisterRequest};
    use eduvillage::certificates::{
        AdminFilters, CertificateEngine, CertificateRecord, CourseCertificate, Download,
        VerificationStatus,
    };
    use eduvillage::core::config::AppConfig;
    use eduvillage::learn::progress::LessonState;
    use eduvillage::learn::types::{
        CreateCourseRequest, CreateLessonRequest, EnrollRequest, LessonAccess,
    };
    use eduvillage::learn::LearnEngine;
    use eduvillage::shared::enums::Role;
    use eduvillage::shared::error::AppError;
    use eduvillage::shared::models::{Certificate, User};
    use eduvillage::shared::utils::{run_migrations, DbPool};
    use eduvillage::web::auth::AuthenticatedUser;

    /// Pool for the test database, or `None` when none is reachable.
    fn test_pool() -> Option<DbPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = Pool::builder()
            .max_size(2)
            .build(ConnectionManager::<PgConnection>::new(url))
            .ok()?;
        run_migrations(&pool).ok()?;
        Some(pool)
    }

    fn unique(prefix: &str) -> String {
        format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
    }

    async fn register(pool: &DbPool, role: Role) -> User {
        AccountEngine::new(pool.clone())
            .register(RegisterRequest {
                username: unique(role.as_str()),
                email: String::new(),
                display_name: String::new(),
                password: "learn-flow-pass-42".to_string(),
                confirm_password: "learn-flow-pass-42".to_string(),
                role: role.as_str().to_string(),
            })
            .await
            .unwrap()
    }

    fn session(user: &User) -> AuthenticatedUser {
        AuthenticatedUser {
            id: user.id,
            username: user.username.clone(),
            name: user.full_name().to_string(),
            role: user.role,
        }
    }

    fn admin_session() -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::new_v4(),
            username: "admin1".to_string(),
            name: "admin1".to_string(),
            role: Role::Admin,
        }
    }

    fn lesson_form(title: &str) -> CreateLessonRequest {
        CreateLessonRequest {
            title: title.to_string(),
            difficulty: "beginner".to_string(),
            category: "other".to_string(),
            ..CreateLessonRequest::default()
        }
    }

    /// Course with `lessons` active lessons, authored by a fresh teacher.
    async fn course_with_lessons(pool: &DbPool, lessons: usize) -> (Uuid, Vec<Uuid>) {
        let (_, course_id, ids) = authored_course(pool, lessons).await;
        (course_id, ids)
    }

    /// Like [`course_with_lessons`], also returning the authoring teacher.
    async fn authored_course(
        pool: &DbPool,
        lessons: usize,
    ) -> (AuthenticatedUser, Uuid, Vec<Uuid>) {
        let teacher = session(&register(pool, Role::Teacher).await);
        let engine = LearnEngine::new(pool.clone());
        let course = engine
            .create_course(
                &teacher,
                &CreateCourseRequest {
                    title: unique("Course"),
                    description: "Integration test course".to_string(),
                    category: "other".to_string(),
                },
            )
            .await
            .unwrap();

        let mut ids = Vec::new();
        for n in 1..=lessons {
            let lesson = engine
                .add_lesson(&teacher, course.id, &lesson_form(&format!("Lesson {n}")))
                .await
                .unwrap();
            assert_eq!(lesson.lesson_order, n as i32);
            ids.push(lesson.id);
        }
        (teacher, course.id, ids)
    }

    fn enroll_form() -> EnrollRequest {
        named_enroll_form("Ada Lovelace")
    }

    fn named_enroll_form(full_name: &str) -> EnrollRequest {
        EnrollRequest {
            full_name: full_name.to_string(),
            phone_number: "+1 555-0100".to_string(),
        }
    }

    /// Enrolls a fresh student and completes every lesson in `lessons`.
    async fn graduate(
        pool: &DbPool,
        course_id: Uuid,
        lessons: &[Uuid],
        full_name: &str,
    ) -> (User, Certificate) {
        let student = register(pool, Role::Student).await;
        let engine = LearnEngine::new(pool.clone());
        engine
            .enroll(student.id, student.full_name(), course_id, &named_enroll_form(full_name))
            .await
            .unwrap();
        let mut certificate = None;
        for lesson in lessons {
            certificate = engine
                .complete_lesson(student.id, *lesson)
                .await
                .unwrap()
                .certificate;
        }
        (student, certificate.unwrap())
    }

    #[tokio::test]
    async fn test_cannot_enroll_twice() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let student = register(&pool, Role::Student).await;
        let (course_id, _) = course_with_lessons(&pool, 1).await;
        let engine = LearnEngine::new(pool.clone());

        engine
            .enroll(student.id, student.full_name(), course_id, &enroll_form())
            .await
            .unwrap();
        let second = engine
            .enroll(student.id, student.full_name(), course_id, &enroll_form())
            .await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_lessons_complete_in_order_and_issue_one_certificate() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let student = register(&pool, Role::Student).await;
        let (course_id, lessons) = course_with_lessons(&pool, 3).await;
        let engine = LearnEngine::new(pool.clone());
        engine
            .enroll(student.id, student.full_name(), course_id, &enroll_form())
            .await
            .unwrap();

        let skipped = engine.complete_lesson(student.id, lessons[1]).await;
        assert!(matches!(skipped, Err(AppError::Forbidden(_))));

        let first = engine.complete_lesson(student.id, lessons[0]).await.unwrap();
        assert!(first.newly_completed);
        assert!(first.certificate.is_none());

        let again = engine.complete_lesson(student.id, lessons[0]).await.unwrap();
        assert!(!again.newly_completed);

        engine.complete_lesson(student.id, lessons[1]).await.unwrap();
        let detail = engine.course_detail(student.id, course_id).await.unwrap().unwrap();
        assert_eq!(detail.percent, 66);
        assert!(detail.certificate.is_none());
        assert_eq!(detail.next_lesson.map(|l| l.id), Some(lessons[2]));

        let last = engine.complete_lesson(student.id, lessons[2]).await.unwrap();
        assert!(last.certificate_issued);
        let certificate = last.certificate.unwrap();

        let replay = engine.complete_lesson(student.id, lessons[2]).await.unwrap();
        assert!(!replay.certificate_issued);
        assert_eq!(replay.certificate.map(|c| c.id), Some(certificate.id));

        let mine = CertificateEngine::new(pool.clone())
            .my_certificates(student.id)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].student_name(), "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_revoked_certificate_verifies_as_revoked() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let student = register(&pool, Role::Student).await;
        let (course_id, lessons) = course_with_lessons(&pool, 1).await;
        let learn = LearnEngine::new(pool.clone());
        learn
            .enroll(student.id, student.full_name(), course_id, &enroll_form())
            .await
            .unwrap();
        let certificate = learn
            .complete_lesson(student.id, lessons[0])
            .await
            .unwrap()
            .certificate
            .unwrap();

        let engine = CertificateEngine::new(pool.clone());
        let code = certificate.verification_code.to_string();
        assert_eq!(
            engine.verify(&code).await.unwrap().status,
            VerificationStatus::Valid
        );

        engine.set_revoked(certificate.id, true).await.unwrap();
        let revoked = engine.verify(&code).await.unwrap();
        assert_eq!(revoked.status, VerificationStatus::Revoked);
        assert_eq!(revoked.student_name.as_deref(), Some("Ada Lovelace"));

        let unknown = engine.verify(&Uuid::new_v4().to_string()).await.unwrap();
        assert_eq!(unknown.status, VerificationStatus::Invalid);
        let malformed = engine.verify("not-a-code").await.unwrap();
        assert_eq!(malformed.status, VerificationStatus::Invalid);
    }

    #[tokio::test]
    async fn test_hiding_the_remaining_lesson_issues_certificate() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let student = register(&pool, Role::Student).await;
        let (teacher, course_id, lessons) = authored_course(&pool, 2).await;
        let engine = LearnEngine::new(pool.clone());
        engine
            .enroll(student.id, student.full_name(), course_id, &enroll_form())
            .await
            .unwrap();
        engine.complete_lesson(student.id, lessons[0]).await.unwrap();

        let hidden = engine.toggle_lesson_active(&teacher, lessons[1]).await.unwrap();
        assert!(!hidden.is_active);

        let detail = engine.course_detail(student.id, course_id).await.unwrap().unwrap();
        assert_eq!((detail.completed, detail.total, detail.percent), (1, 1, 100));
        let certificate = detail.certificate.expect("certificate after hiding last lesson");

        let replay = engine.complete_lesson(student.id, lessons[0]).await.unwrap();
        assert!(!replay.newly_completed);
        assert!(!replay.certificate_issued);
        assert_eq!(replay.certificate.map(|c| c.id), Some(certificate.id));

        let gone = engine.complete_lesson(student.id, lessons[1]).await;
        assert!(matches!(gone, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_overlong_display_name_cannot_break_enrollment() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let accounts = AccountEngine::new(pool.clone());
        let request = |display_name: String| RegisterRequest {
            username: unique("student"),
            email: String::new(),
            display_name,
            password: "learn-flow-pass-42".to_string(),
            confirm_password: "learn-flow-pass-42".to_string(),
            role: "student".to_string(),
        };

        let refused = accounts.register(request("N".repeat(300))).await;
        assert!(matches!(refused, Err(AppError::Validation(_))));

        let student = accounts.register(request("N".repeat(255))).await.unwrap();
        let (course_id, _) = course_with_lessons(&pool, 1).await;
        let engine = LearnEngine::new(pool.clone());
        let blank_name = named_enroll_form("");

        let enrollment = engine
            .enroll(student.id, student.full_name(), course_id, &blank_name)
            .await
            .unwrap();
        assert_eq!(enrollment.full_name.chars().count(), 255);

        let other = register(&pool, Role::Student).await;
        let too_long = engine
            .enroll(other.id, &"N".repeat(300), course_id, &blank_name)
            .await;
        assert!(matches!(too_long, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_download_rechecks_completion_and_revocation() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let (teacher, course_id, lessons) = authored_course(&pool, 1).await;
        let (student, certificate) = graduate(&pool, course_id, &lessons, "Ada Lovelace").await;
        let certificates = CertificateEngine::new(pool.clone());
        let settings = AppConfig::default().certificates;

        match certificates
            .download(student.id, certificate.id, &settings)
            .await
            .unwrap()
        {
            Download::Ready { certificate_id, pdf } => {
                assert_eq!(certificate_id, certificate.id);
                assert!(pdf.starts_with(b"%PDF"));
            }
            other => panic!("expected a PDF, got {other:?}"),
        }
        let mine = certificates.my_certificates(student.id).await.unwrap();
        assert!(mine[0].certificate.downloaded);

        let learn = LearnEngine::new(pool.clone());
        let extra = learn
            .add_lesson(&teacher, course_id, &lesson_form("Bonus"))
            .await
            .unwrap();
        let incomplete = certificates
            .download(student.id, certificate.id, &settings)
            .await
            .unwrap();
        assert!(matches!(incomplete, Download::Incomplete));

        learn.complete_lesson(student.id, extra.id).await.unwrap();
        certificates.set_revoked(certificate.id, true).await.unwrap();
        let revoked = certificates
            .download(student.id, certificate.id, &settings)
            .await
            .unwrap();
        assert!(matches!(revoked, Download::Revoked));

        let stranger = register(&pool, Role::Student).await;
        let foreign = certificates
            .download(stranger.id, certificate.id, &settings)
            .await;
        assert!(matches!(foreign, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lesson_detail_gates_and_records_visit() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let student = register(&pool, Role::Student).await;
        let (course_id, lessons) = course_with_lessons(&pool, 2).await;
        let engine = LearnEngine::new(pool.clone());

        let outsider = engine.lesson_detail(student.id, course_id, lessons[0]).await.unwrap();
        assert!(matches!(outsider, LessonAccess::NotEnrolled(_)));

        engine
            .enroll(student.id, student.full_name(), course_id, &enroll_form())
            .await
            .unwrap();

        let locked = engine.lesson_detail(student.id, course_id, lessons[1]).await.unwrap();
        assert!(matches!(locked, LessonAccess::Locked(_)));

        match engine.lesson_detail(student.id, course_id, lessons[0]).await.unwrap() {
            LessonAccess::Open(page) => {
                assert_eq!(page.state, LessonState::Next);
                assert_eq!(page.progress.lesson_id, lessons[0]);
                assert!(!page.progress.completed);
                assert!(page.progress.completed_at.is_none());
            }
            _ => panic!("first lesson should be open"),
        }

        let detail = engine.course_detail(student.id, course_id).await.unwrap().unwrap();
        assert_eq!(detail.completed, 0);

        let (other_course, _) = course_with_lessons(&pool, 1).await;
        let wrong_course = engine.lesson_detail(student.id, other_course, lessons[0]).await;
        assert!(matches!(wrong_course, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_list_filters() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let (course_id, lessons) = course_with_lessons(&pool, 1).await;
        let (ada, ada_cert) = graduate(&pool, course_id, &lessons, "Ada Lovelace").await;
        let (grace, grace_cert) = graduate(&pool, course_id, &lessons, "Grace Hopper").await;

        let engine = CertificateEngine::new(pool.clone());
        engine
            .download(ada.id, ada_cert.id, &AppConfig::default().certificates)
            .await
            .unwrap();
        engine.set_revoked(grace_cert.id, true).await.unwrap();

        let in_course = |q: Option<&str>, downloaded: Option<&str>, revoked: Option<&str>| {
            AdminFilters {
                q: q.map(str::to_string),
                course: Some(course_id.to_string()),
                downloaded: downloaded.map(str::to_string),
                revoked: revoked.map(str::to_string),
            }
        };
        let ids = |records: Vec<CertificateRecord>| -> Vec<Uuid> {
            records.iter().map(|r| r.certificate.id).collect()
        };

        let all = engine.admin_list(&in_course(None, None, None)).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_name = engine
            .admin_list(&in_course(Some("lovelace"), None, None))
            .await
            .unwrap();
        assert_eq!(ids(by_name), vec![ada_cert.id]);

        let by_username = engine
            .admin_list(&in_course(Some(&grace.username.to_uppercase()), None, None))
            .await
            .unwrap();
        assert_eq!(ids(by_username), vec![grace_cert.id]);

        let downloaded = engine
            .admin_list(&in_course(None, Some("true"), None))
            .await
            .unwrap();
        assert_eq!(ids(downloaded), vec![ada_cert.id]);

        let not_downloaded = engine
            .admin_list(&in_course(None, Some("false"), None))
            .await
            .unwrap();
        assert_eq!(ids(not_downloaded), vec![grace_cert.id]);

        let revoked = engine
            .admin_list(&in_course(None, None, Some("true")))
            .await
            .unwrap();
        assert_eq!(ids(revoked), vec![grace_cert.id]);

        let active = engine
            .admin_list(&in_course(None, None, Some("false")))
            .await
            .unwrap();
        assert_eq!(ids(active), vec![ada_cert.id]);
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_toggles_lessons() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let (owner, _, lessons) = authored_course(&pool, 1).await;
        let intruder = session(&register(&pool, Role::Teacher).await);
        let engine = LearnEngine::new(pool.clone());

        let refused = engine.toggle_lesson_active(&intruder, lessons[0]).await;
        assert!(matches!(refused, Err(AppError::Forbidden(_))));

        let hidden = engine.toggle_lesson_active(&owner, lessons[0]).await.unwrap();
        assert!(!hidden.is_active);

        let restored = engine
            .toggle_lesson_active(&admin_session(), lessons[0])
            .await
            .unwrap();
        assert!(restored.is_active);

        let missing = engine.toggle_lesson_active(&owner, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_course_without_lessons_never_issues_certificate() {
        let Some(pool) = test_pool() else {
            println!("Skipping test - DATABASE_URL not available");
            return;
        };
        let student = register(&pool, Role::Student).await;
        let (owner, course_id, lessons) = authored_course(&pool, 1).await;
        let engine = LearnEngine::new(pool.clone());
        engine.toggle_lesson_active(&owner, lessons[0]).await.unwrap();
        engine
            .enroll(student.id, student.full_name(), course_id, &enroll_form())
            .await
            .unwrap();

        let detail = engine.course_detail(student.id, course_id).await.unwrap().unwrap();
        assert_eq!((detail.total, detail.percent), (0, 0));
        assert!(detail.certificate.is_none());
        assert!(detail.next_lesson.is_none());

        let status = CertificateEngine::new(pool.clone())
            .certificate_for_course(student.id, course_id)
            .await
            .unwrap();
        assert!(matches!(status, CourseCertificate::NotIssued));
    }
}
