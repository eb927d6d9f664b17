//! Previous/next lesson navigation and visibility.

mod support;

use common::AppError;
use domain::{LessonStatus, SectionStatus, Viewer};
use marketplace_lib::service::ServiceContainer;
use uuid::Uuid;

use crate::support::{completed_session, setup, TestApp};

struct SeededCourse {
    course_id: Uuid,
    /// Lessons in display order: s1 [a, b(private), c], s2(private) [d], s3 [e(preview)]
    lessons: [Uuid; 5],
}

async fn seed_course(app: &TestApp) -> SeededCourse {
    let course = app.create_course("Navigation").await;
    let s1 = app.create_section(course.id, "One", SectionStatus::Public).await;
    let s2 = app.create_section(course.id, "Two", SectionStatus::Private).await;
    // An empty public section between s2 and s3 must not stop the walk
    app.create_section(course.id, "Empty", SectionStatus::Public).await;
    let s3 = app.create_section(course.id, "Three", SectionStatus::Public).await;

    let a = app.create_lesson(s1.id, "A", LessonStatus::Public).await;
    let b = app.create_lesson(s1.id, "B", LessonStatus::Private).await;
    let c = app.create_lesson(s1.id, "C", LessonStatus::Public).await;
    let d = app.create_lesson(s2.id, "D", LessonStatus::Public).await;
    let e = app.create_lesson(s3.id, "E", LessonStatus::Preview).await;

    SeededCourse {
        course_id: course.id,
        lessons: [a.id, b.id, c.id, d.id, e.id],
    }
}

async fn neighbors(app: &TestApp, viewer: Viewer, lesson_id: Uuid) -> (Option<Uuid>, Option<Uuid>) {
    let page = app
        .services
        .lessons()
        .get_lesson_page(viewer, lesson_id)
        .await
        .unwrap();
    (page.previous_lesson_id, page.next_lesson_id)
}

#[tokio::test]
async fn test_full_scope_walks_every_lesson() {
    let app = setup().await;
    let course = seed_course(&app).await;
    let [a, b, c, d, e] = course.lessons;

    assert_eq!(neighbors(&app, app.admin, a).await, (None, Some(b)));
    assert_eq!(neighbors(&app, app.admin, b).await, (Some(a), Some(c)));
    assert_eq!(neighbors(&app, app.admin, c).await, (Some(b), Some(d)));
    assert_eq!(neighbors(&app, app.admin, d).await, (Some(c), Some(e)));
    assert_eq!(neighbors(&app, app.admin, e).await, (Some(d), None));
}

#[tokio::test]
async fn test_public_scope_skips_private_lessons_and_sections() {
    let app = setup().await;
    let course = seed_course(&app).await;
    let [a, _b, c, _d, e] = course.lessons;
    let anonymous = Viewer::anonymous();

    assert_eq!(neighbors(&app, anonymous, a).await, (None, Some(c)));
    assert_eq!(neighbors(&app, anonymous, c).await, (Some(a), Some(e)));
    assert_eq!(neighbors(&app, anonymous, e).await, (Some(c), None));
}

#[tokio::test]
async fn test_hidden_lessons_are_not_found_for_public_scope() {
    let app = setup().await;
    let course = seed_course(&app).await;
    let [_, b, _, d, _] = course.lessons;
    let user = app.create_user("Grace Hopper").await;

    for viewer in [Viewer::anonymous(), Viewer::user(user.id)] {
        for lesson in [b, d] {
            let result = app.services.lessons().get_lesson_page(viewer, lesson).await;
            assert!(matches!(result, Err(AppError::PermissionDenied)));
        }
    }
}

#[tokio::test]
async fn test_access_grant_widens_navigation_scope() {
    let app = setup().await;
    let course = seed_course(&app).await;
    let [a, b, c, d, e] = course.lessons;
    let user = app.create_user("Grace Hopper").await;
    let viewer = Viewer::user(user.id);

    // Cached under public scope first
    assert_eq!(neighbors(&app, viewer, a).await, (None, Some(c)));

    let product = app
        .create_product("Navigation", 10, vec![course.course_id])
        .await;
    app.services
        .fulfillment()
        .fulfill(completed_session("cs_nav", user.id, product.product.id))
        .await
        .unwrap();

    assert_eq!(neighbors(&app, viewer, a).await, (None, Some(b)));
    assert_eq!(neighbors(&app, viewer, d).await, (Some(c), Some(e)));

    let page = app.services.lessons().get_lesson_page(viewer, b).await.unwrap();
    assert!(page.capabilities.can_view);
    assert!(page.capabilities.can_complete);
    assert!(!page.capabilities.can_edit);
}

#[tokio::test]
async fn test_navigation_follows_reorder() {
    let app = setup().await;
    let course = seed_course(&app).await;
    let [a, b, c, _, _] = course.lessons;

    // Warm the cache with the original order
    assert_eq!(neighbors(&app, app.admin, c).await.0, Some(b));

    app.services
        .lessons()
        .reorder_lessons(app.admin, vec![c, a, b])
        .await
        .unwrap();

    assert_eq!(neighbors(&app, app.admin, c).await.0, None);
    assert_eq!(neighbors(&app, app.admin, a).await, (Some(c), Some(b)));
}

#[tokio::test]
async fn test_single_lesson_course_has_no_neighbors() {
    let app = setup().await;
    let course = app.create_course("Tiny").await;
    let section = app.create_section(course.id, "Only", SectionStatus::Public).await;
    let lesson = app.create_lesson(section.id, "Only", LessonStatus::Public).await;

    assert_eq!(neighbors(&app, Viewer::anonymous(), lesson.id).await, (None, None));
}
