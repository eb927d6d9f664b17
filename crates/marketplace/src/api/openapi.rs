//! OpenAPI documentation.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::api::handlers::course_handler::{CourseRequest, ReorderRequest, SectionRequest};
use crate::api::handlers::lesson_handler::{CompletionRequest, LessonRequest};
use crate::api::handlers::product_handler::{CheckoutResponse, OwnershipResponse, ProductRequest};
use domain::{
    Course, CourseLayout, CourseOutline, CourseSection, CourseSummary, CourseTableRow, Lesson,
    LessonCapabilities, LessonPage, LessonStatus, PaymentDetails, PricingRow, Product,
    ProductPage, ProductSnapshot, ProductStatus, ProductTableRow, ProductWithCourses, Purchase,
    PurchaseReceipt, SaleRow, SectionOutline, SectionStatus, User, UserCourseProgress, UserRole,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::course_handler::list_course_table,
        crate::api::handlers::course_handler::list_course_summaries,
        crate::api::handlers::course_handler::get_course_for_edit,
        crate::api::handlers::course_handler::create_course,
        crate::api::handlers::course_handler::update_course,
        crate::api::handlers::course_handler::delete_course,
        crate::api::handlers::course_handler::create_section,
        crate::api::handlers::course_handler::update_section,
        crate::api::handlers::course_handler::delete_section,
        crate::api::handlers::course_handler::reorder_sections,
        crate::api::handlers::course_handler::list_user_courses,
        crate::api::handlers::course_handler::get_course_layout,
        crate::api::handlers::lesson_handler::create_lesson,
        crate::api::handlers::lesson_handler::update_lesson,
        crate::api::handlers::lesson_handler::delete_lesson,
        crate::api::handlers::lesson_handler::reorder_lessons,
        crate::api::handlers::lesson_handler::get_lesson_page,
        crate::api::handlers::lesson_handler::set_lesson_complete,
        crate::api::handlers::product_handler::list_product_table,
        crate::api::handlers::product_handler::get_product_for_edit,
        crate::api::handlers::product_handler::create_product,
        crate::api::handlers::product_handler::update_product,
        crate::api::handlers::product_handler::delete_product,
        crate::api::handlers::product_handler::list_public_products,
        crate::api::handlers::product_handler::get_public_product,
        crate::api::handlers::product_handler::create_checkout,
        crate::api::handlers::product_handler::get_ownership,
        crate::api::handlers::purchase_handler::list_user_purchases,
        crate::api::handlers::purchase_handler::get_user_purchase,
        crate::api::handlers::purchase_handler::list_sales,
        crate::api::handlers::user_handler::get_current_user,
        crate::api::handlers::webhook_handler::checkout_return,
        crate::api::handlers::webhook_handler::payment_notification,
        crate::api::handlers::webhook_handler::identity_notification,
    ),
    components(
        schemas(
            CourseRequest,
            SectionRequest,
            ReorderRequest,
            LessonRequest,
            CompletionRequest,
            ProductRequest,
            CheckoutResponse,
            OwnershipResponse,
            Course,
            CourseSection,
            CourseSummary,
            CourseTableRow,
            CourseOutline,
            SectionOutline,
            CourseLayout,
            UserCourseProgress,
            Lesson,
            LessonStatus,
            SectionStatus,
            LessonCapabilities,
            LessonPage,
            Product,
            ProductStatus,
            ProductPage,
            ProductTableRow,
            ProductWithCourses,
            Purchase,
            ProductSnapshot,
            PurchaseReceipt,
            PaymentDetails,
            PricingRow,
            SaleRow,
            User,
            UserRole,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Courses", description = "Course layouts and owned courses"),
        (name = "Lessons", description = "Lesson pages and completion marks"),
        (name = "Products", description = "Storefront and checkout"),
        (name = "Purchases", description = "Purchase history and receipts"),
        (name = "Users", description = "Signed-in user"),
        (name = "Admin", description = "Catalog administration and sales"),
        (name = "Webhooks", description = "Payment and identity provider callbacks"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
