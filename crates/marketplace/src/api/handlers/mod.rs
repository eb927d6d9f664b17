//! HTTP handlers.

pub mod course_handler;
pub mod health_handler;
pub mod lesson_handler;
pub mod product_handler;
pub mod purchase_handler;
pub mod user_handler;
pub mod webhook_handler;

pub use course_handler::{admin_course_routes, course_routes};
pub use health_handler::health_routes;
pub use lesson_handler::{admin_lesson_routes, lesson_routes};
pub use product_handler::{admin_product_routes, product_routes};
pub use purchase_handler::{admin_sales_routes, purchase_routes};
pub use user_handler::user_routes;
pub use webhook_handler::webhook_routes;
