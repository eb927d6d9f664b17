//! SeaORM entities for the marketplace schema.

pub mod course;
pub mod course_product;
pub mod course_section;
pub mod lesson;
pub mod product;
pub mod purchase;
pub mod user;
pub mod user_course_access;
pub mod user_lesson_complete;
