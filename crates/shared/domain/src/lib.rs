//! Domain layer - Core marketplace entities, value objects and rules.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! catalog and commerce entities, cache tag naming, and visibility rules.

pub mod constants;
pub mod course;
pub mod error;
pub mod navigation;
pub mod permissions;
pub mod product;
pub mod purchase;
pub mod tags;
pub mod user;
pub mod viewer;

pub use constants::*;
pub use course::{
    Course, CourseInput, CourseLayout, CourseOutline, CourseSection, CourseSummary,
    CourseTableRow, Lesson, LessonInput, LessonPosition, LessonStatus, SectionInput,
    SectionOutline, SectionStatus, UserCourseProgress,
};
pub use error::{DomainError, DomainResult};
pub use navigation::{Direction, LessonPage};
pub use permissions::{ContentScope, LessonCapabilities};
pub use product::{
    Product, ProductInput, ProductPage, ProductStatus, ProductTableRow, ProductWithCourses,
};
pub use purchase::{
    NewPurchase, PaymentDetails, PricingRow, ProductSnapshot, Purchase, PurchaseReceipt, SaleRow,
};
pub use tags::{CacheEntity, TagSet};
pub use user::{Redaction, User, UserProfile, UserRole};
pub use viewer::Viewer;
