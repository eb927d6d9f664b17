//! Repository layer for data access.
//!
//! Each entity has a pool-level read trait with a `*Store` implementation and a
//! `Tx*Repository` bound to an open transaction for writes. Queries shared by
//! both are generic over `ConnectionTrait`.

mod access_repository;
mod cascade;
mod course_repository;
pub mod entities;
mod lesson_repository;
mod product_repository;
mod purchase_repository;
mod section_repository;
mod user_repository;

pub use access_repository::{
    AccessRepository, AccessStore, CompletionRepository, CompletionStore, TxAccessRepository,
    TxCompletionRepository,
};
pub use cascade::CascadeFootprint;
pub use course_repository::{CourseRepository, CourseStore, TxCourseRepository};
pub use lesson_repository::{LessonRepository, LessonStore, TxLessonRepository};
pub use product_repository::{ProductRepository, ProductStore, TxProductRepository};
pub use purchase_repository::{PurchaseRepository, PurchaseStore, TxPurchaseRepository};
pub use section_repository::{SectionRepository, SectionStore, TxSectionRepository};
pub use user_repository::{TxUserRepository, UserRepository, UserStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use access_repository::{MockAccessRepository, MockCompletionRepository};
#[cfg(any(test, feature = "test-utils"))]
pub use course_repository::MockCourseRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use lesson_repository::MockLessonRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use product_repository::MockProductRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use purchase_repository::MockPurchaseRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use section_repository::MockSectionRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
