//! Application services layer - Use cases and business logic.
//!
//! Services check permissions first, read through [`CachedQueries`], write in
//! a Unit of Work transaction and invalidate the affected cache tags once the
//! transaction has committed.

mod checkout_service;
pub mod container;
mod course_service;
pub mod fulfillment;
mod lesson_service;
mod product_service;
mod purchase_service;
pub mod queries;
mod user_service;

use common::{AppError, AppResult};
use domain::permissions::can_manage_catalog;
use domain::Viewer;

// Service Container
pub use container::{parallel, ServiceContainer, Services};

// Service traits and implementations
pub use checkout_service::{CheckoutManager, CheckoutService};
pub use course_service::{CourseManager, CourseService};
pub use fulfillment::{Fulfillment, FulfillmentOutcome, FulfillmentService, FulfillmentStage};
pub use lesson_service::{LessonManager, LessonService};
pub use product_service::{ProductManager, ProductService};
pub use purchase_service::{PurchaseManager, PurchaseService};
pub use queries::CachedQueries;
pub use user_service::{UserManager, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use checkout_service::MockCheckoutService;
#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
#[cfg(any(test, feature = "test-utils"))]
pub use course_service::MockCourseService;
#[cfg(any(test, feature = "test-utils"))]
pub use fulfillment::MockFulfillmentService;
#[cfg(any(test, feature = "test-utils"))]
pub use lesson_service::MockLessonService;
#[cfg(any(test, feature = "test-utils"))]
pub use product_service::MockProductService;
#[cfg(any(test, feature = "test-utils"))]
pub use purchase_service::MockPurchaseService;
#[cfg(any(test, feature = "test-utils"))]
pub use user_service::MockUserService;

/// Catalog administration is admin-only.
pub(crate) fn require_catalog_manager(viewer: &Viewer) -> AppResult<()> {
    if can_manage_catalog(viewer) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::CachedQueries;
    use crate::infra::{DataCache, TransactionContext, TxFuture, UnitOfWork};
    use crate::repository::{
        AccessRepository, CompletionRepository, CourseRepository, LessonRepository,
        MockAccessRepository, MockCompletionRepository, MockCourseRepository,
        MockLessonRepository, MockProductRepository, MockPurchaseRepository,
        MockSectionRepository, MockUserRepository, ProductRepository, PurchaseRepository,
        SectionRepository, UserRepository,
    };
    use common::{AppError, AppResult};

    /// Unit of Work over mocks without expectations: any store access panics.
    #[derive(Default)]
    pub struct TestUnitOfWork {
        pub courses: Arc<MockCourseRepository>,
        pub sections: Arc<MockSectionRepository>,
        pub lessons: Arc<MockLessonRepository>,
        pub products: Arc<MockProductRepository>,
        pub purchases: Arc<MockPurchaseRepository>,
        pub users: Arc<MockUserRepository>,
        pub access: Arc<MockAccessRepository>,
        pub completions: Arc<MockCompletionRepository>,
    }

    impl TestUnitOfWork {
        pub fn queries(self) -> CachedQueries<Self> {
            CachedQueries::new(Arc::new(self), DataCache::in_memory())
        }

        pub fn shared(self) -> (Arc<Self>, CachedQueries<Self>) {
            let uow = Arc::new(self);
            let queries = CachedQueries::new(uow.clone(), DataCache::in_memory());
            (uow, queries)
        }
    }

    #[async_trait]
    impl UnitOfWork for TestUnitOfWork {
        fn courses(&self) -> Arc<dyn CourseRepository> {
            self.courses.clone()
        }

        fn sections(&self) -> Arc<dyn SectionRepository> {
            self.sections.clone()
        }

        fn lessons(&self) -> Arc<dyn LessonRepository> {
            self.lessons.clone()
        }

        fn products(&self) -> Arc<dyn ProductRepository> {
            self.products.clone()
        }

        fn purchases(&self) -> Arc<dyn PurchaseRepository> {
            self.purchases.clone()
        }

        fn users(&self) -> Arc<dyn UserRepository> {
            self.users.clone()
        }

        fn access(&self) -> Arc<dyn AccessRepository> {
            self.access.clone()
        }

        fn completions(&self) -> Arc<dyn CompletionRepository> {
            self.completions.clone()
        }

        async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
        where
            F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
            T: Send,
        {
            Err(AppError::internal("No transactions in unit tests"))
        }
    }
}
