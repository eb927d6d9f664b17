//! Service Container - Centralized service access with parallel execution support.
//!
//! Wires every service over one Unit of Work and one cache so that writes made
//! through any service invalidate what the others have cached.

use std::future::Future;
use std::sync::Arc;

use super::{
    CheckoutManager, CheckoutService, CourseManager, CourseService, Fulfillment,
    FulfillmentService, LessonManager, LessonService, ProductManager, ProductService,
    PurchaseManager, PurchaseService, UserManager, UserService,
};
use super::queries::CachedQueries;
use crate::infra::{DataCache, Persistence};
use crate::payments::PaymentGateway;
use common::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn courses(&self) -> Arc<dyn CourseService>;

    fn lessons(&self) -> Arc<dyn LessonService>;

    fn products(&self) -> Arc<dyn ProductService>;

    fn purchases(&self) -> Arc<dyn PurchaseService>;

    fn checkout(&self) -> Arc<dyn CheckoutService>;

    fn fulfillment(&self) -> Arc<dyn FulfillmentService>;

    fn users(&self) -> Arc<dyn UserService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    course_service: Arc<dyn CourseService>,
    lesson_service: Arc<dyn LessonService>,
    product_service: Arc<dyn ProductService>,
    purchase_service: Arc<dyn PurchaseService>,
    checkout_service: Arc<dyn CheckoutService>,
    fulfillment_service: Arc<dyn FulfillmentService>,
    user_service: Arc<dyn UserService>,
}

impl Services {
    /// Create service container from database connection, cache and payment gateway
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        cache: DataCache,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let uow = Arc::new(Persistence::new(db));
        let queries = CachedQueries::new(uow.clone(), cache.clone());

        let fulfillment_service: Arc<dyn FulfillmentService> =
            Arc::new(Fulfillment::new(uow.clone(), cache));

        Self {
            course_service: Arc::new(CourseManager::new(uow.clone(), queries.clone())),
            lesson_service: Arc::new(LessonManager::new(uow.clone(), queries.clone())),
            product_service: Arc::new(ProductManager::new(uow.clone(), queries.clone())),
            purchase_service: Arc::new(PurchaseManager::new(queries.clone(), gateway.clone())),
            checkout_service: Arc::new(CheckoutManager::new(
                queries.clone(),
                gateway,
                fulfillment_service.clone(),
            )),
            fulfillment_service,
            user_service: Arc::new(UserManager::new(uow, queries)),
        }
    }
}

impl ServiceContainer for Services {
    fn courses(&self) -> Arc<dyn CourseService> {
        self.course_service.clone()
    }

    fn lessons(&self) -> Arc<dyn LessonService> {
        self.lesson_service.clone()
    }

    fn products(&self) -> Arc<dyn ProductService> {
        self.product_service.clone()
    }

    fn purchases(&self) -> Arc<dyn PurchaseService> {
        self.purchase_service.clone()
    }

    fn checkout(&self) -> Arc<dyn CheckoutService> {
        self.checkout_service.clone()
    }

    fn fulfillment(&self) -> Arc<dyn FulfillmentService> {
        self.fulfillment_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }
}

/// Parallel execution utilities for running independent reads concurrently.
pub mod parallel {
    use super::*;
    use tokio::try_join;

    /// Execute two independent async operations in parallel.
    ///
    /// If either operation fails, the error is returned immediately.
    pub async fn join2<F1, F2, T1, T2>(f1: F1, f2: F2) -> AppResult<(T1, T2)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
    {
        try_join!(f1, f2)
    }

    /// Execute a collection of homogeneous async operations in parallel.
    ///
    /// Results are returned in the same order as the input futures.
    pub async fn join_all<F, T>(futures: Vec<F>) -> AppResult<Vec<T>>
    where
        F: Future<Output = AppResult<T>>,
    {
        let results = futures::future::join_all(futures).await;
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::parallel;
    use common::AppError;

    #[tokio::test]
    async fn test_join_all_preserves_order() {
        let futures: Vec<_> = (0..5).map(|i| async move { Ok::<_, AppError>(i * 2) }).collect();

        let results = parallel::join_all(futures).await.unwrap();
        assert_eq!(results, vec![0, 2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn test_join2_surfaces_first_error() {
        let result = parallel::join2(
            async { Ok::<_, AppError>(1) },
            async { Err::<i32, _>(AppError::NotFound) },
        )
        .await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
