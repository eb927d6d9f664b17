//! Unit of Work: repository access and transaction lifecycle.
//!
//! Pool-level repositories serve reads. Every write goes through a
//! [`TransactionContext`], whose repositories share one database transaction
//! that commits when the closure returns `Ok` and rolls back otherwise.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};

use crate::repository::{
    AccessRepository, AccessStore, CompletionRepository, CompletionStore, CourseRepository,
    CourseStore, LessonRepository, LessonStore, ProductRepository, ProductStore,
    PurchaseRepository, PurchaseStore, SectionRepository, SectionStore, TxAccessRepository,
    TxCompletionRepository, TxCourseRepository, TxLessonRepository, TxProductRepository,
    TxPurchaseRepository, TxSectionRepository, TxUserRepository, UserRepository, UserStore,
};
use common::{AppError, AppResult};

/// Boxed future returned by transaction closures.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because of the generic transaction methods; tests
/// implement it over mocked repositories instead.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn courses(&self) -> Arc<dyn CourseRepository>;

    fn sections(&self) -> Arc<dyn SectionRepository>;

    fn lessons(&self) -> Arc<dyn LessonRepository>;

    fn products(&self) -> Arc<dyn ProductRepository>;

    fn purchases(&self) -> Arc<dyn PurchaseRepository>;

    fn users(&self) -> Arc<dyn UserRepository>;

    fn access(&self) -> Arc<dyn AccessRepository>;

    fn completions(&self) -> Arc<dyn CompletionRepository>;

    /// Execute a closure within a ReadCommitted transaction.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Repository access within one open transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn courses(&self) -> TxCourseRepository<'a> {
        TxCourseRepository::new(self.txn)
    }

    pub fn sections(&self) -> TxSectionRepository<'a> {
        TxSectionRepository::new(self.txn)
    }

    pub fn lessons(&self) -> TxLessonRepository<'a> {
        TxLessonRepository::new(self.txn)
    }

    pub fn products(&self) -> TxProductRepository<'a> {
        TxProductRepository::new(self.txn)
    }

    pub fn purchases(&self) -> TxPurchaseRepository<'a> {
        TxPurchaseRepository::new(self.txn)
    }

    pub fn users(&self) -> TxUserRepository<'a> {
        TxUserRepository::new(self.txn)
    }

    pub fn access(&self) -> TxAccessRepository<'a> {
        TxAccessRepository::new(self.txn)
    }

    pub fn completions(&self) -> TxCompletionRepository<'a> {
        TxCompletionRepository::new(self.txn)
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    courses: Arc<CourseStore>,
    sections: Arc<SectionStore>,
    lessons: Arc<LessonStore>,
    products: Arc<ProductStore>,
    purchases: Arc<PurchaseStore>,
    users: Arc<UserStore>,
    access: Arc<AccessStore>,
    completions: Arc<CompletionStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            courses: Arc::new(CourseStore::new(db.clone())),
            sections: Arc::new(SectionStore::new(db.clone())),
            lessons: Arc::new(LessonStore::new(db.clone())),
            products: Arc::new(ProductStore::new(db.clone())),
            purchases: Arc::new(PurchaseStore::new(db.clone())),
            users: Arc::new(UserStore::new(db.clone())),
            access: Arc::new(AccessStore::new(db.clone())),
            completions: Arc::new(CompletionStore::new(db.clone())),
            db,
        }
    }

    async fn execute_transaction<F, T>(&self, isolation: IsolationLevel, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(isolation), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
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

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        self.execute_transaction(IsolationLevel::ReadCommitted, f)
            .await
    }
}
