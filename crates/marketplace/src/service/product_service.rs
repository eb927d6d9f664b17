//! Product service - product authoring and the public storefront.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::container::parallel;
use super::queries::CachedQueries;
use super::require_catalog_manager;
use crate::infra::{Invalidation, UnitOfWork};
use common::{AppError, AppResult, OptionExt};
use domain::permissions::can_view_product;
use domain::{
    ContentScope, CourseOutline, Product, ProductInput, ProductPage, ProductTableRow,
    ProductWithCourses, Viewer,
};

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductService: Send + Sync {
    /// Admin table with course and customer counts
    async fn list_product_table(&self, viewer: Viewer) -> AppResult<Vec<ProductTableRow>>;

    async fn get_product_for_edit(&self, viewer: Viewer, id: Uuid)
        -> AppResult<ProductWithCourses>;

    async fn create_product(
        &self,
        viewer: Viewer,
        input: ProductInput,
    ) -> AppResult<ProductWithCourses>;

    async fn update_product(
        &self,
        viewer: Viewer,
        id: Uuid,
        input: ProductInput,
    ) -> AppResult<ProductWithCourses>;

    /// Refused while purchases reference the product
    async fn delete_product(&self, viewer: Viewer, id: Uuid) -> AppResult<()>;

    /// Public products ordered by name
    async fn list_public_products(&self) -> AppResult<Vec<Product>>;

    /// Product with the outline of each bundled course as the viewer sees it
    async fn get_public_product(&self, viewer: Viewer, id: Uuid) -> AppResult<ProductPage>;
}

pub struct ProductManager<U: UnitOfWork> {
    uow: Arc<U>,
    queries: CachedQueries<U>,
}

impl<U: UnitOfWork + 'static> ProductManager<U> {
    pub fn new(uow: Arc<U>, queries: CachedQueries<U>) -> Self {
        Self { uow, queries }
    }

    async fn visible_outline(
        &self,
        viewer: &Viewer,
        course_id: Uuid,
    ) -> AppResult<Option<CourseOutline>> {
        let has_access = match viewer.user_id {
            Some(user_id) => self.queries.has_access(user_id, course_id).await?,
            None => false,
        };
        self.queries
            .outline(course_id, ContentScope::resolve(viewer, has_access))
            .await
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> ProductService for ProductManager<U> {
    async fn list_product_table(&self, viewer: Viewer) -> AppResult<Vec<ProductTableRow>> {
        require_catalog_manager(&viewer)?;
        self.queries.product_table().await
    }

    async fn get_product_for_edit(
        &self,
        viewer: Viewer,
        id: Uuid,
    ) -> AppResult<ProductWithCourses> {
        require_catalog_manager(&viewer)?;
        self.queries.product(id).await?.ok_or_not_found()
    }

    async fn create_product(
        &self,
        viewer: Viewer,
        input: ProductInput,
    ) -> AppResult<ProductWithCourses> {
        require_catalog_manager(&viewer)?;
        input.validate()?;

        let product = self
            .uow
            .transaction(move |ctx| Box::pin(async move { ctx.products().create(&input).await }))
            .await?;

        tracing::info!(product_id = %product.product.id, "Product created");
        self.queries
            .cache()
            .invalidate(Invalidation::new().product(product.product.id).into_tags())
            .await;
        Ok(product)
    }

    async fn update_product(
        &self,
        viewer: Viewer,
        id: Uuid,
        input: ProductInput,
    ) -> AppResult<ProductWithCourses> {
        require_catalog_manager(&viewer)?;
        input.validate()?;

        let product = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move { ctx.products().update(id, &input).await })
            })
            .await?;

        self.queries
            .cache()
            .invalidate(Invalidation::new().product(id).into_tags())
            .await;
        Ok(product)
    }

    async fn delete_product(&self, viewer: Viewer, id: Uuid) -> AppResult<()> {
        require_catalog_manager(&viewer)?;

        self.uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    if ctx.products().has_purchases(id).await? {
                        return Err(AppError::validation(
                            "Product has purchases and cannot be deleted",
                        ));
                    }
                    ctx.products().delete(id).await
                })
            })
            .await?;

        tracing::info!(product_id = %id, "Product deleted");
        self.queries
            .cache()
            .invalidate(Invalidation::new().product(id).into_tags())
            .await;
        Ok(())
    }

    async fn list_public_products(&self) -> AppResult<Vec<Product>> {
        self.queries.public_products().await
    }

    async fn get_public_product(&self, viewer: Viewer, id: Uuid) -> AppResult<ProductPage> {
        let ProductWithCourses {
            product,
            course_ids,
        } = self.queries.product(id).await?.ok_or_not_found()?;
        if !can_view_product(&viewer, product.status) {
            return Err(AppError::PermissionDenied);
        }

        let outlines = parallel::join_all(
            course_ids
                .iter()
                .map(|course_id| self.visible_outline(&viewer, *course_id))
                .collect(),
        )
        .await?;

        Ok(ProductPage {
            product,
            courses: outlines.into_iter().flatten().collect(),
        })
    }
}
