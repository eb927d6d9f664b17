//! Product repository and the product/course join.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::{course, course_product, product, purchase};
use common::{AppError, AppResult};
use domain::{Product, ProductInput, ProductStatus, ProductTableRow, ProductWithCourses};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Product and the ids of the courses it bundles.
    async fn find_with_courses(&self, id: Uuid) -> AppResult<Option<ProductWithCourses>>;

    /// Every product with course and customer counts, ordered by name.
    async fn list_table(&self) -> AppResult<Vec<ProductTableRow>>;

    /// Public products ordered by name.
    async fn list_public(&self) -> AppResult<Vec<Product>>;
}

pub struct ProductStore {
    db: DatabaseConnection,
}

impl ProductStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for ProductStore {
    async fn find_with_courses(&self, id: Uuid) -> AppResult<Option<ProductWithCourses>> {
        find_with_courses(&self.db, id).await
    }

    async fn list_table(&self) -> AppResult<Vec<ProductTableRow>> {
        let products = product::Entity::find()
            .order_by_asc(product::Column::Name)
            .all(&self.db)
            .await?;

        let courses: Vec<(Uuid, i64)> = course_product::Entity::find()
            .select_only()
            .column(course_product::Column::ProductId)
            .column_as(Expr::col(course_product::Column::CourseId).count(), "count")
            .group_by(course_product::Column::ProductId)
            .into_tuple()
            .all(&self.db)
            .await?;
        let courses: HashMap<Uuid, i64> = courses.into_iter().collect();

        let customers: Vec<(Uuid, i64)> = purchase::Entity::find()
            .select_only()
            .column(purchase::Column::ProductId)
            .column_as(Expr::col(purchase::Column::UserId).count(), "count")
            .filter(purchase::Column::RefundedAt.is_null())
            .group_by(purchase::Column::ProductId)
            .into_tuple()
            .all(&self.db)
            .await?;
        let customers: HashMap<Uuid, i64> = customers.into_iter().collect();

        Ok(products
            .into_iter()
            .map(|model| {
                let courses_count = courses.get(&model.id).copied().unwrap_or(0).max(0) as u64;
                let customers_count =
                    customers.get(&model.id).copied().unwrap_or(0).max(0) as u64;
                ProductTableRow {
                    product: Product::from(model),
                    courses_count,
                    customers_count,
                }
            })
            .collect())
    }

    async fn list_public(&self) -> AppResult<Vec<Product>> {
        let products = product::Entity::find()
            .filter(product::Column::Status.eq(ProductStatus::Public.as_str()))
            .order_by_asc(product::Column::Name)
            .all(&self.db)
            .await?;
        Ok(products.into_iter().map(Product::from).collect())
    }
}

/// Product writes bound to an open transaction.
pub struct TxProductRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxProductRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find_with_courses(&self, id: Uuid) -> AppResult<Option<ProductWithCourses>> {
        find_with_courses(self.txn, id).await
    }

    pub async fn ids_for_course(&self, course_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = course_product::Entity::find()
            .select_only()
            .column(course_product::Column::ProductId)
            .filter(course_product::Column::CourseId.eq(course_id))
            .into_tuple()
            .all(self.txn)
            .await?;
        Ok(ids)
    }

    pub async fn create(&self, input: &ProductInput) -> AppResult<ProductWithCourses> {
        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description.trim().to_string()),
            image_url: Set(input.image_url.trim().to_string()),
            price_in_dollars: Set(input.price_in_dollars),
            status: Set(input.status.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.txn)
        .await?;

        let course_ids = input.distinct_course_ids();
        self.link_courses(model.id, &course_ids).await?;

        Ok(ProductWithCourses {
            product: Product::from(model),
            course_ids,
        })
    }

    /// Updates the product and rewrites its course links.
    pub async fn update(&self, id: Uuid, input: &ProductInput) -> AppResult<ProductWithCourses> {
        let existing = product::Entity::find_by_id(id)
            .one(self.txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: product::ActiveModel = existing.into();
        active.name = Set(input.name.trim().to_string());
        active.description = Set(input.description.trim().to_string());
        active.image_url = Set(input.image_url.trim().to_string());
        active.price_in_dollars = Set(input.price_in_dollars);
        active.status = Set(input.status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        let model = active.update(self.txn).await?;

        course_product::Entity::delete_many()
            .filter(course_product::Column::ProductId.eq(id))
            .exec(self.txn)
            .await?;
        let course_ids = input.distinct_course_ids();
        self.link_courses(id, &course_ids).await?;

        Ok(ProductWithCourses {
            product: Product::from(model),
            course_ids,
        })
    }

    pub async fn has_purchases(&self, id: Uuid) -> AppResult<bool> {
        let count = purchase::Entity::find()
            .filter(purchase::Column::ProductId.eq(id))
            .count(self.txn)
            .await?;
        Ok(count > 0)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = product::Entity::delete_by_id(id).exec(self.txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn link_courses(&self, product_id: Uuid, course_ids: &[Uuid]) -> AppResult<()> {
        if course_ids.is_empty() {
            return Ok(());
        }

        let known = course::Entity::find()
            .filter(course::Column::Id.is_in(course_ids.iter().copied()))
            .count(self.txn)
            .await?;
        if known != course_ids.len() as u64 {
            return Err(AppError::validation("Unknown course"));
        }

        let now = Utc::now();
        let rows = course_ids.iter().map(|course_id| course_product::ActiveModel {
            course_id: Set(*course_id),
            product_id: Set(product_id),
            created_at: Set(now),
        });
        course_product::Entity::insert_many(rows)
            .exec_without_returning(self.txn)
            .await?;
        Ok(())
    }
}

async fn find_with_courses<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> AppResult<Option<ProductWithCourses>> {
    let Some(model) = product::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let course_ids: Vec<Uuid> = course_product::Entity::find()
        .select_only()
        .column(course_product::Column::CourseId)
        .filter(course_product::Column::ProductId.eq(id))
        .order_by_asc(course_product::Column::CreatedAt)
        .into_tuple()
        .all(db)
        .await?;

    Ok(Some(ProductWithCourses {
        product: Product::from(model),
        course_ids,
    }))
}
