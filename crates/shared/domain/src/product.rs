//! Products: purchasable bundles of courses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{CENTS_PER_DOLLAR, STATUS_PRIVATE, STATUS_PUBLIC};
use crate::course::{require_name, CourseOutline};
use crate::error::{require_text, DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Public,
    Private,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Public => STATUS_PUBLIC,
            ProductStatus::Private => STATUS_PRIVATE,
        }
    }
}

impl TryFrom<&str> for ProductStatus {
    type Error = DomainError;

    fn try_from(value: &str) -> DomainResult<Self> {
        match value {
            STATUS_PUBLIC => Ok(ProductStatus::Public),
            STATUS_PRIVATE => Ok(ProductStatus::Private),
            other => Err(DomainError::validation(format!(
                "Unknown product status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price_in_dollars: i32,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn price_in_cents(&self) -> i64 {
        i64::from(self.price_in_dollars) * CENTS_PER_DOLLAR
    }

    pub fn is_public(&self) -> bool {
        self.status == ProductStatus::Public
    }
}

/// Product together with the ids of the courses it bundles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProductWithCourses {
    #[serde(flatten)]
    pub product: Product,
    pub course_ids: Vec<Uuid>,
}

/// Row of the admin product table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProductTableRow {
    #[serde(flatten)]
    pub product: Product,
    pub courses_count: u64,
    pub customers_count: u64,
}

/// Public product page: the product plus the outline of each bundled course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProductPage {
    #[serde(flatten)]
    pub product: Product,
    pub courses: Vec<CourseOutline>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price_in_dollars: i32,
    pub status: ProductStatus,
    pub course_ids: Vec<Uuid>,
}

impl ProductInput {
    pub fn validate(&self) -> DomainResult<()> {
        require_name(&self.name)?;
        require_text(&self.description, "Description is required")?;
        require_text(&self.image_url, "Image is required")?;
        if self.price_in_dollars < 0 {
            return Err(DomainError::validation("Price cannot be negative"));
        }
        if self.course_ids.is_empty() {
            return Err(DomainError::validation("At least one course is required"));
        }
        Ok(())
    }

    /// Course ids with duplicates removed, first occurrence wins.
    pub fn distinct_course_ids(&self) -> Vec<Uuid> {
        let mut seen = std::collections::HashSet::new();
        self.course_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "Bundle".into(),
            description: "Everything".into(),
            image_url: "/images/bundle.png".into(),
            price_in_dollars: 49,
            status: ProductStatus::Public,
            course_ids: vec![Uuid::new_v4()],
        }
    }

    #[test]
    fn test_product_input_rejects_negative_price() {
        let bad = ProductInput {
            price_in_dollars: -1,
            ..input()
        };
        assert!(matches!(bad.validate(), Err(DomainError::Validation(_))));
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_product_input_requires_a_course() {
        let bad = ProductInput {
            course_ids: vec![],
            ..input()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_distinct_course_ids_keeps_first_occurrence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let dup = ProductInput {
            course_ids: vec![a, b, a],
            ..input()
        };
        assert_eq!(dup.distinct_course_ids(), vec![a, b]);
    }
}
