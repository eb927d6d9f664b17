//! Shared fixtures for integration tests.
//!
//! Each test gets its own in-memory SQLite database with migrations applied
//! and a process-local cache, wired through the production service container.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use uuid::Uuid;

use common::{AppError, AppResult, DatabaseConfig};
use domain::{
    Course, CourseInput, CourseSection, Lesson, LessonInput, LessonStatus, PaymentDetails,
    PricingRow, ProductInput, ProductStatus, ProductWithCourses, SectionInput, SectionStatus,
    User, UserProfile, UserRole, Viewer,
};
use marketplace_lib::infra::{DataCache, Database};
use marketplace_lib::payments::{CheckoutProduct, Payer, PaymentCompleted, PaymentGateway};
use marketplace_lib::service::{ServiceContainer, Services};

/// Payment processor stand-in that records checkout requests and serves
/// completed sessions from a fixed list.
#[derive(Default)]
pub struct FakeGateway {
    pub sessions: Mutex<Vec<PaymentCompleted>>,
    pub checkouts: Mutex<Vec<(Uuid, Uuid)>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_intent(
        &self,
        product: &CheckoutProduct,
        payer: &Payer,
    ) -> AppResult<String> {
        self.checkouts
            .lock()
            .map_err(|_| AppError::internal("poisoned"))?
            .push((product.id, payer.user_id));
        Ok(format!("secret_{}", product.id))
    }

    async fn retrieve_completed_session(&self, session_id: &str) -> AppResult<PaymentCompleted> {
        self.sessions
            .lock()
            .map_err(|_| AppError::internal("poisoned"))?
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn payment_details(
        &self,
        _session_id: &str,
        price_paid_in_cents: i32,
        _refunded: bool,
    ) -> AppResult<PaymentDetails> {
        Ok(PaymentDetails {
            receipt_url: None,
            pricing_rows: vec![PricingRow {
                label: "Total".to_string(),
                amount_in_dollars: f64::from(price_paid_in_cents) / 100.0,
                emphasized: true,
            }],
        })
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub database: Arc<Database>,
    pub cache: DataCache,
    pub gateway: Arc<FakeGateway>,
    pub services: Services,
    pub admin: Viewer,
}

/// Fresh database, cache and services.
pub async fn setup() -> TestApp {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        // One connection keeps every query on the same in-memory database
        max_connections: 1,
        min_connections: 1,
    };
    let database = Database::connect(&config)
        .await
        .expect("in-memory database should migrate");
    let db = database.get_connection();
    let cache = DataCache::in_memory();
    let gateway = Arc::new(FakeGateway::default());
    let services = Services::from_connection(db.clone(), cache.clone(), gateway.clone());

    TestApp {
        db,
        database: Arc::new(database),
        cache,
        gateway,
        services,
        admin: Viewer::admin(Uuid::new_v4()),
    }
}

impl TestApp {
    pub async fn create_user(&self, name: &str) -> User {
        self.sync_user(name, None).await
    }

    pub async fn create_admin(&self, name: &str) -> User {
        self.sync_user(name, Some(UserRole::Admin)).await
    }

    async fn sync_user(&self, name: &str, role: Option<UserRole>) -> User {
        let external_id = format!("user_{}", Uuid::new_v4().simple());
        self.services
            .users()
            .sync_user(UserProfile {
                email: format!("{external_id}@example.com"),
                external_id,
                name: name.to_string(),
                image_url: None,
                role,
            })
            .await
            .expect("user sync should succeed")
    }

    pub async fn create_course(&self, name: &str) -> Course {
        self.services
            .courses()
            .create_course(
                self.admin,
                CourseInput {
                    name: name.to_string(),
                    description: format!("About {name}"),
                },
            )
            .await
            .expect("course create should succeed")
    }

    pub async fn create_section(
        &self,
        course_id: Uuid,
        name: &str,
        status: SectionStatus,
    ) -> CourseSection {
        self.services
            .courses()
            .create_section(
                self.admin,
                course_id,
                SectionInput {
                    name: name.to_string(),
                    status,
                },
            )
            .await
            .expect("section create should succeed")
    }

    pub async fn create_lesson(&self, section_id: Uuid, name: &str, status: LessonStatus) -> Lesson {
        self.services
            .lessons()
            .create_lesson(self.admin, lesson_input(section_id, name, status))
            .await
            .expect("lesson create should succeed")
    }

    pub async fn create_product(
        &self,
        name: &str,
        price_in_dollars: i32,
        course_ids: Vec<Uuid>,
    ) -> ProductWithCourses {
        self.services
            .products()
            .create_product(
                self.admin,
                ProductInput {
                    name: name.to_string(),
                    description: format!("{name} bundle"),
                    image_url: "/images/bundle.png".to_string(),
                    price_in_dollars,
                    status: ProductStatus::Public,
                    course_ids,
                },
            )
            .await
            .expect("product create should succeed")
    }

    pub async fn execute(&self, sql: &str) {
        self.db
            .execute_unprepared(sql)
            .await
            .expect("raw statement should run");
    }
}

pub fn lesson_input(section_id: Uuid, name: &str, status: LessonStatus) -> LessonInput {
    LessonInput {
        section_id,
        name: name.to_string(),
        status,
        youtube_video_id: "dQw4w9WgXcQ".to_string(),
        description: None,
    }
}

pub fn completed_session(session_id: &str, user_id: Uuid, product_id: Uuid) -> PaymentCompleted {
    PaymentCompleted {
        session_id: session_id.to_string(),
        user_id: Some(user_id.to_string()),
        product_id: Some(product_id.to_string()),
        amount_total: None,
    }
}
