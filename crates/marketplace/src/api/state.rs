//! Application state - Dependency injection container.

use std::sync::Arc;

use crate::config::MarketplaceConfig;
use crate::identity::{IdentityResolver, JwtIdentityResolver};
use crate::infra::{DataCache, Database};
use crate::payments::{PaymentGateway, StripeGateway};
use crate::service::{ServiceContainer, Services};

/// Secrets and limits for inbound webhooks.
#[derive(Clone, Default)]
pub struct WebhookSecrets {
    pub payments: String,
    pub payments_tolerance_seconds: i64,
    pub identity: String,
}

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<dyn ServiceContainer>,
    pub identity: Arc<dyn IdentityResolver>,
    pub cache: DataCache,
    pub database: Arc<Database>,
    pub webhooks: WebhookSecrets,
}

impl AppState {
    /// Wire production services from configuration.
    pub fn from_config(database: Arc<Database>, cache: DataCache, config: &MarketplaceConfig) -> Self {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(
            config.payments.clone(),
            config.server_url.clone(),
        ));
        let services = Arc::new(Services::from_connection(
            database.get_connection(),
            cache.clone(),
            gateway,
        ));
        let identity = Arc::new(JwtIdentityResolver::new(&config.jwt, services.users()));

        Self {
            services,
            identity,
            cache,
            database,
            webhooks: WebhookSecrets {
                payments: config.payments.webhook_secret.clone(),
                payments_tolerance_seconds: config.payments.webhook_tolerance_seconds,
                identity: config.identity_webhook_secret.clone(),
            },
        }
    }

    /// Create application state with manually injected collaborators.
    pub fn new(
        services: Arc<dyn ServiceContainer>,
        identity: Arc<dyn IdentityResolver>,
        cache: DataCache,
        database: Arc<Database>,
        webhooks: WebhookSecrets,
    ) -> Self {
        Self {
            services,
            identity,
            cache,
            database,
            webhooks,
        }
    }
}
