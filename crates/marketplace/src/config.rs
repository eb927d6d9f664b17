//! Marketplace configuration.

use std::env;

use common::{CacheBackend, CacheConfig, DatabaseConfig, JwtConfig, PaymentConfig, ServiceConfig};

/// Marketplace configuration, loaded from the environment.
#[derive(Clone)]
pub struct MarketplaceConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub jwt: JwtConfig,
    pub payments: PaymentConfig,
    /// Shared secret for identity-provider user sync webhooks
    pub identity_webhook_secret: String,
    /// Public base URL, used for checkout return URLs and absolute image URLs
    pub server_url: String,
}

impl MarketplaceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service.service_name),
                host: env::var("HOST").unwrap_or(defaults.service.host),
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.service.port),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.database.max_connections),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.database.min_connections),
            },
            cache: CacheConfig {
                backend: env::var("CACHE_BACKEND")
                    .map(|v| CacheBackend::parse(&v))
                    .unwrap_or(defaults.cache.backend),
                url: env::var("REDIS_URL").unwrap_or(defaults.cache.url),
                namespace: env::var("CACHE_NAMESPACE").unwrap_or(defaults.cache.namespace),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt.secret),
                leeway_seconds: env::var("JWT_LEEWAY_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.jwt.leeway_seconds),
            },
            payments: PaymentConfig {
                secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or(defaults.payments.secret_key),
                webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                    .unwrap_or(defaults.payments.webhook_secret),
                api_base: env::var("STRIPE_API_BASE").unwrap_or(defaults.payments.api_base),
                webhook_tolerance_seconds: env::var("STRIPE_WEBHOOK_TOLERANCE_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.payments.webhook_tolerance_seconds),
                currency: env::var("STRIPE_CURRENCY").unwrap_or(defaults.payments.currency),
            },
            identity_webhook_secret: env::var("IDENTITY_WEBHOOK_SECRET")
                .unwrap_or(defaults.identity_webhook_secret),
            server_url: env::var("SERVER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.server_url),
        }
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}

impl std::fmt::Debug for MarketplaceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceConfig")
            .field("service", &self.service)
            .field("database", &self.database)
            .field("cache", &self.cache)
            .field("jwt", &self.jwt)
            .field("payments", &self.payments)
            .field("identity_webhook_secret", &"[REDACTED]")
            .field("server_url", &self.server_url)
            .finish()
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            jwt: JwtConfig::default(),
            payments: PaymentConfig::default(),
            identity_webhook_secret: String::new(),
            server_url: "http://localhost:3000".to_string(),
        }
    }
}
