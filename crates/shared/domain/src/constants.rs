//! Stored string values and business constants.

// =============================================================================
// User Roles
// =============================================================================

pub const ROLE_USER: &str = "user";

/// Catalog authoring and sales access
pub const ROLE_ADMIN: &str = "admin";

// =============================================================================
// Visibility Statuses
// =============================================================================

pub const STATUS_PUBLIC: &str = "public";
pub const STATUS_PRIVATE: &str = "private";
pub const STATUS_PREVIEW: &str = "preview";

// =============================================================================
// Validation
// =============================================================================

/// Minimum name length for courses, sections, lessons and products
pub const MIN_NAME_LENGTH: usize = 1;

/// Cents per whole currency unit
pub const CENTS_PER_DOLLAR: i64 = 100;

// =============================================================================
// Soft Delete Redaction
// =============================================================================

pub const REDACTED_EMAIL: &str = "redacted@deleted.com";
pub const REDACTED_NAME: &str = "Deleted User";
pub const REDACTED_EXTERNAL_ID_PREFIX: &str = "deleted-";
