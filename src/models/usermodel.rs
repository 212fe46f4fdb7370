use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Creator,
    Advertiser,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Creator => "creator",
            UserRole::Advertiser => "advertiser",
        }
    }
}

/// Users are owned by the auth/profile subsystem; the deal core only reads
/// them for caller identity and read-side briefs.
#[derive(Debug, Deserialize, Serialize, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub company_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
