use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthService, ADMIN_ROLE, USER_ROLE};
use crate::entities::user::{self, Entity as UserEntity};
use crate::errors::ServiceError;

/// Login/bootstrap payload: identity plus optional profile fields.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpsertUserRequest {
    #[validate(email(message = "a valid email address is required"))]
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub education: Option<String>,
    pub linkedin: Option<String>,
}

/// Identity store operations plus the login path that couples an upsert
/// with token issuance.
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    /// Inserts or updates the user keyed by email, then issues a session
    /// token for it. Role is never touched here; promotion is a separate,
    /// admin-gated operation.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn upsert(
        &self,
        request: UpsertUserRequest,
    ) -> Result<(user::Model, String), ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let now = Utc::now();
        let saved = match self.find_by_email(&request.email).await? {
            Some(existing) => {
                let mut active: user::ActiveModel = existing.into();
                if request.name.is_some() {
                    active.name = Set(request.name);
                }
                if request.phone.is_some() {
                    active.phone = Set(request.phone);
                }
                if request.address.is_some() {
                    active.address = Set(request.address);
                }
                if request.education.is_some() {
                    active.education = Set(request.education);
                }
                if request.linkedin.is_some() {
                    active.linkedin = Set(request.linkedin);
                }
                active.updated_at = Set(now);
                active.update(&*self.db).await?
            }
            None => {
                user::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    email: Set(request.email.clone()),
                    name: Set(request.name),
                    role: Set(USER_ROLE.to_string()),
                    phone: Set(request.phone),
                    address: Set(request.address),
                    education: Set(request.education),
                    linkedin: Set(request.linkedin),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&*self.db)
                .await?
            }
        };

        let token = self.auth.issue_token(&saved.email)?;
        Ok((saved, token))
    }

    pub async fn list(&self) -> Result<Vec<user::Model>, ServiceError> {
        UserEntity::find()
            .order_by_asc(user::Column::Email)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    /// Unknown emails are simply not admins; the lookup miss is not an error.
    pub async fn is_admin(&self, email: &str) -> Result<bool, ServiceError> {
        Ok(self
            .find_by_email(email)
            .await?
            .map(|account| account.role == ADMIN_ROLE)
            .unwrap_or(false))
    }

    #[instrument(skip(self))]
    pub async fn promote_to_admin(&self, email: &str) -> Result<user::Model, ServiceError> {
        let account = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {email} not found")))?;

        let mut active: user::ActiveModel = account.into();
        active.role = Set(ADMIN_ROLE.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(email, "user promoted to admin");
        Ok(updated)
    }
}
