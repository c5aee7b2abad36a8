use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::review::{self, Entity as ReviewEntity};
use crate::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub reviewer_name: Option<String>,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i32,
    pub comment: Option<String>,
}

pub struct ReviewService {
    db: Arc<DatabaseConnection>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<review::Model>, ServiceError> {
        ReviewEntity::find()
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        reviewer_email: &str,
        request: CreateReviewRequest,
    ) -> Result<review::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        review::ActiveModel {
            id: Set(Uuid::new_v4()),
            reviewer_email: Set(reviewer_email.to_string()),
            reviewer_name: Set(request.reviewer_name),
            rating: Set(request.rating),
            comment: Set(request.comment),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::from)
    }
}
