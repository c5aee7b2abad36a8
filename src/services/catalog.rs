use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::entities::product::{self, Entity as ProductEntity};
use crate::errors::ServiceError;

fn validate_positive_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("price must be greater than 0".into());
        Err(err)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "product name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[validate(custom = "validate_positive_price")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "quantity must not be negative"))]
    pub quantity: i32,
    #[serde(default = "default_min_order_quantity")]
    #[validate(range(min = 1, message = "minimum order quantity must be at least 1"))]
    pub min_order_quantity: i32,
}

fn default_min_order_quantity() -> i32 {
    1
}

/// Partial patch for simple product fields. Stock changes go through
/// `adjust_stock` or settlement, never through here.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    pub min_order_quantity: Option<i32>,
}

/// Catalog store: plain keyed CRUD plus the admin stock-adjustment path.
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateProductRequest) -> Result<product::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let now = Utc::now();
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            description: Set(request.description),
            image_url: Set(request.image_url),
            price: Set(request.price),
            quantity: Set(request.quantity),
            min_order_quantity: Set(request.min_order_quantity),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {id} not found")))
    }

    pub async fn list(&self) -> Result<Vec<product::Model>, ServiceError> {
        ProductEntity::find()
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        if let Some(price) = &request.price {
            if *price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "price must be greater than 0".to_string(),
                ));
            }
        }
        if let Some(min) = request.min_order_quantity {
            if min < 1 {
                return Err(ServiceError::ValidationError(
                    "minimum order quantity must be at least 1".to_string(),
                ));
            }
        }

        let existing = self.get(id).await?;
        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if request.description.is_some() {
            active.description = Set(request.description);
        }
        if request.image_url.is_some() {
            active.image_url = Set(request.image_url);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(min) = request.min_order_quantity {
            active.min_order_quantity = Set(min);
        }
        active.updated_at = Set(Utc::now());

        active.update(&*self.db).await.map_err(ServiceError::from)
    }

    /// Removes `amount` units of stock. The conditional update keeps the
    /// decrement atomic and refuses to take quantity below zero.
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, id: Uuid, amount: i32) -> Result<product::Model, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "adjustment amount must be positive".to_string(),
            ));
        }

        let result = ProductEntity::update_many()
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).sub(amount),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(id))
            .filter(product::Column::Quantity.gte(amount))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            let current = self.get(id).await?;
            return Err(ServiceError::ValidationError(format!(
                "cannot remove {amount} units, only {} in stock",
                current.quantity
            )));
        }

        self.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = ProductEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {id} not found")));
        }

        info!(product_id = %id, "product deleted");
        Ok(())
    }
}
