//! Order store and the fulfillment orchestrator.
//!
//! An order has exactly two states: created (unpaid) and settled (paid with
//! a transaction id). Settlement is the one compound write in the system:
//! it records the payment receipt, flips the paid flag, and decrements
//! product stock. The receipt insert and a compare-and-set on the paid flag
//! keep the whole thing at-most-once under concurrent attempts.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::error::SqlErr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::entities::order::{self, Entity as OrderEntity};
use crate::entities::payment;
use crate::entities::product::{self, Entity as ProductEntity};
use crate::errors::ServiceError;
use crate::gateway;

/// All charges are in US dollars, matching the processor account.
const CURRENCY: &str = "usd";

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
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    /// Amount the customer will be charged; snapshotted on the order so
    /// later catalog edits leave it untouched.
    #[validate(custom = "validate_positive_price")]
    pub price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettleOrderRequest {
    #[validate(length(min = 1, message = "transactionId is required"))]
    pub transaction_id: String,
    pub payment_method: Option<String>,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates an order in the unpaid state. Stock is neither checked nor
    /// reserved here; it is checked and decremented at settlement.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn create(
        &self,
        owner_email: &str,
        request: CreateOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let product = ProductEntity::find_by_id(request.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", request.product_id))
            })?;

        if request.quantity < product.min_order_quantity {
            return Err(ServiceError::ValidationError(format!(
                "minimum order quantity for {} is {}",
                product.name, product.min_order_quantity
            )));
        }

        let now = Utc::now();
        let created = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_email: Set(owner_email.to_string()),
            product_id: Set(product.id),
            product_name: Set(product.name),
            quantity: Set(request.quantity),
            price: Set(request.price),
            paid: Set(false),
            transaction_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(order_id = %created.id, customer = owner_email, "order created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {id} not found")))
    }

    pub async fn list_for(&self, email: &str) -> Result<Vec<order::Model>, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::CustomerEmail.eq(email))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    /// Settles an order: records the receipt, marks the order paid, and
    /// decrements stock. Safe to invoke more than once; only the first
    /// invocation has any effect.
    ///
    /// The receipt goes in first so a crash can only ever leave a receipt
    /// without a paid order (recoverable by retrying), never a paid order
    /// without a receipt. The unique index on `payments.order_id` makes the
    /// insert tolerant of exactly that retry.
    #[instrument(skip(self, request), fields(%order_id))]
    pub async fn settle(
        &self,
        order_id: Uuid,
        request: SettleOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db;
        let order = self.get(order_id).await?;
        if order.paid {
            return Err(ServiceError::AlreadySettled(order_id));
        }

        let amount_minor = gateway::to_minor_units(order.price)?;

        let receipt = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            transaction_id: Set(request.transaction_id.clone()),
            amount_minor: Set(amount_minor),
            currency: Set(CURRENCY.to_string()),
            payment_method: Set(request.payment_method.clone()),
            created_at: Set(Utc::now()),
        };
        match receipt.insert(db).await {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                // A previous attempt recorded the receipt but did not finish
                // marking the order paid; resume from here.
                warn!(%order_id, "receipt already recorded, resuming settlement");
            }
            Err(err) => return Err(err.into()),
        }

        let txn = db.begin().await?;

        // Compare-and-set: only the transition from unpaid wins.
        let updated = OrderEntity::update_many()
            .col_expr(order::Column::Paid, Expr::value(true))
            .col_expr(
                order::Column::TransactionId,
                Expr::value(request.transaction_id.clone()),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Paid.eq(false))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            txn.rollback().await?;
            return Err(ServiceError::AlreadySettled(order_id));
        }

        // Stock comes off in the same transaction. The arithmetic happens
        // in the database, so concurrent settlements of different orders
        // against the same product cannot oversell.
        let decremented = ProductEntity::update_many()
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).sub(order.quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(order.product_id))
            .filter(product::Column::Quantity.gte(order.quantity))
            .exec(&txn)
            .await?;

        if decremented.rows_affected == 0 {
            // Fewer units left than were ordered; clamp at zero instead of
            // going negative.
            ProductEntity::update_many()
                .col_expr(product::Column::Quantity, Expr::value(0))
                .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(product::Column::Id.eq(order.product_id))
                .exec(&txn)
                .await?;
            warn!(%order_id, product_id = %order.product_id, "stock clamped to zero at settlement");
        }

        txn.commit().await?;

        info!(%order_id, transaction_id = %request.transaction_id, amount_minor, "order settled");
        self.get(order_id).await
    }

    /// Deletes an order. Only the owner or an admin may delete, and only
    /// while the order is unpaid; settled orders are immutable history.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        id: Uuid,
        caller_email: &str,
        caller_is_admin: bool,
    ) -> Result<(), ServiceError> {
        let order = self.get(id).await?;

        if order.customer_email != caller_email && !caller_is_admin {
            return Err(ServiceError::Forbidden(
                "orders may only be deleted by their owner".to_string(),
            ));
        }
        if order.paid {
            return Err(ServiceError::AlreadySettled(id));
        }

        OrderEntity::delete_by_id(id).exec(&*self.db).await?;
        info!(order_id = %id, "order deleted");
        Ok(())
    }
}
