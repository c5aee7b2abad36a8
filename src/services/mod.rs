pub mod catalog;
pub mod orders;
pub mod reviews;
pub mod users;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::AuthService;

/// Aggregates the services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<users::UserService>,
    pub catalog: Arc<catalog::ProductService>,
    pub orders: Arc<orders::OrderService>,
    pub reviews: Arc<reviews::ReviewService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self {
            users: Arc::new(users::UserService::new(db.clone(), auth)),
            catalog: Arc::new(catalog::ProductService::new(db.clone())),
            orders: Arc::new(orders::OrderService::new(db.clone())),
            reviews: Arc::new(reviews::ReviewService::new(db)),
        }
    }
}
