use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn, orm_from_pool},
    middleware::throttle::Throttle,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub jwt_secret: Arc<str>,
    pub throttle: Throttle,
}

impl AppState {
    pub fn new(pool: DbPool, jwt_secret: impl Into<Arc<str>>) -> Self {
        let orm = orm_from_pool(&pool);
        Self {
            pool,
            orm,
            jwt_secret: jwt_secret.into(),
            throttle: Throttle::default(),
        }
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }
}
