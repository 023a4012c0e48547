use std::sync::Arc;

use anyhow::Context;
use time::Duration;

use crate::auth::{
    jwt::JwtKeys,
    repo::{MemoryUserRepo, PgUserRepo, UserRepo},
    reset::ResetTokenStore,
    service::AuthService,
};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users: Arc<dyn UserRepo> = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                tracing::info!("using Postgres user store");
                Arc::new(PgUserRepo::new(db))
            }
            None => {
                tracing::info!("DATABASE_URL not set, using in-memory user store");
                Arc::new(MemoryUserRepo::default())
            }
        };

        let keys = JwtKeys::new(&config.jwt);
        let resets = ResetTokenStore::new(Duration::minutes(config.reset_token_ttl_minutes));
        let auth = Arc::new(AuthService::new(users, resets, keys));

        Ok(Self { config, auth })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_hours: 24,
            },
            reset_token_ttl_minutes: 60,
            cors_origins: Vec::new(),
        });
        let keys = JwtKeys::new(&config.jwt);
        let auth = Arc::new(AuthService::new(
            Arc::new(MemoryUserRepo::default()),
            ResetTokenStore::new(Duration::minutes(60)),
            keys,
        ));
        Self { config, auth }
    }
}
