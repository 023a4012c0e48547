use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Username,
    Email,
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("duplicate {0:?}")]
    Conflict(ConflictField),
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Credential store contract. Injected into the auth service as
/// `Arc<dyn UserRepo>` so the in-memory and Postgres backings are
/// interchangeable.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, new: NewUser) -> Result<User, RepoError>;
    /// Exact, case-sensitive match against either username or email.
    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn update_password_hash(&self, id: Uuid, new_hash: &str) -> Result<(), RepoError>;
}

/// Process-lifetime user store; records are lost on restart.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Vec<User>>,
}

impl MemoryUserRepo {
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<User>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        // Uniqueness check and insert happen under one lock so concurrent
        // registrations cannot both pass the check.
        let mut users = self.lock();
        if users.iter().any(|u| u.username == new.username) {
            return Err(RepoError::Conflict(ConflictField::Username));
        }
        if users.iter().any(|u| u.email == new.email) {
            return Err(RepoError::Conflict(ConflictField::Email));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            full_name: new.full_name,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, RepoError> {
        let users = self.lock();
        Ok(users
            .iter()
            .find(|u| u.username == identifier || u.email == identifier)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let users = self.lock();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_password_hash(&self, id: Uuid, new_hash: &str) -> Result<(), RepoError> {
        let mut users = self.lock();
        let user = users.iter_mut().find(|u| u.id == id).ok_or(RepoError::NotFound)?;
        user.password_hash = new_hash.to_string();
        Ok(())
    }
}

/// Postgres-backed user store; uniqueness is enforced by the `users` table
/// constraints so check-and-insert is atomic on the database side.
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, full_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, full_name, password_hash, created_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.full_name)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                let field = if db_err.constraint() == Some("users_email_key") {
                    ConflictField::Email
                } else {
                    ConflictField::Username
                };
                Err(RepoError::Conflict(field))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, password_hash, created_at
            FROM users
            WHERE username = $1 OR email = $1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_password_hash(&self, id: Uuid, new_hash: &str) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET password_hash = $2 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(new_hash)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            full_name: "Test User".into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn create_and_find_by_username_or_email() {
        let repo = MemoryUserRepo::default();
        let user = repo.create(new_user("ada", "ada@x.com")).await.expect("create");

        let by_username = repo
            .find_by_username_or_email("ada")
            .await
            .expect("lookup")
            .expect("found");
        assert_eq!(by_username.id, user.id);

        let by_email = repo
            .find_by_username_or_email("ada@x.com")
            .await
            .expect("lookup")
            .expect("found");
        assert_eq!(by_email.id, user.id);

        assert!(repo
            .find_by_username_or_email("unknown")
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn lookup_is_case_sensitive() {
        let repo = MemoryUserRepo::default();
        repo.create(new_user("ada", "ada@x.com")).await.expect("create");
        assert!(repo
            .find_by_username_or_email("Ada")
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_even_with_new_email() {
        let repo = MemoryUserRepo::default();
        repo.create(new_user("ada", "ada@x.com")).await.expect("create");
        let err = repo
            .create(new_user("ada", "other@x.com"))
            .await
            .expect_err("duplicate username");
        assert!(matches!(err, RepoError::Conflict(ConflictField::Username)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let repo = MemoryUserRepo::default();
        repo.create(new_user("ada", "ada@x.com")).await.expect("create");
        let err = repo
            .create(new_user("grace", "ada@x.com"))
            .await
            .expect_err("duplicate email");
        assert!(matches!(err, RepoError::Conflict(ConflictField::Email)));
    }

    #[tokio::test]
    async fn update_password_hash_replaces_hash() {
        let repo = MemoryUserRepo::default();
        let user = repo.create(new_user("ada", "ada@x.com")).await.expect("create");
        repo.update_password_hash(user.id, "new-hash").await.expect("update");
        let reloaded = repo.find_by_id(user.id).await.expect("lookup").expect("found");
        assert_eq!(reloaded.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn update_password_hash_unknown_id_is_not_found() {
        let repo = MemoryUserRepo::default();
        let err = repo
            .update_password_hash(Uuid::new_v4(), "hash")
            .await
            .expect_err("unknown id");
        assert!(matches!(err, RepoError::NotFound));
    }
}
