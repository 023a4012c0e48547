use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{ChangePasswordRequest, PublicUser, RegisterRequest},
    jwt::JwtKeys,
    password,
    repo::UserRepo,
    repo_types::NewUser,
    reset::ResetTokenStore,
};
use crate::error::ApiError;

const LOGIN_FAILED: &str = "Kullanıcı adı veya şifre hatalı!";
const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Orchestrates the credential lifecycle over an injected user repository,
/// the reset-token store and the JWT issuer. Backing storage is behind
/// `Arc<dyn UserRepo>`, so swapping in-memory for Postgres never touches
/// this logic.
pub struct AuthService {
    pub users: Arc<dyn UserRepo>,
    pub resets: ResetTokenStore,
    pub keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepo>, resets: ResetTokenStore, keys: JwtKeys) -> Self {
        Self { users, resets, keys }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<(PublicUser, String), ApiError> {
        let full_name = req.full_name.trim().to_string();
        let email = req.email.trim().to_string();
        let username = req.username.trim().to_string();

        if full_name.is_empty() || email.is_empty() || username.is_empty() || req.password.is_empty()
        {
            return Err(ApiError::Validation("Lütfen tüm alanları doldurun.".into()));
        }
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("Geçerli bir e-posta girin.".into()));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::Validation(
                "Şifre en az 6 karakter olmalıdır!".into(),
            ));
        }

        let password_hash = password::hash_password_blocking(req.password).await?;
        let user = self
            .users
            .create(NewUser {
                username,
                email,
                full_name,
                password_hash,
            })
            .await?;
        let token = self.keys.sign(user.id, &user.username)?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok((user.into(), token))
    }

    /// `identifier` may be a username or an email. Unknown identifier and
    /// wrong password are deliberately indistinguishable to the caller.
    pub async fn login(
        &self,
        identifier: &str,
        password_plain: &str,
    ) -> Result<(PublicUser, String), ApiError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password_plain.is_empty() {
            return Err(ApiError::Validation(
                "Kullanıcı adı ve şifre gereklidir!".into(),
            ));
        }

        let user = match self.users.find_by_username_or_email(identifier).await? {
            Some(user) => user,
            None => {
                warn!(identifier = %identifier, "login: unknown user");
                return Err(ApiError::Auth(LOGIN_FAILED.into()));
            }
        };

        let ok = password::verify_password_blocking(
            password_plain.to_string(),
            user.password_hash.clone(),
        )
        .await?;
        if !ok {
            warn!(user_id = %user.id, "login: wrong password");
            return Err(ApiError::Auth(LOGIN_FAILED.into()));
        }

        let token = self.keys.sign(user.id, &user.username)?;
        info!(user_id = %user.id, username = %user.username, "user logged in");
        Ok((user.into(), token))
    }

    /// Issues a reset token for the matching user. The token is handed back
    /// to the caller in the response body, matching the legacy flow; no
    /// out-of-band delivery exists.
    pub async fn forgot_password(&self, identifier: &str) -> Result<String, ApiError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ApiError::Validation(
                "Lütfen kullanıcı adı veya e-posta girin.".into(),
            ));
        }

        let user = self
            .users
            .find_by_username_or_email(identifier)
            .await?
            .ok_or_else(|| ApiError::NotFound("Kullanıcı bulunamadı!".into()))?;

        let token = self.resets.issue(user.id);
        info!(user_id = %user.id, "reset token issued");
        Ok(token)
    }

    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: String,
    ) -> Result<(), ApiError> {
        if reset_token.is_empty() || new_password.is_empty() {
            return Err(ApiError::Validation("Lütfen tüm alanları doldurun.".into()));
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::Validation(
                "Şifre en az 6 karakter olmalıdır!".into(),
            ));
        }

        let user_id = self
            .resets
            .consume(reset_token)
            .ok_or(ApiError::InvalidToken)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Kullanıcı bulunamadı!".into()))?;

        let new_hash = password::hash_password_blocking(new_password).await?;
        self.users.update_password_hash(user.id, &new_hash).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        req: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        if req.current_password.is_empty() || req.new_password.is_empty() {
            return Err(ApiError::Validation("Lütfen tüm alanları doldurun.".into()));
        }
        if let Some(confirm) = &req.confirm_password {
            if *confirm != req.new_password {
                return Err(ApiError::Validation("Şifreler uyuşmuyor!".into()));
            }
        }
        if !password::is_strong_password(&req.new_password) {
            return Err(ApiError::Validation(
                "Şifre en az 6 karakter, 1 büyük harf, 1 küçük harf ve 1 rakam içermelidir!".into(),
            ));
        }
        if req.new_password == req.current_password {
            return Err(ApiError::Validation(
                "Yeni şifre mevcut şifre ile aynı olamaz!".into(),
            ));
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Kullanıcı bulunamadı!".into()))?;

        let ok = password::verify_password_blocking(
            req.current_password,
            user.password_hash.clone(),
        )
        .await?;
        if !ok {
            warn!(user_id = %user.id, "change password: wrong current password");
            return Err(ApiError::Auth("Mevcut şifre hatalı!".into()));
        }

        let new_hash = password::hash_password_blocking(req.new_password).await?;
        self.users.update_password_hash(user.id, &new_hash).await?;
        info!(user_id = %user.id, "password changed");
        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, ApiError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Kullanıcı bulunamadı!".into()))?;
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::MemoryUserRepo;
    use crate::config::JwtConfig;
    use time::Duration;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryUserRepo::default()),
            ResetTokenStore::new(Duration::minutes(60)),
            JwtKeys::new(&JwtConfig {
                secret: "test-secret".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_hours: 24,
            }),
        )
    }

    fn ada() -> RegisterRequest {
        RegisterRequest {
            full_name: "Ada Lovelace".into(),
            email: "ada@x.com".into(),
            username: "ada".into(),
            password: "abc123".into(),
        }
    }

    #[tokio::test]
    async fn register_returns_user_and_verifiable_token() {
        let svc = service();
        let (user, token) = svc.register(ada()).await.expect("register");
        assert_eq!(user.username, "ada");
        let claims = svc.keys.verify(&token).expect("token verifies");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "ada");
    }

    #[tokio::test]
    async fn register_rejects_empty_fields_and_short_password() {
        let svc = service();
        let mut req = ada();
        req.full_name = "  ".into();
        assert!(matches!(
            svc.register(req).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let mut req = ada();
        req.password = "ab1".into();
        assert!(matches!(
            svc.register(req).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let mut req = ada();
        req.email = "not-an-email".into();
        assert!(matches!(
            svc.register(req).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn register_duplicate_username_conflicts_despite_new_email() {
        let svc = service();
        svc.register(ada()).await.expect("first register");
        let mut again = ada();
        again.email = "ada2@x.com".into();
        assert!(matches!(
            svc.register(again).await.unwrap_err(),
            ApiError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn register_duplicate_email_conflicts() {
        let svc = service();
        svc.register(ada()).await.expect("first register");
        let mut again = ada();
        again.username = "ada2".into();
        assert!(matches!(
            svc.register(again).await.unwrap_err(),
            ApiError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn login_works_with_username_and_email() {
        let svc = service();
        svc.register(ada()).await.expect("register");

        let (user, token) = svc.login("ada", "abc123").await.expect("login by username");
        assert_eq!(user.username, "ada");
        assert!(svc.keys.verify(&token).is_ok());

        svc.login("ada@x.com", "abc123").await.expect("login by email");
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let svc = service();
        svc.register(ada()).await.expect("register");

        let unknown = svc.login("grace", "abc123").await.unwrap_err();
        let wrong = svc.login("ada", "wrong-pass").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(unknown, ApiError::Auth(_)));
        assert!(matches!(wrong, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn forgot_password_unknown_user_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.forgot_password("nobody").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn forgot_then_reset_roundtrip_and_token_is_single_use() {
        let svc = service();
        svc.register(ada()).await.expect("register");

        let token = svc.forgot_password("ada").await.expect("forgot");
        assert!(token.len() >= 20);

        svc.reset_password(&token, "Yeni1234".into())
            .await
            .expect("reset");

        // old password no longer works, new one does
        assert!(svc.login("ada", "abc123").await.is_err());
        svc.login("ada", "Yeni1234").await.expect("login with new password");

        // second spend of the same token fails
        assert!(matches!(
            svc.reset_password(&token, "Baska123".into()).await.unwrap_err(),
            ApiError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn reset_password_validates_input() {
        let svc = service();
        assert!(matches!(
            svc.reset_password("", "Yeni1234".into()).await.unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            svc.reset_password("sometoken", "ab1".into()).await.unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            svc.reset_password("unknown-token", "Yeni1234".into())
                .await
                .unwrap_err(),
            ApiError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn change_password_enforces_policy() {
        let svc = service();
        let (user, _) = svc.register(ada()).await.expect("register");

        // confirmation mismatch
        let err = svc
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "abc123".into(),
                    new_password: "Yeni1234".into(),
                    confirm_password: Some("Farkli1".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // weak new password (no uppercase)
        let err = svc
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "abc123".into(),
                    new_password: "yeni1234".into(),
                    confirm_password: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // new equals current
        let err = svc
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "Abc123".into(),
                    new_password: "Abc123".into(),
                    confirm_password: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn change_password_rejects_wrong_current_password() {
        let svc = service();
        let (user, _) = svc.register(ada()).await.expect("register");
        let err = svc
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "wrong".into(),
                    new_password: "Yeni1234".into(),
                    confirm_password: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn change_password_updates_login() {
        let svc = service();
        let (user, _) = svc.register(ada()).await.expect("register");
        svc.change_password(
            user.id,
            ChangePasswordRequest {
                current_password: "abc123".into(),
                new_password: "Yeni1234".into(),
                confirm_password: Some("Yeni1234".into()),
            },
        )
        .await
        .expect("change password");

        assert!(svc.login("ada", "abc123").await.is_err());
        svc.login("ada", "Yeni1234").await.expect("login with new password");
    }

    #[tokio::test]
    async fn current_user_unknown_id_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.current_user(Uuid::new_v4()).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}
