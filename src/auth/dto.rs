use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

// Request bodies. The legacy clients sent a mix of English and Turkish field
// names; serde aliases normalize both spellings onto one canonical schema
// before any validation runs.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(alias = "adSoyad", alias = "ad_soyad")]
    pub full_name: String,
    #[serde(alias = "eposta", alias = "ePosta")]
    pub email: String,
    #[serde(alias = "kullaniciAdi", alias = "kullanici_adi")]
    pub username: String,
    #[serde(alias = "sifre")]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "kullaniciAdi", alias = "kullanici_adi")]
    pub username: String,
    #[serde(alias = "sifre")]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    /// Username or email.
    #[serde(alias = "email", alias = "eposta", alias = "kullaniciAdi")]
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(alias = "token", alias = "sifirlamaToken")]
    pub reset_token: String,
    #[serde(alias = "yeniSifre")]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(alias = "mevcutSifre")]
    pub current_password: String,
    #[serde(alias = "yeniSifre")]
    pub new_password: String,
    /// Optional server-side confirmation; when present it must match.
    #[serde(default, alias = "yeniSifreTekrar")]
    pub confirm_password: Option<String>,
}

/// User payload returned to clients. Built from `User` so the password hash
/// can never appear in a response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub reset_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
