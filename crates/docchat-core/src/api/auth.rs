use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{ensure_success, ApiClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
}

impl UserInfo {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub role: UserRole,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterAdminRequest<'a> {
    email: &'a str,
    password: &'a str,
    admin_key: &'a str,
}

impl ApiClient {
    pub async fn register(&self, email: &str, password: &str) -> Result<UserInfo> {
        let response = self
            .post("/auth/register")
            .json(&RegisterRequest { email, password })
            .send()
            .await?;

        let response = ensure_success(response, "Registration").await?;
        Ok(response.json().await?)
    }

    pub async fn register_admin(&self, email: &str, password: &str, admin_key: &str) -> Result<UserInfo> {
        let response = self
            .post("/auth/register-admin")
            .json(&RegisterAdminRequest {
                email,
                password,
                admin_key,
            })
            .send()
            .await?;

        let response = ensure_success(response, "Admin registration").await?;
        Ok(response.json().await?)
    }

    /// Exchange credentials for a token, attach it, and fetch the account.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<UserInfo> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        let response = ensure_success(response, "Login").await?;
        let token: TokenResponse = response.json().await?;
        self.set_auth_token(Some(&token.access_token));

        self.me().await
    }

    /// The account behind the current token.
    pub async fn me(&self) -> Result<UserInfo> {
        let response = self.get("/me").send().await?;
        let response = ensure_success(response, "Fetching current user").await?;
        Ok(response.json().await?)
    }
}
