use crate::domain::error::{AppError, Result};
use crate::domain::user::{AuthResponse, NewUser, User};
use crate::infrastructure::db::UserRepository;
use crate::infrastructure::security::password::{generate_token, PasswordHasher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150, message = "must be between 1 and 150 characters"))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
}

impl RegisterRequest {
    fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub struct AuthUseCase {
    repository: Arc<dyn UserRepository + Send + Sync>,
}

impl AuthUseCase {
    pub fn new(repository: Arc<dyn UserRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        let request = request.normalized();
        request.validate()?;

        let salt = PasswordHasher::new_salt();
        let user = self
            .repository
            .create(&NewUser {
                username: request.username,
                email: request.email.unwrap_or_default(),
                password_hash: PasswordHasher::hash(&request.password, &salt),
                password_salt: salt,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "Registered user");
        self.issue(&user).await
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::ValidationError(
                "Please provide both username and password".to_string(),
            ));
        }

        let user = self
            .repository
            .find_by_username(request.username.trim())
            .await?
            .filter(|u| PasswordHasher::verify(&request.password, &u.password_salt, &u.password_hash));

        match user {
            Some(user) => self.issue(&user).await,
            None => {
                warn!(username = %request.username, "Rejected login");
                Err(AppError::Unauthorized("Invalid credentials".to_string()))
            }
        }
    }

    /// Resolve a token key to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        if token.is_empty() {
            return Err(AppError::Unauthorized(
                "Authentication credentials were not provided.".to_string(),
            ));
        }
        self.repository
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid token.".to_string()))
    }

    async fn issue(&self, user: &User) -> Result<AuthResponse> {
        let token = self
            .repository
            .get_or_create_token(user.id, &generate_token())
            .await?;
        Ok(AuthResponse {
            user: user.public(),
            token,
        })
    }
}
