use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use encore_types::api::{Claims, LoginRequest, LoginResponse};

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_LIFETIME_DAYS: i64 = 30;

/// One configured admin login. Only the Argon2 hash of the password is kept.
pub struct AdminAccount {
    pub id: String,
    pub name: String,
    password_hash: String,
}

/// The fixed set of admin accounts allowed into the dashboard.
#[derive(Default)]
pub struct AdminAccounts {
    accounts: Vec<AdminAccount>,
}

impl AdminAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account, hashing its password with Argon2id.
    pub fn add(&mut self, id: &str, name: &str, password: &str) -> anyhow::Result<()> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("hash password for {}: {}", id, e))?
            .to_string();

        self.accounts.retain(|a| a.id != id);
        self.accounts.push(AdminAccount {
            id: id.to_string(),
            name: name.to_string(),
            password_hash,
        });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&AdminAccount> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.accounts.iter().map(|a| a.id.as_str())
    }

    /// Returns the account if the password matches.
    pub fn verify(&self, username: &str, password: &str) -> Option<&AdminAccount> {
        let account = self.get(&username.trim().to_lowercase())?;
        let parsed = match PasswordHash::new(&account.password_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored hash for {} is unreadable: {}", account.id, e);
                return None;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .ok()
            .map(|_| account)
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // Argon2 verification is CPU-bound
    let verify_state = state.clone();
    let account = tokio::task::spawn_blocking(move || {
        verify_state
            .accounts
            .verify(&req.username, &req.password)
            .map(|a| (a.id.clone(), a.name.clone()))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("login task failed: {}", e)))?;

    let Some((user_id, name)) = account else {
        warn!("Failed login attempt");
        return Err(ApiError::Unauthorized);
    };

    let token = create_token(&state.jwt_secret, &user_id, &name)?;
    info!("{} signed in", user_id);

    Ok(Json(LoginResponse {
        user_id,
        name,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: &str, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a token and check that its account is still configured.
pub fn verify_token(state: &AppState, token: &str) -> Option<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    state.accounts.get(&data.claims.sub)?;
    Some(data.claims)
}
