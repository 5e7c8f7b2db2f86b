mod guard;

pub use guard::{RouteDecision, View, guard};

use std::{io::ErrorKind, path::PathBuf};

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const INVALID_CREDENTIALS: &str = "invalid username or password";
const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

/// Public view of a stored user. Never carries credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    id: Uuid,
    username: String,
    salt: String,
    password_hash: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl StoredUser {
    fn account(&self) -> UserAccount {
        UserAccount {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// JSON-file backed account store. Every mutation is written through.
#[derive(Debug)]
pub struct UserDirectory {
    path: PathBuf,
    admin_username: String,
    users: Vec<StoredUser>,
}

impl UserDirectory {
    pub async fn open(path: impl Into<PathBuf>, admin_username: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let users = match fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        info!(target: "users", path = %path.display(), users = users.len(), "user directory loaded");

        Ok(Self {
            path,
            admin_username: admin_username.into(),
            users,
        })
    }

    pub async fn create(&mut self, username: &str, password: &str) -> Result<UserAccount> {
        let username = normalize_username(username)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::auth(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.position(&username).is_some() {
            return Err(AppError::auth("username is already taken"));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let role = if username == self.admin_username {
            Role::Admin
        } else {
            Role::Member
        };
        let user = StoredUser {
            id: Uuid::new_v4(),
            password_hash: hash_password(&salt, password)?,
            username,
            salt,
            role,
            created_at: Utc::now(),
        };
        let account = user.account();

        self.users.push(user);
        if let Err(err) = self.persist().await {
            self.users.pop();
            return Err(err);
        }

        info!(target: "users", username = %account.username, role = ?account.role, "account created");
        Ok(account)
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserAccount> {
        let username = username.trim().to_lowercase();
        let user = self
            .position(&username)
            .map(|index| &self.users[index])
            .filter(|user| verify_password(&user.salt, password, &user.password_hash));

        match user {
            Some(user) => Ok(user.account()),
            None => {
                warn!(target: "users", %username, "login rejected");
                Err(AppError::auth(INVALID_CREDENTIALS))
            }
        }
    }

    pub async fn delete(&mut self, username: &str) -> Result<UserAccount> {
        let username = username.trim().to_lowercase();
        let index = self
            .position(&username)
            .ok_or_else(|| AppError::auth(format!("no such user: {username}")))?;

        let removed = self.users.remove(index);
        if let Err(err) = self.persist().await {
            self.users.insert(index, removed);
            return Err(err);
        }

        info!(target: "users", %username, "account deleted");
        Ok(removed.account())
    }

    pub fn list(&self) -> Vec<UserAccount> {
        self.users.iter().map(StoredUser::account).collect()
    }

    fn position(&self, username: &str) -> Option<usize> {
        self.users.iter().position(|user| user.username == username)
    }

    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(&self.users)?).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AppError::auth(format!(
            "username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AppError::auth(
            "username may only contain a-z, 0-9, '_', '.' and '-'",
        ));
    }
    Ok(username)
}

fn hash_password(salt: &str, password: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes())
        .map_err(|e| AppError::other(format!("invalid salt: {e}")))?;
    mac.update(password.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn verify_password(salt: &str, password: &str, expected: &str) -> bool {
    let Ok(expected) = general_purpose::STANDARD.decode(expected) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(salt.as_bytes()) else {
        return false;
    };
    mac.update(password.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
