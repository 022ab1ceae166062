//! Accounts: sign up, sessions and password changes.
//!
//! The rest of the application only ever sees a [`Principal`]; how it was
//! authenticated stays here.

use std::sync::Arc;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo,
};
use crate::domain::entities::{AuthorSummary, UserRecord};
use crate::domain::validators::{
    FieldErrors, ValidationError, validate_max_chars, validate_not_empty,
};

const USERNAME_MAX_CHARS: usize = 150;
const NAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

pub const INVALID_LOGIN_MESSAGE: &str = "Пожалуйста, введите правильные имя пользователя и пароль. Оба поля могут быть чувствительны к регистру.";

/// The identity a request acts as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Principal {
    #[default]
    Anonymous,
    User(AuthorSummary),
}

impl Principal {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user.id),
        }
    }

    pub fn user(&self) -> Option<&AuthorSummary> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::User(_))
    }

    /// Stable key distinguishing principals in shared caches.
    pub fn cache_key(&self) -> String {
        match self {
            Principal::Anonymous => "anonymous".to_string(),
            Principal::User(user) => format!("user:{}", user.id),
        }
    }
}

/// Opaque session secret handed to the client. Only its hash is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    /// Register a user and open a session for them.
    pub async fn signup(
        &self,
        form: &SignupForm,
    ) -> Result<(UserRecord, SessionToken), AccountError> {
        let username = form.username.trim();
        let mut errors = FieldErrors::new();
        errors
            .check(validate_username(username))
            .check(validate_max_chars(
                "first_name",
                form.first_name.trim(),
                NAME_MAX_CHARS,
            ))
            .check(validate_max_chars(
                "last_name",
                form.last_name.trim(),
                NAME_MAX_CHARS,
            ))
            .check(validate_email(form.email.trim()))
            .check(validate_new_password(
                "password2",
                &form.password1,
                &form.password2,
            ));

        if errors.get("username").is_none()
            && self.users.find_by_username(username).await?.is_some()
        {
            errors.push(ValidationError::new(
                "username",
                "Пользователь с таким именем уже существует.",
                username,
            ));
        }
        errors.into_result()?;

        let password_hash = hash_password(&form.password1)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                username: username.to_string(),
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                email: form.email.trim().to_string(),
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AccountError::Validation(
                    ValidationError::new(
                        "username",
                        "Пользователь с таким именем уже существует.",
                        username,
                    )
                    .into(),
                ),
                other => AccountError::Repo(other),
            })?;

        info!(
            target = "yatube::accounts",
            user_id = user.id,
            username = %user.username,
            "user signed up"
        );

        let token = self.open_session(user.id).await?;
        Ok((user, token))
    }

    pub async fn login(&self, form: &LoginForm) -> Result<(UserRecord, SessionToken), AccountError> {
        let mut errors = FieldErrors::new();
        errors
            .check(validate_not_empty("username", form.username.trim()))
            .check(validate_not_empty("password", &form.password));
        errors.into_result()?;

        let user = self
            .users
            .find_by_username(form.username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(&form.password, &user.password_hash) {
            warn!(
                target = "yatube::accounts",
                username = %user.username,
                "rejected login with wrong password"
            );
            return Err(AccountError::InvalidCredentials);
        }

        let removed = self.sessions.delete_expired(OffsetDateTime::now_utc()).await?;
        if removed > 0 {
            info!(target = "yatube::accounts", removed, "purged expired sessions");
        }

        let token = self.open_session(user.id).await?;
        Ok((user, token))
    }

    /// Resolve a session secret. Unknown or expired secrets are anonymous.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AccountError> {
        let now = OffsetDateTime::now_utc();
        let Some(session) = self.sessions.find_session(&hash_token(token), now).await? else {
            return Ok(Principal::Anonymous);
        };

        let principal = self
            .users
            .find_by_id(session.user_id)
            .await?
            .map(|user| Principal::User(user.summary()))
            .unwrap_or_default();
        Ok(principal)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        self.sessions.delete_session(&hash_token(token)).await?;
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        form: &PasswordChangeForm,
    ) -> Result<(), AccountError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::Repo(RepoError::NotFound))?;

        let mut errors = FieldErrors::new();
        if !verify_password(&form.old_password, &user.password_hash) {
            errors.push(ValidationError::new(
                "old_password",
                "Ваш старый пароль введён неправильно. Пожалуйста, введите его снова.",
                "",
            ));
        }
        errors.check(validate_new_password(
            "new_password2",
            &form.new_password1,
            &form.new_password2,
        ));
        errors.into_result()?;

        let password_hash = hash_password(&form.new_password1)?;
        self.users.update_password(user.id, &password_hash).await?;
        info!(
            target = "yatube::accounts",
            user_id = user.id,
            "password changed"
        );
        Ok(())
    }

    async fn open_session(&self, user_id: i64) -> Result<SessionToken, AccountError> {
        let token = SessionToken::generate();
        self.sessions
            .create_session(CreateSessionParams {
                token_hash: hash_token(token.as_str()),
                user_id,
                expires_at: OffsetDateTime::now_utc() + self.session_ttl,
            })
            .await?;
        Ok(token)
    }
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..])
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    validate_not_empty("username", username)?;
    validate_max_chars("username", username, USERNAME_MAX_CHARS)?;
    let valid = username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '.' | '@' | '+' | '-'));
    if !valid {
        return Err(ValidationError::new(
            "username",
            "Введите правильное имя пользователя. Оно может содержать только буквы, цифры и знаки @/./+/-/_.",
            username,
        ));
    }
    Ok(())
}

/// E-mail is optional; when present it needs a local part and a dotted domain.
fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Ok(());
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::new(
            "email",
            "Введите правильный адрес электронной почты.",
            email,
        ));
    }
    Ok(())
}

fn validate_new_password(
    field: &'static str,
    password: &str,
    confirmation: &str,
) -> Result<(), ValidationError> {
    validate_not_empty(field, password)?;
    if password != confirmation {
        return Err(ValidationError::new(
            field,
            "Введенные пароли не совпадают.",
            "",
        ));
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ValidationError::new(
            field,
            format!(
                "Введённый пароль слишком короткий. Он должен содержать как минимум {PASSWORD_MIN_CHARS} символов."
            ),
            "",
        ));
    }
    if password.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            field,
            "Введённый пароль состоит только из цифр.",
            "",
        ));
    }
    Ok(())
}
