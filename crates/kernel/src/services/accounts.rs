//! Account registration, authentication, and caller resolution.

use std::sync::{Arc, LazyLock};

use anyhow::Context;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{hash_password, verify_password};
use crate::models::{NewUser, User};
use crate::permissions::Caller;
use crate::store::ContentStore;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 150;

/// Maximum email length.
pub const MAX_EMAIL_LEN: usize = 254;

/// Maximum first or last name length.
pub const MAX_NAME_LEN: usize = 150;

#[allow(clippy::expect_used)]
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Self-service registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Check username shape, pushing a message onto `errors` when invalid.
pub fn validate_username(username: &str, errors: &mut Vec<String>) {
    if username.is_empty() {
        errors.push("Username is required.".to_string());
    } else if username.chars().count() > MAX_USERNAME_LEN {
        errors.push(format!("Username must be at most {MAX_USERNAME_LEN} characters."));
    } else if !USERNAME_RE.is_match(username) {
        errors.push(
            "Username may contain only letters, digits and @/./+/-/_ characters.".to_string(),
        );
    }
}

pub fn validate_email(email: &str, errors: &mut Vec<String>) {
    if email.is_empty() {
        errors.push("Email is required.".to_string());
    } else if email.chars().count() > MAX_EMAIL_LEN {
        errors.push(format!("Email must be at most {MAX_EMAIL_LEN} characters."));
    } else if !EMAIL_RE.is_match(email) {
        errors.push("Enter a valid email address.".to_string());
    }
}

pub fn validate_names(first_name: &str, last_name: &str, errors: &mut Vec<String>) {
    if first_name.chars().count() > MAX_NAME_LEN {
        errors.push(format!("First name must be at most {MAX_NAME_LEN} characters."));
    }
    if last_name.chars().count() > MAX_NAME_LEN {
        errors.push(format!("Last name must be at most {MAX_NAME_LEN} characters."));
    }
}

pub fn validate_password(password: &str, errors: &mut Vec<String>) {
    if password.is_empty() {
        errors.push("Password is required.".to_string());
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!("Password must be at least {MIN_PASSWORD_LEN} characters."));
    }
}

/// Hash a password on the blocking thread pool.
pub async fn hash_password_blocking(password: String) -> ServiceResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task failed")??;
    Ok(hash)
}

/// Push uniqueness errors for a username/email pair, ignoring the account `exclude`.
pub async fn check_unique_identity(
    store: &dyn ContentStore,
    username: &str,
    email: &str,
    exclude: Option<Uuid>,
    errors: &mut Vec<String>,
) -> ServiceResult<()> {
    if !username.is_empty() && store.username_taken(username, exclude).await? {
        errors.push("A user with that username already exists.".to_string());
    }
    if !email.is_empty() && store.email_taken(email, exclude).await? {
        errors.push("A user with that email already exists.".to_string());
    }
    Ok(())
}

/// Identity provider backed by the content store.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn ContentStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Register a new active, non-staff account.
    pub async fn register(&self, form: RegistrationForm) -> ServiceResult<User> {
        let username = form.username.trim().to_string();
        let email = form.email.trim().to_string();

        let mut errors = Vec::new();
        validate_username(&username, &mut errors);
        validate_email(&email, &mut errors);
        validate_password(&form.password, &mut errors);
        if form.password != form.confirm_password {
            errors.push("Passwords do not match.".to_string());
        }
        check_unique_identity(self.store.as_ref(), &username, &email, None, &mut errors).await?;
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let password_hash = hash_password_blocking(form.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                username,
                email,
                first_name: String::new(),
                last_name: String::new(),
                password_hash,
                is_staff: false,
                is_superuser: false,
                is_active: true,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Verify credentials. Unknown, inactive, and wrong-password accounts all
    /// produce the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<User> {
        let invalid = || ServiceError::validation("Invalid username or password.");

        let Some(user) = self.store.find_user_by_username(username.trim()).await? else {
            return Err(invalid());
        };
        if !user.is_active {
            return Err(invalid());
        }

        let hash = user.password_hash.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
            .await
            .context("password verification task failed")?;
        if !verified {
            tracing::info!(username = %user.username, "failed login attempt");
            return Err(invalid());
        }

        self.store.touch_login(user.id).await?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    /// Resolve a session's user id into a caller. Missing or deactivated
    /// accounts are treated as anonymous.
    pub async fn resolve_caller(&self, user_id: Option<Uuid>) -> ServiceResult<Caller> {
        let Some(user_id) = user_id else {
            return Ok(Caller::Anonymous);
        };
        match self.store.find_user(user_id).await? {
            Some(user) if user.is_active => Ok(Caller::from(&user)),
            _ => Ok(Caller::Anonymous),
        }
    }

    /// Create an active superuser from the command line.
    pub async fn create_superuser(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ServiceResult<User> {
        let username = username.trim().to_string();
        let email = email.trim().to_string();

        let mut errors = Vec::new();
        validate_username(&username, &mut errors);
        validate_email(&email, &mut errors);
        validate_password(password, &mut errors);
        check_unique_identity(self.store.as_ref(), &username, &email, None, &mut errors).await?;
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let password_hash = hash_password_blocking(password.to_string()).await?;
        let user = self
            .store
            .create_user(NewUser {
                username,
                email,
                first_name: String::new(),
                last_name: String::new(),
                password_hash,
                is_staff: true,
                is_superuser: true,
                is_active: true,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "superuser created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn username_errors(username: &str) -> Vec<String> {
        let mut errors = Vec::new();
        validate_username(username, &mut errors);
        errors
    }

    #[test]
    fn usernames_allow_word_and_punctuation_characters() {
        assert!(username_errors("ada.lovelace+blog@home_1-x").is_empty());
        assert_eq!(username_errors("").len(), 1);
        assert_eq!(username_errors("has space").len(), 1);
        assert_eq!(username_errors("semi;colon").len(), 1);
        assert_eq!(username_errors(&"a".repeat(151)).len(), 1);
        assert!(username_errors(&"a".repeat(150)).is_empty());
    }

    #[test]
    fn email_shape_is_checked() {
        let mut errors = Vec::new();
        validate_email("ada@example.com", &mut errors);
        assert!(errors.is_empty());

        validate_email("not-an-email", &mut errors);
        validate_email("", &mut errors);
        assert_eq!(errors.len(), 2);

        let long = format!("{}@example.com", "a".repeat(MAX_EMAIL_LEN));
        let mut errors = Vec::new();
        validate_email(&long, &mut errors);
        assert_eq!(errors, vec!["Email must be at most 254 characters.".to_string()]);
    }

    #[test]
    fn names_fit_their_columns() {
        let mut errors = Vec::new();
        validate_names("Ada", &"b".repeat(MAX_NAME_LEN), &mut errors);
        assert!(errors.is_empty());

        validate_names(&"a".repeat(MAX_NAME_LEN + 1), "", &mut errors);
        assert_eq!(errors, vec!["First name must be at most 150 characters.".to_string()]);
    }

    #[test]
    fn password_needs_eight_characters() {
        let mut errors = Vec::new();
        validate_password("12345678", &mut errors);
        assert!(errors.is_empty());

        validate_password("short", &mut errors);
        assert_eq!(errors.len(), 1);
    }
}
