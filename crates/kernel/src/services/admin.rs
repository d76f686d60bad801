//! Superuser administration of categories and user accounts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{Category, NewUser, PostFilter, User, UserChanges};
use crate::permissions::{Caller, Identity};
use crate::services::accounts::{
    check_unique_identity, hash_password_blocking, validate_email, validate_names,
    validate_password, validate_username,
};
use crate::store::ContentStore;

/// Longest accepted category name.
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

/// Submitted account fields from the user form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Required on create; on edit, blank keeps the current password.
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_active: bool,
}

impl UserForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            password: String::new(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
        }
    }
}

/// A user row on the account list.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    pub post_count: i64,
}

fn plural_posts(count: i64) -> String {
    if count == 1 {
        "1 post".to_string()
    } else {
        format!("{count} posts")
    }
}

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn ContentStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    fn require_category_admin(caller: &Caller) -> ServiceResult<&Identity> {
        let identity = caller.identity().ok_or(ServiceError::Unauthorized)?;
        if !identity.capabilities().can_manage_categories {
            return Err(ServiceError::forbidden("Only superusers can manage categories."));
        }
        Ok(identity)
    }

    fn require_user_admin(caller: &Caller) -> ServiceResult<&Identity> {
        let identity = caller.identity().ok_or(ServiceError::Unauthorized)?;
        if !identity.capabilities().can_manage_users {
            return Err(ServiceError::forbidden("Only superusers can manage users."));
        }
        Ok(identity)
    }

    // Categories

    pub async fn find_category(&self, caller: &Caller, id: Uuid) -> ServiceResult<Category> {
        Self::require_category_admin(caller)?;
        self.store
            .find_category(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn validate_category_name(&self, name: &str, exclude: Option<Uuid>) -> ServiceResult<()> {
        if name.is_empty() {
            return Err(ServiceError::validation("Category name is required."));
        }
        if name.chars().count() > MAX_CATEGORY_NAME_LEN {
            return Err(ServiceError::validation(format!(
                "Category name must be at most {MAX_CATEGORY_NAME_LEN} characters."
            )));
        }
        if self.store.category_name_taken(name, exclude).await? {
            return Err(ServiceError::validation(
                "A category with this name already exists.",
            ));
        }
        Ok(())
    }

    pub async fn add_category(&self, caller: &Caller, name: &str) -> ServiceResult<Category> {
        Self::require_category_admin(caller)?;
        let name = name.trim();
        self.validate_category_name(name, None).await?;

        let category = self.store.create_category(name).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn edit_category(
        &self,
        caller: &Caller,
        id: Uuid,
        name: &str,
    ) -> ServiceResult<Category> {
        Self::require_category_admin(caller)?;
        if self.store.find_category(id).await?.is_none() {
            return Err(ServiceError::NotFound);
        }
        let name = name.trim();
        self.validate_category_name(name, Some(id)).await?;

        let category = self
            .store
            .rename_category(id, name)
            .await?
            .ok_or(ServiceError::NotFound)?;
        tracing::info!(category_id = %id, name = %category.name, "category renamed");
        Ok(category)
    }

    /// Delete an unused category, returning it as it was.
    pub async fn delete_category(&self, caller: &Caller, id: Uuid) -> ServiceResult<Category> {
        Self::require_category_admin(caller)?;
        let category = self
            .store
            .find_category(id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let post_count = self
            .store
            .count_posts(&PostFilter::default().in_category(id))
            .await?;
        if post_count > 0 {
            tracing::info!(category_id = %id, post_count, "category deletion refused");
            return Err(ServiceError::Refused(format!(
                "Cannot delete category \"{}\" because it has {}.",
                category.name,
                plural_posts(post_count)
            )));
        }

        self.store.delete_category(id).await?;
        tracing::info!(category_id = %id, name = %category.name, "category deleted");
        Ok(category)
    }

    // Users

    pub async fn list_users(&self, caller: &Caller) -> ServiceResult<Vec<UserSummary>> {
        Self::require_user_admin(caller)?;
        let users = self.store.list_users().await?;

        let mut summaries = Vec::with_capacity(users.len());
        for user in users {
            let post_count = self
                .store
                .count_posts(&PostFilter::default().by_author(user.id))
                .await?;
            summaries.push(UserSummary { user, post_count });
        }
        Ok(summaries)
    }

    pub async fn find_user(&self, caller: &Caller, id: Uuid) -> ServiceResult<User> {
        Self::require_user_admin(caller)?;
        self.store.find_user(id).await?.ok_or(ServiceError::NotFound)
    }

    pub async fn create_user(&self, caller: &Caller, form: UserForm) -> ServiceResult<User> {
        Self::require_user_admin(caller)?;
        let username = form.username.trim().to_string();
        let email = form.email.trim().to_string();

        let mut errors = Vec::new();
        validate_username(&username, &mut errors);
        validate_email(&email, &mut errors);
        validate_names(form.first_name.trim(), form.last_name.trim(), &mut errors);
        validate_password(&form.password, &mut errors);
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
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                password_hash,
                is_staff: form.is_staff,
                is_superuser: form.is_superuser,
                is_active: form.is_active,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub async fn edit_user(
        &self,
        caller: &Caller,
        id: Uuid,
        form: UserForm,
    ) -> ServiceResult<User> {
        Self::require_user_admin(caller)?;
        if self.store.find_user(id).await?.is_none() {
            return Err(ServiceError::NotFound);
        }
        let username = form.username.trim().to_string();
        let email = form.email.trim().to_string();

        let mut errors = Vec::new();
        validate_username(&username, &mut errors);
        validate_email(&email, &mut errors);
        validate_names(form.first_name.trim(), form.last_name.trim(), &mut errors);
        if !form.password.is_empty() {
            validate_password(&form.password, &mut errors);
        }
        check_unique_identity(self.store.as_ref(), &username, &email, Some(id), &mut errors)
            .await?;
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let user = self
            .store
            .update_user(
                id,
                UserChanges {
                    username,
                    email,
                    first_name: form.first_name.trim().to_string(),
                    last_name: form.last_name.trim().to_string(),
                    is_staff: form.is_staff,
                    is_superuser: form.is_superuser,
                    is_active: form.is_active,
                },
            )
            .await?
            .ok_or(ServiceError::NotFound)?;

        if !form.password.is_empty() {
            let password_hash = hash_password_blocking(form.password).await?;
            self.store.set_password_hash(id, &password_hash).await?;
            tracing::info!(user_id = %id, "user password changed");
        }

        tracing::info!(user_id = %id, username = %user.username, "user updated");
        Ok(user)
    }

    /// Delete an account that owns no posts, returning it as it was.
    pub async fn delete_user(&self, caller: &Caller, id: Uuid) -> ServiceResult<User> {
        let identity = Self::require_user_admin(caller)?;
        let user = self.store.find_user(id).await?.ok_or(ServiceError::NotFound)?;

        if identity.user_id == id {
            return Err(ServiceError::Refused(
                "You cannot delete your own account.".to_string(),
            ));
        }

        let post_count = self
            .store
            .count_posts(&PostFilter::default().by_author(id))
            .await?;
        if post_count > 0 {
            tracing::info!(user_id = %id, post_count, "user deletion refused");
            return Err(ServiceError::Refused(format!(
                "Cannot delete user \"{}\" because they have {}.",
                user.username,
                plural_posts(post_count)
            )));
        }

        self.store.delete_user(id).await?;
        tracing::info!(user_id = %id, username = %user.username, "user deleted");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::plural_posts;

    #[test]
    fn post_counts_are_pluralised() {
        assert_eq!(plural_posts(1), "1 post");
        assert_eq!(plural_posts(3), "3 posts");
    }
}
