//! Authoring and moderation: posts, feature images, and comments.
//!
//! Authors manage their own posts; staff and superusers may moderate any post
//! or comment.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::file::{ALLOWED_IMAGE_TYPES, FileStorage, MAX_IMAGE_SIZE};
use crate::models::{
    Category, Comment, NewComment, NewPost, Post, PostChanges, PostFilter, PostStatus,
};
use crate::permissions::{Caller, Identity};
use crate::services::slug::{slugify, unique_slug};
use crate::store::ContentStore;

/// Longest accepted post title.
pub const MAX_TITLE_LEN: usize = 200;

/// Submitted post fields, as raw form strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    /// Category id.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub body: String,
    /// "Draft" or "Published"; blank means draft.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_featured: bool,
}

impl PostForm {
    /// Prefill a form from an existing post.
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            category: post.category_id.to_string(),
            short_description: post.short_description.clone(),
            body: post.body.clone(),
            status: post.status().label().to_string(),
            is_featured: post.is_featured,
        }
    }
}

/// An uploaded feature image.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// What the dashboard landing page shows.
#[derive(Debug, Serialize)]
pub struct DashboardOverview {
    pub posts: Vec<Post>,
    /// Present only for callers who can manage categories; newest first.
    pub categories: Option<Vec<Category>>,
}

/// Validated post fields ready to persist.
struct ValidPost {
    title: String,
    category_id: Uuid,
    short_description: String,
    body: String,
    status: PostStatus,
}

fn require_identity(caller: &Caller) -> ServiceResult<&Identity> {
    caller.identity().ok_or(ServiceError::Unauthorized)
}

#[derive(Clone)]
pub struct AuthoringService {
    store: Arc<dyn ContentStore>,
    files: Arc<dyn FileStorage>,
}

impl AuthoringService {
    pub fn new(store: Arc<dyn ContentStore>, files: Arc<dyn FileStorage>) -> Self {
        Self { store, files }
    }

    // Comments

    pub async fn submit_comment(
        &self,
        caller: &Caller,
        post_slug: &str,
        body: &str,
    ) -> ServiceResult<Comment> {
        let identity = require_identity(caller)?;
        let post = self
            .store
            .find_post_by_slug(post_slug)
            .await?
            .filter(Post::is_published)
            .ok_or(ServiceError::NotFound)?;

        let body = body.trim();
        if body.is_empty() {
            return Err(ServiceError::validation("Comment cannot be empty."));
        }

        let comment = self
            .store
            .create_comment(NewComment {
                post_id: post.id,
                author_id: identity.user_id,
                body: body.to_string(),
            })
            .await?;

        tracing::info!(comment_id = %comment.id, post_id = %post.id, "comment added");
        Ok(comment)
    }

    /// Delete a comment, returning the post it belonged to.
    pub async fn delete_comment(&self, caller: &Caller, comment_id: Uuid) -> ServiceResult<Post> {
        require_identity(caller)?;
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        if !caller.owns_or_moderates(comment.author_id) {
            return Err(ServiceError::forbidden(
                "You do not have permission to delete this comment.",
            ));
        }

        let post = self
            .store
            .find_post(comment.post_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        self.store.delete_comment(comment_id).await?;

        tracing::info!(comment_id = %comment_id, post_id = %post.id, "comment deleted");
        Ok(post)
    }

    // Posts

    /// Posts the caller may manage: all of them for moderators, otherwise their own.
    pub async fn list_my_posts(&self, caller: &Caller) -> ServiceResult<Vec<Post>> {
        let identity = require_identity(caller)?;
        let filter = if identity.capabilities().can_moderate_posts {
            PostFilter::default()
        } else {
            PostFilter::default().by_author(identity.user_id)
        };
        Ok(self.store.list_posts(&filter).await?)
    }

    pub async fn dashboard_overview(&self, caller: &Caller) -> ServiceResult<DashboardOverview> {
        let identity = require_identity(caller)?;
        let posts = self
            .store
            .list_posts(&PostFilter::default().by_author(identity.user_id))
            .await?;

        let categories = if identity.capabilities().can_manage_categories {
            let mut categories = self.store.list_categories().await?;
            categories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Some(categories)
        } else {
            None
        };

        Ok(DashboardOverview { posts, categories })
    }

    /// Categories offered on the post form.
    pub async fn form_categories(&self, caller: &Caller) -> ServiceResult<Vec<Category>> {
        require_identity(caller)?;
        Ok(self.store.list_categories().await?)
    }

    /// Load a post for editing, enforcing the same rules as `edit_post`.
    pub async fn post_for_edit(&self, caller: &Caller, post_id: Uuid) -> ServiceResult<Post> {
        require_identity(caller)?;
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        if !caller.owns_or_moderates(post.author_id) {
            return Err(ServiceError::forbidden(
                "You do not have permission to edit this post.",
            ));
        }
        Ok(post)
    }

    pub async fn create_post(
        &self,
        caller: &Caller,
        form: PostForm,
        image: Option<Upload>,
    ) -> ServiceResult<Post> {
        let identity = require_identity(caller)?;
        let valid = self.validate(&form, image.as_ref()).await?;

        let base = slugify(&valid.title);
        let slug = unique_slug(self.store.as_ref(), &base, None).await?;
        let is_featured = form.is_featured && identity.capabilities().can_moderate_posts;

        let featured_image = match image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let result = self
            .store
            .create_post(NewPost {
                title: valid.title,
                slug,
                category_id: valid.category_id,
                author_id: identity.user_id,
                short_description: valid.short_description,
                body: valid.body,
                status: valid.status,
                is_featured,
                featured_image: featured_image.clone(),
            })
            .await;

        match result {
            Ok(post) => {
                tracing::info!(
                    post_id = %post.id,
                    slug = %post.slug,
                    author_id = %identity.user_id,
                    "post created"
                );
                Ok(post)
            }
            Err(e) => {
                if let Some(uri) = featured_image {
                    self.remove_image(&uri).await;
                }
                Err(e.into())
            }
        }
    }

    pub async fn edit_post(
        &self,
        caller: &Caller,
        post_id: Uuid,
        form: PostForm,
        image: Option<Upload>,
    ) -> ServiceResult<Post> {
        let existing = self.post_for_edit(caller, post_id).await?;
        let valid = self.validate(&form, image.as_ref()).await?;

        let slug = if valid.title == existing.title {
            existing.slug.clone()
        } else {
            let base = slugify(&valid.title);
            unique_slug(self.store.as_ref(), &base, Some(post_id)).await?
        };

        let is_featured = if caller.capabilities().can_moderate_posts {
            form.is_featured
        } else {
            existing.is_featured
        };

        let new_image = match image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };
        let featured_image = new_image
            .clone()
            .or_else(|| existing.featured_image.clone());

        let result = self
            .store
            .update_post(
                post_id,
                PostChanges {
                    title: valid.title,
                    slug,
                    category_id: valid.category_id,
                    short_description: valid.short_description,
                    body: valid.body,
                    status: valid.status,
                    is_featured,
                    featured_image,
                },
            )
            .await;

        let updated = match result {
            Ok(Some(post)) => post,
            Ok(None) => {
                if let Some(uri) = new_image {
                    self.remove_image(&uri).await;
                }
                return Err(ServiceError::NotFound);
            }
            Err(e) => {
                if let Some(uri) = new_image {
                    self.remove_image(&uri).await;
                }
                return Err(e.into());
            }
        };

        if new_image.is_some()
            && let Some(old) = existing.featured_image.as_deref()
        {
            self.remove_image(old).await;
        }

        tracing::info!(post_id = %post_id, slug = %updated.slug, "post updated");
        Ok(updated)
    }

    /// Delete a post, returning it as it was.
    pub async fn delete_post(&self, caller: &Caller, post_id: Uuid) -> ServiceResult<Post> {
        require_identity(caller)?;
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        if !caller.owns_or_moderates(post.author_id) {
            return Err(ServiceError::forbidden(
                "You do not have permission to delete this post.",
            ));
        }

        if !self.store.delete_post(post_id).await? {
            return Err(ServiceError::NotFound);
        }
        if let Some(uri) = post.featured_image.as_deref() {
            self.remove_image(uri).await;
        }

        tracing::info!(post_id = %post_id, slug = %post.slug, "post deleted");
        Ok(post)
    }

    /// Flip a post's featured flag, returning the post with its new state.
    pub async fn toggle_featured(&self, caller: &Caller, post_id: Uuid) -> ServiceResult<Post> {
        require_identity(caller)?;
        if !caller.capabilities().can_moderate_posts {
            return Err(ServiceError::forbidden("Only staff can feature posts."));
        }

        let mut post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let featured = !post.is_featured;
        if !self.store.set_featured(post_id, featured).await? {
            return Err(ServiceError::NotFound);
        }
        post.is_featured = featured;

        tracing::info!(post_id = %post_id, featured, "post featured flag toggled");
        Ok(post)
    }

    async fn validate(&self, form: &PostForm, image: Option<&Upload>) -> ServiceResult<ValidPost> {
        let title = form.title.trim().to_string();
        let short_description = form.short_description.trim().to_string();
        let body = form.body.trim().to_string();
        let category = form.category.trim();

        let mut errors = Vec::new();
        if title.is_empty() {
            errors.push("Title is required.".to_string());
        } else if title.chars().count() > MAX_TITLE_LEN {
            errors.push(format!("Title must be at most {MAX_TITLE_LEN} characters."));
        } else if slugify(&title).is_empty() {
            errors.push("Title must contain at least one letter or number.".to_string());
        }
        if short_description.is_empty() {
            errors.push("Short description is required.".to_string());
        }
        if body.is_empty() {
            errors.push("Body is required.".to_string());
        }

        let status = if form.status.trim().is_empty() {
            Some(PostStatus::Draft)
        } else {
            PostStatus::from_form(&form.status)
        };
        if status.is_none() {
            errors.push("Invalid status.".to_string());
        }

        let mut category_id = None;
        if category.is_empty() {
            errors.push("Category is required.".to_string());
        } else {
            match Uuid::parse_str(category) {
                Ok(id) if self.store.find_category(id).await?.is_some() => category_id = Some(id),
                _ => errors.push("Invalid category.".to_string()),
            }
        }

        if let Some(upload) = image {
            if !ALLOWED_IMAGE_TYPES.contains(&upload.content_type.as_str()) {
                errors.push("Feature image must be a JPEG, PNG, GIF or WebP image.".to_string());
            } else if upload.data.len() > MAX_IMAGE_SIZE {
                errors.push("Feature image is too large.".to_string());
            }
        }

        match (status, category_id) {
            (Some(status), Some(category_id)) if errors.is_empty() => Ok(ValidPost {
                title,
                category_id,
                short_description,
                body,
                status,
            }),
            _ => Err(ServiceError::Validation(errors)),
        }
    }

    async fn store_image(&self, upload: Upload) -> ServiceResult<String> {
        let uri = self.files.generate_uri(&upload.filename);
        self.files.write(&uri, &upload.data).await?;
        Ok(uri)
    }

    async fn remove_image(&self, uri: &str) {
        if let Err(e) = self.files.delete(uri).await {
            tracing::warn!(error = %e, uri = %uri, "failed to remove feature image");
        }
    }
}
