//! Content store abstraction.
//!
//! All reads and writes of blog content and accounts go through
//! [`ContentStore`]. Production uses [`PgContentStore`]; the test suite runs
//! the same services against [`MemoryContentStore`].

pub mod memory;
mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryContentStore;
pub use postgres::PgContentStore;

use crate::models::{
    About, Category, Comment, NewComment, NewPost, NewUser, Post, PostChanges, PostFilter,
    SocialLink, User, UserChanges,
};

/// Persistent storage for categories, posts, comments, site content, and users.
///
/// Deleting a category or a user that posts still reference must fail; deleting
/// a post or a user removes their comments.
#[async_trait]
pub trait ContentStore: Send + Sync {
    // Categories

    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>>;

    /// Case-insensitive name check, ignoring the category `exclude`.
    async fn category_name_taken(&self, name: &str, exclude: Option<Uuid>) -> Result<bool>;

    async fn create_category(&self, name: &str) -> Result<Category>;

    async fn rename_category(&self, id: Uuid, name: &str) -> Result<Option<Category>>;

    async fn delete_category(&self, id: Uuid) -> Result<bool>;

    // Posts

    /// Posts matching `filter`, newest first.
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>>;

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64>;

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>>;

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Slugs equal to `base` or of the form `base-*`, ignoring the post `exclude`.
    async fn slugs_with_prefix(&self, base: &str, exclude: Option<Uuid>) -> Result<Vec<String>>;

    async fn create_post(&self, input: NewPost) -> Result<Post>;

    async fn update_post(&self, id: Uuid, input: PostChanges) -> Result<Option<Post>>;

    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<bool>;

    async fn delete_post(&self, id: Uuid) -> Result<bool>;

    // Comments

    /// Comments on a post, oldest first.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>>;

    async fn create_comment(&self, input: NewComment) -> Result<Comment>;

    async fn delete_comment(&self, id: Uuid) -> Result<bool>;

    // Site content

    /// The oldest about record.
    async fn first_about(&self) -> Result<Option<About>>;

    async fn list_social_links(&self) -> Result<Vec<SocialLink>>;

    // Users

    /// All users ordered by username.
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool>;

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool>;

    async fn create_user(&self, input: NewUser) -> Result<User>;

    async fn update_user(&self, id: Uuid, input: UserChanges) -> Result<Option<User>>;

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool>;

    async fn touch_login(&self, id: Uuid) -> Result<()>;

    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    /// Whether the backing store is reachable.
    async fn healthy(&self) -> bool;
}
