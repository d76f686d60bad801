//! PostgreSQL-backed content store.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::ContentStore;
use crate::db;
use crate::models::{
    About, Category, Comment, NewComment, NewPost, NewUser, Post, PostChanges, PostFilter,
    SocialLink, User, UserChanges,
};

/// Content store that reads and writes the relational schema directly.
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Category::list(&self.pool).await
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        Category::find_by_id(&self.pool, id).await
    }

    async fn category_name_taken(&self, name: &str, exclude: Option<Uuid>) -> Result<bool> {
        Category::name_taken(&self.pool, name, exclude).await
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        Category::create(&self.pool, name).await
    }

    async fn rename_category(&self, id: Uuid, name: &str) -> Result<Option<Category>> {
        Category::rename(&self.pool, id, name).await
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        Category::delete(&self.pool, id).await
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        Post::list(&self.pool, filter).await
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        Post::count(&self.pool, filter).await
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        Post::find_by_id(&self.pool, id).await
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        Post::find_by_slug(&self.pool, slug).await
    }

    async fn slugs_with_prefix(&self, base: &str, exclude: Option<Uuid>) -> Result<Vec<String>> {
        Post::slugs_with_prefix(&self.pool, base, exclude).await
    }

    async fn create_post(&self, input: NewPost) -> Result<Post> {
        Post::create(&self.pool, input).await
    }

    async fn update_post(&self, id: Uuid, input: PostChanges) -> Result<Option<Post>> {
        Post::update(&self.pool, id, input).await
    }

    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<bool> {
        Post::set_featured(&self.pool, id, featured).await
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        Post::delete(&self.pool, id).await
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        Comment::list_for_post(&self.pool, post_id).await
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        Comment::find_by_id(&self.pool, id).await
    }

    async fn create_comment(&self, input: NewComment) -> Result<Comment> {
        Comment::create(&self.pool, input).await
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        Comment::delete(&self.pool, id).await
    }

    async fn first_about(&self) -> Result<Option<About>> {
        About::first(&self.pool).await
    }

    async fn list_social_links(&self) -> Result<Vec<SocialLink>> {
        SocialLink::list(&self.pool).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        User::list(&self.pool).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        User::find_by_id(&self.pool, id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        User::find_by_username(&self.pool, username).await
    }

    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool> {
        User::username_taken(&self.pool, username, exclude).await
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool> {
        User::email_taken(&self.pool, email, exclude).await
    }

    async fn create_user(&self, input: NewUser) -> Result<User> {
        User::create(&self.pool, input).await
    }

    async fn update_user(&self, id: Uuid, input: UserChanges) -> Result<Option<User>> {
        User::update(&self.pool, id, input).await
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        User::set_password_hash(&self.pool, id, password_hash).await
    }

    async fn touch_login(&self, id: Uuid) -> Result<()> {
        User::touch_login(&self.pool, id).await
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        User::delete(&self.pool, id).await
    }

    async fn healthy(&self) -> bool {
        db::check_health(&self.pool).await
    }
}
