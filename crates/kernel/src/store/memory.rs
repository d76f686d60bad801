//! In-memory content store.
//!
//! Keeps every table in a `Vec` behind one lock and enforces the same
//! referential rules as the PostgreSQL schema: categories and authors with
//! posts cannot be deleted, and comments follow their post or author.

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::ContentStore;
use crate::models::{
    About, Category, Comment, NewComment, NewPost, NewUser, Post, PostChanges, PostFilter,
    SocialLink, User, UserChanges,
};

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    abouts: Vec<About>,
    social_links: Vec<SocialLink>,
    users: Vec<User>,
}

impl Tables {
    fn category_name(&self, id: Uuid) -> String {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn username(&self, id: Uuid) -> String {
        self.users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    /// Fill in joined display columns as the SQL join would.
    fn hydrate_post(&self, post: &Post) -> Post {
        let mut post = post.clone();
        post.category_name = self.category_name(post.category_id);
        post.author_username = self.username(post.author_id);
        post
    }

    fn hydrate_comment(&self, comment: &Comment) -> Comment {
        let mut comment = comment.clone();
        comment.author_username = self.username(comment.author_id);
        comment
    }

    fn matching_posts(&self, filter: &PostFilter) -> Vec<Post> {
        // Newest first; later inserts win timestamp ties.
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .rev()
            .filter(|p| filter.matches(p))
            .map(|p| self.hydrate_post(p))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }
}

/// Content store held entirely in process memory.
#[derive(Default)]
pub struct MemoryContentStore {
    tables: RwLock<Tables>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an about record.
    pub fn add_about(&self, heading: &str, description: &str) -> About {
        let now = Utc::now();
        let about = About {
            id: Uuid::now_v7(),
            heading: heading.to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tables.write().abouts.push(about.clone());
        about
    }

    /// Add a social link.
    pub fn add_social_link(&self, platform: &str, url: &str) -> SocialLink {
        let link = SocialLink {
            id: Uuid::now_v7(),
            platform: platform.to_string(),
            url: url.to_string(),
        };
        self.tables.write().social_links.push(link.clone());
        link
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.tables.read().categories.clone())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self
            .tables
            .read()
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn category_name_taken(&self, name: &str, exclude: Option<Uuid>) -> Result<bool> {
        let name = name.to_lowercase();
        Ok(self
            .tables
            .read()
            .categories
            .iter()
            .any(|c| c.name.to_lowercase() == name && Some(c.id) != exclude))
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let mut tables = self.tables.write();
        let lowered = name.to_lowercase();
        if tables
            .categories
            .iter()
            .any(|c| c.name.to_lowercase() == lowered)
        {
            bail!("duplicate key value violates unique constraint \"category_name_lower_idx\"");
        }

        let now = Utc::now();
        let category = Category {
            id: Uuid::now_v7(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn rename_category(&self, id: Uuid, name: &str) -> Result<Option<Category>> {
        let mut tables = self.tables.write();
        let Some(category) = tables.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        category.name = name.to_string();
        category.updated_at = Utc::now();
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.posts.iter().any(|p| p.category_id == id) {
            bail!("category {id} is still referenced by posts");
        }
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok(tables.categories.len() < before)
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        Ok(self.tables.read().matching_posts(filter))
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        let tables = self.tables.read();
        Ok(tables.posts.iter().filter(|p| filter.matches(p)).count() as i64)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        let tables = self.tables.read();
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| tables.hydrate_post(p)))
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let tables = self.tables.read();
        Ok(tables
            .posts
            .iter()
            .find(|p| p.slug == slug)
            .map(|p| tables.hydrate_post(p)))
    }

    async fn slugs_with_prefix(&self, base: &str, exclude: Option<Uuid>) -> Result<Vec<String>> {
        let prefix = format!("{base}-");
        Ok(self
            .tables
            .read()
            .posts
            .iter()
            .filter(|p| Some(p.id) != exclude)
            .filter(|p| p.slug == base || p.slug.starts_with(&prefix))
            .map(|p| p.slug.clone())
            .collect())
    }

    async fn create_post(&self, input: NewPost) -> Result<Post> {
        let mut tables = self.tables.write();
        if tables.posts.iter().any(|p| p.slug == input.slug) {
            bail!("duplicate key value violates unique constraint \"post_slug_key\"");
        }
        if !tables.categories.iter().any(|c| c.id == input.category_id) {
            bail!("category {} does not exist", input.category_id);
        }
        if !tables.users.iter().any(|u| u.id == input.author_id) {
            bail!("user {} does not exist", input.author_id);
        }

        let now = Utc::now();
        let post = Post {
            id: Uuid::now_v7(),
            title: input.title,
            slug: input.slug,
            category_id: input.category_id,
            author_id: input.author_id,
            short_description: input.short_description,
            body: input.body,
            status: input.status.as_i16(),
            is_featured: input.is_featured,
            featured_image: input.featured_image,
            created_at: now,
            updated_at: now,
            category_name: String::new(),
            author_username: String::new(),
        };
        let hydrated = tables.hydrate_post(&post);
        tables.posts.push(post);
        Ok(hydrated)
    }

    async fn update_post(&self, id: Uuid, input: PostChanges) -> Result<Option<Post>> {
        let mut tables = self.tables.write();
        if tables
            .posts
            .iter()
            .any(|p| p.id != id && p.slug == input.slug)
        {
            bail!("duplicate key value violates unique constraint \"post_slug_key\"");
        }
        if !tables.categories.iter().any(|c| c.id == input.category_id) {
            bail!("category {} does not exist", input.category_id);
        }

        let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.title = input.title;
        post.slug = input.slug;
        post.category_id = input.category_id;
        post.short_description = input.short_description;
        post.body = input.body;
        post.status = input.status.as_i16();
        post.is_featured = input.is_featured;
        post.featured_image = input.featured_image;
        post.updated_at = Utc::now();
        let updated = post.clone();

        Ok(Some(tables.hydrate_post(&updated)))
    }

    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<bool> {
        let mut tables = self.tables.write();
        let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        post.is_featured = featured;
        post.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        if tables.posts.len() == before {
            return Ok(false);
        }
        tables.comments.retain(|c| c.post_id != id);
        Ok(true)
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let tables = self.tables.read();
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| tables.hydrate_comment(c))
            .collect())
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let tables = self.tables.read();
        Ok(tables
            .comments
            .iter()
            .find(|c| c.id == id)
            .map(|c| tables.hydrate_comment(c)))
    }

    async fn create_comment(&self, input: NewComment) -> Result<Comment> {
        let mut tables = self.tables.write();
        if !tables.posts.iter().any(|p| p.id == input.post_id) {
            bail!("post {} does not exist", input.post_id);
        }
        if !tables.users.iter().any(|u| u.id == input.author_id) {
            bail!("user {} does not exist", input.author_id);
        }

        let comment = Comment {
            id: Uuid::now_v7(),
            post_id: input.post_id,
            author_id: input.author_id,
            body: input.body,
            created_at: Utc::now(),
            author_username: String::new(),
        };
        let hydrated = tables.hydrate_comment(&comment);
        tables.comments.push(comment);
        Ok(hydrated)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        Ok(tables.comments.len() < before)
    }

    async fn first_about(&self) -> Result<Option<About>> {
        Ok(self.tables.read().abouts.first().cloned())
    }

    async fn list_social_links(&self) -> Result<Vec<SocialLink>> {
        let mut links = self.tables.read().social_links.clone();
        links.sort_by(|a, b| a.platform.cmp(&b.platform));
        Ok(links)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users = self.tables.read().users.clone();
        users.sort_by_key(|u| u.username.to_lowercase());
        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_lowercase();
        Ok(self
            .tables
            .read()
            .users
            .iter()
            .find(|u| u.username.to_lowercase() == username)
            .cloned())
    }

    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool> {
        let username = username.to_lowercase();
        Ok(self
            .tables
            .read()
            .users
            .iter()
            .any(|u| u.username.to_lowercase() == username && Some(u.id) != exclude))
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool> {
        let email = email.to_lowercase();
        Ok(self
            .tables
            .read()
            .users
            .iter()
            .any(|u| u.email.to_lowercase() == email && Some(u.id) != exclude))
    }

    async fn create_user(&self, input: NewUser) -> Result<User> {
        let mut tables = self.tables.write();
        let username = input.username.to_lowercase();
        let email = input.email.to_lowercase();
        if tables.users.iter().any(|u| {
            u.username.to_lowercase() == username || u.email.to_lowercase() == email
        }) {
            bail!("duplicate key value violates unique constraint on users");
        }

        let user = User {
            id: Uuid::now_v7(),
            username: input.username,
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            password_hash: input.password_hash,
            is_staff: input.is_staff,
            is_superuser: input.is_superuser,
            is_active: input.is_active,
            created_at: Utc::now(),
            last_login: None,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, input: UserChanges) -> Result<Option<User>> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.username = input.username;
        user.email = input.email;
        user.first_name = input.first_name;
        user.last_name = input.last_name;
        user.is_staff = input.is_staff;
        user.is_superuser = input.is_superuser;
        user.is_active = input.is_active;
        Ok(Some(user.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        Ok(true)
    }

    async fn touch_login(&self, id: Uuid) -> Result<()> {
        if let Some(user) = self.tables.write().users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.posts.iter().any(|p| p.author_id == id) {
            bail!("user {id} is still referenced by posts");
        }
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }
        tables.comments.retain(|c| c.author_id != id);
        Ok(true)
    }

    async fn healthy(&self) -> bool {
        true
    }
}
