//! Blog post model.
//!
//! Listing queries are assembled with SeaQuery so the same builder serves the
//! home feed, category pages, keyword search, and the dashboard post list.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_query::{Alias, Asterisk, Expr, Order, PostgresQueryBuilder, Query, SelectStatement};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Publication status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    /// Database representation.
    pub fn as_i16(self) -> i16 {
        match self {
            Self::Draft => 0,
            Self::Published => 1,
        }
    }

    /// Convert from the database representation. Unknown values read as draft.
    pub fn from_i16(value: i16) -> Self {
        if value == 1 {
            Self::Published
        } else {
            Self::Draft
        }
    }

    /// Parse a submitted form value. Accepts the label (any case) or the numeric code.
    pub fn from_form(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" | "0" => Some(Self::Draft),
            "published" | "1" => Some(Self::Published),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
        }
    }
}

/// Post record joined with its category name and author username.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub short_description: String,
    pub body: String,

    /// 0 = draft, 1 = published.
    pub status: i16,

    pub is_featured: bool,

    /// Storage URI of the feature image, if one was uploaded.
    pub featured_image: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub category_name: String,
    pub author_username: String,
}

impl Post {
    pub fn status(&self) -> PostStatus {
        PostStatus::from_i16(self.status)
    }

    pub fn is_published(&self) -> bool {
        self.status() == PostStatus::Published
    }
}

/// Input for creating a post. The slug is resolved by the caller.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub short_description: String,
    pub body: String,
    pub status: PostStatus,
    pub is_featured: bool,
    pub featured_image: Option<String>,
}

/// Replacement values for an existing post.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub slug: String,
    pub category_id: Uuid,
    pub short_description: String,
    pub body: String,
    pub status: PostStatus,
    pub is_featured: bool,
    pub featured_image: Option<String>,
}

/// Filter for post listings. Results are always newest first.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub featured: Option<bool>,

    /// Case-insensitive substring matched against title, short description, and body.
    pub keyword: Option<String>,
}

impl PostFilter {
    /// Published posts only.
    pub fn published() -> Self {
        Self {
            status: Some(PostStatus::Published),
            ..Default::default()
        }
    }

    pub fn in_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn by_author(mut self, author_id: Uuid) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn featured(mut self) -> Self {
        self.featured = Some(true);
        self
    }

    pub fn matching(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Check a post against this filter. Mirrors the SQL built by `listing_query`.
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(status) = self.status
            && post.status != status.as_i16()
        {
            return false;
        }
        if let Some(category_id) = self.category_id
            && post.category_id != category_id
        {
            return false;
        }
        if let Some(author_id) = self.author_id
            && post.author_id != author_id
        {
            return false;
        }
        if let Some(featured) = self.featured
            && post.is_featured != featured
        {
            return false;
        }
        if let Some(ref keyword) = self.keyword {
            let needle = keyword.to_lowercase();
            return [&post.title, &post.short_description, &post.body]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
        }
        true
    }
}

/// Escape LIKE wildcards so user input is matched literally.
pub fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn post_col(name: &str) -> Expr {
    Expr::col((Alias::new("post"), Alias::new(name)))
}

fn apply_filter(query: &mut SelectStatement, filter: &PostFilter) {
    if let Some(status) = filter.status {
        query.and_where(post_col("status").eq(status.as_i16()));
    }
    if let Some(category_id) = filter.category_id {
        query.and_where(post_col("category_id").eq(category_id));
    }
    if let Some(author_id) = filter.author_id {
        query.and_where(post_col("author_id").eq(author_id));
    }
    if let Some(featured) = filter.featured {
        query.and_where(post_col("is_featured").eq(featured));
    }
    if let Some(ref keyword) = filter.keyword {
        let pattern = format!("%{}%", escape_like(keyword));
        query.and_where(Expr::cust_with_values(
            "(post.title ILIKE $1 OR post.short_description ILIKE $2 OR post.body ILIKE $3)",
            [pattern.clone(), pattern.clone(), pattern],
        ));
    }
}

/// Build the listing SELECT for a filter.
pub fn listing_query(filter: &PostFilter) -> String {
    let mut query = Query::select();

    query
        .column((Alias::new("post"), Asterisk))
        .expr_as(
            Expr::col((Alias::new("category"), Alias::new("name"))),
            Alias::new("category_name"),
        )
        .expr_as(
            Expr::col((Alias::new("users"), Alias::new("username"))),
            Alias::new("author_username"),
        )
        .from(Alias::new("post"))
        .inner_join(
            Alias::new("category"),
            Expr::col((Alias::new("category"), Alias::new("id"))).equals((
                Alias::new("post"),
                Alias::new("category_id"),
            )),
        )
        .inner_join(
            Alias::new("users"),
            Expr::col((Alias::new("users"), Alias::new("id")))
                .equals((Alias::new("post"), Alias::new("author_id"))),
        );

    apply_filter(&mut query, filter);

    query
        .order_by((Alias::new("post"), Alias::new("created_at")), Order::Desc)
        .order_by((Alias::new("post"), Alias::new("id")), Order::Desc);

    query.to_string(PostgresQueryBuilder)
}

/// Build the COUNT query for a filter.
pub fn count_query(filter: &PostFilter) -> String {
    let mut query = Query::select();
    query.expr(Expr::col(Asterisk).count()).from(Alias::new("post"));

    apply_filter(&mut query, filter);

    query.to_string(PostgresQueryBuilder)
}

const POST_SELECT: &str = r#"
    SELECT post.*, category.name AS category_name, users.username AS author_username
    FROM post
    INNER JOIN category ON category.id = post.category_id
    INNER JOIN users ON users.id = post.author_id
"#;

impl Post {
    /// List posts matching a filter, newest first.
    pub async fn list(pool: &PgPool, filter: &PostFilter) -> Result<Vec<Self>> {
        let sql = listing_query(filter);
        let posts = sqlx::query_as::<_, Post>(&sql)
            .fetch_all(pool)
            .await
            .context("failed to list posts")?;

        Ok(posts)
    }

    /// Count posts matching a filter.
    pub async fn count(pool: &PgPool, filter: &PostFilter) -> Result<i64> {
        let sql = count_query(filter);
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(pool)
            .await
            .context("failed to count posts")?;

        Ok(count)
    }

    /// Find a post by ID regardless of status.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, Post>(&format!("{POST_SELECT} WHERE post.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch post by id")?;

        Ok(post)
    }

    /// Find a post by slug regardless of status.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, Post>(&format!("{POST_SELECT} WHERE post.slug = $1"))
            .bind(slug)
            .fetch_optional(pool)
            .await
            .context("failed to fetch post by slug")?;

        Ok(post)
    }

    /// Slugs equal to `base` or starting with `base-`, excluding one post.
    pub async fn slugs_with_prefix(
        pool: &PgPool,
        base: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>> {
        let pattern = format!("{}-%", escape_like(base));
        let slugs: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT slug FROM post
            WHERE (slug = $1 OR slug LIKE $2) AND ($3::uuid IS NULL OR id <> $3)
            "#,
        )
        .bind(base)
        .bind(&pattern)
        .bind(exclude)
        .fetch_all(pool)
        .await
        .context("failed to fetch existing slugs")?;

        Ok(slugs)
    }

    /// Create a new post.
    pub async fn create(pool: &PgPool, input: NewPost) -> Result<Self> {
        let id = Uuid::now_v7();

        sqlx::query(
            r#"
            INSERT INTO post (id, title, slug, category_id, author_id, short_description, body,
                              status, is_featured, featured_image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(input.category_id)
        .bind(input.author_id)
        .bind(&input.short_description)
        .bind(&input.body)
        .bind(input.status.as_i16())
        .bind(input.is_featured)
        .bind(&input.featured_image)
        .execute(pool)
        .await
        .context("failed to create post")?;

        Self::find_by_id(pool, id)
            .await?
            .context("post missing after insert")
    }

    /// Replace a post's editable fields and refresh `updated_at`.
    pub async fn update(pool: &PgPool, id: Uuid, input: PostChanges) -> Result<Option<Self>> {
        let result = sqlx::query(
            r#"
            UPDATE post
            SET title = $1, slug = $2, category_id = $3, short_description = $4, body = $5,
                status = $6, is_featured = $7, featured_image = $8, updated_at = NOW()
            WHERE id = $9
            "#,
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(input.category_id)
        .bind(&input.short_description)
        .bind(&input.body)
        .bind(input.status.as_i16())
        .bind(input.is_featured)
        .bind(&input.featured_image)
        .bind(id)
        .execute(pool)
        .await
        .context("failed to update post")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    /// Set the featured flag.
    pub async fn set_featured(pool: &PgPool, id: Uuid, featured: bool) -> Result<bool> {
        let result =
            sqlx::query("UPDATE post SET is_featured = $1, updated_at = NOW() WHERE id = $2")
                .bind(featured)
                .bind(id)
                .execute(pool)
                .await
                .context("failed to update featured flag")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a post. Comments go with it.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM post WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete post")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        Post {
            id: Uuid::now_v7(),
            title: "Hello World".to_string(),
            slug: "hello-world".to_string(),
            category_id: Uuid::now_v7(),
            author_id: Uuid::now_v7(),
            short_description: "A first post".to_string(),
            body: "<p>Body text</p>".to_string(),
            status: 1,
            is_featured: false,
            featured_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            category_name: "Tech".to_string(),
            author_username: "ada".to_string(),
        }
    }

    #[test]
    fn status_parses_form_values() {
        assert_eq!(PostStatus::from_form("Published"), Some(PostStatus::Published));
        assert_eq!(PostStatus::from_form("draft"), Some(PostStatus::Draft));
        assert_eq!(PostStatus::from_form("1"), Some(PostStatus::Published));
        assert_eq!(PostStatus::from_form("archived"), None);
        assert_eq!(PostStatus::from_i16(7), PostStatus::Draft);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn listing_query_applies_filters() {
        let filter = PostFilter::published().featured();
        let sql = listing_query(&filter);

        assert!(sql.contains("FROM \"post\""));
        assert!(sql.contains("INNER JOIN \"category\""));
        assert!(sql.contains("\"status\" = 1"));
        assert!(sql.contains("\"is_featured\" = TRUE"));
        assert!(sql.contains("ORDER BY"));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn keyword_search_matches_three_fields() {
        let sql = listing_query(&PostFilter::published().matching("world"));
        assert!(sql.contains("post.title ILIKE"));
        assert!(sql.contains("post.short_description ILIKE"));
        assert!(sql.contains("post.body ILIKE"));
        assert!(sql.contains("%world%"));
    }

    #[test]
    fn count_query_has_no_ordering() {
        let sql = count_query(&PostFilter::published());
        assert!(sql.contains("COUNT(*)"));
        assert!(!sql.contains("ORDER BY"));
    }

    #[test]
    fn filter_matches_in_memory() {
        let post = sample_post();
        assert!(PostFilter::published().matches(&post));
        assert!(PostFilter::published().matching("WORLD").matches(&post));
        assert!(PostFilter::published().matching("first").matches(&post));
        assert!(!PostFilter::published().matching("absent").matches(&post));
        assert!(!PostFilter::published().featured().matches(&post));
        assert!(
            !PostFilter::default()
                .in_category(Uuid::now_v7())
                .matches(&post)
        );
    }
}
