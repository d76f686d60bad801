//! Comment model for discussion under published posts.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Comment record joined with its author's username.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Parent post ID.
    pub post_id: Uuid,

    /// Author user ID.
    pub author_id: Uuid,

    /// Plain-text comment body.
    pub body: String,

    pub created_at: DateTime<Utc>,

    pub author_username: String,
}

/// Input for creating a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
}

const COMMENT_SELECT: &str = r#"
    SELECT comment.id, comment.post_id, comment.author_id, comment.body, comment.created_at,
           users.username AS author_username
    FROM comment
    INNER JOIN users ON users.id = comment.author_id
"#;

impl Comment {
    /// Find a comment by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let comment =
            sqlx::query_as::<_, Self>(&format!("{COMMENT_SELECT} WHERE comment.id = $1"))
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("failed to fetch comment")?;

        Ok(comment)
    }

    /// List all comments on a post, oldest first.
    pub async fn list_for_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<Self>> {
        let comments = sqlx::query_as::<_, Self>(&format!(
            "{COMMENT_SELECT} WHERE comment.post_id = $1 ORDER BY comment.created_at, comment.id"
        ))
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("failed to list comments")?;

        Ok(comments)
    }

    /// Create a comment.
    pub async fn create(pool: &PgPool, input: NewComment) -> Result<Self> {
        let id = Uuid::now_v7();

        sqlx::query(
            r#"
            INSERT INTO comment (id, post_id, author_id, body, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(id)
        .bind(input.post_id)
        .bind(input.author_id)
        .bind(&input.body)
        .execute(pool)
        .await
        .context("failed to create comment")?;

        Self::find_by_id(pool, id)
            .await?
            .context("comment missing after insert")
    }

    /// Delete a comment.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comment WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete comment")?;

        Ok(result.rows_affected() > 0)
    }
}
