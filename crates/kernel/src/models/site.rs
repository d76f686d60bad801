//! Home page content: the "about" blurb and social links.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// About section shown on the home page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct About {
    pub id: Uuid,
    pub heading: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl About {
    /// The oldest about record, if any exist.
    pub async fn first(pool: &PgPool) -> Result<Option<Self>> {
        let about = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, heading, description, created_at, updated_at
            FROM about
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .fetch_optional(pool)
        .await
        .context("failed to fetch about section")?;

        Ok(about)
    }
}

/// A link to one of the site's social profiles.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SocialLink {
    pub id: Uuid,
    pub platform: String,
    pub url: String,
}

impl SocialLink {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let links = sqlx::query_as::<_, Self>(
            "SELECT id, platform, url FROM social_link ORDER BY platform, id",
        )
        .fetch_all(pool)
        .await
        .context("failed to list social links")?;

        Ok(links)
    }
}
