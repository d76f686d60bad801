//! Public browsing: home feed, category pages, single posts, and search.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{About, Category, Comment, Post, PostFilter, SocialLink};
use crate::store::ContentStore;

/// Everything the home page shows.
#[derive(Debug, Serialize)]
pub struct HomePage {
    pub categories: Vec<Category>,
    pub featured_posts: Vec<Post>,
    pub posts: Vec<Post>,
    pub about: Option<About>,
    pub social_links: Vec<SocialLink>,
}

#[derive(Debug, Serialize)]
pub struct CategoryPage {
    pub category: Category,
    pub posts: Vec<Post>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct PostPage {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub comment_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub keyword: String,
    pub posts: Vec<Post>,
}

/// Read-only views over published content. No caller is needed.
#[derive(Clone)]
pub struct BrowseService {
    store: Arc<dyn ContentStore>,
}

impl BrowseService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn home(&self) -> ServiceResult<HomePage> {
        let categories = self.store.list_categories().await?;
        let featured_posts = self
            .store
            .list_posts(&PostFilter::published().featured())
            .await?;
        let posts = self.store.list_posts(&PostFilter::published()).await?;
        let about = self.store.first_about().await?;
        let social_links = self.store.list_social_links().await?;

        Ok(HomePage {
            categories,
            featured_posts,
            posts,
            about,
            social_links,
        })
    }

    pub async fn posts_by_category(&self, category_id: Uuid) -> ServiceResult<CategoryPage> {
        let category = self
            .store
            .find_category(category_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let posts = self
            .store
            .list_posts(&PostFilter::published().in_category(category_id))
            .await?;
        let categories = self.store.list_categories().await?;

        Ok(CategoryPage {
            category,
            posts,
            categories,
        })
    }

    /// A published post with its comments, oldest first.
    ///
    /// Drafts are indistinguishable from missing slugs.
    pub async fn post_by_slug(&self, slug: &str) -> ServiceResult<PostPage> {
        let post = self
            .store
            .find_post_by_slug(slug)
            .await?
            .filter(Post::is_published)
            .ok_or(ServiceError::NotFound)?;
        let comments = self.store.list_comments(post.id).await?;
        let comment_count = comments.len();

        Ok(PostPage {
            post,
            comments,
            comment_count,
        })
    }

    /// Published posts whose title, short description, or body contains the
    /// keyword, ignoring case. A blank keyword matches nothing.
    pub async fn search(&self, keyword: Option<&str>) -> ServiceResult<SearchResults> {
        let keyword = keyword.map(str::trim).unwrap_or_default().to_string();
        if keyword.is_empty() {
            return Ok(SearchResults {
                keyword,
                posts: Vec::new(),
            });
        }

        let posts = self
            .store
            .list_posts(&PostFilter::published().matching(keyword.clone()))
            .await?;
        tracing::debug!(keyword = %keyword, results = posts.len(), "post search");

        Ok(SearchResults { keyword, posts })
    }

    pub async fn categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }
}
