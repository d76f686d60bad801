//! Database models.

pub mod category;
pub mod comment;
pub mod post;
pub mod site;
pub mod user;

pub use category::Category;
pub use comment::{Comment, NewComment};
pub use post::{NewPost, Post, PostChanges, PostFilter, PostStatus};
pub use site::{About, SocialLink};
pub use user::{NewUser, User, UserChanges};
