//! Application services.
//!
//! Each service takes an explicit [`Caller`](crate::permissions::Caller),
//! performs its permission checks, and talks to the content store.

pub mod accounts;
pub mod admin;
pub mod authoring;
pub mod browse;
pub mod slug;

pub use accounts::{AccountService, RegistrationForm};
pub use admin::{AdminService, UserForm, UserSummary};
pub use authoring::{AuthoringService, DashboardOverview, PostForm, Upload};
pub use browse::{BrowseService, CategoryPage, HomePage, PostPage, SearchResults};
