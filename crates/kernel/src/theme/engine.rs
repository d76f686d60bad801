//! Tera theme engine.
//!
//! The built-in templates are compiled into the binary. A template directory
//! may override any of them by name.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

use crate::file::FileStorage;

/// Built-in templates, keyed by the name handlers render.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("home.html", include_str!("../../templates/home.html")),
    (
        "posts_by_category.html",
        include_str!("../../templates/posts_by_category.html"),
    ),
    ("post.html", include_str!("../../templates/post.html")),
    ("search.html", include_str!("../../templates/search.html")),
    ("categories.html", include_str!("../../templates/categories.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
    (
        "dashboard/base.html",
        include_str!("../../templates/dashboard/base.html"),
    ),
    (
        "dashboard/index.html",
        include_str!("../../templates/dashboard/index.html"),
    ),
    (
        "dashboard/posts.html",
        include_str!("../../templates/dashboard/posts.html"),
    ),
    (
        "dashboard/post_form.html",
        include_str!("../../templates/dashboard/post_form.html"),
    ),
    (
        "dashboard/category_form.html",
        include_str!("../../templates/dashboard/category_form.html"),
    ),
    (
        "dashboard/users.html",
        include_str!("../../templates/dashboard/users.html"),
    ),
    (
        "dashboard/user_form.html",
        include_str!("../../templates/dashboard/user_form.html"),
    ),
];

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    tera: Tera,
}

impl ThemeEngine {
    /// Build the engine from the built-in templates, letting files under
    /// `override_dir` replace them by name.
    pub fn new(override_dir: Option<&Path>, files: Arc<dyn FileStorage>) -> Result<Self> {
        let mut tera = match override_dir {
            Some(dir) => {
                let pattern = dir.join("**/*.html");
                let pattern_str = pattern
                    .to_str()
                    .context("invalid template directory path")?;
                Tera::new(pattern_str).context("failed to load template overrides")?
            }
            None => Tera::default(),
        };

        let overridden: Vec<String> = tera.get_template_names().map(str::to_string).collect();
        let builtins: Vec<(&str, &str)> = BUILTIN_TEMPLATES
            .iter()
            .filter(|(name, _)| !overridden.iter().any(|o| o == name))
            .copied()
            .collect();
        tera.add_raw_templates(builtins)
            .context("failed to compile built-in templates")?;
        tera.autoescape_on(vec![".html"]);

        Self::register_filters(&mut tera, files);

        debug!(
            count = tera.get_template_names().count(),
            overrides = overridden.len(),
            "loaded templates"
        );

        Ok(Self { tera })
    }

    fn register_filters(tera: &mut Tera, files: Arc<dyn FileStorage>) {
        // Post bodies are author-supplied HTML.
        tera.register_filter(
            "sanitize",
            |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                let html = tera::try_get_value!("sanitize", "value", String, value);
                Ok(tera::Value::String(ammonia::clean(&html)))
            },
        );

        tera.register_filter(
            "media_url",
            move |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                let uri = tera::try_get_value!("media_url", "value", String, value);
                Ok(tera::Value::String(files.public_url(&uri)))
            },
        );
    }

    /// Render a template with the given context.
    pub fn render(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .with_context(|| format!("failed to render template {template}"))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("templates", &self.tera.get_template_names().count())
            .finish()
    }
}
