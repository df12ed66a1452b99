//! # Services
//!
//! Request types, handlers, and validators, plus the explicit registration
//! table that binds them together at startup.

pub mod blogs;
pub mod echo;

use relay_core::{Registry, RegistryError};

use crate::state::AppState;

/// Build the handler and validator registry for every service.
pub fn registry() -> Result<Registry<AppState>, RegistryError> {
    Registry::builder()
        .handler::<blogs::GetBlogs>()
        .handler::<blogs::GetBlog>()
        .handler::<blogs::CreateBlog>()
        .handler::<echo::Test>()
        .validator(blogs::get_blog_rules())
        .validator(blogs::create_blog_rules())
        .build()
}
