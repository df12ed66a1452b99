//! # Blog Service
//!
//! Requests, handlers, and validation rules for the blog routes.
//!
//! | Request              | Binds from          | Handler       | Result         |
//! |----------------------|---------------------|---------------|----------------|
//! | [`GetBlogsRequest`]  | nothing             | [`GetBlogs`]  | `Vec<Blog>`    |
//! | [`GetBlogRequest`]   | route               | [`GetBlog`]   | `Option<Blog>` |
//! | [`CreateBlogRequest`]| body, user context  | [`CreateBlog`]| `Blog`         |

use relay_core::{
    BindingError, FromJsonBody, FromRoute, FromUserContext, Handler, HandlerFault, JsonFields,
    Principal, Request, RequestDescriptor, RouteValues, Rules,
};

use crate::data::{Blog, Repository, UnitOfWork};
use crate::state::AppState;

/// Claim carrying the author name of a new blog.
pub const AUTHOR_CLAIM: &str = "username";

// ── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct GetBlogsRequest;

impl Request for GetBlogsRequest {
    type Output = Vec<Blog>;
}

pub struct GetBlogs {
    blogs: UnitOfWork<Blog>,
}

impl Handler<AppState> for GetBlogs {
    type Request = GetBlogsRequest;

    fn from_scope(state: &AppState) -> Self {
        Self {
            blogs: state.blogs.unit_of_work(),
        }
    }

    async fn run(self, _request: GetBlogsRequest) -> Result<Vec<Blog>, HandlerFault> {
        Ok(self.blogs.query(|_| true))
    }
}

// ── Single ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct GetBlogRequest {
    pub id: i32,
}

impl Request for GetBlogRequest {
    type Output = Option<Blog>;

    fn descriptor() -> RequestDescriptor<Self> {
        RequestDescriptor::new().from_route()
    }
}

impl FromRoute for GetBlogRequest {
    fn bind_from_route(&mut self, route: &RouteValues) -> Result<(), BindingError> {
        self.id = route.get_int("id");
        Ok(())
    }
}

pub fn get_blog_rules() -> Rules<GetBlogRequest> {
    Rules::<GetBlogRequest>::new().rule("Id", |r| r.id > 0, "Id needs to be greater than 0")
}

pub struct GetBlog {
    blogs: UnitOfWork<Blog>,
}

impl Handler<AppState> for GetBlog {
    type Request = GetBlogRequest;

    fn from_scope(state: &AppState) -> Self {
        Self {
            blogs: state.blogs.unit_of_work(),
        }
    }

    async fn run(self, request: GetBlogRequest) -> Result<Option<Blog>, HandlerFault> {
        Ok(self
            .blogs
            .query(|blog| blog.id == request.id)
            .into_iter()
            .next())
    }
}

// ── Create ──────────────────────────────────────────────────────────────────

/// Body of `POST /admin/blogs`.
#[derive(Debug, Default)]
pub struct CreateBlogRequest {
    pub title: String,
    pub created_by: String,
}

impl Request for CreateBlogRequest {
    type Output = Blog;

    fn descriptor() -> RequestDescriptor<Self> {
        RequestDescriptor::new().from_json_body().from_user_context()
    }
}

/// Only `title` is read from the body; the author never is.
impl FromJsonBody for CreateBlogRequest {
    fn bind_from_body(&mut self, body: &JsonFields) -> Result<(), BindingError> {
        body.merge_into("title", &mut self.title)
    }
}

impl FromUserContext for CreateBlogRequest {
    fn bind_from_user(&mut self, user: &Principal) -> Result<(), BindingError> {
        if let Some(name) = user.claim(AUTHOR_CLAIM) {
            self.created_by = name.to_string();
        }
        Ok(())
    }
}

pub fn create_blog_rules() -> Rules<CreateBlogRequest> {
    Rules::<CreateBlogRequest>::new()
        .rule(
            "Title",
            |r| !r.title.trim().is_empty(),
            "Title must not be empty",
        )
        .rule(
            "CreatedBy",
            |r| !r.created_by.is_empty(),
            "CreatedBy must be resolved from the caller identity",
        )
}

pub struct CreateBlog {
    blogs: UnitOfWork<Blog>,
}

impl Handler<AppState> for CreateBlog {
    type Request = CreateBlogRequest;

    fn from_scope(state: &AppState) -> Self {
        Self {
            blogs: state.blogs.unit_of_work(),
        }
    }

    async fn run(mut self, request: CreateBlogRequest) -> Result<Blog, HandlerFault> {
        self.blogs.add(Blog {
            id: 0,
            title: request.title,
            created_by: request.created_by,
        });
        let saved = self
            .blogs
            .commit()
            .map_err(|e| HandlerFault::new(format!("saving blog: {e}")))?;
        let blog = saved
            .into_iter()
            .next()
            .ok_or_else(|| HandlerFault::new("commit returned no blog"))?;
        tracing::info!(id = blog.id, created_by = %blog.created_by, "blog created");
        Ok(blog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{bind, Claim, RawInputs, Validator};

    fn seeded_state() -> AppState {
        let state = AppState::new();
        let mut uow = state.blogs.unit_of_work();
        uow.add(Blog {
            id: 0,
            title: "first".into(),
            created_by: "alice".into(),
        });
        uow.add(Blog {
            id: 0,
            title: "second".into(),
            created_by: "bob".into(),
        });
        uow.commit().unwrap();
        state
    }

    #[tokio::test]
    async fn get_blogs_lists_everything() {
        let state = seeded_state();
        let blogs = GetBlogs::from_scope(&state)
            .run(GetBlogsRequest)
            .await
            .unwrap();
        assert_eq!(blogs.len(), 2);
    }

    #[tokio::test]
    async fn get_blog_finds_by_id_or_none() {
        let state = seeded_state();
        let found = GetBlog::from_scope(&state)
            .run(GetBlogRequest { id: 2 })
            .await
            .unwrap();
        assert_eq!(found.map(|b| b.title), Some("second".to_string()));

        let missing = GetBlog::from_scope(&state)
            .run(GetBlogRequest { id: 99 })
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn get_blog_rules_reject_non_positive_ids() {
        let rules = get_blog_rules();
        for id in [0, -3] {
            let errors = rules.validate(&GetBlogRequest { id });
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "Id");
            assert_eq!(errors[0].message, "Id needs to be greater than 0");
        }
        assert!(rules.validate(&GetBlogRequest { id: 1 }).is_empty());
    }

    #[tokio::test]
    async fn create_blog_persists_with_assigned_id() {
        let state = AppState::new();
        let blog = CreateBlog::from_scope(&state)
            .run(CreateBlogRequest {
                title: "boi".into(),
                created_by: "bob master 3000".into(),
            })
            .await
            .unwrap();
        assert_eq!(blog.id, 1);
        assert_eq!(blog.created_by, "bob master 3000");
        assert_eq!(state.blogs.len(), 1);
    }

    #[test]
    fn author_comes_from_identity_not_body() {
        let principal = Principal::authenticated(
            "bearer",
            vec![Claim::new(AUTHOR_CLAIM, "bob master 3000")],
        );
        let inputs = RawInputs::new()
            .with_body(r#"{"title":"boi","createdBy":"mallory"}"#)
            .with_identity(principal);
        let request = bind(&CreateBlogRequest::descriptor(), &inputs).unwrap();
        assert_eq!(request.title, "boi");
        assert_eq!(request.created_by, "bob master 3000");
    }

    #[test]
    fn missing_author_claim_fails_validation() {
        let inputs = RawInputs::new()
            .with_body(r#"{"title":"boi"}"#)
            .with_identity(Principal::authenticated("bearer", Vec::new()));
        let request = bind(&CreateBlogRequest::descriptor(), &inputs).unwrap();
        let errors = create_blog_rules().validate(&request);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "CreatedBy");
    }

    #[test]
    fn empty_title_fails_validation() {
        let errors = create_blog_rules().validate(&CreateBlogRequest {
            title: "  ".into(),
            created_by: "bob".into(),
        });
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Title must not be empty");
    }
}
