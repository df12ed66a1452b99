//! # Echo Service
//!
//! `POST /test/{id}?v=...` binds from every request-side source at once and
//! echoes what it received, which makes it the smoke test for body merging.

use relay_core::{
    BindingError, FromJsonBody, FromQuery, FromRoute, Handler, HandlerFault, JsonFields,
    QueryValues, Request, RequestDescriptor, RouteValues,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct TestRequest {
    pub title: String,
    pub from_route: i32,
    pub from_query: String,
}

impl Request for TestRequest {
    type Output = TestResult;

    fn descriptor() -> RequestDescriptor<Self> {
        RequestDescriptor::new()
            .from_route()
            .from_query()
            .from_json_body()
    }
}

impl FromRoute for TestRequest {
    fn bind_from_route(&mut self, route: &RouteValues) -> Result<(), BindingError> {
        self.from_route = route.get_int("id");
        Ok(())
    }
}

impl FromQuery for TestRequest {
    fn bind_from_query(&mut self, query: &QueryValues) -> Result<(), BindingError> {
        if let Some(v) = query.get_str("v") {
            self.from_query = v.to_string();
        }
        Ok(())
    }
}

/// Body keys use the camelCase field names.
impl FromJsonBody for TestRequest {
    fn bind_from_body(&mut self, body: &JsonFields) -> Result<(), BindingError> {
        body.merge_into("title", &mut self.title)?;
        body.merge_into("fromRoute", &mut self.from_route)?;
        body.merge_into("fromQuery", &mut self.from_query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub result: String,
}

pub struct Test;

impl<S> Handler<S> for Test {
    type Request = TestRequest;

    fn from_scope(_: &S) -> Self {
        Test
    }

    async fn run(self, request: TestRequest) -> Result<TestResult, HandlerFault> {
        Ok(TestResult {
            result: format!(
                "{}_{}_{}",
                request.title, request.from_route, request.from_query
            ),
        })
    }
}
