//! # Binding Properties
//!
//! Property tests for the binder's merge and zero-default guarantees over
//! arbitrary route values and body payloads.

use proptest::prelude::*;
use relay_core::{
    bind, BindingError, FromJsonBody, FromQuery, FromRoute, JsonFields, QueryValues, RawInputs,
    Request, RequestDescriptor, RouteValues,
};

#[derive(Debug, Default)]
struct Article {
    id: i32,
    slug: String,
    title: String,
    summary: String,
}

impl Request for Article {
    type Output = ();

    fn descriptor() -> RequestDescriptor<Self> {
        RequestDescriptor::new()
            .from_route()
            .from_query()
            .from_json_body()
    }
}

impl FromRoute for Article {
    fn bind_from_route(&mut self, route: &RouteValues) -> Result<(), BindingError> {
        self.id = route.get_int("id");
        Ok(())
    }
}

impl FromQuery for Article {
    fn bind_from_query(&mut self, query: &QueryValues) -> Result<(), BindingError> {
        if let Some(slug) = query.get_str("slug") {
            self.slug = slug.to_string();
        }
        Ok(())
    }
}

impl FromJsonBody for Article {
    fn bind_from_body(&mut self, body: &JsonFields) -> Result<(), BindingError> {
        body.merge_into("title", &mut self.title)?;
        body.merge_into("summary", &mut self.summary)
    }
}

/// Route-bound key that the body contract does not accept at all.
#[derive(Debug, Default)]
struct Revision {
    id: i32,
    title: String,
}

impl Request for Revision {
    type Output = ();

    fn descriptor() -> RequestDescriptor<Self> {
        RequestDescriptor::new().from_route().from_json_body()
    }
}

impl FromRoute for Revision {
    fn bind_from_route(&mut self, route: &RouteValues) -> Result<(), BindingError> {
        self.id = route.get_int("id");
        Ok(())
    }
}

impl FromJsonBody for Revision {
    fn bind_from_body(&mut self, body: &JsonFields) -> Result<(), BindingError> {
        body.merge_into("title", &mut self.title)
    }
}

#[test]
fn route_field_outside_body_contract_survives_merge() {
    let inputs = RawInputs::new()
        .with_route(RouteValues::from_pairs([("id", "7")]))
        .with_body(r#"{"title":"x"}"#);
    let revision = bind(&Revision::descriptor(), &inputs).unwrap();
    assert_eq!(revision.id, 7);
    assert_eq!(revision.title, "x");
}

proptest! {
    /// Body keys the request does not accept never disturb route values.
    #[test]
    fn unaccepted_body_keys_leave_route_value(
        id in 1..i32::MAX,
        title in ".{0,24}",
        noise in proptest::collection::btree_map("[a-zA-Z]{1,8}", any::<i64>(), 0..4),
    ) {
        let mut body = serde_json::Map::new();
        for (k, v) in noise {
            body.insert(k, serde_json::Value::from(v));
        }
        body.insert("title".into(), serde_json::Value::String(title.clone()));
        let inputs = RawInputs::new()
            .with_route(RouteValues::from_pairs([("id", id.to_string())]))
            .with_body(serde_json::to_vec(&body).unwrap());

        let revision = bind(&Revision::descriptor(), &inputs).unwrap();
        prop_assert_eq!(revision.id, id);
        prop_assert_eq!(revision.title, title);
    }

    /// A body that omits route/query fields never clears them.
    #[test]
    fn body_merge_preserves_route_and_query(
        id in any::<i32>(),
        slug in "[a-z0-9-]{1,16}",
        title in proptest::option::of(".{0,24}"),
        summary in proptest::option::of(".{0,24}"),
    ) {
        let mut body = serde_json::Map::new();
        if let Some(t) = &title {
            body.insert("title".into(), serde_json::Value::String(t.clone()));
        }
        if let Some(s) = &summary {
            body.insert("summary".into(), serde_json::Value::String(s.clone()));
        }
        let inputs = RawInputs::new()
            .with_route(RouteValues::from_pairs([("id", id.to_string())]))
            .with_query(QueryValues::from_pairs([("slug", slug.clone())]))
            .with_body(serde_json::to_vec(&body).unwrap());

        let article = bind(&Article::descriptor(), &inputs).unwrap();
        prop_assert_eq!(article.id, id);
        prop_assert_eq!(&article.slug, &slug);
        prop_assert_eq!(article.title, title.unwrap_or_default());
        prop_assert_eq!(article.summary, summary.unwrap_or_default());
    }

    /// Any route segment that is not an i32 binds as zero.
    #[test]
    fn unparseable_route_segment_binds_zero(segment in "[a-zA-Z_ ]{1,12}") {
        let inputs = RawInputs::new()
            .with_route(RouteValues::from_pairs([("id", segment)]));
        let article = bind(&Article::descriptor(), &inputs).unwrap();
        prop_assert_eq!(article.id, 0);
    }

    /// The first occurrence of a repeated query key is the one bound.
    #[test]
    fn repeated_query_key_keeps_first(first in "[a-z]{1,8}", rest in proptest::collection::vec("[a-z]{1,8}", 0..4)) {
        let mut pairs = vec![("slug".to_string(), first.clone())];
        pairs.extend(rest.into_iter().map(|v| ("slug".to_string(), v)));
        let inputs = RawInputs::new().with_query(QueryValues::from_pairs(pairs));
        let article = bind(&Article::descriptor(), &inputs).unwrap();
        prop_assert_eq!(article.slug, first);
    }
}
