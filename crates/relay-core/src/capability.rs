//! # Binding Capabilities
//!
//! A request type declares which call inputs it is populated from. There are
//! four independent capabilities:
//!
//! | Capability          | Contract                         | Input                  |
//! |---------------------|----------------------------------|------------------------|
//! | from-route          | [`FromRoute`]                    | path parameters        |
//! | from-query          | [`FromQuery`]                    | query string           |
//! | from-json-body      | [`FromJsonBody`]                 | JSON object body       |
//! | from-user-context   | [`FromUserContext`]              | resolved [`Principal`] |
//!
//! Declaration is explicit: [`Request::descriptor`] returns a
//! [`RequestDescriptor`] holding one optional binder function per capability.
//! Each `from_*` builder method only compiles when the request type satisfies
//! the matching contract, so a descriptor can never name a capability the
//! type cannot fulfil.
//!
//! Every capability writes only the fields it explicitly names. The body
//! capability receives the payload as [`JsonFields`] and assigns key by key,
//! so a field the payload does not mention keeps whatever an earlier stage
//! bound into it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::BindingError;

// ── Parameter maps ──────────────────────────────────────────────────────────

/// String-to-string mapping of route or query parameters.
///
/// Built from ordered pairs; when a key repeats, the first value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    values: HashMap<String, String>,
}

/// Resolved path parameters of a route template.
pub type RouteValues = ParamMap;

/// Decoded query-string parameters.
pub type QueryValues = ParamMap;

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ordered pairs, keeping the first value of a repeated key.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = HashMap::new();
        for (k, v) in pairs {
            values.entry(k.into()).or_insert_with(|| v.into());
        }
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Raw string value for `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Lenient integer lookup: a missing or unparseable value yields `0`.
    pub fn get_int(&self, key: &str) -> i32 {
        self.get_str(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Strict lookup: a missing key is `Ok(None)`, an unparseable value is
    /// [`BindingError::InvalidScalar`].
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, BindingError> {
        match self.get_str(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| BindingError::InvalidScalar {
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
        }
    }
}

/// Top-level fields of a JSON object body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonFields {
    fields: Map<String, Value>,
}

impl JsonFields {
    /// Parse a body payload.
    ///
    /// An empty or whitespace-only body carries no fields. Anything else must
    /// be a JSON object.
    pub fn parse(body: &[u8]) -> Result<Self, BindingError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice(body).map_err(BindingError::MalformedBody)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(BindingError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Overwrite `target` with the payload value for `key`, if the payload
    /// names it. A value of the wrong type is [`BindingError::InvalidField`].
    pub fn merge_into<T: DeserializeOwned>(
        &self,
        key: &str,
        target: &mut T,
    ) -> Result<(), BindingError> {
        if let Some(value) = self.fields.get(key) {
            *target = T::deserialize(value).map_err(|source| BindingError::InvalidField {
                key: key.to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

impl From<Map<String, Value>> for JsonFields {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Identity ────────────────────────────────────────────────────────────────

/// One named claim carried by a [`Principal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub kind: String,
    pub value: String,
}

impl Claim {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// The resolved caller identity, possibly anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    /// Authentication scheme that vouched for the caller. `None` = anonymous.
    scheme: Option<String>,
    claims: Vec<Claim>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(scheme: impl Into<String>, claims: Vec<Claim>) -> Self {
        Self {
            scheme: Some(scheme.into()),
            claims,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.scheme.is_some()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Value of the first claim of the given type.
    pub fn claim(&self, kind: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.value.as_str())
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }
}

// ── Capability contracts ────────────────────────────────────────────────────

/// Populates fields from resolved path parameters.
pub trait FromRoute {
    fn bind_from_route(&mut self, route: &RouteValues) -> Result<(), BindingError>;
}

/// Populates fields from the query string.
pub trait FromQuery {
    fn bind_from_query(&mut self, query: &QueryValues) -> Result<(), BindingError>;
}

/// Merges the fields named by a JSON object body. Fields the payload does
/// not name must be left as they are.
pub trait FromJsonBody {
    fn bind_from_body(&mut self, body: &JsonFields) -> Result<(), BindingError>;
}

/// Populates fields from the caller identity.
pub trait FromUserContext {
    fn bind_from_user(&mut self, user: &Principal) -> Result<(), BindingError>;
}

/// A request type: constructed with default field values once per call,
/// then populated by the binders its descriptor declares.
pub trait Request: Default + Send + Sync + 'static {
    /// Result produced by this request's handler.
    type Output: Serialize + Send + 'static;

    /// Capabilities this request type binds from. Read once at registration.
    fn descriptor() -> RequestDescriptor<Self> {
        RequestDescriptor::new()
    }
}

// ── Descriptor ──────────────────────────────────────────────────────────────

/// One binding capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    FromRoute,
    FromQuery,
    FromJsonBody,
    FromUserContext,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FromRoute => "from-route",
            Self::FromQuery => "from-query",
            Self::FromJsonBody => "from-json-body",
            Self::FromUserContext => "from-user-context",
        })
    }
}

pub(crate) type RouteBinder<R> = fn(&mut R, &RouteValues) -> Result<(), BindingError>;
pub(crate) type QueryBinder<R> = fn(&mut R, &QueryValues) -> Result<(), BindingError>;
pub(crate) type BodyBinder<R> = fn(&mut R, &JsonFields) -> Result<(), BindingError>;
pub(crate) type UserBinder<R> = fn(&mut R, &Principal) -> Result<(), BindingError>;

/// The binder functions declared for a request type.
pub struct RequestDescriptor<R> {
    pub(crate) name: &'static str,
    pub(crate) route: Option<RouteBinder<R>>,
    pub(crate) query: Option<QueryBinder<R>>,
    pub(crate) body: Option<BodyBinder<R>>,
    pub(crate) user: Option<UserBinder<R>>,
}

impl<R> Clone for RequestDescriptor<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for RequestDescriptor<R> {}

impl<R> fmt::Debug for RequestDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl<R: Request> RequestDescriptor<R> {
    /// A descriptor with no capabilities.
    pub fn new() -> Self {
        Self {
            name: short_type_name::<R>(),
            route: None,
            query: None,
            body: None,
            user: None,
        }
    }

    pub fn from_route(mut self) -> Self
    where
        R: FromRoute,
    {
        self.route = Some(<R as FromRoute>::bind_from_route);
        self
    }

    pub fn from_query(mut self) -> Self
    where
        R: FromQuery,
    {
        self.query = Some(<R as FromQuery>::bind_from_query);
        self
    }

    pub fn from_json_body(mut self) -> Self
    where
        R: FromJsonBody,
    {
        self.body = Some(<R as FromJsonBody>::bind_from_body);
        self
    }

    pub fn from_user_context(mut self) -> Self
    where
        R: FromUserContext,
    {
        self.user = Some(<R as FromUserContext>::bind_from_user);
        self
    }
}

impl<R: Request> Default for RequestDescriptor<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> RequestDescriptor<R> {
    /// Short name of the request type, for logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared capabilities, in binding order.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::with_capacity(4);
        if self.route.is_some() {
            caps.push(Capability::FromRoute);
        }
        if self.query.is_some() {
            caps.push(Capability::FromQuery);
        }
        if self.body.is_some() {
            caps.push(Capability::FromJsonBody);
        }
        if self.user.is_some() {
            caps.push(Capability::FromUserContext);
        }
        caps
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::FromRoute => self.route.is_some(),
            Capability::FromQuery => self.query.is_some(),
            Capability::FromJsonBody => self.body.is_some(),
            Capability::FromUserContext => self.user.is_some(),
        }
    }
}

/// Last path segment of a type name (`a::b::GetBlog` → `GetBlog`).
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_wins_for_repeated_keys() {
        let query = QueryValues::from_pairs([("v", "first"), ("v", "second"), ("w", "x")]);
        assert_eq!(query.get_str("v"), Some("first"));
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn get_int_defaults_to_zero() {
        let route = RouteValues::from_pairs([("id", "abc"), ("n", "42")]);
        assert_eq!(route.get_int("id"), 0);
        assert_eq!(route.get_int("missing"), 0);
        assert_eq!(route.get_int("n"), 42);
    }

    #[test]
    fn strict_parse_reports_invalid_scalar() {
        let route = RouteValues::from_pairs([("id", "abc")]);
        let err = route.parse::<i32>("id").unwrap_err();
        assert!(matches!(err, BindingError::InvalidScalar { ref key, .. } if key == "id"));
        assert_eq!(route.parse::<i32>("missing").unwrap(), None);
    }

    #[test]
    fn principal_claim_lookup() {
        let user = Principal::authenticated("bearer", vec![Claim::new("username", "bob")]);
        assert!(user.is_authenticated());
        assert_eq!(user.scheme(), Some("bearer"));
        assert_eq!(user.claim("username"), Some("bob"));
        assert_eq!(user.claim("email"), None);
    }

    #[test]
    fn anonymous_principal_has_no_claims() {
        let anon = Principal::anonymous();
        assert!(!anon.is_authenticated());
        assert!(anon.claims().is_empty());
    }

    #[derive(Default)]
    struct Everything {
        id: i32,
    }

    impl Request for Everything {
        type Output = ();
    }

    impl FromRoute for Everything {
        fn bind_from_route(&mut self, route: &RouteValues) -> Result<(), BindingError> {
            self.id = route.get_int("id");
            Ok(())
        }
    }

    impl FromQuery for Everything {
        fn bind_from_query(&mut self, _query: &QueryValues) -> Result<(), BindingError> {
            Ok(())
        }
    }

    impl FromJsonBody for Everything {
        fn bind_from_body(&mut self, body: &JsonFields) -> Result<(), BindingError> {
            body.merge_into("id", &mut self.id)
        }
    }

    impl FromUserContext for Everything {
        fn bind_from_user(&mut self, _user: &Principal) -> Result<(), BindingError> {
            Ok(())
        }
    }

    #[test]
    fn descriptor_lists_capabilities_in_binding_order() {
        let desc = RequestDescriptor::<Everything>::new()
            .from_user_context()
            .from_json_body()
            .from_query()
            .from_route();
        assert_eq!(
            desc.capabilities(),
            vec![
                Capability::FromRoute,
                Capability::FromQuery,
                Capability::FromJsonBody,
                Capability::FromUserContext,
            ]
        );
        assert_eq!(desc.name(), "Everything");
    }

    #[test]
    fn default_descriptor_is_empty() {
        let desc = Everything::descriptor();
        assert!(desc.capabilities().is_empty());
        assert!(!desc.has(Capability::FromRoute));
    }

    #[test]
    fn json_fields_parse_rules() {
        assert!(JsonFields::parse(b"  \n").unwrap().is_empty());
        assert!(matches!(
            JsonFields::parse(b"{\"id\":").unwrap_err(),
            BindingError::MalformedBody(_)
        ));
        assert!(matches!(
            JsonFields::parse(b"\"text\"").unwrap_err(),
            BindingError::NotAnObject { found: "string" }
        ));
        assert_eq!(JsonFields::parse(br#"{"a":1,"b":2}"#).unwrap().len(), 2);
    }

    #[test]
    fn merge_into_touches_only_named_keys() {
        let body = JsonFields::parse(br#"{"id": 9}"#).unwrap();
        let mut id = 3;
        let mut other = String::from("kept");
        body.merge_into("id", &mut id).unwrap();
        body.merge_into("other", &mut other).unwrap();
        assert_eq!(id, 9);
        assert_eq!(other, "kept");
    }

    #[test]
    fn merge_into_rejects_wrong_type() {
        let body = JsonFields::parse(br#"{"id": "nine"}"#).unwrap();
        let mut id = 3;
        let err = body.merge_into("id", &mut id).unwrap_err();
        assert!(matches!(err, BindingError::InvalidField { ref key, .. } if key == "id"));
        assert_eq!(id, 3);
    }

    #[test]
    fn capability_display() {
        assert_eq!(Capability::FromJsonBody.to_string(), "from-json-body");
    }
}
