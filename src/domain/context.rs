//! Call context describing one outbound serialization.
//!
//! The context carries everything filtering decisions may depend on: the
//! invoked method, its declared return type, the argument values, the active
//! principal and the negotiated media type.

use crate::domain::fingerprint::ContextFingerprint;
use crate::domain::media_type::MediaType;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// Stable identity of an invoked method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId {
    declaring_type: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl MethodId {
    /// Create a method identity from its declaring type and method name.
    pub fn new(
        declaring_type: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }

    /// Declaring type, e.g. `UserController`.
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// Method name, e.g. `get_user`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// Which type a dynamic field list applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListTarget {
    /// The declared return type of the method
    Root,
    /// A named type anywhere in the object graph
    Type(String),
}

impl ListTarget {
    /// Resolve the target to a concrete type name.
    pub fn type_name<'a>(&'a self, root: &'a str) -> &'a str {
        match self {
            ListTarget::Root => root,
            ListTarget::Type(name) => name,
        }
    }
}

/// How an argument participates in filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relevance {
    /// Never affects filtering; left out of the fingerprint
    Ignored,
    /// Read by predicates; part of the fingerprint
    Relevant,
    /// Names the only fields of the target type to serialize
    IncludeList(ListTarget),
    /// Names fields of the target type to drop
    ExcludeList(ListTarget),
}

impl Relevance {
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Relevance::Ignored => 0,
            Relevance::Relevant => 1,
            Relevance::IncludeList(_) => 2,
            Relevance::ExcludeList(_) => 3,
        }
    }
}

/// An actual argument value passed to the invoked method.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    name: String,
    value: Value,
    relevance: Relevance,
    relevant_keys: Option<BTreeSet<String>>,
}

impl Argument {
    fn with_relevance(name: impl Into<String>, value: Value, relevance: Relevance) -> Self {
        Self {
            name: name.into(),
            value,
            relevance,
            relevant_keys: None,
        }
    }

    /// An argument that never affects filtering.
    pub fn ignored(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_relevance(name, value.into(), Relevance::Ignored)
    }

    /// An argument read by predicates.
    pub fn relevant(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_relevance(name, value.into(), Relevance::Relevant)
    }

    /// A list of field names that are the only ones serialized for the root type.
    pub fn include_list<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_relevance(
            name,
            Self::name_array(fields),
            Relevance::IncludeList(ListTarget::Root),
        )
    }

    /// A list of field names dropped from the root type.
    pub fn exclude_list<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_relevance(
            name,
            Self::name_array(fields),
            Relevance::ExcludeList(ListTarget::Root),
        )
    }

    fn name_array<I, S>(fields: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Array(
            fields
                .into_iter()
                .map(|field| Value::String(field.into()))
                .collect(),
        )
    }

    /// Retarget a field list at a named type instead of the root type.
    ///
    /// Has no effect on arguments that are not field lists.
    pub fn for_type(mut self, type_name: impl Into<String>) -> Self {
        let target = ListTarget::Type(type_name.into());
        self.relevance = match self.relevance {
            Relevance::IncludeList(_) => Relevance::IncludeList(target),
            Relevance::ExcludeList(_) => Relevance::ExcludeList(target),
            other => other,
        };
        self
    }

    /// Restrict the filter-relevant part of an object value to these keys.
    ///
    /// Changes to other keys do not produce a different fingerprint.
    pub fn with_relevant_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relevant_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Argument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full argument value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// How this argument participates in filtering.
    pub fn relevance(&self) -> &Relevance {
        &self.relevance
    }

    /// Whether the argument contributes to the fingerprint.
    pub fn is_relevant(&self) -> bool {
        !matches!(self.relevance, Relevance::Ignored)
    }

    /// The part of the value that filtering may observe.
    pub fn relevant_value(&self) -> Cow<'_, Value> {
        match (&self.relevant_keys, &self.value) {
            (Some(keys), Value::Object(map)) => Cow::Owned(Value::Object(
                map.iter()
                    .filter(|(key, _)| keys.contains(key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            )),
            _ => Cow::Borrowed(&self.value),
        }
    }

    /// Field names carried by this argument.
    ///
    /// Accepts a JSON array of strings or a single comma-separated string.
    /// Other values carry no names.
    pub fn field_names(&self) -> BTreeSet<&str> {
        match &self.value {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect(),
            Value::String(list) => list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Whether the argument names the given field.
    pub fn contains_field(&self, field: &str) -> bool {
        self.field_names().contains(field)
    }
}

/// The authenticated caller on whose behalf the response is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    name: Option<String>,
    roles: BTreeSet<String>,
}

impl Principal {
    /// Create a principal with the given roles.
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a display name. Names never affect filtering.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Principal name, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Granted roles.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Whether the role is granted.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Everything known about one outbound serialization.
#[derive(Debug, Clone)]
pub struct CallContext {
    method: MethodId,
    return_type: String,
    arguments: Vec<Argument>,
    principal: Option<Principal>,
    media_type: MediaType,
}

impl CallContext {
    /// Create a context for a method returning `return_type`, written as `media_type`.
    pub fn new(method: MethodId, return_type: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            method,
            return_type: return_type.into(),
            arguments: Vec::new(),
            principal: None,
            media_type,
        }
    }

    /// Add an argument value.
    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Set the active principal.
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Replace the negotiated media type.
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// Invoked method.
    pub fn method(&self) -> &MethodId {
        &self.method
    }

    /// Declared return type name; the root of filter resolution.
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// All argument values in declaration order.
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Look up an argument by name.
    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|arg| arg.name == name)
    }

    /// Look up a filter-relevant argument by name.
    ///
    /// Ignored arguments are not part of the fingerprint, so filtering
    /// decisions must only read arguments returned here.
    pub fn relevant_argument(&self, name: &str) -> Option<&Argument> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name && arg.is_relevant())
    }

    /// Active principal.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Whether the active principal holds the role. False without a principal.
    pub fn has_role(&self, role: &str) -> bool {
        self.principal
            .as_ref()
            .is_some_and(|principal| principal.has_role(role))
    }

    /// Negotiated media type.
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// Compute the cache key for this context.
    pub fn fingerprint(&self) -> ContextFingerprint {
        ContextFingerprint::of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_names_from_array_and_string() {
        let list = Argument::include_list("fields", ["id", "name", ""]);
        assert_eq!(list.field_names(), BTreeSet::from(["id", "name"]));

        let csv = Argument::relevant("fields", "id, email,,name");
        assert_eq!(csv.field_names(), BTreeSet::from(["email", "id", "name"]));

        let other = Argument::relevant("fields", 42);
        assert!(other.field_names().is_empty());
    }

    #[test]
    fn test_relevant_keys_projection() {
        let arg = Argument::relevant(
            "query",
            json!({"view": "summary", "page": 3, "trace": "abc"}),
        )
        .with_relevant_keys(["view"]);

        assert_eq!(arg.relevant_value().into_owned(), json!({"view": "summary"}));
        assert_eq!(arg.value()["page"], json!(3));
    }

    #[test]
    fn test_for_type_retargets_lists_only() {
        let list = Argument::exclude_list("drop", ["secret"]).for_type("Address");
        assert_eq!(
            list.relevance(),
            &Relevance::ExcludeList(ListTarget::Type("Address".to_string()))
        );

        let plain = Argument::relevant("flag", true).for_type("Address");
        assert_eq!(plain.relevance(), &Relevance::Relevant);
    }

    #[test]
    fn test_context_role_lookup() {
        let ctx = CallContext::new(
            MethodId::new("UserController", "get"),
            "User",
            MediaType::application_json(),
        );
        assert!(!ctx.has_role("ADMIN"));

        let ctx = ctx.with_principal(Principal::new(["ADMIN"]).with_name("alice"));
        assert!(ctx.has_role("ADMIN"));
        assert!(!ctx.has_role("AUDITOR"));
        assert_eq!(ctx.principal().and_then(Principal::name), Some("alice"));
    }

    #[test]
    fn test_method_id_display() {
        let id = MethodId::new("UserController", "list");
        assert_eq!(id.to_string(), "UserController::list");
    }
}
