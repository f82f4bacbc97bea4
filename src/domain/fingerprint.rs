//! Context fingerprint computation for mapper caching.
//!
//! A fingerprint identifies one filtering configuration:
//! - The invoked method
//! - A digest of every filter-relevant argument value (and the principal's roles)
//! - The negotiated media type
//!
//! Calls with the same fingerprint are served by the same cached mapper.

use crate::domain::context::{Argument, CallContext, MethodId, Principal, Relevance};
use crate::domain::media_type::MediaType;
use ahash::AHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Cache key identifying a filtering context.
///
/// Two fingerprints are equal when the method, the media type and the
/// value of every filter-relevant argument are equal. Ignored arguments,
/// and keys outside an argument's relevant projection, never change it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextFingerprint {
    method: MethodId,
    digest: u64,
    media_type: MediaType,
}

impl ContextFingerprint {
    /// Compute a fingerprint from its components.
    ///
    /// # Arguments
    /// * `method` - Identity of the invoked method
    /// * `return_type` - Declared return type name
    /// * `arguments` - Actual argument values (any order)
    /// * `principal` - Active principal, if any
    /// * `media_type` - Negotiated media type
    pub fn new(
        method: MethodId,
        return_type: &str,
        arguments: &[Argument],
        principal: Option<&Principal>,
        media_type: MediaType,
    ) -> Self {
        let mut hasher = AHasher::default();

        return_type.hash(&mut hasher);

        // Sort by name so declaration order is irrelevant. Arguments sharing
        // a name are all kept.
        let mut relevant: Vec<&Argument> =
            arguments.iter().filter(|arg| arg.is_relevant()).collect();
        relevant.sort_by(|a, b| a.name().cmp(b.name()));

        for arg in relevant {
            arg.name().hash(&mut hasher);
            arg.relevance().tag().hash(&mut hasher);
            match arg.relevance() {
                Relevance::IncludeList(target) | Relevance::ExcludeList(target) => {
                    target.hash(&mut hasher);
                    // Lists are matched by membership, hash them as sets
                    for field in arg.field_names() {
                        field.hash(&mut hasher);
                    }
                }
                _ => {
                    // serde_json maps are key-ordered, so this is canonical
                    arg.relevant_value().to_string().hash(&mut hasher);
                }
            }
            // Separator so adjacent arguments cannot run together
            0xffu8.hash(&mut hasher);
        }

        if let Some(principal) = principal {
            for role in principal.roles() {
                role.hash(&mut hasher);
            }
        }

        Self {
            method,
            digest: hasher.finish(),
            media_type,
        }
    }

    /// Compute the fingerprint of a call context.
    pub fn of(ctx: &CallContext) -> Self {
        Self::new(
            ctx.method().clone(),
            ctx.return_type(),
            ctx.arguments(),
            ctx.principal(),
            ctx.media_type().clone(),
        )
    }

    /// Invoked method.
    pub fn method(&self) -> &MethodId {
        &self.method
    }

    /// Digest of the filter-relevant inputs.
    pub fn digest(&self) -> u64 {
        self.digest
    }

    /// Negotiated media type.
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }
}

impl fmt::Display for ContextFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:016x}@{}", self.method, self.digest, self.media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> CallContext {
        CallContext::new(
            MethodId::new("UserController", "get"),
            "User",
            MediaType::application_json(),
        )
    }

    #[test]
    fn test_identical_contexts_produce_same_fingerprint() {
        let a = ctx().with_argument(Argument::include_list("fields", ["id", "name"]));
        let b = ctx().with_argument(Argument::include_list("fields", ["id", "name"]));

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_different_relevant_values_produce_different_fingerprints() {
        let a = ctx().with_argument(Argument::include_list("fields", ["id"]));
        let b = ctx().with_argument(Argument::include_list("fields", ["email"]));

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_ignored_arguments_do_not_affect_fingerprint() {
        let a = ctx().with_argument(Argument::ignored("request_id", "abc"));
        let b = ctx().with_argument(Argument::ignored("request_id", "def"));

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), ctx().fingerprint());
    }

    #[test]
    fn test_projection_hides_irrelevant_keys() {
        let a = ctx().with_argument(
            Argument::relevant("query", json!({"view": "full", "page": 1}))
                .with_relevant_keys(["view"]),
        );
        let b = ctx().with_argument(
            Argument::relevant("query", json!({"view": "full", "page": 9}))
                .with_relevant_keys(["view"]),
        );
        let c = ctx().with_argument(
            Argument::relevant("query", json!({"view": "summary", "page": 1}))
                .with_relevant_keys(["view"]),
        );

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_field_list_order_independence() {
        let a = ctx().with_argument(Argument::include_list("fields", ["id", "name"]));
        let b = ctx().with_argument(Argument::include_list("fields", ["name", "id"]));

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_argument_order_independence() {
        let a = ctx()
            .with_argument(Argument::relevant("a", 1))
            .with_argument(Argument::relevant("b", 2));
        let b = ctx()
            .with_argument(Argument::relevant("b", 2))
            .with_argument(Argument::relevant("a", 1));

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_arguments_sharing_a_name_all_count() {
        let a = ctx()
            .with_argument(Argument::exclude_list("hide", ["id"]))
            .with_argument(Argument::exclude_list("hide", ["name"]));
        let b = ctx()
            .with_argument(Argument::exclude_list("hide", ["id"]))
            .with_argument(Argument::exclude_list("hide", ["email"]));

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_include_and_exclude_lists_differ() {
        let a = ctx().with_argument(Argument::include_list("fields", ["id"]));
        let b = ctx().with_argument(Argument::exclude_list("fields", ["id"]));

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_roles_are_part_of_fingerprint() {
        let admin = ctx().with_principal(Principal::new(["ADMIN"]));
        let user = ctx().with_principal(Principal::new(["USER"]));
        let renamed = ctx().with_principal(Principal::new(["ADMIN"]).with_name("bob"));

        assert_ne!(admin.fingerprint(), user.fingerprint());
        assert_eq!(admin.fingerprint(), renamed.fingerprint());
    }

    #[test]
    fn test_media_type_and_method_are_part_of_fingerprint() {
        let json = ctx();
        let xml = ctx().with_media_type(MediaType::application_xml());
        let other = CallContext::new(
            MethodId::new("UserController", "list"),
            "User",
            MediaType::application_json(),
        );

        assert_ne!(json.fingerprint(), xml.fingerprint());
        assert_ne!(json.fingerprint(), other.fingerprint());
    }

    #[test]
    fn test_no_relevant_arguments_degenerates_to_method_and_media() {
        let a = ctx().with_argument(Argument::ignored("page", 1));
        let b = ctx().with_argument(Argument::ignored("page", 2));
        let fp = a.fingerprint();

        assert_eq!(fp, b.fingerprint());
        assert_eq!(fp.method(), &MethodId::new("UserController", "get"));
        assert_eq!(fp.media_type(), &MediaType::application_json());
    }

    #[test]
    fn test_composite_values_compare_structurally() {
        let a = ctx().with_argument(Argument::relevant(
            "filter",
            json!({"b": [1, 2], "a": {"x": true}}),
        ));
        let b = ctx().with_argument(Argument::relevant(
            "filter",
            json!({"a": {"x": true}, "b": [1, 2]}),
        ));

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_collision_resistance_across_values() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        for i in 0..500 {
            let fp = ctx()
                .with_argument(Argument::relevant("n", i))
                .fingerprint();
            assert!(seen.insert(fp.digest()), "digest collision at {}", i);
        }
    }

    #[test]
    fn test_display_format() {
        let display = ctx().fingerprint().to_string();
        assert!(display.starts_with("UserController::get#"));
        assert!(display.ends_with("@application/json"));
    }
}
