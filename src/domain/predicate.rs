//! Field predicates for conditional filter markers.
//!
//! This module defines the core trait for predicates evaluated against the
//! call context and provides the built-in kinds: role checks, list
//! membership and custom closures.

use crate::domain::context::CallContext;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Decision made for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDecision {
    /// Serialize the field
    Include,
    /// Skip the field
    Exclude,
}

impl FieldDecision {
    /// Check if this decision is Include.
    pub fn is_include(&self) -> bool {
        matches!(self, FieldDecision::Include)
    }

    /// Check if this decision is Exclude.
    pub fn is_exclude(&self) -> bool {
        matches!(self, FieldDecision::Exclude)
    }
}

/// Trait for predicates gating a field.
///
/// A field carrying a conditional marker is serialized only when its
/// predicate holds for the current call.
///
/// Predicates must only observe filter-relevant arguments and the principal's
/// roles; anything else is invisible to the fingerprint and would leak
/// between cached mappers.
pub trait FieldPredicate: Send + Sync {
    /// Evaluate the predicate for `field` under `ctx`.
    fn evaluate(&self, ctx: &CallContext, field: &str) -> bool;
}

/// How a role check combines several roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleMatch {
    /// At least one role must be granted
    Any,
    /// Every role must be granted
    All,
}

/// Role-gated predicate.
///
/// # Example
/// ```
/// use field_filter::{CallContext, FieldPredicate, MediaType, MethodId, Principal, RoleCheck};
///
/// let check = RoleCheck::any(["ADMIN", "AUDITOR"]);
/// let ctx = CallContext::new(MethodId::new("Users", "get"), "User", MediaType::application_json())
///     .with_principal(Principal::new(["AUDITOR"]));
///
/// assert!(check.evaluate(&ctx, "salary"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCheck {
    roles: BTreeSet<String>,
    mode: RoleMatch,
}

impl RoleCheck {
    /// Require at least one of the roles.
    pub fn any<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            mode: RoleMatch::Any,
        }
    }

    /// Require every one of the roles.
    pub fn all<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            mode: RoleMatch::All,
        }
    }

    /// Roles checked.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }
}

impl FieldPredicate for RoleCheck {
    fn evaluate(&self, ctx: &CallContext, _field: &str) -> bool {
        match self.mode {
            RoleMatch::Any => self.roles.iter().any(|role| ctx.has_role(role)),
            RoleMatch::All => self.roles.iter().all(|role| ctx.has_role(role)),
        }
    }
}

/// Holds when a caller-supplied list argument names the field.
///
/// A missing argument counts as an empty list.
///
/// # Example
/// ```
/// use field_filter::{Argument, CallContext, FieldPredicate, ListMembership, MediaType, MethodId};
///
/// let listed = ListMembership::new("fields");
/// let ctx = CallContext::new(MethodId::new("Users", "get"), "User", MediaType::application_json())
///     .with_argument(Argument::relevant("fields", "id,email"));
///
/// assert!(listed.evaluate(&ctx, "email"));
/// assert!(!listed.evaluate(&ctx, "name"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMembership {
    argument: String,
    field: Option<String>,
}

impl ListMembership {
    /// Check the annotated field's own name against `argument`.
    pub fn new(argument: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            field: None,
        }
    }

    /// Check a fixed name instead of the annotated field's own name.
    pub fn named(argument: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            field: Some(field.into()),
        }
    }

    /// Name of the list argument.
    pub fn argument(&self) -> &str {
        &self.argument
    }
}

impl FieldPredicate for ListMembership {
    fn evaluate(&self, ctx: &CallContext, field: &str) -> bool {
        let name = self.field.as_deref().unwrap_or(field);
        ctx.relevant_argument(&self.argument)
            .is_some_and(|arg| arg.contains_field(name))
    }
}

/// Closure-backed predicate.
///
/// The closure is evaluated once per filtering context and its result is
/// cached under the context fingerprint. It must only read what the
/// fingerprint covers: roles and [`CallContext::relevant_argument`].
#[derive(Clone)]
pub struct CustomPredicate {
    label: String,
    check: Arc<dyn Fn(&CallContext, &str) -> bool + Send + Sync>,
}

impl CustomPredicate {
    /// Wrap a closure. The label only shows up in `Debug` output.
    pub fn new<F>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(&CallContext, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            check: Arc::new(check),
        }
    }

    /// Label given at construction.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl FieldPredicate for CustomPredicate {
    fn evaluate(&self, ctx: &CallContext, field: &str) -> bool {
        (self.check)(ctx, field)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("label", &self.label)
            .field("check", &"<fn>")
            .finish()
    }
}

/// Convenience enum for the predicate kinds.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Role-gated
    Role(RoleCheck),
    /// List membership
    Listed(ListMembership),
    /// Custom closure
    Custom(CustomPredicate),
}

impl Predicate {
    /// Holds when the principal has `role`.
    pub fn has_role(role: impl Into<String>) -> Self {
        Predicate::Role(RoleCheck::any([role.into()]))
    }

    /// Holds when the principal has at least one of `roles`.
    pub fn any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::Role(RoleCheck::any(roles))
    }

    /// Holds when the principal has all of `roles`.
    pub fn all_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::Role(RoleCheck::all(roles))
    }

    /// Holds when the list argument names the field.
    pub fn listed_in(argument: impl Into<String>) -> Self {
        Predicate::Listed(ListMembership::new(argument))
    }

    /// Custom closure predicate.
    pub fn custom<F>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(&CallContext, &str) -> bool + Send + Sync + 'static,
    {
        Predicate::Custom(CustomPredicate::new(label, check))
    }
}

impl FieldPredicate for Predicate {
    fn evaluate(&self, ctx: &CallContext, field: &str) -> bool {
        match self {
            Predicate::Role(p) => p.evaluate(ctx, field),
            Predicate::Listed(p) => p.evaluate(ctx, field),
            Predicate::Custom(p) => p.evaluate(ctx, field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::{Argument, MethodId, Principal};
    use crate::domain::media_type::MediaType;

    fn ctx() -> CallContext {
        CallContext::new(
            MethodId::new("Users", "get"),
            "User",
            MediaType::application_json(),
        )
    }

    #[test]
    fn test_role_check_any() {
        let check = RoleCheck::any(["ADMIN", "AUDITOR"]);

        assert!(!check.evaluate(&ctx(), "salary"));
        assert!(check.evaluate(&ctx().with_principal(Principal::new(["ADMIN"])), "salary"));
        assert!(!check.evaluate(&ctx().with_principal(Principal::new(["USER"])), "salary"));
    }

    #[test]
    fn test_role_check_all() {
        let check = RoleCheck::all(["ADMIN", "AUDITOR"]);

        assert!(!check.evaluate(&ctx().with_principal(Principal::new(["ADMIN"])), "x"));
        assert!(check.evaluate(
            &ctx().with_principal(Principal::new(["ADMIN", "AUDITOR", "USER"])),
            "x"
        ));
    }

    #[test]
    fn test_empty_role_set() {
        // Vacuous truth for All, nothing to match for Any
        assert!(RoleCheck::all(Vec::<String>::new()).evaluate(&ctx(), "x"));
        assert!(!RoleCheck::any(Vec::<String>::new()).evaluate(&ctx(), "x"));
    }

    #[test]
    fn test_list_membership_missing_argument() {
        let listed = ListMembership::new("fields");
        assert!(!listed.evaluate(&ctx(), "email"));
    }

    #[test]
    fn test_list_membership_skips_ignored_argument() {
        let listed = ListMembership::new("fields");
        let ctx = ctx()
            .with_argument(Argument::ignored("fields", "email"))
            .with_argument(Argument::relevant("fields", "id"));

        assert!(!listed.evaluate(&ctx, "email"));
        assert!(listed.evaluate(&ctx, "id"));
    }

    #[test]
    fn test_list_membership_named_field() {
        let listed = ListMembership::named("expand", "details");
        let ctx = ctx().with_argument(Argument::relevant("expand", "details"));

        // The annotated field's own name is irrelevant here
        assert!(listed.evaluate(&ctx, "address"));
    }

    #[test]
    fn test_custom_predicate_sees_field_name() {
        let predicate = Predicate::custom("starts-with-id", |_ctx, field| field.starts_with("id"));

        assert!(predicate.evaluate(&ctx(), "id_card"));
        assert!(!predicate.evaluate(&ctx(), "name"));
        assert!(format!("{:?}", predicate).contains("starts-with-id"));
    }

    #[test]
    fn test_predicate_enum_dispatch() {
        let ctx = ctx()
            .with_principal(Principal::new(["ADMIN"]))
            .with_argument(Argument::include_list("fields", ["email"]));

        assert!(Predicate::has_role("ADMIN").evaluate(&ctx, "email"));
        assert!(Predicate::any_role(["X", "ADMIN"]).evaluate(&ctx, "email"));
        assert!(!Predicate::all_roles(["X", "ADMIN"]).evaluate(&ctx, "email"));
        assert!(Predicate::listed_in("fields").evaluate(&ctx, "email"));
        assert!(!Predicate::listed_in("fields").evaluate(&ctx, "name"));
    }

    #[test]
    fn test_decision_helpers() {
        assert!(FieldDecision::Include.is_include());
        assert!(FieldDecision::Exclude.is_exclude());
        assert!(!FieldDecision::Exclude.is_include());
    }
}
