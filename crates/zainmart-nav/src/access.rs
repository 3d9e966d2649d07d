use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAccessRule {
    pub role: String,
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    #[serde(default)]
    pub is_full_access: bool,
}

impl RoleAccessRule {
    pub fn full(role: &str) -> Self {
        Self {
            role: role.to_string(),
            allowed_paths: Vec::new(),
            is_full_access: true,
        }
    }

    pub fn prefixes(role: &str, prefixes: &[&str]) -> Self {
        Self {
            role: role.to_string(),
            allowed_paths: prefixes.iter().map(|p| p.to_string()).collect(),
            is_full_access: false,
        }
    }

    /// Plain string-prefix match: `/seller` also admits `/sellerX`.
    fn admits(&self, path: &str) -> bool {
        self.is_full_access || self.allowed_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// The role table consulted by the route guard. One rule per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    rules: Vec<RoleAccessRule>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                RoleAccessRule::full("super_admin"),
                RoleAccessRule::prefixes("zm_admin", &["/dashboard/admin/zainmart"]),
                RoleAccessRule::prefixes("zm_seller", &["/seller"]),
            ],
        }
    }
}

impl AccessPolicy {
    /// Builds a policy, keeping the first rule for any repeated role.
    pub fn new(rules: Vec<RoleAccessRule>) -> Self {
        let mut unique: Vec<RoleAccessRule> = Vec::with_capacity(rules.len());
        for rule in rules {
            if unique.iter().any(|r| r.role == rule.role) {
                debug!(role = %rule.role, "Ignoring duplicate access rule");
                continue;
            }
            unique.push(rule);
        }
        Self { rules: unique }
    }

    pub fn rules(&self) -> &[RoleAccessRule] {
        &self.rules
    }

    pub fn rule(&self, role: &str) -> Option<&RoleAccessRule> {
        self.rules.iter().find(|r| r.role == role)
    }

    pub fn can_access_path<S: AsRef<str>>(&self, roles: &[S], path: &str) -> bool {
        if roles.is_empty() {
            return false;
        }
        if roles.iter().any(|r| r.as_ref() == "super_admin") {
            return true;
        }
        roles
            .iter()
            .filter_map(|role| self.rule(role.as_ref()))
            .any(|rule| rule.admits(path))
    }
}

static DEFAULT_POLICY: LazyLock<AccessPolicy> = LazyLock::new(AccessPolicy::default);

/// Route guard with the built-in role table.
pub fn can_access_path<S: AsRef<str>>(roles: &[S], path: &str) -> bool {
    DEFAULT_POLICY.can_access_path(roles, path)
}

/// Landing page after sign-in. The first matching role wins, in the fixed
/// order super_admin, zm_admin, zm_seller.
pub fn default_path_for_role<S: AsRef<str>>(roles: &[S]) -> &'static str {
    let has = |wanted: &str| roles.iter().any(|r| r.as_ref() == wanted);
    if roles.is_empty() {
        "/login"
    } else if has("super_admin") {
        "/dashboard/admin"
    } else if has("zm_admin") {
        "/dashboard/admin/zainmart"
    } else if has("zm_seller") {
        "/seller"
    } else {
        "/dashboard"
    }
}

const PUBLIC_ROUTES: [&str; 9] = [
    "/register",
    "/contact",
    "/home",
    "/",
    "/login",
    "/privacy",
    "/help",
    "/community",
    "/unauthorized",
];

/// Routes reachable without a session. Everything else is protected.
pub fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTES.contains(&path) || path.starts_with("/catalogs")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum RouteDecision {
    Allow,
    Login,
    Redirect(String),
}

/// Decides what happens when a caller navigates to `path`. `roles` is
/// `None` when nobody is signed in.
pub fn authorize<S: AsRef<str>>(roles: Option<&[S]>, path: &str) -> RouteDecision {
    if is_public_route(path) {
        return RouteDecision::Allow;
    }
    let Some(roles) = roles else {
        return RouteDecision::Login;
    };
    if can_access_path(roles, path) {
        RouteDecision::Allow
    } else {
        let target = default_path_for_role(roles);
        debug!(path, target, "Redirecting unauthorized navigation");
        RouteDecision::Redirect(target.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_no_roles_no_access() {
        assert!(!can_access_path(&NONE, "/seller"));
        assert!(!can_access_path(&NONE, "/"));
    }

    #[test]
    fn test_super_admin_bypasses_table() {
        assert!(can_access_path(&["super_admin"], "/anything/at/all"));
        assert!(can_access_path(&["nobody", "super_admin"], "/x"));
        let empty = AccessPolicy::new(Vec::new());
        assert!(empty.can_access_path(&["super_admin"], "/x"));
    }

    #[test]
    fn test_prefix_rules() {
        assert!(can_access_path(&["zm_seller"], "/seller/orders"));
        assert!(!can_access_path(&["zm_seller"], "/dashboard"));
        assert!(can_access_path(&["zm_admin"], "/dashboard/admin/zainmart/orders"));
        assert!(!can_access_path(&["zm_admin"], "/dashboard/admin"));
        assert!(can_access_path(&["guest", "zm_seller"], "/seller"));
        assert!(!can_access_path(&["guest"], "/seller"));
    }

    #[test]
    fn test_prefix_match_is_not_segment_aware() {
        assert!(can_access_path(&["zm_seller"], "/sellerX"));
        assert!(can_access_path(&["zm_admin"], "/dashboard/admin/zainmartX"));
    }

    #[test]
    fn test_full_access_rule_for_custom_role() {
        let policy = AccessPolicy::new(vec![RoleAccessRule::full("ops"), RoleAccessRule::prefixes("ops", &["/ops"])]);
        assert_eq!(policy.rules().len(), 1);
        assert!(policy.can_access_path(&["ops"], "/dashboard"));
    }

    #[test]
    fn test_default_path_precedence() {
        assert_eq!(default_path_for_role(&NONE), "/login");
        assert_eq!(default_path_for_role(&["zm_seller", "super_admin"]), "/dashboard/admin");
        assert_eq!(default_path_for_role(&["zm_admin", "zm_seller"]), "/dashboard/admin/zainmart");
        assert_eq!(default_path_for_role(&["zm_seller", "zm_admin"]), "/dashboard/admin/zainmart");
        assert_eq!(default_path_for_role(&["zm_seller"]), "/seller");
        assert_eq!(default_path_for_role(&["customer"]), "/dashboard");
    }

    #[test]
    fn test_public_routes() {
        assert!(is_public_route("/catalogs/shoes"));
        assert!(is_public_route("/catalogs"));
        assert!(is_public_route("/"));
        assert!(is_public_route("/login"));
        assert!(!is_public_route("/dashboard"));
        assert!(!is_public_route("/login/extra"));
    }

    #[test]
    fn test_authorize_decisions() {
        assert_eq!(authorize::<&str>(None, "/home"), RouteDecision::Allow);
        assert_eq!(authorize::<&str>(None, "/seller"), RouteDecision::Login);
        assert_eq!(authorize(Some(&["zm_seller"][..]), "/seller/products"), RouteDecision::Allow);
        assert_eq!(
            authorize(Some(&["zm_seller"][..]), "/dashboard/admin"),
            RouteDecision::Redirect("/seller".into())
        );
        assert_eq!(authorize(Some(&NONE[..]), "/me"), RouteDecision::Redirect("/login".into()));
    }
}
