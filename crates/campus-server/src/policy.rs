//! Longest-prefix path → role authorization table.

use campus_core::models::role::{Role, RoleSet};

/// True if `prefix` covers `path` on a segment boundary: `/a` covers
/// `/a` and `/a/b` but not `/ab`.
pub fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// True if any of `prefixes` covers `path`.
pub fn any_prefix_matches<S: AsRef<str>>(prefixes: &[S], path: &str) -> bool {
    prefixes.iter().any(|p| prefix_matches(p.as_ref(), path))
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    roles: RoleSet,
}

/// Immutable after construction. Rules are kept sorted longest prefix
/// first, so the first match is the most specific one.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<Rule>,
}

impl AccessPolicy {
    pub fn new(rules: impl IntoIterator<Item = (String, RoleSet)>) -> Self {
        let mut rules: Vec<Rule> = rules
            .into_iter()
            .map(|(prefix, roles)| Rule { prefix, roles })
            .collect();
        // Stable: equal-length duplicates keep declaration order.
        rules.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { rules }
    }

    /// Role set of the longest rule covering `path`.
    pub fn lookup(&self, path: &str) -> Option<&RoleSet> {
        self.rules
            .iter()
            .find(|rule| prefix_matches(&rule.prefix, path))
            .map(|rule| &rule.roles)
    }

    /// Unmatched paths and empty role sets deny.
    pub fn authorize(&self, path: &str, role: Role) -> bool {
        self.lookup(path).is_some_and(|roles| roles.admits(role))
    }
}
