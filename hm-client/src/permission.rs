//! Role / permission checks

use crate::session::SessionStore;

/// Grants every role and permission
pub const SUPER_PERMISSION: &str = "*:*:*";

/// Snapshot of the session's roles and permissions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    roles: Vec<String>,
    permissions: Vec<String>,
}

impl PermissionSet {
    pub fn new(roles: Vec<String>, permissions: Vec<String>) -> Self {
        Self { roles, permissions }
    }

    pub fn from_session(session: &dyn SessionStore) -> Self {
        Self::new(session.roles(), session.permissions())
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == SUPER_PERMISSION || r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }

    pub fn has_permission(&self, perm: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == SUPER_PERMISSION || p == perm)
    }

    pub fn has_any_permission(&self, perms: &[&str]) -> bool {
        perms.iter().any(|p| self.has_permission(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let set = PermissionSet::new(
            vec!["ops".into()],
            vec!["product:asyncExport:down".into()],
        );
        assert!(set.has_role("ops"));
        assert!(!set.has_role("admin"));
        assert!(set.has_permission("product:asyncExport:down"));
        assert!(!set.has_permission("product:asyncExport:retry"));
        assert!(set.has_any_permission(&["x", "product:asyncExport:down"]));
        assert!(!set.has_any_role(&[]));
    }

    #[test]
    fn test_wildcard() {
        let set = PermissionSet::new(vec![SUPER_PERMISSION.into()], vec![SUPER_PERMISSION.into()]);
        assert!(set.has_role("anything"));
        assert!(set.has_permission("system:user:remove"));
        assert!(set.has_any_role(&["a", "b"]));
    }
}
