//! Resource kinds the provider manages.
//!
//! The registry is built once in `main` and handed to the command handlers.

use crate::operations::OperationKind;

/// One manageable resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKind {
    /// Name users refer to the kind by.
    pub name: String,
    pub summary: String,
    /// Member kind sent to the platform when this resource joins network groups.
    pub member_kind: Option<String>,
    /// Long-running operations the resource supports.
    pub operations: Vec<OperationKind>,
}

impl ResourceKind {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            member_kind: None,
            operations: Vec::new(),
        }
    }

    /// Mark the kind as a network-group member.
    #[must_use]
    pub fn with_membership(mut self, member_kind: impl Into<String>) -> Self {
        self.member_kind = Some(member_kind.into());
        self
    }

    /// Add a supported long-running operation.
    #[must_use]
    pub fn with_operation(mut self, operation: OperationKind) -> Self {
        self.operations.push(operation);
        self
    }

    /// Whether this kind can join network groups.
    pub fn uses_membership(&self) -> bool {
        self.member_kind.is_some()
    }

    pub fn supports(&self, operation: OperationKind) -> bool {
        self.operations.contains(&operation)
    }
}

/// Explicit list of resource kinds.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    kinds: Vec<ResourceKind>,
}

impl ResourceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The kinds this provider ships with.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            ResourceKind::new("application", "Application running on the platform")
                .with_membership("application")
                .with_operation(OperationKind::Restart),
        );
        registry.register(
            ResourceKind::new("addon", "Managed add-on attached to an organisation")
                .with_membership("addon")
                .with_operation(OperationKind::Reboot),
        );
        registry.register(
            ResourceKind::new("database", "Managed database add-on")
                .with_membership("addon")
                .with_operation(OperationKind::Reboot)
                .with_operation(OperationKind::Restart)
                .with_operation(OperationKind::ExecuteSql),
        );
        registry.register(ResourceKind::new(
            "log_drain",
            "Forwards application logs to a recipient",
        ));
        registry.register(ResourceKind::new(
            "network_group",
            "Private network shared by its members",
        ));
        registry
    }

    /// Add a kind. A kind with the same name is replaced.
    pub fn register(&mut self, kind: ResourceKind) {
        match self.kinds.iter_mut().find(|k| k.name == kind.name) {
            Some(existing) => *existing = kind,
            None => self.kinds.push(kind),
        }
    }

    /// Look up a kind by name.
    pub fn get(&self, name: &str) -> Option<&ResourceKind> {
        self.kinds.iter().find(|k| k.name == name)
    }

    /// Kinds in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, ResourceKind> {
        self.kinds.iter()
    }

    /// Kinds that can join network groups.
    pub fn members(&self) -> impl Iterator<Item = &ResourceKind> {
        self.kinds.iter().filter(|k| k.uses_membership())
    }

    /// Kinds supporting the given operation.
    pub fn supporting(&self, operation: OperationKind) -> impl Iterator<Item = &ResourceKind> {
        self.kinds.iter().filter(move |k| k.supports(operation))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_enumerates_every_kind() {
        let registry = ResourceRegistry::builtin();
        let names = registry.iter().map(|k| k.name.as_str()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "application",
                "addon",
                "database",
                "log_drain",
                "network_group",
            ]
        );
    }

    #[test]
    fn test_membership_kinds() {
        let registry = ResourceRegistry::builtin();
        let members = registry
            .members()
            .map(|k| k.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(members, vec!["application", "addon", "database"]);
        assert_eq!(
            registry.get("database").and_then(|k| k.member_kind.as_deref()),
            Some("addon")
        );
    }

    #[test]
    fn test_supporting_operation() {
        let registry = ResourceRegistry::builtin();
        let sql = registry
            .supporting(OperationKind::ExecuteSql)
            .map(|k| k.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(sql, vec!["database"]);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ResourceRegistry::new();
        registry.register(ResourceKind::new("application", "first"));
        registry.register(ResourceKind::new("application", "second"));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("application").map(|k| k.summary.as_str()),
            Some("second")
        );
    }
}
