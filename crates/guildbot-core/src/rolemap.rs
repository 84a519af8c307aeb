//! Static role configuration: the reaction emoji -> role table and the
//! self-service role list. Pure data, immutable after load.

/// Ordered emoji -> role-name table driving reaction-based assignment.
///
/// Insertion order is display order in the prompt message and the order in
/// which reactions are seeded.
#[derive(Clone, Debug)]
pub struct RoleMappings {
    entries: Vec<(String, String)>,
}

impl RoleMappings {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn role_for(&self, emoji: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(e, _)| e == emoji)
            .map(|(_, r)| r.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(e, r)| (e.as_str(), r.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered set of role names members may self-assign via the selection menu.
///
/// Disjoint from [`RoleMappings`]: a different assignment surface over the
/// same target type (a named guild role).
#[derive(Clone, Debug)]
pub struct SelfServiceRoles {
    names: Vec<String>,
}

impl SelfServiceRoles {
    pub fn new(names: Vec<String>) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !deduped.contains(&name) {
                deduped.push(name);
            }
        }
        Self { names: deduped }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> RoleMappings {
        RoleMappings::new(vec![
            ("🍎".to_string(), "Apples".to_string()),
            ("🍊".to_string(), "Oranges".to_string()),
        ])
    }

    #[test]
    fn lookup_by_emoji() {
        let m = mappings();
        assert_eq!(m.role_for("🍎"), Some("Apples"));
        assert_eq!(m.role_for("🍇"), None);
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let m = mappings();
        let order: Vec<&str> = m.iter().map(|(e, _)| e).collect();
        assert_eq!(order, vec!["🍎", "🍊"]);
    }

    #[test]
    fn self_service_dedup_keeps_first_occurrence() {
        let s = SelfServiceRoles::new(vec![
            "fans".to_string(),
            "news".to_string(),
            "fans".to_string(),
        ]);
        assert_eq!(s.len(), 2);
        assert!(s.contains("fans"));
        assert!(!s.contains("artists"));
        assert_eq!(s.iter().collect::<Vec<_>>(), vec!["fans", "news"]);
    }
}
