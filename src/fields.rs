//! Field-key registries.
//!
//! A registry maps the internal name of a request field (the key it
//! serializes under) to the wire key the horde expects for it. There is one
//! registry per placement: header, path and query. Anything no registry
//! claims is sent in the JSON body.

/// An ordered, immutable internal-name → wire-name table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldRegistry {
    entries: Vec<(&'static str, &'static str)>,
}

impl FieldRegistry {
    /// Creates a registry from `(internal, wire)` pairs. Order is preserved.
    pub fn new(entries: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns the wire name registered for `field`, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use horde_client::FieldRegistries;
    ///
    /// let registries = FieldRegistries::ai_horde();
    /// assert_eq!(registries.header.wire_name("client_agent"), Some("Client-Agent"));
    /// assert_eq!(registries.header.wire_name("prompt"), None);
    /// ```
    pub fn wire_name(&self, field: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(internal, _)| *internal == field)
            .map(|(_, wire)| *wire)
    }

    /// Returns `true` if `field` is registered.
    pub fn contains(&self, field: &str) -> bool {
        self.wire_name(field).is_some()
    }

    /// Iterates `(internal, wire)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The three registries a client marshals requests with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegistries {
    /// Fields sent as HTTP headers.
    pub header: FieldRegistry,
    /// Fields substituted into `{placeholder}`s of the endpoint path.
    pub path: FieldRegistry,
    /// Fields sent in the query string.
    pub query: FieldRegistry,
}

impl FieldRegistries {
    pub fn new(header: FieldRegistry, path: FieldRegistry, query: FieldRegistry) -> Self {
        Self {
            header,
            path,
            query,
        }
    }

    /// Registries for the AI Horde API (`https://aihorde.net/api`).
    pub fn ai_horde() -> Self {
        Self {
            header: Self::generic_headers(),
            path: FieldRegistry::new([("id", "id")]),
            query: FieldRegistry::new([("worker_type", "type"), ("name", "name")]),
        }
    }

    /// Registries for the image ratings API (`https://ratings.aihorde.net/api`).
    pub fn ratings() -> Self {
        Self {
            header: Self::generic_headers(),
            path: FieldRegistry::new([("image_id", "image_id"), ("user_id", "user_id")]),
            query: FieldRegistry::new([
                ("format", "format"),
                ("rating", "rating"),
                ("artifacts", "artifacts"),
                ("min_ratings", "min_ratings"),
                ("max_deviation", "max_deviation"),
                ("divergence", "divergence"),
                ("offset", "offset"),
            ]),
        }
    }

    fn generic_headers() -> FieldRegistry {
        FieldRegistry::new([
            ("apikey", "apikey"),
            ("accept", "accept"),
            ("client_agent", "Client-Agent"),
        ])
    }
}

impl Default for FieldRegistries {
    fn default() -> Self {
        Self::ai_horde()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_preserves_order() {
        let registry = FieldRegistry::new([("b", "B"), ("a", "A")]);
        let names: Vec<_> = registry.iter().map(|(internal, _)| internal).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_first_entry_wins_for_duplicates() {
        let registry = FieldRegistry::new([("apikey", "apikey"), ("apikey", "X-Api-Key")]);
        assert_eq!(registry.wire_name("apikey"), Some("apikey"));
    }

    #[test]
    fn test_ratings_registries() {
        let registries = FieldRegistries::ratings();
        assert!(registries.path.contains("image_id"));
        assert!(registries.query.contains("min_ratings"));
        assert!(!registries.path.contains("id"));
        assert_eq!(registries.header, FieldRegistries::ai_horde().header);
    }

    #[test]
    fn test_default_is_ai_horde() {
        assert_eq!(FieldRegistries::default(), FieldRegistries::ai_horde());
        assert_eq!(FieldRegistries::ai_horde().query.wire_name("worker_type"), Some("type"));
        assert!(FieldRegistry::default().is_empty());
    }
}
