//! Compiler configuration.

use std::collections::{HashMap, HashSet};

/// Target of an `exact:` rewrite.
#[derive(Debug, Clone, Default)]
pub struct ExactMapping {
    /// Concrete field the filter applies to.
    pub field: String,
    /// Display-value to stored-value rewrites; values without an entry
    /// pass through unchanged.
    pub value_map: HashMap<String, String>,
}

/// Read-only configuration for one compile pass.
///
/// Constructed fresh from the search specification for every request,
/// never mutated afterwards, and shared by reference across the whole
/// AST walk.
#[derive(Debug, Clone, Default)]
pub struct CompilerContext {
    /// Fields full-text terms search by default, boosts encoded as
    /// `name^boost`.
    pub fields: Vec<String>,
    /// `field:` name remappings to one or more concrete fields.
    pub field_mappings: HashMap<String, Vec<String>>,
    /// Fields `range:` is allowed on. Anything else compiles to a query
    /// matching nothing.
    pub range_allowed: HashSet<String>,
    /// Fields `exact:` is allowed on, with their rewrite targets.
    pub exact_mappings: HashMap<String, ExactMapping>,
}

impl CompilerContext {
    /// Creates a context searching the given default fields.
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Maps a `field:` name to one or more concrete fields.
    pub fn with_field_mapping(
        mut self,
        name: impl Into<String>,
        fields: Vec<String>,
    ) -> Self {
        self.field_mappings.insert(name.into(), fields);
        self
    }

    /// Allows `range:` filtering on a field.
    pub fn with_range_field(mut self, name: impl Into<String>) -> Self {
        self.range_allowed.insert(name.into());
        self
    }

    /// Allows `exact:` filtering on a field, rewriting to `target` with
    /// the given value rewrites.
    pub fn with_exact_mapping(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        value_map: HashMap<String, String>,
    ) -> Self {
        self.exact_mappings.insert(
            name.into(),
            ExactMapping {
                field: target.into(),
                value_map,
            },
        );
        self
    }

    /// Merges another context into this one.
    ///
    /// Fields are unioned preserving order; on mapping collisions the
    /// existing entry wins, so a federated search keeps each child's
    /// declarations stable regardless of registration order.
    pub fn merge(mut self, other: Self) -> Self {
        for field in other.fields {
            if !self.fields.contains(&field) {
                self.fields.push(field);
            }
        }
        for (name, fields) in other.field_mappings {
            self.field_mappings.entry(name).or_insert(fields);
        }
        self.range_allowed.extend(other.range_allowed);
        for (name, mapping) in other.exact_mappings {
            self.exact_mappings.entry(name).or_insert(mapping);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_populate_the_context() {
        let ctx = CompilerContext::new(vec!["title^4".into(), "content".into()])
            .with_field_mapping("title", vec!["document_title.en-US".into()])
            .with_range_field("clicks")
            .with_exact_mapping(
                "category",
                "category_id",
                HashMap::from([("help".to_string(), "7".to_string())]),
            );

        assert_eq!(ctx.fields.len(), 2);
        assert_eq!(
            ctx.field_mappings["title"],
            vec!["document_title.en-US".to_string()]
        );
        assert!(ctx.range_allowed.contains("clicks"));
        assert_eq!(ctx.exact_mappings["category"].field, "category_id");
    }

    #[test]
    fn merge_unions_and_keeps_existing_entries() {
        let left = CompilerContext::new(vec!["title".into()])
            .with_field_mapping("title", vec!["wiki_title".into()]);
        let right = CompilerContext::new(vec!["title".into(), "content".into()])
            .with_field_mapping("title", vec!["question_title".into()])
            .with_range_field("votes");

        let merged = left.merge(right);

        assert_eq!(merged.fields, vec!["title".to_string(), "content".to_string()]);
        // First registration wins on collision.
        assert_eq!(merged.field_mappings["title"], vec!["wiki_title".to_string()]);
        assert!(merged.range_allowed.contains("votes"));
    }
}
