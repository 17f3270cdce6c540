//! Query compiler.
//!
//! Walks the parsed AST and emits backend-neutral query expressions.
//! Compilation never fails on well-typed input: unauthorized range and
//! exact fields degrade to a query matching nothing rather than erroring,
//! so a compiled query is always executable.

use onebox_protocol::{BoolQuery, CompareOp, Query, TextOperator, TextQuery};
use onebox_query::{QueryNode, RangeOp};

use crate::context::CompilerContext;

/// Compiles a query expression against a compiler context.
pub fn compile(node: &QueryNode, ctx: &CompilerContext) -> Query {
    compile_scoped(node, ctx, &ctx.fields)
}

/// Compiles with an explicit field scope.
///
/// Field scoping replaces the in-scope fields for the inner compile call
/// only; siblings keep seeing the context's defaults.
fn compile_scoped(node: &QueryNode, ctx: &CompilerContext, fields: &[String]) -> Query {
    match node {
        QueryNode::Term(text) => text_query(text, fields),

        QueryNode::FieldScope { field, node } => {
            let scoped = ctx
                .field_mappings
                .get(field)
                .cloned()
                .unwrap_or_else(|| vec![field.clone()]);
            compile_scoped(node, ctx, &scoped)
        }

        QueryNode::Range { field, op, value } => {
            if ctx.range_allowed.contains(field) {
                Query::range(field.clone(), compare_op(*op), value.clone())
            } else {
                // Fail closed: an unauthorized range field must never
                // silently widen results.
                Query::MatchNone
            }
        }

        QueryNode::Exact { field, value } => match ctx.exact_mappings.get(field) {
            Some(mapping) => {
                let rewritten = mapping
                    .value_map
                    .get(value)
                    .cloned()
                    .unwrap_or_else(|| value.clone());
                Query::terms(mapping.field.clone(), vec![rewritten])
            }
            None => Query::MatchNone,
        },

        QueryNode::Not(inner) => BoolQuery::new()
            .must_not(compile_scoped(inner, ctx, fields))
            .build(),

        QueryNode::And(items) => items
            .iter()
            .fold(BoolQuery::new(), |bool_query, item| {
                bool_query.must(compile_scoped(item, ctx, fields))
            })
            .build(),

        QueryNode::Or(items) => items
            .iter()
            .fold(BoolQuery::new(), |bool_query, item| {
                bool_query.should(compile_scoped(item, ctx, fields))
            })
            .minimum_should_match(1)
            .build(),

        QueryNode::Adjacency(items) => compile_adjacency(items, ctx, fields),
    }
}

/// Compiles an adjacency run.
///
/// Runs made up entirely of plain terms coalesce into one multi-word
/// full-text query, which keeps phrase-like scoring in a single backend
/// query instead of a boolean tree. Anything else conjoins the items.
fn compile_adjacency(items: &[QueryNode], ctx: &CompilerContext, fields: &[String]) -> Query {
    let texts: Option<Vec<&str>> = items
        .iter()
        .map(|item| match item {
            QueryNode::Term(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();

    if let Some(texts) = texts {
        return text_query(&texts.join(" "), fields);
    }

    items
        .iter()
        .fold(BoolQuery::new(), |bool_query, item| {
            bool_query.must(compile_scoped(item, ctx, fields))
        })
        .build()
}

/// The default full-text query for term text: every word required,
/// quoted spans matched as phrases.
fn text_query(text: &str, fields: &[String]) -> Query {
    Query::Text(TextQuery {
        query: text.to_string(),
        fields: fields.to_vec(),
        default_operator: TextOperator::And,
        minimum_should_match: None,
        phrase: true,
    })
}

/// Maps the AST's range operator onto the protocol's comparison key.
fn compare_op(op: RangeOp) -> CompareOp {
    match op {
        RangeOp::Lt => CompareOp::Lt,
        RangeOp::Lte => CompareOp::Lte,
        RangeOp::Gt => CompareOp::Gt,
        RangeOp::Gte => CompareOp::Gte,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use onebox_query::parse;

    use super::*;

    fn ctx() -> CompilerContext {
        CompilerContext::new(vec!["title^4".into(), "content".into()])
            .with_field_mapping("title", vec!["document_title.en-US".into()])
            .with_range_field("clicks")
            .with_exact_mapping(
                "category",
                "category_id",
                HashMap::from([("help".to_string(), "7".to_string())]),
            )
    }

    fn compiled(input: &str) -> Query {
        compile(&parse(input).unwrap().unwrap(), &ctx())
    }

    #[test]
    fn term_searches_all_configured_fields() {
        let Query::Text(text) = compiled("firefox") else {
            panic!("expected a text query");
        };
        assert_eq!(text.query, "firefox");
        assert_eq!(text.fields, vec!["title^4".to_string(), "content".to_string()]);
        assert_eq!(text.default_operator, TextOperator::And);
        assert!(text.phrase);
    }

    #[test]
    fn adjacency_of_plain_terms_coalesces() {
        let Query::Text(text) = compiled("firefox keeps crashing") else {
            panic!("expected a single text query, not a boolean tree");
        };
        assert_eq!(text.query, "firefox keeps crashing");
    }

    #[test]
    fn adjacency_with_quoted_phrase_still_coalesces() {
        let Query::Text(text) = compiled("firefox \"address bar\"") else {
            panic!("expected a single text query");
        };
        assert_eq!(text.query, "firefox \"address bar\"");
        assert!(text.phrase);
    }

    #[test]
    fn adjacency_with_operators_compiles_as_conjunction() {
        let Query::Bool(bool_query) = compiled("firefox exact:category:help") else {
            panic!("expected a bool query");
        };
        assert_eq!(bool_query.must.len(), 2);
        assert_eq!(
            bool_query.must[1],
            Query::terms("category_id", vec!["7".into()])
        );
    }

    #[test]
    fn field_scope_remaps_and_replaces_fields() {
        let Query::Text(text) = compiled("field:title:firefox") else {
            panic!("expected a text query");
        };
        // Scoped to the remapped field only; other configured fields are
        // excluded.
        assert_eq!(text.fields, vec!["document_title.en-US".to_string()]);
        assert_eq!(text.query, "firefox");
    }

    #[test]
    fn field_scope_does_not_leak_to_siblings() {
        let Query::Bool(bool_query) = compiled("field:title:firefox AND crash") else {
            panic!("expected a bool query");
        };
        let Query::Text(scoped) = &bool_query.must[0] else {
            panic!("expected text queries");
        };
        let Query::Text(sibling) = &bool_query.must[1] else {
            panic!("expected text queries");
        };
        assert_eq!(scoped.fields, vec!["document_title.en-US".to_string()]);
        assert_eq!(
            sibling.fields,
            vec!["title^4".to_string(), "content".to_string()]
        );
    }

    #[test]
    fn unmapped_field_scope_uses_the_literal_name() {
        let Query::Text(text) = compiled("field:summary:firefox") else {
            panic!("expected a text query");
        };
        assert_eq!(text.fields, vec!["summary".to_string()]);
    }

    #[test]
    fn allowed_range_compiles_to_a_range_filter() {
        assert_eq!(
            compiled("range:clicks:gte:100"),
            Query::range("clicks", CompareOp::Gte, "100")
        );
    }

    #[test]
    fn unauthorized_range_fails_closed() {
        for input in [
            "range:secret:gte:0",
            "range:secret:lt:zzz",
            "range:locale:lte:en",
        ] {
            assert_eq!(compiled(input), Query::MatchNone, "input: {input}");
        }
    }

    #[test]
    fn exact_rewrites_field_and_value() {
        assert_eq!(
            compiled("exact:category:help"),
            Query::terms("category_id", vec!["7".into()])
        );
    }

    #[test]
    fn exact_unmapped_value_passes_through() {
        assert_eq!(
            compiled("exact:category:troubleshooting"),
            Query::terms("category_id", vec!["troubleshooting".into()])
        );
    }

    #[test]
    fn exact_on_unmapped_field_fails_closed() {
        assert_eq!(compiled("exact:secret:value"), Query::MatchNone);
    }

    #[test]
    fn not_compiles_to_must_not() {
        let Query::Bool(bool_query) = compiled("NOT firefox") else {
            panic!("expected a bool query");
        };
        assert!(bool_query.must.is_empty());
        assert_eq!(bool_query.must_not.len(), 1);
    }

    #[test]
    fn or_requires_one_should_clause() {
        let Query::Bool(bool_query) = compiled("firefox OR fenix") else {
            panic!("expected a bool query");
        };
        assert_eq!(bool_query.should.len(), 2);
        assert_eq!(bool_query.minimum_should_match, Some(1));
    }

    #[test]
    fn literal_fallback_terms_always_compile() {
        // Strings that fail to parse get compiled as one literal term by
        // the caller; that path must never panic, whatever the text.
        for nasty in ["(((", "a AND", "NOT", ")", "field:title:", "\"open (quote"] {
            let query = compile(&QueryNode::term(nasty), &ctx());
            assert!(matches!(query, Query::Text(_)));
        }
    }

    #[test]
    fn complex_query_shape() {
        let Query::Bool(outer) = compiled("(firefox OR fenix) NOT legacy range:clicks:gt:5")
        else {
            panic!("expected a bool query");
        };
        assert_eq!(outer.must.len(), 3);
        assert!(matches!(&outer.must[0], Query::Bool(b) if b.should.len() == 2));
        assert!(matches!(&outer.must[1], Query::Bool(b) if b.must_not.len() == 1));
        assert_eq!(outer.must[2], Query::range("clicks", CompareOp::Gt, "5"));
    }
}
