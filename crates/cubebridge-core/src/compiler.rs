//! # Query Compiler
//!
//! Maps free-text business questions to structured queries.
//!
//! - Deterministic: same text, same query
//! - Total: every input, including the empty string, yields a valid query
//! - No semantic guessing: only the phrase tables in [`crate::rules`]

use crate::rules::{
    DEFAULT_RULES, DIMENSION_RULES, DefaultRule, FALLBACK_DEFAULT, LIMIT_RULES, METRIC_RULES,
    MemberRule, RANKING_RULES, TIME_GRAIN_RULES,
};
use crate::types::{Query, TimeDimension};
use crate::vocabulary;

/// Compiles natural-language questions into [`Query`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryCompiler;

impl QueryCompiler {
    /// Create a new compiler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compile an optional question; `None` compiles like the empty string.
    #[must_use]
    pub fn compile_opt(&self, text: Option<&str>) -> Query {
        self.compile(text.unwrap_or_default())
    }

    /// Compile a question into a valid query.
    #[must_use]
    pub fn compile(&self, text: &str) -> Query {
        let text = normalize(text);
        let mut query = Query::new();

        collect_members(&mut query.measures, METRIC_RULES, &text);
        collect_members(&mut query.dimensions, DIMENSION_RULES, &text);

        if let Some(grain) = TIME_GRAIN_RULES.iter().find(|r| r.matches(&text)) {
            let dimension =
                vocabulary::time_dimension_for(query.measures.first().map(String::as_str));
            query
                .time_dimensions
                .push(TimeDimension::new(dimension, grain.granularity));
        }

        // Ranking needs a measure to sort by; without one it is skipped.
        if let Some(ranking) = RANKING_RULES.iter().find(|r| r.matches(&text))
            && let Some(first) = query.measures.first().cloned()
        {
            query.sort_by(&first, ranking.direction);
        }

        if let Some(limit) = LIMIT_RULES.iter().find(|r| r.matches(&text)) {
            query.limit = Some(limit.limit);
        }

        if query.validate().is_ok() {
            query
        } else {
            default_query(&text)
        }
    }
}

/// Compile a question with the default compiler.
#[must_use]
pub fn compile(text: &str) -> Query {
    QueryCompiler::new().compile(text)
}

/// Lower-case and trim question text.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn collect_members(target: &mut Vec<String>, rules: &[MemberRule], text: &str) {
    for rule in rules.iter().filter(|r| r.trigger.matches(text)) {
        if !target.iter().any(|m| m == rule.member) {
            target.push(rule.member.to_string());
        }
    }
}

/// Domain-sniffing default for text that named no measure or dimension.
fn default_query(text: &str) -> Query {
    let rule = DEFAULT_RULES
        .iter()
        .find(|r| r.trigger.matches(text))
        .unwrap_or(&FALLBACK_DEFAULT);
    from_default(rule)
}

fn from_default(rule: &DefaultRule) -> Query {
    let mut query = Query::from_members(&[rule.measure], &[rule.dimension]).with_limit(rule.limit);
    if let Some(direction) = rule.order {
        query.sort_by(rule.measure, direction);
    }
    query
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Granularity, SortDirection};
    use crate::vocabulary::{cities, customers, sales};

    #[test]
    fn none_compiles_like_empty() {
        let compiler = QueryCompiler::new();
        assert_eq!(compiler.compile_opt(None), compiler.compile(""));
        assert_eq!(compiler.compile_opt(Some("")), compiler.compile(""));
    }

    #[test]
    fn compiled_queries_pass_validation() {
        let compiler = QueryCompiler::new();
        for text in ["", "top 5 cities by revenue", "monthly orders", "zzz"] {
            assert_eq!(compiler.compile(text).validate(), Ok(()), "{text}");
        }
    }

    #[test]
    fn repeated_triggers_do_not_duplicate() {
        // "sales" and "revenue" both trigger the revenue measure.
        let query = compile("sales revenue and more revenue");
        let revenue = query
            .measures
            .iter()
            .filter(|m| *m == sales::TOTAL_REVENUE)
            .count();
        assert_eq!(revenue, 1);
    }

    #[test]
    fn measures_keep_rule_order() {
        let query = compile("revenue and population");
        assert_eq!(
            query.measures,
            vec![
                cities::TOTAL_POPULATION.to_string(),
                sales::TOTAL_REVENUE.to_string()
            ]
        );
    }

    #[test]
    fn bottom_sorts_ascending() {
        let query = compile("lowest revenue by channel");
        assert_eq!(
            query.order_for(sales::TOTAL_REVENUE),
            Some(SortDirection::Asc)
        );
        assert_eq!(query.dimensions, vec![sales::CHANNEL.to_string()]);
    }

    #[test]
    fn ranking_without_measure_is_skipped() {
        let query = compile("top product categories");
        assert!(query.measures.is_empty());
        assert!(query.order.is_empty());
        assert_eq!(query.dimensions, vec![sales::PRODUCT_CATEGORY.to_string()]);
    }

    #[test]
    fn time_grain_uses_measure_cube() {
        let query = compile("monthly customer count");
        assert_eq!(query.measures, vec![customers::COUNT.to_string()]);
        assert_eq!(
            query.time_dimensions,
            vec![TimeDimension::new(
                customers::REGISTRATION_DATE,
                Granularity::Month
            )]
        );
    }

    #[test]
    fn default_keeps_only_default_shape() {
        // A lone time grain names no member, so the default replaces it.
        let query = compile("weekly");
        assert_eq!(query.measures, vec![cities::COUNT.to_string()]);
        assert!(query.time_dimensions.is_empty());
    }

    #[test]
    fn customer_default() {
        let query = compile("tell me about our clients");
        assert_eq!(query.measures, vec![customers::COUNT.to_string()]);
        assert_eq!(query.dimensions, vec![customers::CUSTOMER_TYPE.to_string()]);
        assert_eq!(query.limit, Some(5));
        assert!(query.order.is_empty());
    }
}
