//! # Analysis Suggestions
//!
//! Canned analysis patterns offered to callers who do not yet know what to
//! ask, plus a few keyed on the wording of a business question.

use crate::compiler::normalize;
use crate::rules::Trigger;
use crate::types::{Query, SortDirection};
use crate::vocabulary::{cities, customers, sales};
use serde::Serialize;
use serde_json::{Value, json};

/// A titled, ready-to-run query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub title: &'static str,
    pub description: &'static str,
    pub query: Query,
}

impl Suggestion {
    fn new(title: &'static str, description: &'static str, query: Query) -> Self {
        Self {
            title,
            description,
            query,
        }
    }
}

/// Analyses that make sense for any caller.
#[must_use]
pub fn common_analyses() -> Vec<Suggestion> {
    vec![
        Suggestion::new(
            "Revenue by Product Category",
            "Analyze sales revenue across different product categories",
            Query::from_members(&[sales::TOTAL_REVENUE], &[sales::PRODUCT_CATEGORY])
                .with_order(sales::TOTAL_REVENUE, SortDirection::Desc),
        ),
        Suggestion::new(
            "Cities by Population",
            "Compare cities by total population",
            Query::from_members(&[cities::TOTAL_POPULATION], &[cities::CITY_NAME])
                .with_order(cities::TOTAL_POPULATION, SortDirection::Desc)
                .with_limit(10),
        ),
        Suggestion::new(
            "Customer Lifetime Value by Type",
            "Analyze customer value across different segments",
            Query::from_members(
                &[customers::AVERAGE_LIFETIME_VALUE, customers::COUNT],
                &[customers::CUSTOMER_TYPE],
            )
            .with_order(customers::AVERAGE_LIFETIME_VALUE, SortDirection::Desc),
        ),
    ]
}

const POPULATION: Trigger = Trigger::any(&["population", "demographic", "people"]);
const GEOGRAPHY: Trigger = Trigger::any(&["geography", "location", "geographic", "regional"]);
const RANKING: Trigger = Trigger::any(&["compare", "comparison", "ranking", "top"]);
const REVENUE: Trigger = Trigger::any(&["revenue", "sales", "channel", "payment"]);

/// Analyses keyed on the wording of `question`.
#[must_use]
pub fn contextual_suggestions(question: &str) -> Vec<Suggestion> {
    let text = normalize(question);
    let mut suggestions = Vec::new();

    if POPULATION.matches(&text) {
        suggestions.push(Suggestion::new(
            "Population Analysis by Region",
            "Analyze population distribution across regions",
            Query::from_members(&[cities::TOTAL_POPULATION], &[cities::REGION])
                .with_order(cities::TOTAL_POPULATION, SortDirection::Desc),
        ));
        suggestions.push(Suggestion::new(
            "Most Populous Cities",
            "Identify cities with highest population",
            Query::from_members(
                &[cities::TOTAL_POPULATION],
                &[cities::CITY_NAME, cities::STATE_NAME],
            )
            .with_order(cities::TOTAL_POPULATION, SortDirection::Desc)
            .with_limit(10),
        ));
    }

    if GEOGRAPHY.matches(&text) {
        suggestions.push(Suggestion::new(
            "Geographic Distribution",
            "Analyze data distribution across geographic regions",
            Query::from_members(
                &[cities::COUNT, cities::TOTAL_POPULATION],
                &[cities::REGION, cities::STATE_NAME],
            ),
        ));
    }

    if RANKING.matches(&text) {
        suggestions.push(Suggestion::new(
            "State Rankings",
            "Compare performance across states",
            Query::from_members(
                &[cities::TOTAL_POPULATION, cities::COUNT],
                &[cities::STATE_NAME],
            )
            .with_order(cities::TOTAL_POPULATION, SortDirection::Desc),
        ));
    }

    if REVENUE.matches(&text) {
        suggestions.push(Suggestion::new(
            "Revenue by Channel",
            "Compare sales revenue and order value across channels",
            Query::from_members(
                &[sales::TOTAL_REVENUE, sales::AVERAGE_ORDER_VALUE],
                &[sales::CHANNEL],
            )
            .with_order(sales::TOTAL_REVENUE, SortDirection::Desc),
        ));
    }

    suggestions
}

/// Reduce a `meta` document to cube names and member names.
///
/// Members may be objects with a `name` field or bare strings; both shapes
/// occur in practice.
#[must_use]
pub fn available_cubes(meta: &Value) -> Vec<Value> {
    let member_names = |cube: &Value, key: &str| -> Vec<Value> {
        cube.get(key)
            .and_then(Value::as_array)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m.get("name").unwrap_or(m).as_str())
                    .map(|name| Value::String(name.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    };

    meta.get("cubes")
        .and_then(Value::as_array)
        .map(|cubes| {
            cubes
                .iter()
                .map(|cube| {
                    json!({
                        "name": cube.get("name").cloned().unwrap_or(Value::Null),
                        "measures": member_names(cube, "measures"),
                        "dimensions": member_names(cube, "dimensions"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// TESTS
// =============================================================================
