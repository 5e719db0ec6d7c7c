//! # Synthetic Payloads
//!
//! Canned `load` and `meta` answers shaped like real Cube responses. Served
//! by the mock backend, and by the resilient backend once every retry has
//! failed. Callers see these tagged as `mock` or `fallback`, never `live`.

use cubebridge_core::vocabulary::{self, cities, customers, sales};
use serde_json::{Map, Value, json};

/// Canned metadata: the full canonical vocabulary.
#[must_use]
pub fn meta() -> Value {
    vocabulary::metadata()
}

/// Canned rows for `query`, picked by the cube of its first measure (or
/// first dimension) and cut to its `limit`.
#[must_use]
pub fn load(query: &Value) -> Value {
    let first_member = ["measures", "dimensions"]
        .iter()
        .filter_map(|key| query.get(*key).and_then(Value::as_array))
        .flatten()
        .find_map(Value::as_str)
        .unwrap_or(cities::COUNT);

    let rows = match vocabulary::cube_of(first_member) {
        sales::CUBE => sales_rows(),
        customers::CUBE => customer_rows(),
        _ if first_member == cities::COUNT => city_count_rows(),
        _ => city_population_rows(),
    };

    let limit = query
        .get("limit")
        .and_then(Value::as_u64)
        .and_then(|l| usize::try_from(l).ok())
        .unwrap_or(usize::MAX);

    json!({ "data": rows.into_iter().take(limit).collect::<Vec<_>>() })
}

/// One result row; Cube returns every value as a string.
fn row(cells: &[(&str, &str)]) -> Value {
    let map: Map<String, Value> = cells
        .iter()
        .map(|(member, value)| ((*member).to_string(), Value::from(*value)))
        .collect();
    Value::Object(map)
}

fn sales_rows() -> Vec<Value> {
    [
        ("Home & Garden", "85231.64"),
        ("Sports", "70710.6"),
        ("Clothing", "51878.4"),
        ("Electronics", "48302.15"),
        ("Books", "19554.9"),
    ]
    .into_iter()
    .map(|(category, revenue)| {
        row(&[
            (sales::PRODUCT_CATEGORY, category),
            (sales::TOTAL_REVENUE, revenue),
        ])
    })
    .collect()
}

fn customer_rows() -> Vec<Value> {
    [("Individual", "412"), ("Business", "163"), ("Enterprise", "48")]
        .into_iter()
        .map(|(kind, count)| row(&[(customers::CUSTOMER_TYPE, kind), (customers::COUNT, count)]))
        .collect()
}

fn city_population_rows() -> Vec<Value> {
    [
        ("New York", "8336817"),
        ("Los Angeles", "3979576"),
        ("Chicago", "2693976"),
        ("Houston", "2320268"),
        ("Phoenix", "1680992"),
    ]
    .into_iter()
    .map(|(city, population)| {
        row(&[
            (cities::CITY_NAME, city),
            (cities::TOTAL_POPULATION, population),
        ])
    })
    .collect()
}

fn city_count_rows() -> Vec<Value> {
    ["New York", "Los Angeles", "Chicago", "Houston", "Phoenix"]
        .into_iter()
        .map(|city| row(&[(cities::CITY_NAME, city), (cities::COUNT, "1")]))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_query_gets_sales_rows() {
        let payload = load(&json!({"measures": ["sales.total_revenue"], "limit": 3}));
        let rows = payload["data"].as_array().expect("data");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["sales.product_category"], "Home & Garden");
    }

    #[test]
    fn population_query_gets_city_rows() {
        let payload = load(&json!({"measures": ["cities.total_population"]}));
        let rows = payload["data"].as_array().expect("data");
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0]["cities.city_name"], "New York");
    }

    #[test]
    fn dimension_only_query_uses_dimension_cube() {
        let payload = load(&json!({"dimensions": ["customers.customer_type"]}));
        assert_eq!(payload["data"][0]["customers.customer_type"], "Individual");
    }

    #[test]
    fn shapeless_query_still_answers() {
        let payload = load(&json!({}));
        assert!(!payload["data"].as_array().expect("data").is_empty());
    }

    #[test]
    fn meta_has_cubes() {
        assert_eq!(meta()["cubes"].as_array().map(Vec::len), Some(3));
    }
}
