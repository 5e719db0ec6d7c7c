//! # Vocabulary Module
//!
//! The canonical metric vocabulary of the semantic layer.
//!
//! Three cubes are known: `cities`, `sales` and `customers`. Identifiers are
//! always lower-case `<cube>.<member>`; capitalized spellings are not
//! recognised.

use serde_json::{Value, json};

/// Members of the `cities` cube.
pub mod cities {
    pub const CUBE: &str = "cities";
    pub const COUNT: &str = "cities.count";
    pub const TOTAL_POPULATION: &str = "cities.total_population";
    pub const CITY_NAME: &str = "cities.city_name";
    pub const STATE_NAME: &str = "cities.state_name";
    pub const REGION: &str = "cities.region";
}

/// Members of the `sales` cube.
pub mod sales {
    pub const CUBE: &str = "sales";
    pub const COUNT: &str = "sales.count";
    pub const TOTAL_REVENUE: &str = "sales.total_revenue";
    pub const AVERAGE_ORDER_VALUE: &str = "sales.average_order_value";
    pub const TOTAL_QUANTITY: &str = "sales.total_quantity";
    pub const TOTAL_DISCOUNT_AMOUNT: &str = "sales.total_discount_amount";
    pub const PRODUCT_CATEGORY: &str = "sales.product_category";
    pub const CHANNEL: &str = "sales.channel";
    pub const PAYMENT_METHOD: &str = "sales.payment_method";
    pub const DISCOUNT_TIER: &str = "sales.discount_tier";
    pub const DATE: &str = "sales.date";
}

/// Members of the `customers` cube.
pub mod customers {
    pub const CUBE: &str = "customers";
    pub const COUNT: &str = "customers.count";
    pub const AVERAGE_LIFETIME_VALUE: &str = "customers.average_lifetime_value";
    pub const AVERAGE_CREDIT_SCORE: &str = "customers.average_credit_score";
    pub const CUSTOMER_TYPE: &str = "customers.customer_type";
    pub const CREDIT_SCORE_TIER: &str = "customers.credit_score_tier";
    pub const REGISTRATION_DATE: &str = "customers.registration_date";
}

// =============================================================================
// CUBE CATALOG
// =============================================================================

/// A named member of a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub kind: &'static str,
}

/// Static description of one cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub measures: &'static [MemberSpec],
    pub dimensions: &'static [MemberSpec],
    /// Date column used for time grains, if the cube has one.
    pub time_dimension: Option<&'static str>,
}

const fn member(name: &'static str, title: &'static str, kind: &'static str) -> MemberSpec {
    MemberSpec { name, title, kind }
}

/// All cubes of the semantic layer, in catalog order.
pub static CUBES: &[CubeSpec] = &[
    CubeSpec {
        name: cities::CUBE,
        title: "Cities",
        measures: &[
            member(cities::COUNT, "Count", "number"),
            member(cities::TOTAL_POPULATION, "Total Population", "number"),
        ],
        dimensions: &[
            member(cities::CITY_NAME, "City Name", "string"),
            member(cities::STATE_NAME, "State Name", "string"),
            member(cities::REGION, "Region", "string"),
        ],
        time_dimension: None,
    },
    CubeSpec {
        name: sales::CUBE,
        title: "Sales",
        measures: &[
            member(sales::COUNT, "Count", "number"),
            member(sales::TOTAL_REVENUE, "Total Revenue", "number"),
            member(sales::AVERAGE_ORDER_VALUE, "Average Order Value", "number"),
            member(sales::TOTAL_QUANTITY, "Total Quantity", "number"),
            member(sales::TOTAL_DISCOUNT_AMOUNT, "Total Discount Amount", "number"),
        ],
        dimensions: &[
            member(sales::PRODUCT_CATEGORY, "Product Category", "string"),
            member(sales::CHANNEL, "Channel", "string"),
            member(sales::PAYMENT_METHOD, "Payment Method", "string"),
            member(sales::DISCOUNT_TIER, "Discount Tier", "string"),
            member(sales::DATE, "Date", "time"),
        ],
        time_dimension: Some(sales::DATE),
    },
    CubeSpec {
        name: customers::CUBE,
        title: "Customers",
        measures: &[
            member(customers::COUNT, "Count", "number"),
            member(
                customers::AVERAGE_LIFETIME_VALUE,
                "Average Lifetime Value",
                "number",
            ),
            member(
                customers::AVERAGE_CREDIT_SCORE,
                "Average Credit Score",
                "number",
            ),
        ],
        dimensions: &[
            member(customers::CUSTOMER_TYPE, "Customer Type", "string"),
            member(customers::CREDIT_SCORE_TIER, "Credit Score Tier", "string"),
            member(customers::REGISTRATION_DATE, "Registration Date", "time"),
        ],
        time_dimension: Some(customers::REGISTRATION_DATE),
    },
];

/// Look up a cube by name.
#[must_use]
pub fn cube(name: &str) -> Option<&'static CubeSpec> {
    CUBES.iter().find(|c| c.name == name)
}

/// The cube part of a `<cube>.<member>` identifier.
#[must_use]
pub fn cube_of(member: &str) -> &str {
    member.split_once('.').map_or(member, |(cube, _)| cube)
}

/// Date column used when a time grain is requested.
///
/// Follows the cube that owns `measure`; cubes without a date column (and a
/// missing measure) fall back to `sales.date`.
#[must_use]
pub fn time_dimension_for(measure: Option<&str>) -> &'static str {
    measure
        .and_then(|m| cube(cube_of(m)))
        .and_then(|c| c.time_dimension)
        .unwrap_or(sales::DATE)
}

/// Whether `member` is a known measure or dimension.
#[must_use]
pub fn is_known_member(member: &str) -> bool {
    cube(cube_of(member)).is_some_and(|c| {
        c.measures
            .iter()
            .chain(c.dimensions)
            .any(|m| m.name == member)
    })
}

/// Metadata document in the shape returned by the Cube `meta` endpoint.
#[must_use]
pub fn metadata() -> Value {
    let cubes: Vec<Value> = CUBES.iter().map(cube_metadata).collect();
    json!({ "cubes": cubes })
}

fn cube_metadata(cube: &CubeSpec) -> Value {
    let members = |specs: &[MemberSpec]| -> Vec<Value> {
        specs
            .iter()
            .map(|m| json!({ "name": m.name, "title": m.title, "type": m.kind }))
            .collect()
    };
    json!({
        "name": cube.name,
        "title": cube.title,
        "measures": members(cube.measures),
        "dimensions": members(cube.dimensions),
    })
}

// =============================================================================
// TESTS
// =============================================================================
