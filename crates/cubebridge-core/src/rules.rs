//! # Rule Tables
//!
//! Declarative trigger tables driving the query compiler.
//!
//! Every table is evaluated in declaration order against the lower-cased,
//! trimmed question text. Matching is plain substring containment.
//!
//! | Table | Effect | Matching |
//! |-------|--------|----------|
//! | `METRIC_RULES` | append measure | every match applies |
//! | `DIMENSION_RULES` | append dimension | every match applies |
//! | `TIME_GRAIN_RULES` | set the time grain | first match wins |
//! | `RANKING_RULES` | sort by first measure | first match wins |
//! | `LIMIT_RULES` | set the row limit | first match wins |
//! | `DEFAULT_RULES` | replace an empty query | first match wins |

use crate::types::{Granularity, SortDirection};
use crate::vocabulary::{cities, customers, sales};

// =============================================================================
// TRIGGER
// =============================================================================

/// A phrase predicate over question text.
///
/// Matches when any `any` phrase occurs, every `also` group is satisfied by
/// at least one of its phrases, and no `unless` phrase occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub any: &'static [&'static str],
    pub also: &'static [&'static str],
    pub unless: &'static [&'static str],
}

impl Trigger {
    /// Matches when any of `phrases` occurs.
    #[must_use]
    pub const fn any(phrases: &'static [&'static str]) -> Self {
        Self {
            any: phrases,
            also: &[],
            unless: &[],
        }
    }

    /// Additionally require one of `phrases`.
    #[must_use]
    pub const fn and(self, phrases: &'static [&'static str]) -> Self {
        Self {
            also: phrases,
            ..self
        }
    }

    /// Suppress the trigger when any of `phrases` occurs.
    #[must_use]
    pub const fn unless(self, phrases: &'static [&'static str]) -> Self {
        Self {
            unless: phrases,
            ..self
        }
    }

    /// Evaluate against already-normalized text.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        contains_any(text, self.any)
            && (self.also.is_empty() || contains_any(text, self.also))
            && !contains_any(text, self.unless)
    }
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

// =============================================================================
// RULE SHAPES
// =============================================================================

/// Appends `member` to the query when `trigger` matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRule {
    pub trigger: Trigger,
    pub member: &'static str,
}

/// Sets a time grain when any phrase occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrainRule {
    pub phrases: &'static [&'static str],
    pub granularity: Granularity,
}

/// Sorts by the first measure when any phrase occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingRule {
    pub phrases: &'static [&'static str],
    pub direction: SortDirection,
}

/// Sets the row limit when any phrase occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitRule {
    pub phrases: &'static [&'static str],
    pub limit: u32,
}

/// Query used when no measure or dimension was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultRule {
    pub trigger: Trigger,
    pub measure: &'static str,
    pub dimension: &'static str,
    pub order: Option<SortDirection>,
    pub limit: u32,
}

impl GrainRule {
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        contains_any(text, self.phrases)
    }
}

impl RankingRule {
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        contains_any(text, self.phrases)
    }
}

impl LimitRule {
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        contains_any(text, self.phrases)
    }
}

const fn rule(trigger: Trigger, member: &'static str) -> MemberRule {
    MemberRule { trigger, member }
}

const CUSTOMER_OR_SALES: &[&str] = &["customer", "sales"];

// =============================================================================
// TABLES
// =============================================================================

pub static METRIC_RULES: &[MemberRule] = &[
    rule(
        Trigger::any(&["population", "people", "residents"]),
        cities::TOTAL_POPULATION,
    ),
    rule(
        Trigger::any(&["count", "number", "how many"]).and(&["cities", "city"]),
        cities::COUNT,
    ),
    rule(
        Trigger::any(&["revenue", "sales", "income", "money"]),
        sales::TOTAL_REVENUE,
    ),
    rule(
        Trigger::any(&["order", "average order", "aov"]),
        sales::AVERAGE_ORDER_VALUE,
    ),
    rule(
        Trigger::any(&["quantity", "volume", "units"]),
        sales::TOTAL_QUANTITY,
    ),
    rule(
        Trigger::any(&["discount", "discounts"]),
        sales::TOTAL_DISCOUNT_AMOUNT,
    ),
    rule(
        Trigger::any(&["customer", "customers"]).and(&["count", "number"]),
        customers::COUNT,
    ),
    rule(
        Trigger::any(&["lifetime value", "ltv", "customer value"]),
        customers::AVERAGE_LIFETIME_VALUE,
    ),
    rule(
        Trigger::any(&["credit score", "credit"]),
        customers::AVERAGE_CREDIT_SCORE,
    ),
];

pub static DIMENSION_RULES: &[MemberRule] = &[
    rule(
        Trigger::any(&["city"]).and(&["name", "cities"]),
        cities::CITY_NAME,
    ),
    rule(
        Trigger::any(&["state"]).unless(CUSTOMER_OR_SALES),
        cities::STATE_NAME,
    ),
    rule(
        Trigger::any(&["region"]).unless(CUSTOMER_OR_SALES),
        cities::REGION,
    ),
    rule(
        Trigger::any(&["category", "product"]),
        sales::PRODUCT_CATEGORY,
    ),
    rule(Trigger::any(&["channel", "channels"]), sales::CHANNEL),
    rule(
        Trigger::any(&["payment", "payment method"]),
        sales::PAYMENT_METHOD,
    ),
    rule(
        Trigger::any(&["discount tier", "discount level"]),
        sales::DISCOUNT_TIER,
    ),
    rule(
        Trigger::any(&["customer type", "customer segment"]),
        customers::CUSTOMER_TYPE,
    ),
    rule(
        Trigger::any(&["credit score tier", "credit tier"]),
        customers::CREDIT_SCORE_TIER,
    ),
];

pub static TIME_GRAIN_RULES: &[GrainRule] = &[
    GrainRule {
        phrases: &["monthly", "per month", "by month", "each month"],
        granularity: Granularity::Month,
    },
    GrainRule {
        phrases: &["daily", "per day", "by day", "each day"],
        granularity: Granularity::Day,
    },
    GrainRule {
        phrases: &["yearly", "annual", "per year", "by year"],
        granularity: Granularity::Year,
    },
    GrainRule {
        phrases: &["weekly", "per week", "by week"],
        granularity: Granularity::Week,
    },
];

pub static RANKING_RULES: &[RankingRule] = &[
    RankingRule {
        phrases: &["top", "highest", "largest"],
        direction: SortDirection::Desc,
    },
    RankingRule {
        phrases: &["bottom", "lowest", "smallest"],
        direction: SortDirection::Asc,
    },
];

pub static LIMIT_RULES: &[LimitRule] = &[
    LimitRule {
        phrases: &["top 10", "top ten"],
        limit: 10,
    },
    LimitRule {
        phrases: &["top 5", "top five"],
        limit: 5,
    },
    LimitRule {
        phrases: &["top 3", "top three"],
        limit: 3,
    },
];

pub static DEFAULT_RULES: &[DefaultRule] = &[
    DefaultRule {
        trigger: Trigger::any(&["sales", "revenue", "product", "category"]),
        measure: sales::TOTAL_REVENUE,
        dimension: sales::PRODUCT_CATEGORY,
        order: Some(SortDirection::Desc),
        limit: 5,
    },
    DefaultRule {
        trigger: Trigger::any(&["customer", "customers", "client"]),
        measure: customers::COUNT,
        dimension: customers::CUSTOMER_TYPE,
        order: None,
        limit: 5,
    },
];

/// Applied when no `DEFAULT_RULES` entry matches.
pub static FALLBACK_DEFAULT: DefaultRule = DefaultRule {
    trigger: Trigger::any(&[]),
    measure: cities::COUNT,
    dimension: cities::CITY_NAME,
    order: None,
    limit: 5,
};

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_suppresses_trigger() {
        let state = Trigger::any(&["state"]).unless(CUSTOMER_OR_SALES);
        assert!(state.matches("population by state"));
        assert!(!state.matches("sales by state"));
        assert!(!state.matches("customers by state"));
    }

    #[test]
    fn conjunction_requires_both_groups() {
        let count = Trigger::any(&["count", "number"]).and(&["city", "cities"]);
        assert!(count.matches("count of cities"));
        assert!(!count.matches("count of orders"));
        assert!(!count.matches("list cities"));
    }

    #[test]
    fn empty_trigger_never_matches() {
        assert!(!FALLBACK_DEFAULT.trigger.matches("anything"));
        assert!(!FALLBACK_DEFAULT.trigger.matches(""));
    }

    #[test]
    fn longer_limit_phrases_checked_first() {
        // A later phrase containing an earlier one could never win.
        for (i, earlier) in LIMIT_RULES.iter().enumerate() {
            for later in &LIMIT_RULES[i + 1..] {
                for phrase in later.phrases {
                    assert!(
                        !earlier.phrases.iter().any(|e| phrase.contains(e)),
                        "{phrase} shadowed"
                    );
                }
            }
        }
    }

    #[test]
    fn every_table_member_is_known() {
        for r in METRIC_RULES.iter().chain(DIMENSION_RULES) {
            assert!(crate::vocabulary::is_known_member(r.member), "{}", r.member);
        }
    }
}
