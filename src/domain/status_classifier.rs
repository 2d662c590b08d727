//! Availability text → [`StockStatus`] decision table
//!
//! Rules are evaluated top-to-bottom and the first match wins. Unavailability
//! comes first: pages often render a disabled "Add to Cart" button next to a
//! "Currently unavailable" notice.

use crate::domain::product::StockStatus;

/// One row of the decision table: matches if the fragment contains any needle
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub needles: &'static [&'static str],
    pub status: StockStatus,
}

impl ClassificationRule {
    fn matches(&self, fragment: &str) -> bool {
        self.needles.iter().any(|needle| fragment.contains(needle))
    }
}

pub const DEFAULT_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        needles: &["currently unavailable"],
        status: StockStatus::OutOfStock,
    },
    ClassificationRule {
        needles: &["in stock", "add to cart"],
        status: StockStatus::InStock,
    },
];

/// Status assigned when no rule matches, including the empty fragment
pub const FALLBACK_STATUS: StockStatus = StockStatus::CheckManually;

#[derive(Debug, Clone, Copy)]
pub struct StatusClassifier {
    rules: &'static [ClassificationRule],
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self { rules: DEFAULT_RULES }
    }
}

impl StatusClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn rules(&self) -> &'static [ClassificationRule] {
        self.rules
    }

    pub fn classify(&self, fragment: &str) -> StockStatus {
        let fragment = fragment.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&fragment))
            .map_or(FALLBACK_STATUS, |rule| rule.status)
    }
}
