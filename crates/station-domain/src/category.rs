//! Expenditure categories and their legal subcategories.

use std::{collections::HashMap, fmt};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Closed set of expenditure categories recognised by the dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ExpenditureCategory {
    Kitchen,
    General,
    GeneratorDieselLube,
    Salary,
    PremisesRent,
    PettyCash,
    Allowances,
    InterStationLoan,
    MachineryRepair,
    PersonalLoan,
    Other,
}

static ALIASES: Lazy<HashMap<&'static str, ExpenditureCategory>> = Lazy::new(|| {
    use ExpenditureCategory::*;

    let mut map = HashMap::new();
    for category in ExpenditureCategory::ALL {
        map.insert(category.tag(), category);
    }
    for (alias, category) in [
        ("diesel", GeneratorDieselLube),
        ("generator", GeneratorDieselLube),
        ("lube", GeneratorDieselLube),
        ("generator/diesel/lube", GeneratorDieselLube),
        ("rent", PremisesRent),
        ("premises", PremisesRent),
        ("petty", PettyCash),
        ("allowance", Allowances),
        ("loan", PersonalLoan),
        ("personal-loans", PersonalLoan),
        ("inter-station-loans", InterStationLoan),
        ("repair", MachineryRepair),
        ("machinery", MachineryRepair),
    ] {
        map.insert(alias, category);
    }
    map
});

impl ExpenditureCategory {
    pub const ALL: [ExpenditureCategory; 11] = [
        ExpenditureCategory::Kitchen,
        ExpenditureCategory::General,
        ExpenditureCategory::GeneratorDieselLube,
        ExpenditureCategory::Salary,
        ExpenditureCategory::PremisesRent,
        ExpenditureCategory::PettyCash,
        ExpenditureCategory::Allowances,
        ExpenditureCategory::InterStationLoan,
        ExpenditureCategory::MachineryRepair,
        ExpenditureCategory::PersonalLoan,
        ExpenditureCategory::Other,
    ];

    /// Canonical tag stored on expenditure lines.
    pub fn tag(self) -> &'static str {
        match self {
            ExpenditureCategory::Kitchen => "kitchen",
            ExpenditureCategory::General => "general",
            ExpenditureCategory::GeneratorDieselLube => "generator-diesel-lube",
            ExpenditureCategory::Salary => "salary",
            ExpenditureCategory::PremisesRent => "premises-rent",
            ExpenditureCategory::PettyCash => "petty-cash",
            ExpenditureCategory::Allowances => "allowances",
            ExpenditureCategory::InterStationLoan => "inter-station-loan",
            ExpenditureCategory::MachineryRepair => "machinery-repair",
            ExpenditureCategory::PersonalLoan => "personal-loan",
            ExpenditureCategory::Other => "other",
        }
    }

    /// Resolves a stored or user-entered tag, including legacy aliases.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let key = tag.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        ALIASES.get(key.as_str()).copied()
    }

    /// Legal subcategory values, in display order. Empty when the category
    /// takes no subcategory.
    pub fn subcategories(self) -> &'static [&'static str] {
        match self {
            ExpenditureCategory::Kitchen => &["groceries", "utensils", "gas-cylinder", "water"],
            ExpenditureCategory::General => &["stationery", "utilities", "cleaning", "transport"],
            ExpenditureCategory::GeneratorDieselLube => {
                &["diesel", "lube-oil", "filters", "servicing"]
            }
            ExpenditureCategory::Salary => &["advance", "net-pay", "bonus"],
            ExpenditureCategory::Allowances => &["fuel", "mobile", "meal"],
            ExpenditureCategory::MachineryRepair => {
                &["compressor", "dispenser", "generator", "electrical"]
            }
            ExpenditureCategory::PremisesRent
            | ExpenditureCategory::PettyCash
            | ExpenditureCategory::InterStationLoan
            | ExpenditureCategory::PersonalLoan
            | ExpenditureCategory::Other => &[],
        }
    }

    pub fn has_subcategories(self) -> bool {
        !self.subcategories().is_empty()
    }

    /// Returns the table spelling of `subcategory` when it is legal here.
    pub fn canonical_subcategory(self, subcategory: &str) -> Option<&'static str> {
        let wanted = subcategory.trim();
        self.subcategories()
            .iter()
            .copied()
            .find(|legal| legal.eq_ignore_ascii_case(wanted))
    }

    pub fn allows_subcategory(self, subcategory: &str) -> bool {
        self.canonical_subcategory(subcategory).is_some()
    }

    pub fn label(self) -> &'static str {
        match self {
            ExpenditureCategory::Kitchen => "Kitchen",
            ExpenditureCategory::General => "General",
            ExpenditureCategory::GeneratorDieselLube => "Generator / Diesel / Lube",
            ExpenditureCategory::Salary => "Salary",
            ExpenditureCategory::PremisesRent => "Premises Rent",
            ExpenditureCategory::PettyCash => "Petty Cash",
            ExpenditureCategory::Allowances => "Allowances",
            ExpenditureCategory::InterStationLoan => "Inter-Station Loan",
            ExpenditureCategory::MachineryRepair => "Machinery Repair",
            ExpenditureCategory::PersonalLoan => "Personal Loan",
            ExpenditureCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ExpenditureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonicalizes a category tag: known tags and aliases map to the canonical
/// tag, unknown tags are kept trimmed so legacy data still buckets by its own value.
pub fn canonical_category_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(match ExpenditureCategory::from_tag(trimmed) {
        Some(category) => category.tag().to_string(),
        None => trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_tags() {
        assert_eq!(
            ExpenditureCategory::from_tag("Diesel"),
            Some(ExpenditureCategory::GeneratorDieselLube)
        );
        assert_eq!(
            canonical_category_tag(" loan "),
            Some("personal-loan".to_string())
        );
        assert_eq!(canonical_category_tag("fuel-card"), Some("fuel-card".into()));
        assert_eq!(canonical_category_tag("  "), None);
    }

    #[test]
    fn every_category_round_trips_its_tag() {
        for category in ExpenditureCategory::ALL {
            assert_eq!(ExpenditureCategory::from_tag(category.tag()), Some(category));
        }
    }

    #[test]
    fn subcategory_lookup_is_per_category() {
        assert!(ExpenditureCategory::Kitchen.allows_subcategory("Utensils"));
        assert!(!ExpenditureCategory::General.allows_subcategory("utensils"));
        assert!(!ExpenditureCategory::PettyCash.has_subcategories());
    }
}
