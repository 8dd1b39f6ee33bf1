//! Residue factor records and the alias-aware lookup table.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use cal_bioscape_siting_models::ResidueCategory;
use serde::{Deserialize, Serialize};

use crate::ResidueError;

/// Number of embedded residue factor records. Enforced by a test.
#[cfg(test)]
const EXPECTED_FACTOR_COUNT: usize = 67;

/// Number of embedded raw crop name aliases. Enforced by a test.
#[cfg(test)]
const EXPECTED_ALIAS_COUNT: usize = 64;

const FACTORS_TOML: &str = include_str!("../data/residue_factors.toml");
const ALIASES_TOML: &str = include_str!("../data/crop_aliases.toml");

static BUILTIN: LazyLock<ResidueTable> = LazyLock::new(|| {
    ResidueTable::from_toml_str(FACTORS_TOML, ALIASES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded residue tables: {e}"))
});

/// Per-acre residue yield for one canonical crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidueFactor {
    /// Canonical residue name (e.g. "Almonds").
    pub name: String,
    /// Residue family.
    pub category: ResidueCategory,
    /// Residue form (e.g. "Prunings", "Stover"); may be empty.
    #[serde(default)]
    pub residue_type: String,
    /// Wet tons of residue per acre.
    pub wet_tons_per_acre: f64,
    /// Wet-basis moisture fraction.
    pub moisture_content: f64,
    /// Dry tons of residue per acre.
    pub dry_tons_per_acre: f64,
}

/// Residue tonnage estimated for an acreage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidueEstimate {
    /// Rounded dry tons.
    pub dry_tons: u64,
    /// Rounded wet tons.
    pub wet_tons: u64,
}

impl ResidueFactor {
    /// Estimates rounded dry and wet tonnage for `acres`.
    #[must_use]
    pub fn estimate(&self, acres: f64) -> ResidueEstimate {
        ResidueEstimate {
            dry_tons: round_tons(acres * self.dry_tons_per_acre),
            wet_tons: round_tons(acres * self.wet_tons_per_acre),
        }
    }

    fn validate(&self) -> Result<(), ResidueError> {
        let checks = [
            ("wet_tons_per_acre", self.wet_tons_per_acre),
            ("dry_tons_per_acre", self.dry_tons_per_acre),
            ("moisture_content", self.moisture_content),
        ];
        for (field, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(ResidueError::InvalidFactor {
                    name: self.name.clone(),
                    field,
                    value,
                });
            }
        }
        if self.moisture_content >= 1.0 {
            return Err(ResidueError::InvalidFactor {
                name: self.name.clone(),
                field: "moisture_content",
                value: self.moisture_content,
            });
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_tons(tons: f64) -> u64 {
    if tons.is_finite() && tons > 0.0 {
        tons.round() as u64
    } else {
        0
    }
}

#[derive(Deserialize)]
struct FactorsFile {
    factor: Vec<ResidueFactor>,
}

#[derive(Deserialize)]
struct AliasesFile {
    aliases: BTreeMap<String, String>,
}

/// Residue factors keyed by canonical name, plus the raw-name alias table.
#[derive(Debug, Clone, Default)]
pub struct ResidueTable {
    factors: BTreeMap<String, ResidueFactor>,
    aliases: BTreeMap<String, String>,
}

impl ResidueTable {
    /// The tables embedded in this crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML fails to parse or validate. Since these
    /// are compile-time constants, failures indicate a development error
    /// and are caught by the tests in this module.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Parses a factor table (`[[factor]]` records) and an alias table
    /// (`[aliases]` map of raw name to canonical name).
    ///
    /// # Errors
    ///
    /// Returns an error if either document fails to parse, a canonical name
    /// is repeated, a factor holds a negative/non-finite value, or an alias
    /// points at a missing canonical name.
    pub fn from_toml_str(factors_toml: &str, aliases_toml: &str) -> Result<Self, ResidueError> {
        let factors_file: FactorsFile = toml::de::from_str(factors_toml)?;
        let aliases_file: AliasesFile = toml::de::from_str(aliases_toml)?;
        Self::new(factors_file.factor, aliases_file.aliases)
    }

    /// Builds a table from already-parsed records.
    ///
    /// # Errors
    ///
    /// See [`ResidueTable::from_toml_str`].
    pub fn new(
        records: Vec<ResidueFactor>,
        aliases: BTreeMap<String, String>,
    ) -> Result<Self, ResidueError> {
        let mut factors = BTreeMap::new();
        for record in records {
            record.validate()?;
            if factors.contains_key(&record.name) {
                return Err(ResidueError::DuplicateFactor { name: record.name });
            }
            factors.insert(record.name.clone(), record);
        }

        for (alias, target) in &aliases {
            if !factors.contains_key(target) {
                return Err(ResidueError::UnknownAliasTarget {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }

        log::debug!(
            "Loaded {} residue factors and {} crop aliases",
            factors.len(),
            aliases.len()
        );

        Ok(Self { factors, aliases })
    }

    /// Canonical residue name for a raw crop name (exact match).
    #[must_use]
    pub fn canonical_name(&self, raw_crop: &str) -> Option<&str> {
        self.aliases.get(raw_crop).map(String::as_str)
    }

    /// Residue factors for a raw crop name, or `None` when the crop has no
    /// mapping.
    #[must_use]
    pub fn lookup(&self, raw_crop: &str) -> Option<&ResidueFactor> {
        self.canonical_name(raw_crop)
            .and_then(|name| self.factors.get(name))
    }

    /// Residue factors by canonical name.
    #[must_use]
    pub fn factor(&self, canonical: &str) -> Option<&ResidueFactor> {
        self.factors.get(canonical)
    }

    /// Estimated tonnage for `acres` of a raw crop name.
    #[must_use]
    pub fn estimate(&self, raw_crop: &str, acres: f64) -> Option<ResidueEstimate> {
        self.lookup(raw_crop).map(|factor| factor.estimate(acres))
    }

    /// All factor records in canonical-name order.
    pub fn factors(&self) -> impl Iterator<Item = &ResidueFactor> {
        self.factors.values()
    }

    /// All `(raw name, canonical name)` alias pairs.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
    }

    /// Number of factor records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Whether the table has no factor records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_factors() {
        let table = ResidueTable::builtin();
        assert_eq!(
            table.len(),
            EXPECTED_FACTOR_COUNT,
            "Expected {EXPECTED_FACTOR_COUNT} residue factors, found {}. \
             Update EXPECTED_FACTOR_COUNT after adding/removing records.",
            table.len()
        );
    }

    #[test]
    fn loads_all_aliases() {
        let count = ResidueTable::builtin().aliases().count();
        assert_eq!(
            count, EXPECTED_ALIAS_COUNT,
            "Expected {EXPECTED_ALIAS_COUNT} crop aliases, found {count}"
        );
    }

    #[test]
    fn every_alias_resolves() {
        let table = ResidueTable::builtin();
        for (alias, target) in table.aliases() {
            assert!(
                table.lookup(alias).is_some(),
                "Alias {alias} -> {target} does not resolve"
            );
        }
    }

    #[test]
    fn category_counts_match_source_tables() {
        let table = ResidueTable::builtin();
        let count = |category| table.factors().filter(|f| f.category == category).count();
        assert_eq!(count(ResidueCategory::OrchardVineyard), 21);
        assert_eq!(count(ResidueCategory::RowCrop), 28);
        assert_eq!(count(ResidueCategory::FieldCrop), 18);
    }

    #[test]
    fn orchard_crops_are_prunings() {
        for factor in ResidueTable::builtin().factors() {
            if factor.category == ResidueCategory::OrchardVineyard {
                assert_eq!(factor.residue_type, "Prunings", "{}", factor.name);
            }
        }
    }

    #[test]
    fn dry_yield_never_exceeds_wet_yield() {
        for factor in ResidueTable::builtin().factors() {
            assert!(
                factor.dry_tons_per_acre <= factor.wet_tons_per_acre,
                "{} has dry {} > wet {}",
                factor.name,
                factor.dry_tons_per_acre,
                factor.wet_tons_per_acre
            );
        }
    }

    #[test]
    fn looks_up_almonds() {
        let almonds = ResidueTable::builtin().lookup("Almonds").unwrap();
        assert_eq!(almonds.category, ResidueCategory::OrchardVineyard);
        assert!((almonds.dry_tons_per_acre - 1.5).abs() < f64::EPSILON);
        assert!((almonds.wet_tons_per_acre - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn many_raw_names_share_a_record() {
        let table = ResidueTable::builtin();
        assert_eq!(table.canonical_name("Plums"), Some("Plums & Prunes"));
        assert_eq!(table.canonical_name("Prunes"), Some("Plums & Prunes"));
        assert_eq!(table.canonical_name("Rice"), Some("Rice"));
        assert_eq!(table.canonical_name("Wild Rice"), Some("Rice"));
        assert_eq!(table.canonical_name("Kiwis"), Some("Kiwifruit"));
    }

    #[test]
    fn lookup_is_exact_match() {
        let table = ResidueTable::builtin();
        assert!(table.lookup("almonds").is_none());
        assert!(table.lookup(" Almonds").is_none());
    }

    #[test]
    fn unmapped_crops_return_none() {
        let table = ResidueTable::builtin();
        assert!(table.lookup("Turf Farms").is_none());
        assert!(table.lookup("Unknown").is_none());
        assert!(table.estimate("Greenhouse", 10.0).is_none());
    }

    #[test]
    fn estimates_round_tonnage() {
        let table = ResidueTable::builtin();
        assert_eq!(
            table.estimate("Almonds", 100.0),
            Some(ResidueEstimate {
                dry_tons: 150,
                wet_tons: 250,
            })
        );
        // 25.3 acres of rice: 40.48 dry, 45.54 wet
        assert_eq!(
            table.estimate("Rice", 25.3),
            Some(ResidueEstimate {
                dry_tons: 40,
                wet_tons: 46,
            })
        );
    }

    #[test]
    fn rejects_alias_to_unknown_factor() {
        let factors = r#"
            [[factor]]
            name = "Rice"
            category = "field_crop"
            residue_type = "Straw"
            wet_tons_per_acre = 1.8
            moisture_content = 0.14
            dry_tons_per_acre = 1.6
        "#;
        let aliases = r#"
            [aliases]
            "Wild Rice" = "Paddy"
        "#;
        assert!(matches!(
            ResidueTable::from_toml_str(factors, aliases),
            Err(ResidueError::UnknownAliasTarget { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_and_negative_factors() {
        let duplicate = r#"
            [[factor]]
            name = "Rice"
            category = "field_crop"
            wet_tons_per_acre = 1.8
            moisture_content = 0.14
            dry_tons_per_acre = 1.6

            [[factor]]
            name = "Rice"
            category = "field_crop"
            wet_tons_per_acre = 1.8
            moisture_content = 0.14
            dry_tons_per_acre = 1.6
        "#;
        assert!(matches!(
            ResidueTable::from_toml_str(duplicate, "[aliases]"),
            Err(ResidueError::DuplicateFactor { .. })
        ));

        let negative = r#"
            [[factor]]
            name = "Rice"
            category = "field_crop"
            wet_tons_per_acre = -1.0
            moisture_content = 0.14
            dry_tons_per_acre = 1.6
        "#;
        assert!(matches!(
            ResidueTable::from_toml_str(negative, "[aliases]"),
            Err(ResidueError::InvalidFactor {
                field: "wet_tons_per_acre",
                ..
            })
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            ResidueTable::from_toml_str("[[factor]\nname = ", "[aliases]"),
            Err(ResidueError::Toml(_))
        ));
    }
}
