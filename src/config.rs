//! Weapon catalog and run configuration, loaded from YAML or JSON

use crate::error::{Result, SimError};
use crate::model::{validate_skill, ModelConstants};
use crate::simulation::EvalOptions;
use crate::weapon::WeaponProfile;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Damage per hit at one catalog distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamagePoint {
    pub distance: f64,
    pub damage: f64,
}

/// One catalog entry.
///
/// ```json
/// { "category": "AR", "control": 50, "precision": 60, "rpm": 750,
///   "damage": { "10": 25, "30": 22, "50": 20 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    #[serde(default)]
    pub category: String,
    pub control: f64,
    pub precision: f64,
    pub rpm: f64,
    /// Sorted by distance, no duplicates.
    #[serde(with = "damage_table")]
    pub damage: Vec<DamagePoint>,
}

impl WeaponSpec {
    pub fn distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.damage.iter().map(|p| p.distance)
    }

    pub fn damage_at(&self, distance: f64) -> Option<f64> {
        self.damage.iter().find(|p| p.distance == distance).map(|p| p.damage)
    }

    /// Resolve one damage point into a validated profile.
    pub fn profile_for(&self, point: &DamagePoint, target: &TargetSpec) -> Result<WeaponProfile> {
        let profile = WeaponProfile {
            health: target.health,
            damage_per_hit: point.damage,
            rpm: self.rpm,
            distance: point.distance,
            target_radius: target.radius,
            precision: self.precision,
            control: self.control,
        };
        profile.validate()?;
        Ok(profile)
    }
}

/// The target every weapon is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    pub health: f64,
    /// Effective hit radius, same unit as catalog distances.
    pub radius: f64,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            health: WeaponProfile::DEFAULT_HEALTH,
            radius: WeaponProfile::DEFAULT_TARGET_RADIUS,
        }
    }
}

impl TargetSpec {
    pub fn validate(&self) -> Result<()> {
        if !(self.health.is_finite() && self.health > 0.0) {
            return Err(SimError::InvalidHealth(self.health));
        }
        if !(self.radius.is_finite() && self.radius >= 0.0) {
            return Err(SimError::InvalidTargetRadius(self.radius));
        }
        Ok(())
    }
}

/// Weapon name → spec, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeaponCatalog {
    weapons: BTreeMap<String, WeaponSpec>,
}

impl WeaponCatalog {
    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        if is_json(path.as_ref()) {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: WeaponSpec) {
        self.weapons.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Result<&WeaponSpec> {
        self.weapons
            .get(name)
            .ok_or_else(|| SimError::UnknownWeapon(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WeaponSpec)> {
        self.weapons.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.weapons.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    /// Resolve a (weapon, distance) pair into a profile.
    pub fn profile(&self, name: &str, distance: f64, target: &TargetSpec) -> Result<WeaponProfile> {
        let spec = self.get(name)?;
        let point = spec
            .damage
            .iter()
            .find(|p| p.distance == distance)
            .ok_or_else(|| SimError::UnknownDistance {
                weapon: name.to_string(),
                distance,
            })?;
        spec.profile_for(point, target)
    }
}

/// Everything a catalog run needs besides the catalog itself.
///
/// Supports both flat overrides and full files:
/// ```yaml
/// skill: 0.12
/// options: { trials: 400, seed: 42 }
/// constants: { alpha_max: 0.95 }
/// target: { health: 150 }
/// weapons: [AK-47, MP5]
/// distances: [10, 50]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Player aim jitter (deg).
    pub skill: f64,
    pub options: EvalOptions,
    pub constants: ModelConstants,
    pub target: TargetSpec,
    /// Weapons to evaluate; empty means all.
    pub weapons: Vec<String>,
    /// Distances to evaluate; empty means every catalog distance.
    pub distances: Vec<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            skill: 0.1,
            options: EvalOptions::default(),
            constants: ModelConstants::default(),
            target: TargetSpec::default(),
            weapons: Vec::new(),
            distances: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: RunConfig = if is_json(path.as_ref()) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Whether `name` is selected; an empty weapon list selects everything.
    pub fn includes_weapon(&self, name: &str) -> bool {
        self.weapons.is_empty() || self.weapons.iter().any(|w| w == name)
    }

    /// Whether catalog distance `distance` is selected; an empty list
    /// selects every distance.
    pub fn includes_distance(&self, distance: f64) -> bool {
        self.distances.is_empty() || self.distances.contains(&distance)
    }

    pub fn validate(&self) -> Result<()> {
        validate_skill(self.skill)?;
        self.options.validate()?;
        self.constants.validate()?;
        self.target.validate()
    }
}

fn is_json(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(".json")
}

/// Serde adapter for `{ distance: damage }` maps. Keys may be numeric
/// strings (JSON) or plain numbers (YAML).
mod damage_table {
    use super::*;

    struct DistanceKey(f64);

    impl<'de> Deserialize<'de> for DistanceKey {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct KeyVisitor;

            impl<'de> Visitor<'de> for KeyVisitor {
                type Value = DistanceKey;

                fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str("a distance in metres")
                }

                fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<DistanceKey, E> {
                    v.trim()
                        .parse::<f64>()
                        .map(DistanceKey)
                        .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
                }

                fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<DistanceKey, E> {
                    Ok(DistanceKey(v as f64))
                }

                fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<DistanceKey, E> {
                    Ok(DistanceKey(v as f64))
                }

                fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<DistanceKey, E> {
                    Ok(DistanceKey(v))
                }
            }

            deserializer.deserialize_any(KeyVisitor)
        }
    }

    struct TableVisitor;

    impl<'de> Visitor<'de> for TableVisitor {
        type Value = Vec<DamagePoint>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map from distance to damage per hit")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut points = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((DistanceKey(distance), damage)) = map.next_entry::<DistanceKey, f64>()? {
                points.push(DamagePoint { distance, damage });
            }
            points.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            points.dedup_by(|a, b| a.distance == b.distance);
            Ok(points)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<DamagePoint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(TableVisitor)
    }

    pub fn serialize<S>(points: &[DamagePoint], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(points.iter().map(|p| (p.distance.to_string(), p.damage)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_JSON: &str = r#"{
        "AK-47": { "category": "AR", "control": 40, "precision": 55, "rpm": 600,
                   "damage": { "50": 25, "10": 30, "30": 27.5 } },
        "MP5":   { "category": "SMG", "control": 60, "precision": 45, "rpm": 800,
                   "damage": { "10": 22, "25.5": 18 } }
    }"#;

    #[test]
    fn test_parse_json_catalog() {
        let catalog = WeaponCatalog::from_json(CATALOG_JSON).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["AK-47", "MP5"]);

        let ak = catalog.get("AK-47").unwrap();
        assert_eq!(ak.distances().collect::<Vec<_>>(), vec![10.0, 30.0, 50.0]);
        assert_eq!(ak.damage_at(30.0), Some(27.5));
        assert_eq!(ak.damage_at(20.0), None);

        let mp5 = catalog.get("MP5").unwrap();
        assert_eq!(mp5.damage_at(25.5), Some(18.0));
    }

    #[test]
    fn test_parse_yaml_catalog_with_numeric_keys() {
        let yaml = "\
AK-47:
  category: AR
  control: 40
  precision: 55
  rpm: 600
  damage:
    10: 30
    50: 25
";
        let catalog = WeaponCatalog::from_yaml(yaml).unwrap();
        let ak = catalog.get("AK-47").unwrap();
        assert_eq!(ak.distances().collect::<Vec<_>>(), vec![10.0, 50.0]);
    }

    #[test]
    fn test_bad_distance_key_rejected() {
        let json = r#"{ "X": { "control": 1, "precision": 1, "rpm": 1, "damage": { "far": 10 } } }"#;
        assert!(matches!(WeaponCatalog::from_json(json), Err(SimError::Json(_))));
    }

    #[test]
    fn test_resolve_profile() {
        let catalog = WeaponCatalog::from_json(CATALOG_JSON).unwrap();
        let target = TargetSpec::default();
        let p = catalog.profile("AK-47", 50.0, &target).unwrap();
        assert_eq!(p.damage_per_hit, 25.0);
        assert_eq!(p.rpm, 600.0);
        assert_eq!(p.health, 100.0);
        assert_eq!(p.target_radius, 0.17);

        assert!(matches!(
            catalog.profile("AK-47", 20.0, &target),
            Err(SimError::UnknownDistance { .. })
        ));
        assert!(matches!(
            catalog.profile("M4", 10.0, &target),
            Err(SimError::UnknownWeapon(_))
        ));
    }

    #[test]
    fn test_zero_damage_entry_rejected_at_resolution() {
        let json = r#"{ "X": { "control": 30, "precision": 30, "rpm": 600, "damage": { "10": 0 } } }"#;
        let catalog = WeaponCatalog::from_json(json).unwrap();
        assert!(matches!(
            catalog.profile("X", 10.0, &TargetSpec::default()),
            Err(SimError::InvalidDamage(_))
        ));
    }

    #[test]
    fn test_catalog_round_trips_through_json() {
        let catalog = WeaponCatalog::from_json(CATALOG_JSON).unwrap();
        let json = serde_json::to_string(&catalog).unwrap();
        assert_eq!(WeaponCatalog::from_json(&json).unwrap(), catalog);
    }

    #[test]
    fn test_run_config_defaults_and_overrides() {
        let run: RunConfig = serde_yaml::from_str("skill: 0.2\noptions:\n  trials: 400\n  seed: 42\n").unwrap();
        assert_eq!(run.skill, 0.2);
        assert_eq!(run.options.trials, 400);
        assert_eq!(run.options.seed, Some(42));
        assert_eq!(run.options.sample_count, 800);
        assert_eq!(run.target, TargetSpec::default());
        assert!(run.validate().is_ok());

        let bad = RunConfig {
            skill: -1.0,
            ..RunConfig::default()
        };
        assert!(matches!(bad.validate(), Err(SimError::InvalidSkill(_))));
    }

    #[test]
    fn test_run_selection_filters() {
        let all = RunConfig::default();
        assert!(all.includes_weapon("AK-47"));
        assert!(all.includes_distance(25.5));

        let run: RunConfig = serde_yaml::from_str("weapons: [MP5]\ndistances: [10, 25.5]\n").unwrap();
        assert!(run.includes_weapon("MP5"));
        assert!(!run.includes_weapon("AK-47"));
        assert!(run.includes_distance(10.0));
        assert!(run.includes_distance(25.5));
        assert!(!run.includes_distance(30.0));

        let catalog = WeaponCatalog::from_json(CATALOG_JSON).unwrap();
        let selected: Vec<f64> = catalog
            .get("AK-47")
            .unwrap()
            .distances()
            .filter(|&d| run.includes_distance(d))
            .collect();
        assert_eq!(selected, vec![10.0]);
    }

    #[test]
    fn test_from_file_picks_format_by_extension() {
        let dir = std::env::temp_dir();
        let json_path = dir.join(format!("ttk_sim_catalog_{}.json", std::process::id()));
        fs::write(&json_path, CATALOG_JSON).unwrap();
        let catalog = WeaponCatalog::from_file(&json_path).unwrap();
        assert_eq!(catalog.len(), 2);
        fs::remove_file(&json_path).unwrap();

        let missing = dir.join("ttk_sim_definitely_missing.yaml");
        assert!(matches!(WeaponCatalog::from_file(missing), Err(SimError::Io(_))));
    }
}
