//! Alias catalog: which source columns can mean which canonical field.
//!
//! The catalog is pure data. Each supported source CRM is one JSON file under
//! `backend/catalog/`, embedded into the binary at compile time and parsed
//! once at startup. Adding a new source system is a data addition, never a
//! code change. The engine only ever reads the catalog.

use std::collections::HashMap;

use include_dir::{include_dir, Dir};
use serde::Deserialize;

use common::model::entity::EntityKind;
use common::model::source_system::SourceSystemInfo;

static CATALOG_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/catalog");

/// Canonical field name -> ordered candidate source column names.
/// Candidates are matched case-insensitively, first match wins.
pub type AliasTable = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Deserialize)]
struct SourceSystemProfile {
    key: String,
    display_name: String,
    has_direct_api: bool,
    export_instructions: String,
    /// entity name ("contact" | "job" | "invoice") -> alias table
    aliases: HashMap<String, AliasTable>,
}

/// All source-system profiles, keyed by their catalog key.
#[derive(Debug, Clone)]
pub struct AliasCatalog {
    systems: HashMap<String, SourceSystemProfile>,
}

impl AliasCatalog {
    /// Parses every embedded catalog file. Called once at startup; a broken
    /// catalog file is a build artifact problem, so this is allowed to fail
    /// the boot.
    pub fn load() -> Result<AliasCatalog, serde_json::Error> {
        let mut systems = HashMap::new();
        for file in CATALOG_DIR.files() {
            if file.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let profile: SourceSystemProfile = serde_json::from_slice(file.contents())?;
            systems.insert(profile.key.clone(), profile);
        }
        Ok(AliasCatalog { systems })
    }

    /// The alias table for one (source system, entity) pair, or `None` when
    /// the source system is unknown or has no table for that entity.
    pub fn lookup(&self, source_system: &str, entity: EntityKind) -> Option<&AliasTable> {
        self.systems
            .get(source_system)?
            .aliases
            .get(entity.as_str())
    }

    /// Display metadata for every supported source system, sorted by key.
    pub fn source_systems(&self) -> Vec<SourceSystemInfo> {
        let mut infos: Vec<SourceSystemInfo> = self
            .systems
            .values()
            .map(|p| SourceSystemInfo {
                key: p.key.clone(),
                display_name: p.display_name.clone(),
                has_direct_api: p.has_direct_api,
                export_instructions: p.export_instructions.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_embedded_catalog() {
        let catalog = AliasCatalog::load().unwrap();
        let systems = catalog.source_systems();
        assert!(systems.len() >= 5);
        assert!(systems.iter().any(|s| s.key == "jobber"));
        // sorted by key
        let keys: Vec<&str> = systems.iter().map(|s| s.key.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn every_system_covers_all_three_entities() {
        let catalog = AliasCatalog::load().unwrap();
        for info in catalog.source_systems() {
            for entity in [EntityKind::Contact, EntityKind::Job, EntityKind::Invoice] {
                assert!(
                    catalog.lookup(&info.key, entity).is_some(),
                    "{} missing alias table for {}",
                    info.key,
                    entity.as_str()
                );
            }
        }
    }

    #[test]
    fn unknown_system_is_none() {
        let catalog = AliasCatalog::load().unwrap();
        assert!(catalog.lookup("hubspot", EntityKind::Contact).is_none());
    }
}
