//! Source registry: loads disaster source definitions from TOML configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new source is as simple as
//! creating a new TOML file and adding it to the list below. Deployments
//! can also point at a directory of TOML files with [`load_sources_dir`].

use std::path::Path;

use crate::SourceError;
use crate::source_def::{SourceDefinition, parse_source_toml};

/// TOML configs embedded at compile time, one per category.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    ("earthquake", include_str!("../sources/earthquake.toml")),
    ("flood", include_str!("../sources/flood.toml")),
    ("cyclone", include_str!("../sources/cyclone.toml")),
    ("landslide", include_str!("../sources/landslide.toml")),
    ("tsunami", include_str!("../sources/tsunami.toml")),
    ("fire", include_str!("../sources/fire.toml")),
    ("other", include_str!("../sources/other.toml")),
];

/// Total number of configured sources (used in tests).
#[cfg(test)]
const EXPECTED_SOURCE_COUNT: usize = 7;

/// Returns all configured source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Loads every `*.toml` file in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`SourceError`] if the directory cannot be read, a file cannot
/// be parsed, or two files declare the same source id.
pub fn load_sources_dir(dir: &Path) -> Result<Vec<SourceDefinition>, SourceError> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.retain(|p| p.extension().is_some_and(|ext| ext == "toml"));
    paths.sort();

    let mut sources: Vec<SourceDefinition> = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path)?;
        let source = parse_source_toml(&text).map_err(|e| SourceError::Normalization {
            message: format!("{}: {e}", path.display()),
        })?;
        if sources.iter().any(|s| s.id == source.id) {
            return Err(SourceError::Normalization {
                message: format!("{}: duplicate source id '{}'", path.display(), source.id),
            });
        }
        log::debug!("Loaded source '{}' from {}", source.id, path.display());
        sources.push(source);
    }

    log::info!("Loaded {} sources from {}", sources.len(), dir.display());
    Ok(sources)
}

/// Finds a source by id.
#[must_use]
pub fn find_source<'a>(sources: &'a [SourceDefinition], id: &str) -> Option<&'a SourceDefinition> {
    sources.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use disaster_feed_disaster_models::DisasterCategory;

    use super::*;

    #[test]
    fn loads_all_sources() {
        let sources = all_sources();
        assert_eq!(sources.len(), EXPECTED_SOURCE_COUNT);
    }

    #[test]
    fn source_ids_are_unique() {
        let sources = all_sources();
        let mut ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), EXPECTED_SOURCE_COUNT);
    }

    #[test]
    fn every_category_has_a_source() {
        let sources = all_sources();
        for category in DisasterCategory::all() {
            assert!(
                sources.iter().any(|s| s.category == *category),
                "no source for {category}"
            );
        }
    }

    #[test]
    fn all_sources_have_required_fields() {
        for source in &all_sources() {
            assert!(!source.id.is_empty(), "source id is empty");
            assert!(!source.name.is_empty(), "source name is empty");
            assert!(
                !source.fields.coordinates.is_empty(),
                "{}: no coordinate fields",
                source.id
            );
            assert!(
                !source.fields.visibility.is_empty(),
                "{}: no visibility fields",
                source.id
            );
            assert!(
                !source.fields.occurred_at.is_empty(),
                "{}: no timestamp fields",
                source.id
            );
        }
    }

    #[test]
    fn finds_sources_by_id() {
        let sources = all_sources();
        assert_eq!(
            find_source(&sources, "earthquakes").map(|s| s.category),
            Some(DisasterCategory::Earthquake)
        );
        assert!(find_source(&sources, "volcanoes").is_none());
    }

    #[test]
    fn loads_sources_from_directory() {
        let dir = std::env::temp_dir().join("disaster_feed_registry_dir");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("local_fire.toml"),
            r#"
id = "local_fires"
name = "Local fires"
category = "fire"

[fetcher]
type = "file"
path = "/tmp/fires.json"
"#,
        )
        .unwrap();
        std::fs::write(dir.join("README.md"), "ignored").unwrap();

        let sources = load_sources_dir(&dir).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "local_fires");
        assert_eq!(sources[0].fields.visibility, vec!["isVisible", "visible"]);

        std::fs::write(
            dir.join("zz_duplicate.toml"),
            r#"
id = "local_fires"
name = "Duplicate"
category = "fire"

[fetcher]
type = "json_url"
url = "http://localhost/fires.json"
"#,
        )
        .unwrap();
        assert!(load_sources_dir(&dir).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
