use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    maps: HashMap<String, MapEntry>,
    curves: HashMap<String, String>,
}

/// A map fixture: custom events, the objects placed on the map, and an
/// optional point definition table.
#[derive(Debug, Deserialize)]
struct MapEntry {
    events: String,
    entities: String,
    #[serde(default, rename = "pointDefinitions")]
    point_definitions: Option<String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod maps {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.maps.keys().cloned().collect()
    }

    pub fn events_json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.maps, "map", name)?;
        read_to_string(&entry.events)
    }

    pub fn entities<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.maps, "map", name)?;
        super::load_json(&entry.entities)
    }

    pub fn point_definitions_json(name: &str) -> Result<Option<String>> {
        let entry = lookup(&MANIFEST.maps, "map", name)?;
        match &entry.point_definitions {
            Some(rel) => read_to_string(rel).map(Some),
            None => Ok(None),
        }
    }
}

pub mod curves {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.curves.keys().cloned().collect()
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.curves, "curve", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.curves, "curve", name)?;
        Ok(resolve_path(rel))
    }
}
