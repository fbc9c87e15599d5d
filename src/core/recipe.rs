//! Recipe parsing and validation
//!
//! A recipe is a YAML document describing the ordered groups of packages
//! that make up a language stack. The top-level key is the recipe id; its
//! value carries an optional human-readable `name` and a `packages` list
//! whose elements are groups. Groups are built strictly in order; packages
//! within a group carry no ordering requirement.
//!
//! ```yaml
//! python38:
//!   name: Python 3.8 stack
//!   packages:
//!     - - python-rpm-macros
//!       - python-setuptools
//!     - - python3:
//!           macros:
//!             _with_bootstrap: "1"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;

use crate::error::RecipeError;

/// One package to download and build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Package name
    pub name: String,

    /// Macros to inject before build (`%global <name> <value>`)
    pub macros: BTreeMap<String, String>,

    /// Existing macro definitions to rewrite to a new value
    pub replaced_macros: BTreeMap<String, String>,

    /// Changelog entry recorded for the rebuild
    pub changelog: String,
}

impl PackageSpec {
    /// An ordinary rebuild entry with no overrides
    pub fn bare(name: &str, recipe_id: &str) -> Self {
        Self {
            name: name.to_string(),
            macros: BTreeMap::new(),
            replaced_macros: BTreeMap::new(),
            changelog: format!("Rebuilt for {recipe_id}"),
        }
    }

    /// Whether this entry carries macro overrides (bootstrap rebuild)
    pub fn is_bootstrap(&self) -> bool {
        !self.macros.is_empty() || !self.replaced_macros.is_empty()
    }
}

/// An ordered group of packages; later groups may depend on artifacts
/// produced by every package of earlier groups.
pub type Group = Vec<PackageSpec>;

/// A parsed recipe: ordered groups of package specs
#[derive(Debug, Clone, Default)]
pub struct Recipe {
    /// Recipe id (the top-level document key)
    pub id: String,

    /// Human-readable stack name, if given
    pub name: Option<String>,

    groups: Vec<Group>,
}

impl Recipe {
    /// Load the recipe `recipe_id` from a YAML file
    pub fn load(path: &Path, recipe_id: &str) -> Result<Self, RecipeError> {
        let content = std::fs::read_to_string(path).map_err(|e| RecipeError::ReadFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&content, recipe_id)
    }

    /// Parse the recipe `recipe_id` out of a YAML document
    pub fn from_yaml(content: &str, recipe_id: &str) -> Result<Self, RecipeError> {
        let doc: Value =
            serde_yaml::from_str(content).map_err(|e| RecipeError::ParseError {
                error: e.to_string(),
            })?;

        let entry = doc
            .as_mapping()
            .and_then(|m| m.get(recipe_id))
            .ok_or_else(|| RecipeError::RecipeNotFound {
                name: recipe_id.to_string(),
            })?;

        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        let packages = entry
            .get("packages")
            .and_then(Value::as_sequence)
            .ok_or_else(|| RecipeError::MissingPackages {
                name: recipe_id.to_string(),
            })?;

        let mut groups = Vec::with_capacity(packages.len());
        for (index, group) in packages.iter().enumerate() {
            let entries = group
                .as_sequence()
                .ok_or(RecipeError::GroupNotSequence { index })?;

            let mut specs = Vec::with_capacity(entries.len());
            for entry in entries {
                specs.push(parse_entry(entry, index, recipe_id)?);
            }
            groups.push(specs);
        }

        Ok(Self {
            id: recipe_id.to_string(),
            name,
            groups,
        })
    }

    /// Ordered groups of package specs
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// All packages flattened in recipe order
    pub fn packages(&self) -> impl Iterator<Item = &PackageSpec> {
        self.groups.iter().flatten()
    }

    /// Total package count across all groups
    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Whether the recipe produces no work
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalize a single package entry.
///
/// A bare string is an ordinary rebuild. A one-key mapping is a bootstrap
/// rebuild carrying `macros` and/or `replaced_macros`. Anything else is
/// malformed.
fn parse_entry(entry: &Value, group: usize, recipe_id: &str) -> Result<PackageSpec, RecipeError> {
    match entry {
        Value::String(name) => Ok(PackageSpec::bare(name, recipe_id)),
        Value::Mapping(map) => {
            if map.len() != 1 {
                return Err(RecipeError::AmbiguousEntry {
                    group,
                    count: map.len(),
                });
            }
            let (key, overrides) = map.iter().next().unwrap();
            let name = key.as_str().ok_or_else(|| RecipeError::InvalidEntry {
                group,
                detail: "package name is not a string".to_string(),
            })?;

            Ok(PackageSpec {
                name: name.to_string(),
                macros: parse_macro_map(overrides.get("macros"), name)?,
                replaced_macros: parse_macro_map(overrides.get("replaced_macros"), name)?,
                changelog: format!("Bootstrap for {recipe_id}"),
            })
        }
        other => Err(RecipeError::InvalidEntry {
            group,
            detail: format!("expected a name or one-key mapping, got {other:?}"),
        }),
    }
}

/// Read a `macros`/`replaced_macros` mapping of scalar values
fn parse_macro_map(
    value: Option<&Value>,
    package: &str,
) -> Result<BTreeMap<String, String>, RecipeError> {
    let mut out = BTreeMap::new();
    let Some(map) = value.and_then(Value::as_mapping) else {
        return Ok(out);
    };

    for (key, val) in map {
        let name = key.as_str().unwrap_or_default().to_string();
        let value = match val {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                return Err(RecipeError::InvalidMacro {
                    package: package.to_string(),
                    name,
                })
            }
        };
        out.insert(name, value);
    }
    Ok(out)
}
