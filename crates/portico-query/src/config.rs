//! Site configuration loading.
//!
//! A configuration file is a set of named sections, one per access point.
//! Every section needs a `kind` (or a `url` whose scheme names the kind);
//! all other keys are handed to the backend as parameters. Keys outside any
//! section are defaults shared by every section.
//!
//! ```ini
//! [people]
//! kind = memory
//! keys = id
//! data = people.json
//!
//! [music]
//! url = filesystem://music
//! root = music
//! keys = genre, artist, title
//! ```

use crate::error::{DataError, Result};
use crate::types::AccessPointDescriptor;
use ::config::{Config, File, FileFormat, Map, Value};
use ini::{Ini, ParseOption};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type Parameters = BTreeMap<String, String>;

/// Read a configuration file into one descriptor per section, in file order.
///
/// Relative paths in the sections resolve against the file's directory.
pub fn load_descriptors(path: impl AsRef<Path>) -> Result<Vec<AccessPointDescriptor>> {
    let requested = path.as_ref();
    let path = std::fs::canonicalize(requested)
        .map_err(|_| DataError::ConfigNotFound(requested.to_path_buf()))?;

    if !path.is_file() {
        return Err(DataError::ConfigNotFound(requested.to_path_buf()));
    }

    let text = std::fs::read_to_string(&path).map_err(|e| {
        warn!("Cannot read site configuration {}: {}", path.display(), e);
        DataError::ConfigNotFound(requested.to_path_buf())
    })?;

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    debug!("Loading site configuration from {}", path.display());

    let (defaults, sections) = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => parse_structured(&path, &text, FileFormat::Toml)?,
        Some("json") => parse_structured(&path, &text, FileFormat::Json)?,
        Some("yaml") | Some("yml") => parse_structured(&path, &text, FileFormat::Yaml)?,
        _ => parse_ini(&path, &text)?,
    };

    build_descriptors(defaults, sections, &base_dir)
}

/// INI keeps section names as written and values verbatim (no escapes, no
/// quote stripping); option names are case-insensitive.
fn parse_ini(path: &Path, text: &str) -> Result<(Parameters, Vec<(String, Parameters)>)> {
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };

    let ini = Ini::load_from_str_opt(text, options).map_err(|e| {
        DataError::invalid_configuration(format!("cannot parse {}: {}", path.display(), e))
    })?;

    let mut defaults = Parameters::new();
    let mut sections = Vec::new();

    for (section, properties) in ini.iter() {
        let parameters: Parameters = properties
            .iter()
            .map(|(key, value)| (key.to_lowercase(), value.to_string()))
            .collect();

        match section {
            Some(name) => sections.push((name.to_string(), parameters)),
            None => defaults.extend(parameters),
        }
    }

    Ok((defaults, sections))
}

/// TOML, JSON and YAML go through the `config` crate
fn parse_structured(
    path: &Path,
    text: &str,
    format: FileFormat,
) -> Result<(Parameters, Vec<(String, Parameters)>)> {
    let settings = Config::builder()
        .add_source(File::from_str(text, format))
        .build()
        .map_err(|e| {
            DataError::invalid_configuration(format!("cannot parse {}: {}", path.display(), e))
        })?;

    let root: Value = settings.try_deserialize().map_err(|e| {
        DataError::invalid_configuration(format!("cannot parse {}: {}", path.display(), e))
    })?;

    let table = root.into_table().map_err(|e| {
        DataError::invalid_configuration(format!("{} is not a table: {}", path.display(), e))
    })?;

    split_table(table)
}

fn split_table(table: Map<String, Value>) -> Result<(Parameters, Vec<(String, Parameters)>)> {
    let mut defaults = Parameters::new();
    let mut sections = Vec::new();

    for (name, value) in table {
        match value.clone().into_table() {
            Ok(section) => {
                let mut parameters = Parameters::new();
                for (key, value) in section {
                    let text = value.into_string().map_err(|e| {
                        DataError::invalid_configuration(format!(
                            "access point '{}', parameter '{}': {}",
                            name, key, e
                        ))
                    })?;
                    parameters.insert(key, text);
                }
                sections.push((name, parameters));
            }
            Err(_) => {
                let text = value.into_string().map_err(|e| {
                    DataError::invalid_configuration(format!("default '{}': {}", name, e))
                })?;
                defaults.insert(name, text);
            }
        }
    }

    Ok((defaults, sections))
}

fn build_descriptors(
    defaults: Parameters,
    sections: Vec<(String, Parameters)>,
    base_dir: &Path,
) -> Result<Vec<AccessPointDescriptor>> {
    sections
        .into_iter()
        .map(|(name, section)| {
            let mut parameters = defaults.clone();
            parameters.extend(section);

            let kind = resolve_kind(&name, &mut parameters)?;
            debug!("Access point {} uses backend {}", name, kind);

            Ok(AccessPointDescriptor {
                name,
                kind,
                parameters,
                base_dir: base_dir.to_path_buf(),
            })
        })
        .collect()
}

/// Explicit `kind` first, then the scheme of `url`
fn resolve_kind(name: &str, parameters: &mut BTreeMap<String, String>) -> Result<String> {
    if let Some(kind) = parameters.remove("kind") {
        if let Some(url) = parameters.get("url") {
            if !url.starts_with(&format!("{}://", kind)) {
                warn!(
                    "Access point {} sets kind '{}' but url '{}', using kind",
                    name, kind, url
                );
            }
        }
        return Ok(kind);
    }

    parameters
        .get("url")
        .and_then(|url| url.split_once("://"))
        .map(|(scheme, _)| scheme.to_string())
        .filter(|scheme| !scheme.is_empty())
        .ok_or_else(|| {
            DataError::invalid_configuration(format!(
                "access point '{}' has neither 'kind' nor a 'url' scheme",
                name
            ))
        })
}
