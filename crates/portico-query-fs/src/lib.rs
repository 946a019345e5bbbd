//! File tree implementation of the portico-query AccessPoint trait
//!
//! Every file sitting exactly `keys.len()` levels below `root` is an item.
//! The path components become the key properties and the file text becomes
//! the content property.
//!
//! ## Hierarchy
//!
//! With `keys = genre, artist, title`:
//! - Depth 1: `genre` directories
//! - Depth 2: `artist` directories
//! - Depth 3: `title` files
//!
//! Conditions on a key are checked as soon as that level is reached, and a
//! non-numeric equality condition opens the matching child directly instead
//! of listing the directory. Files that are not UTF-8 text are skipped.
//!
//! ## Example
//!
//! ```ini
//! [music]
//! kind = filesystem
//! root = music
//! keys = genre, artist, title
//! ```
//!
//! `site.search("music", "/jazz/artist=Monk/")` only ever reads `music/jazz/Monk`.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use portico_query::{
    bind_positional, AccessPoint, AccessPointDescriptor, AccessPointFactory, Condition,
    DataError, Item, ItemStream, Operator, Result,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const KIND: &str = "filesystem";

/// Directory tree access point
pub struct FsSource {
    root: PathBuf,
    keys: Vec<String>,
    content: String,
}

/// Conditions split by the tree level they can be checked at
struct Walk {
    root: PathBuf,
    keys: Vec<String>,
    content: String,
    /// Per key level: conditions on that key
    levels: Vec<Vec<Condition>>,
    /// Conditions that need the whole item
    rest: Vec<Condition>,
}

impl FsSource {
    /// Create a source over an existing directory
    pub fn new(root: impl Into<PathBuf>, keys: Vec<String>, content: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            keys,
            content: content.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path of an item, built from its key values
    fn path_of(&self, item: &Item) -> Result<PathBuf> {
        let mut path = self.root.clone();

        for key in &self.keys {
            let value = item.text(key).ok_or_else(|| {
                DataError::invalid_item(format!("missing key property '{}'", key))
            })?;

            if !is_component(&value) {
                return Err(DataError::invalid_item(format!(
                    "'{}' is not a usable path component for '{}'",
                    value, key
                )));
            }

            path.push(value);
        }

        Ok(path)
    }

    fn plan(&self, conditions: Vec<Condition>) -> Walk {
        let mut levels = vec![Vec::new(); self.keys.len()];
        let mut rest = Vec::new();

        for condition in conditions {
            let level = condition
                .property
                .as_ref()
                .and_then(|property| self.keys.iter().position(|key| key == property));

            match level {
                Some(level) => levels[level].push(condition),
                None => rest.push(condition),
            }
        }

        Walk {
            root: self.root.clone(),
            keys: self.keys.clone(),
            content: self.content.clone(),
            levels,
            rest,
        }
    }
}

/// A single, non-special path component
fn is_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains(std::path::MAIN_SEPARATOR)
}

fn io_error(path: &Path, e: std::io::Error) -> DataError {
    error!("I/O error on {}: {}", path.display(), e);
    DataError::Io(format!("{}: {}", path.display(), e))
}

/// Check a path component against the conditions on its level
fn accepts(conditions: &[Condition], name: &str) -> Result<bool> {
    for condition in conditions {
        if let Some(operator) = condition.operator {
            if !operator.apply(name, &condition.value)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Children of `dir` that are directories (or files when `files` is set),
/// sorted by name
async fn children(dir: &Path, files: bool) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| io_error(dir, e))?;
    let mut found = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, e))? {
        let path = entry.path();
        let Ok(name) = entry.file_name().into_string() else {
            warn!("Skipping non UTF-8 path {}", path.display());
            continue;
        };

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        if (files && metadata.is_file()) || (!files && metadata.is_dir()) {
            found.push((name, path));
        }
    }

    found.sort();
    Ok(found)
}

/// The one child named by an equality condition, if it exists
async fn direct_child(dir: &Path, name: &str, files: bool) -> Vec<(String, PathBuf)> {
    if !is_component(name) {
        return Vec::new();
    }

    let path = dir.join(name);
    match tokio::fs::metadata(&path).await {
        Ok(metadata) if (files && metadata.is_file()) || (!files && metadata.is_dir()) => {
            vec![(name.to_string(), path)]
        }
        _ => Vec::new(),
    }
}

fn walk(plan: Walk) -> impl Stream<Item = Result<Item>> + Send + 'static {
    try_stream! {
        let depth = plan.keys.len();
        let mut pending = vec![(plan.root.clone(), Vec::<String>::new())];

        while let Some((dir, components)) = pending.pop() {
            let level = components.len();

            if level == depth {
                let mut item = Item::default();
                for (key, value) in plan.keys.iter().zip(&components) {
                    item.set(key.clone(), value.clone());
                }

                let bytes = tokio::fs::read(&dir).await.map_err(|e| io_error(&dir, e))?;
                let Ok(text) = String::from_utf8(bytes) else {
                    warn!("Skipping non UTF-8 file {}", dir.display());
                    continue;
                };
                item.set(plan.content.clone(), text);

                let mut matched = true;
                for condition in &plan.rest {
                    if !condition.matches(&item)? {
                        matched = false;
                        break;
                    }
                }

                if matched {
                    yield item;
                }
                continue;
            }

            let files = level + 1 == depth;
            // Numbers compare by value, so `7.0` has to see the `7` directory
            let equal = plan.levels[level]
                .iter()
                .find(|c| c.operator == Some(Operator::Eq) && c.value.parse::<f64>().is_err())
                .map(|c| c.value.clone());

            let candidates = match equal {
                Some(name) => direct_child(&dir, &name, files).await,
                None => children(&dir, files).await?,
            };

            // Reversed so the stack pops them in name order
            for (name, path) in candidates.into_iter().rev() {
                if accepts(&plan.levels[level], &name)? {
                    let mut next = components.clone();
                    next.push(name);
                    pending.push((path, next));
                }
            }
        }
    }
}

#[async_trait]
impl AccessPoint for FsSource {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn search(&self, conditions: Vec<Condition>) -> Result<ItemStream> {
        let conditions = bind_positional(conditions, &self.keys)?;
        debug!(
            "Walking {} with {} conditions",
            self.root.display(),
            conditions.len()
        );

        Ok(walk(self.plan(conditions)).boxed())
    }

    async fn save(&self, item: &Item) -> Result<()> {
        let path = self.path_of(item)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let text = item.text(&self.content).unwrap_or_default();
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| io_error(&path, e))?;

        debug!("Saved {}", path.display());
        Ok(())
    }

    async fn remove(&self, item: &Item) -> Result<()> {
        let path = self.path_of(item)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DataError::not_found(path.display().to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

/// Factory for the `filesystem` backend kind
pub struct FsSourceFactory;

#[async_trait]
impl AccessPointFactory for FsSourceFactory {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn create(&self, descriptor: &AccessPointDescriptor) -> Result<Arc<dyn AccessPoint>> {
        let root = descriptor.resolve_path("root")?;

        let is_dir = tokio::fs::metadata(&root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(DataError::invalid_configuration(format!(
                "access point '{}': root {} is not a directory",
                descriptor.name,
                root.display()
            )));
        }

        descriptor.require("keys")?;
        let keys = descriptor.list("keys").unwrap_or_default();
        if keys.is_empty() {
            return Err(DataError::invalid_configuration(format!(
                "access point '{}' has an empty 'keys' list",
                descriptor.name
            )));
        }

        let content = descriptor.parameter("content").unwrap_or("content");
        if keys.iter().any(|key| key == content) {
            return Err(DataError::invalid_configuration(format!(
                "access point '{}': '{}' is both a key and the content property",
                descriptor.name, content
            )));
        }

        debug!(
            "Filesystem access point {} at {} keyed by {:?}",
            descriptor.name,
            root.display(),
            keys
        );

        Ok(Arc::new(FsSource::new(root, keys, content)))
    }
}
