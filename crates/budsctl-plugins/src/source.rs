//! Plugin document sources.
//!
//! A [`PluginSource`] pairs a document's text with a label naming where it
//! came from. Parsing never touches the filesystem directly; directories are
//! turned into sources up front by [`read_sources`], and read failures are
//! carried inside the source so the loader reports them like any other load
//! error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::PluginError;

const SOURCE_TARGET: &str = "budsctl_plugins::source";

/// File extensions recognised as plugin documents.
const PLUGIN_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Text of one plugin document and the label identifying its origin.
#[derive(Debug, Clone)]
pub struct PluginSource {
    origin: String,
    text: Result<String, Arc<io::Error>>,
}

impl PluginSource {
    /// Creates a source from in-memory text.
    #[must_use]
    pub fn new(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            text: Ok(text.into()),
        }
    }

    /// Creates a source whose contents could not be read.
    #[must_use]
    pub fn unreadable(origin: impl Into<String>, error: io::Error) -> Self {
        Self {
            origin: origin.into(),
            text: Err(Arc::new(error)),
        }
    }

    /// Reads a source from a file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let origin = path.display().to_string();
        match fs::read_to_string(path) {
            Ok(text) => Self::new(origin, text),
            Err(error) => Self::unreadable(origin, error),
        }
    }

    /// Returns the origin label (a path or `builtin:` name).
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the document text.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Read`] when the source could not be read.
    pub fn text(&self) -> Result<&str, PluginError> {
        self.text
            .as_deref()
            .map_err(|source| PluginError::Read {
                origin: self.origin.clone(),
                source: Arc::clone(source),
            })
    }
}

/// Reads every `*.yaml` and `*.yml` file in `dir`, in file-name order.
///
/// A missing directory yields no sources. A directory that exists but
/// cannot be listed yields a single unreadable source so the failure is
/// reported by the loader.
#[must_use]
pub fn read_sources(dir: &Path) -> Vec<PluginSource> {
    if !dir.is_dir() {
        debug!(
            target: SOURCE_TARGET,
            dir = %dir.display(),
            "plugin directory absent; skipping"
        );
        return Vec::new();
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => return vec![PluginSource::unreadable(dir.display().to_string(), error)],
    };

    let sources = collect_sources(dir, entries.map(|entry| entry.map(|found| found.path())));
    debug!(
        target: SOURCE_TARGET,
        dir = %dir.display(),
        count = sources.len(),
        "collected plugin documents"
    );
    sources
}

/// Turns directory entries into sources: plugin files in file-name order,
/// then one unreadable source per entry the directory listing failed on.
fn collect_sources<I>(dir: &Path, entries: I) -> Vec<PluginSource>
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
{
    let mut paths = Vec::new();
    let mut failures = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() && has_plugin_extension(&path) => paths.push(path),
            Ok(_) => {}
            Err(error) => failures.push(PluginSource::unreadable(dir.display().to_string(), error)),
        }
    }
    paths.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
    paths
        .iter()
        .map(|path| PluginSource::from_path(path))
        .chain(failures)
        .collect()
}

/// Reads each directory in order; later directories take precedence when
/// the sources are loaded.
#[must_use]
pub fn read_search_paths<P: AsRef<Path>>(dirs: &[P]) -> Vec<PluginSource> {
    dirs.iter()
        .flat_map(|dir| read_sources(dir.as_ref()))
        .collect()
}

fn has_plugin_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PLUGIN_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    //! Unit tests for plugin source collection.

    use std::fs;

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;
    use crate::error::PluginErrorKind;

    #[fixture]
    fn plugin_dir() -> TempDir {
        let dir = TempDir::new().expect("create temp dir");
        fs::write(dir.path().join("b.yml"), "id: b\n").expect("write b");
        fs::write(dir.path().join("a.yaml"), "id: a\n").expect("write a");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write notes");
        fs::create_dir(dir.path().join("nested.yaml")).expect("create nested dir");
        dir
    }

    #[rstest]
    fn reads_yaml_files_in_name_order(plugin_dir: TempDir) {
        let sources = read_sources(plugin_dir.path());
        let texts: Vec<&str> = sources
            .iter()
            .map(|source| source.text().expect("readable"))
            .collect();
        assert_eq!(texts, ["id: a\n", "id: b\n"]);
        let first = sources.first().expect("at least one source");
        assert!(first.origin().ends_with("a.yaml"));
    }

    #[test]
    fn missing_directory_yields_nothing() {
        let dir = TempDir::new().expect("create temp dir");
        assert!(read_sources(&dir.path().join("absent")).is_empty());
    }

    #[rstest]
    fn search_paths_preserve_directory_order(plugin_dir: TempDir) {
        let later = TempDir::new().expect("create temp dir");
        fs::write(later.path().join("a.yaml"), "id: later\n").expect("write later");

        let sources = read_search_paths(&[plugin_dir.path(), later.path()]);
        let last = sources.last().expect("at least one source");
        assert_eq!(last.text().expect("readable"), "id: later\n");
        assert_eq!(sources.len(), 3);
    }

    #[rstest]
    fn failed_entries_become_unreadable_sources(plugin_dir: TempDir) {
        let entries = vec![
            Ok(plugin_dir.path().join("b.yml")),
            Err(io::Error::other("stale handle")),
            Ok(plugin_dir.path().join("a.yaml")),
        ];
        let sources = collect_sources(plugin_dir.path(), entries);

        assert_eq!(sources.len(), 3);
        let last = sources.last().expect("failure recorded");
        let error = last.text().expect_err("entry failed");
        assert_eq!(error.kind(), PluginErrorKind::Load);
        assert_eq!(last.origin(), plugin_dir.path().display().to_string());
        let first = sources.first().expect("plugin files first");
        assert_eq!(first.text().expect("readable"), "id: a\n");
    }

    #[test]
    fn unreadable_source_reports_load_error() {
        let source = PluginSource::unreadable("gone.yaml", io::Error::other("denied"));
        let error = source.text().expect_err("source is unreadable");
        assert_eq!(error.kind(), PluginErrorKind::Load);
        assert_eq!(error.origin(), "gone.yaml");
    }
}
