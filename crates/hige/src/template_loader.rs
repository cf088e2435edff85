//! File-system partial loader for `{{>name}}` tags.

use crate::error::{HigeError, Result};
use hige_ast::{LoaderError, PartialLoader, Template};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// File extension of partial templates on disk.
pub const PARTIAL_EXTENSION: &str = "mustache";

struct PartialPathResolver {
    partial_root: PathBuf,
}

impl PartialPathResolver {
    fn new(partial_root: impl AsRef<Path>) -> Result<Self> {
        let partial_root =
            partial_root
                .as_ref()
                .canonicalize()
                .map_err(|e| HigeError::Partial {
                    message: format!("Invalid partial root: {e}"),
                })?;
        Ok(Self { partial_root })
    }

    /// `a/b` maps to `<root>/a/b.mustache`.
    fn resolve_template_path(&self, name: &str) -> PathBuf {
        let mut segments: Vec<String> = name.split('/').map(str::to_string).collect();
        if let Some(last) = segments.last_mut() {
            *last = format!("{last}.{PARTIAL_EXTENSION}");
        }

        let mut path = self.partial_root.clone();
        path.extend(segments);
        path
    }

    fn ensure_within_root(&self, path: &Path) -> Result<()> {
        let candidate = self.canonicalize_candidate(path)?;
        if candidate.starts_with(&self.partial_root) {
            return Ok(());
        }

        Err(HigeError::Partial {
            message: format!("Partial path escapes the partial root: {}", path.display()),
        })
    }

    fn canonicalize_candidate(&self, path: &Path) -> Result<PathBuf> {
        if path.exists() {
            return path.canonicalize().map_err(|e| HigeError::Partial {
                message: format!("Failed to resolve partial path: {e}"),
            });
        }

        // Only the existing prefix can be canonicalized.
        let (existing_parent, missing_segments) = split_existing_parent(path);
        let mut resolved = existing_parent
            .canonicalize()
            .map_err(|e| HigeError::Partial {
                message: format!("Failed to resolve partial path: {e}"),
            })?;
        resolved.extend(missing_segments);
        Ok(resolved)
    }
}

fn split_existing_parent(path: &Path) -> (PathBuf, Vec<String>) {
    let mut cursor = path.to_path_buf();
    let mut missing_segments = Vec::new();

    while !cursor.exists() {
        let Some(name) = cursor.file_name().and_then(|s| s.to_str()) else {
            break;
        };
        missing_segments.push(name.to_string());

        let Some(parent) = cursor.parent() else {
            break;
        };
        cursor = parent.to_path_buf();
    }

    missing_segments.reverse();
    (cursor, missing_segments)
}

/// Loads partials from a directory and keeps every parsed partial in memory.
pub struct TemplateLoader {
    path_resolver: PartialPathResolver,
    cache: HashMap<String, Arc<Template>>,
}

impl TemplateLoader {
    /// Create a loader rooted at `partial_root`, which must exist.
    pub fn new(partial_root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            path_resolver: PartialPathResolver::new(partial_root)?,
            cache: HashMap::new(),
        })
    }

    /// Load a partial by name; `Ok(None)` when no such file exists.
    pub fn load(&mut self, name: &str) -> Result<Option<Arc<Template>>> {
        validate_partial_name(name)?;

        if let Some(template) = self.cache.get(name) {
            return Ok(Some(Arc::clone(template)));
        }

        let Some(template) = self.load_and_parse(name)? else {
            return Ok(None);
        };
        let template = Arc::new(template);
        self.cache.insert(name.to_string(), Arc::clone(&template));
        Ok(Some(template))
    }

    fn load_and_parse(&self, name: &str) -> Result<Option<Template>> {
        let path = self.path_resolver.resolve_template_path(name);
        self.path_resolver.ensure_within_root(&path)?;

        if !path.is_file() {
            debug!(partial = name, path = %path.display(), "partial file not found");
            return Ok(None);
        }

        debug!(partial = name, path = %path.display(), "loading partial");
        let source = fs::read_to_string(&path)?;
        hige_ast::parse(&source)
            .map(Some)
            .map_err(|e| HigeError::Partial {
                message: format!("Failed to parse partial '{name}': {e}"),
            })
    }
}

impl PartialLoader for TemplateLoader {
    fn load(&mut self, name: &str) -> std::result::Result<Option<Arc<Template>>, LoaderError> {
        TemplateLoader::load(self, name).map_err(|e| Box::new(e) as LoaderError)
    }
}

/// Reject names that could leave the partial root.
fn validate_partial_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(HigeError::Partial {
            message: "Partial name is empty".to_string(),
        });
    }

    if name.contains("..") || name.contains('\\') || name.contains(':') {
        return Err(HigeError::Partial {
            message: format!("Invalid partial name (path traversal): {name}"),
        });
    }

    if name.split('/').any(|segment| segment.is_empty() || segment == ".") {
        return Err(HigeError::Partial {
            message: format!("Invalid partial name (empty segment): {name}"),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, relative: &str, content: &str) {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_validate_name_valid() {
        assert!(validate_partial_name("item").is_ok());
        assert!(validate_partial_name("components/card").is_ok());
        assert!(validate_partial_name("item-row.v2").is_ok());
    }

    #[test]
    fn test_validate_name_invalid() {
        assert!(validate_partial_name("").is_err());
        assert!(validate_partial_name("/absolute").is_err());
        assert!(validate_partial_name("with/../traversal").is_err());
        assert!(validate_partial_name("with//double").is_err());
        assert!(validate_partial_name("with\\backslash").is_err());
        assert!(validate_partial_name("c:drive").is_err());
        assert!(validate_partial_name("./here").is_err());
    }

    #[test]
    fn test_load_nested_partial() {
        let dir = TempDir::new().unwrap();
        write(&dir, "components/card.mustache", "[{{title}}]");

        let mut loader = TemplateLoader::new(dir.path()).unwrap();
        let template = loader.load("components/card").unwrap().unwrap();
        assert_eq!(template.to_string(), "[[T : [], [V : title], [T : ]]]");
    }

    #[test]
    fn test_missing_partial_is_absent() {
        let dir = TempDir::new().unwrap();
        let mut loader = TemplateLoader::new(dir.path()).unwrap();

        assert!(loader.load("nope").unwrap().is_none());
        assert!(loader.load("deep/er/nope").unwrap().is_none());
    }

    #[test]
    fn test_cache_keeps_first_parse() {
        let dir = TempDir::new().unwrap();
        write(&dir, "item.mustache", "first");

        let mut loader = TemplateLoader::new(dir.path()).unwrap();
        let first = loader.load("item").unwrap().unwrap();
        write(&dir, "item.mustache", "second");

        let template = loader.load("item").unwrap().unwrap();
        assert_eq!(template.to_string(), "[[T : first]]");
        assert!(Arc::ptr_eq(&first, &template));
    }

    #[test]
    fn test_parse_error_names_partial() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.mustache", "{{#open}}");

        let mut loader = TemplateLoader::new(dir.path()).unwrap();
        match loader.load("broken") {
            Err(HigeError::Partial { message }) => assert!(message.contains("'broken'")),
            other => panic!("expected partial error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = TemplateLoader::new(dir.path().join("absent"));
        assert!(matches!(result, Err(HigeError::Partial { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_rejected() {
        let outside = TempDir::new().unwrap();
        write(&outside, "secret.mustache", "secret");
        let root = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();

        let mut loader = TemplateLoader::new(root.path()).unwrap();
        assert!(matches!(
            loader.load("link/secret"),
            Err(HigeError::Partial { .. })
        ));
    }
}
