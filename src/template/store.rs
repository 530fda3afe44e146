use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};
use tracing::{error, info, warn};

use super::write::{read_template, write_template, TEMPLATE_SUFFIX};
use super::Template;
use crate::error::{NormalizeError, Result};
use crate::table::RawTable;

type TemplateMap = BTreeMap<String, Arc<Template>>;

/// Named templates, optionally persisted as `<name>.template.json` files in one directory.
///
/// The map is copy-on-write: [`define`](Self::define) swaps in a new map, so a
/// [`RegistrySnapshot`] taken before it keeps seeing the old definitions.
pub struct TemplateRegistry {
    dir: Option<PathBuf>,
    map: RwLock<Arc<TemplateMap>>,
}

impl TemplateRegistry {
    /// Loads every template file in `dir`, creating the directory when missing.
    /// Files that fail to parse or validate are logged and skipped.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut initial = TemplateMap::new();
        for entry in fs::read_dir(&dir)?.filter_map(std::result::Result::ok) {
            let path = entry.path();
            let fname = match path.file_name().and_then(|n| n.to_str()) {
                Some(f) => f,
                None => continue,
            };
            if !fname.ends_with(TEMPLATE_SUFFIX) || fname.starts_with('.') {
                continue;
            }

            match read_template(&path).and_then(|t| t.validate().map(|_| t)) {
                Ok(template) => {
                    let stem = fname.trim_end_matches(TEMPLATE_SUFFIX);
                    if template.name != stem {
                        warn!(
                            file = %path.display(),
                            name = %template.name,
                            "template name differs from its file name"
                        );
                    }
                    initial.insert(template.name.clone(), Arc::new(template));
                }
                Err(e) => error!("Skipping corrupt {:?}: {}", path, e),
            }
        }

        info!(dir = %dir.display(), templates = initial.len(), "loaded templates");
        Ok(Self {
            dir: Some(dir),
            map: RwLock::new(Arc::new(initial)),
        })
    }

    /// A registry that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            map: RwLock::new(Arc::new(TemplateMap::new())),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Immutable view of the current definitions, for the duration of one import.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        RegistrySnapshot {
            templates: Arc::clone(&map),
        }
    }

    /// Validates and stores `template`, replacing any template with the same name.
    pub fn define(&self, template: Template) -> Result<Arc<Template>> {
        template.validate()?;
        let template = Arc::new(template);

        // hold the write lock across the file write so two defines of one name serialize
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(dir) = &self.dir {
            let path = write_template(dir, &template)?;
            info!(name = %template.name, path = %path.display(), "saved template");
        }
        let mut next = TemplateMap::clone(&map);
        let replaced = next
            .insert(template.name.clone(), Arc::clone(&template))
            .is_some();
        *map = Arc::new(next);

        if replaced {
            info!(name = %template.name, "replaced template");
        }
        Ok(template)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<Template>> {
        self.snapshot().resolve(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot().names()
    }

    pub fn len(&self) -> usize {
        self.snapshot().templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    templates: Arc<TemplateMap>,
}

impl RegistrySnapshot {
    pub fn resolve(&self, name: &str) -> Result<Arc<Template>> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| NormalizeError::TemplateNotFound(name.to_string()))
    }

    /// Template names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.values()
    }

    /// First template, by name, whose recorded header matches `raw`.
    pub fn find_matching(&self, raw: &RawTable) -> Option<Arc<Template>> {
        self.templates.values().find(|t| t.matches(raw)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::BoundarySpec;
    use crate::table::ColumnRole;
    use crate::template::write::template_path;
    use tempfile::tempdir;

    fn fmt_a() -> Template {
        Template::new("fmtA", BoundarySpec::new(1, 2, 4))
            .with_role("lat_deg", ColumnRole::Latitude)
            .with_role("lon_deg", ColumnRole::Longitude)
    }

    #[test]
    fn define_then_resolve_returns_an_equal_template() {
        let registry = TemplateRegistry::in_memory();
        registry.define(fmt_a()).unwrap();
        assert_eq!(*registry.resolve("fmtA").unwrap(), fmt_a());
        assert!(matches!(
            registry.resolve("fmtB"),
            Err(NormalizeError::TemplateNotFound(n)) if n == "fmtB"
        ));
    }

    #[test]
    fn persists_and_reloads() -> anyhow::Result<()> {
        let dir = tempdir()?;
        {
            let registry = TemplateRegistry::open(dir.path())?;
            assert!(registry.is_empty());
            registry.define(fmt_a())?;
            registry.define(Template::new("alpha", BoundarySpec::new(3, 5, 9)))?;
        }
        assert!(template_path(dir.path(), "fmtA").exists());

        let reopened = TemplateRegistry::open(dir.path())?;
        assert_eq!(reopened.names(), vec!["alpha", "fmtA"]);
        assert_eq!(*reopened.resolve("fmtA")?, fmt_a());
        Ok(())
    }

    #[test]
    fn corrupt_files_are_skipped() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("broken.template.json"), "{ not json")?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;
        let registry = TemplateRegistry::open(dir.path())?;
        assert!(registry.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_files_are_skipped() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("backwards.template.json"),
            r#"{"name":"backwards","boundary":{"header_line":5,"first_data_line":2,"last_data_line":9}}"#,
        )?;
        fs::write(
            dir.path().join("two-clocks.template.json"),
            r#"{"name":"two-clocks","boundary":{"header_line":1,"first_data_line":2,"last_data_line":9},
                "column_roles":{"a":"time","b":"time"}}"#,
        )?;
        fs::write(
            dir.path().join("escape.template.json"),
            r#"{"name":"../escape","boundary":{"header_line":1,"first_data_line":2,"last_data_line":9}}"#,
        )?;
        fs::write(
            dir.path().join("ok.template.json"),
            r#"{"name":"ok","boundary":{"header_line":1,"first_data_line":2,"last_data_line":9}}"#,
        )?;

        let registry = TemplateRegistry::open(dir.path())?;
        assert_eq!(registry.names(), vec!["ok"]);
        Ok(())
    }

    #[test]
    fn define_replaces_by_name_without_touching_snapshots() {
        let registry = TemplateRegistry::in_memory();
        registry.define(fmt_a()).unwrap();
        let before = registry.snapshot();

        let replacement = Template::new("fmtA", BoundarySpec::new(2, 3, 3));
        registry.define(replacement.clone()).unwrap();

        assert_eq!(*before.resolve("fmtA").unwrap(), fmt_a());
        assert_eq!(*registry.resolve("fmtA").unwrap(), replacement);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_templates_are_not_stored() {
        let registry = TemplateRegistry::in_memory();
        let bad = Template::new("bad", BoundarySpec::new(2, 2, 3));
        assert!(registry.define(bad).unwrap_err().is_configuration());
        assert!(registry.is_empty());
    }

    #[test]
    fn finds_template_by_header() {
        let sample = RawTable::from_text("timestamp,speed,lat_deg,lon_deg\n0,1,2,3\n1,1,2,3\n2,1,2,3");
        let registry = TemplateRegistry::in_memory();
        registry
            .define(fmt_a().with_signature_from(&sample).unwrap())
            .unwrap();
        registry
            .define(Template::new("unsigned", BoundarySpec::new(1, 2, 4)))
            .unwrap();

        let found = registry.snapshot().find_matching(&sample).unwrap();
        assert_eq!(found.name, "fmtA");

        let other = RawTable::from_text("t;v\n0;1\n1;2\n2;3");
        assert!(registry.snapshot().find_matching(&other).is_none());
    }
}
