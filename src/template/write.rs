use std::{
    fs,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use super::Template;
use crate::error::Result;

pub const TEMPLATE_SUFFIX: &str = ".template.json";

/// `<dir>/<name>.template.json`
pub fn template_path<P: AsRef<Path>>(dir: P, name: &str) -> PathBuf {
    dir.as_ref().join(format!("{}{}", name, TEMPLATE_SUFFIX))
}

pub fn read_template<P: AsRef<Path>>(path: P) -> Result<Template> {
    let f = fs::File::open(path.as_ref())?;
    Ok(serde_json::from_reader(BufReader::new(f))?)
}

/// Writes `template` to its file in `dir`, replacing any previous version.
/// The write goes to a temp file first and is renamed over the target, so a
/// reader never sees a half-written template.
pub fn write_template<P: AsRef<Path>>(dir: P, template: &Template) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let path = template_path(dir, &template.name);
    let tmp_path = dir.join(format!(".{}{}.tmp", template.name, TEMPLATE_SUFFIX));

    {
        let mut tmp = fs::File::create(&tmp_path)?;
        // pretty-print with a trailing newline
        serde_json::to_writer_pretty(&mut tmp, template)?;
        tmp.write_all(b"\n")?;
        tmp.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp_path, &path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::BoundarySpec;
    use crate::table::ColumnRole;
    use tempfile::tempdir;

    #[test]
    fn writes_then_overwrites_atomically() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let first = Template::new("ecutek", BoundarySpec::new(8, 9, 20));
        let path = write_template(dir.path(), &first)?;
        assert_eq!(path, dir.path().join("ecutek.template.json"));
        assert_eq!(read_template(&path)?, first);

        let second = first.clone().with_role("Time (s)", ColumnRole::Time);
        write_template(dir.path(), &second)?;
        assert_eq!(read_template(&path)?, second);

        let leftovers: Vec<_> = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let text = fs::read_to_string(&path)?;
        assert!(text.ends_with("}\n"));
        Ok(())
    }
}
