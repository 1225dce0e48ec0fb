//! Finding the command-group modules of a package.
//!
//! Directory discovery follows the layout contract: every file directly in
//! `<root>/<package>` with the configured extension is one module, except
//! names starting with `_` (or `.`). Ids come back sorted so the command
//! tree and its help output are reproducible.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    group::ModuleCatalog,
    registry::ModuleId,
};

/// Where module ids come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// List source files in `root/package`
    Directory {
        root: PathBuf,
        package: String,
        extension: String,
    },
    /// Every catalog module under `package`
    Catalog { package: String },
}

impl Discovery {
    pub fn package(&self) -> &str {
        match self {
            Self::Directory { package, .. } | Self::Catalog { package } => package,
        }
    }

    /// Module ids to build the CLI from, sorted.
    pub fn discover(&self, catalog: &ModuleCatalog) -> Result<Vec<ModuleId>> {
        match self {
            Self::Directory {
                root,
                package,
                extension,
            } => list_modules(root, package, extension),
            Self::Catalog { package } => Ok(catalog
                .ids()
                .filter(|id| id.package() == package)
                .cloned()
                .collect()),
        }
    }
}

/// List the module ids in `root/package` for files ending in `.extension`.
pub fn list_modules(root: &Path, package: &str, extension: &str) -> Result<Vec<ModuleId>> {
    let dir = root.join(package.replace('.', "/"));
    if !dir.is_dir() {
        return Err(Error::Discovery {
            path: dir,
            reason: "not a directory".to_string(),
        });
    }

    let mut stems = Vec::new();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Discovery {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(stem) = module_stem(entry.path(), extension) {
            stems.push(stem);
        }
    }

    let ids = stems
        .into_iter()
        .sorted()
        .dedup()
        .map(|stem| ModuleId::from_parts(package, &stem))
        .collect::<Vec<_>>();
    tracing::debug!(dir = %dir.display(), count = ids.len(), "Discovered command modules");
    Ok(ids)
}

/// Module name for an eligible file, `None` for anything to skip.
fn module_stem(path: &Path, extension: &str) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.starts_with('_') || file_name.starts_with('.') {
        return None;
    }
    if path.extension()?.to_str()? != extension {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    if stem.contains('.') {
        tracing::warn!(file = file_name, "Skipping module with dotted name");
        return None;
    }
    Some(stem.to_string())
}
