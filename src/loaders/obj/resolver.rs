use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::ObjResult;

use super::parse_mtl::{load_mtl, parse_mtl};
use super::types::MaterialLibrary;

/// Supplies material libraries named by `mtllib`.
///
/// An `Err` is not fatal: the parser records a warning and tries the next
/// name on the line.
pub trait MaterialResolver {
    fn resolve(&mut self, name: &str) -> ObjResult<MaterialLibrary>;
}

impl<F> MaterialResolver for F
where
    F: FnMut(&str) -> ObjResult<MaterialLibrary>,
{
    fn resolve(&mut self, name: &str) -> ObjResult<MaterialLibrary> {
        self(name)
    }
}

/// Loads `name` relative to a search directory.
#[derive(Debug, Clone)]
pub struct MaterialFileResolver {
    search_path: PathBuf,
}

impl MaterialFileResolver {
    pub fn new<P: AsRef<Path>>(search_path: P) -> Self {
        Self {
            search_path: search_path.as_ref().to_path_buf(),
        }
    }
}

impl MaterialResolver for MaterialFileResolver {
    fn resolve(&mut self, name: &str) -> ObjResult<MaterialLibrary> {
        let path = self.search_path.join(name);
        trace!(path = %path.display(), "resolving material library");
        load_mtl(&path)
    }
}

/// Serves one in-memory MTL text whatever name is asked for.
#[derive(Debug, Clone)]
pub struct MaterialTextResolver {
    text: String,
}

impl MaterialTextResolver {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

impl MaterialResolver for MaterialTextResolver {
    fn resolve(&mut self, name: &str) -> ObjResult<MaterialLibrary> {
        trace!(name, "serving in-memory material library");
        Ok(parse_mtl(self.text.as_bytes()))
    }
}
