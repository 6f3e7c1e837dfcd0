//! Static content resolution across two content roots

use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Fixed HTML pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Comedor,
    Transporte,
    Reportes,
}

impl Page {
    /// File name looked up in each content root
    pub fn file_name(&self) -> &'static str {
        match self {
            Page::Comedor => "comedor.html",
            Page::Transporte => "transporte.html",
            Page::Reportes => "reportes.html",
        }
    }
}

/// Shared asset directories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetDir {
    Assets,
    Css,
    Js,
}

impl AssetDir {
    pub fn dir_name(&self) -> &'static str {
        match self {
            AssetDir::Assets => "assets",
            AssetDir::Css => "css",
            AssetDir::Js => "js",
        }
    }
}

/// Ordered list of content roots; earlier roots win
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRoots {
    roots: Vec<PathBuf>,
}

impl ContentRoots {
    /// Survey pages first, then reports
    pub fn new(primary: impl Into<PathBuf>, secondary: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![primary.into(), secondary.into()],
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Locate a page file
    pub async fn resolve_page(&self, page: Page) -> Option<PathBuf> {
        self.first_existing(Path::new(page.file_name())).await
    }

    /// Locate an asset under `dir`. Requests that try to leave the directory
    /// resolve to nothing.
    pub async fn resolve_asset(&self, dir: AssetDir, requested: &str) -> Option<PathBuf> {
        let relative = sanitize(requested)?;
        self.first_existing(&Path::new(dir.dir_name()).join(relative)).await
    }

    async fn first_existing(&self, relative: &Path) -> Option<PathBuf> {
        for root in &self.roots {
            let candidate = root.join(relative);
            match tokio::fs::metadata(&candidate).await {
                Ok(meta) if meta.is_file() => return Some(candidate),
                _ => debug!("No content at {}", candidate.display()),
            }
        }
        None
    }
}

/// Accept only plain relative paths made of normal components
fn sanitize(requested: &str) -> Option<PathBuf> {
    if requested.is_empty() || requested.contains('\\') {
        return None;
    }
    let path = Path::new(requested);
    path.components()
        .all(|component| matches!(component, Component::Normal(_)))
        .then(|| path.to_path_buf())
}
