//! A Resource whose body is a pre-built JS bundle, with an optional
//! source-map sidecar.
//!
//! Shaped after the bundling-adjacent `content_saver` emission path: its
//! "write body, write `.map` beside it" pattern survives here even
//! though the rest of that module doesn't apply.

use std::path::PathBuf;

use crate::resource::Resource;

/// A pre-built bundle. Never passed through the link rewriter — JS is
/// never rewritten.
pub struct BundleResource {
    pub resource: Resource,
    pub source_map: Option<Vec<u8>>,
}

impl BundleResource {
    pub fn new(resource: Resource, source_map: Option<Vec<u8>>) -> Self {
        Self { resource, source_map }
    }

    /// Write the bundle at its normal asset location and, if a source map
    /// is present, alongside it at `<bundle_path>.map`.
    pub fn save(&self, dest_root: &std::path::Path) -> anyhow::Result<PathBuf> {
        let path = Resource::emission_path(dest_root, None, self.resource.final_url.path(), false);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &self.resource.body_bytes)?;

        if let Some(map) = &self.source_map {
            let mut map_path = path.clone().into_os_string();
            map_path.push(".map");
            std::fs::write(&map_path, map)?;
        }

        Ok(path)
    }
}
