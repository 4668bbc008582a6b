//! Sliced file name → target path derivation.
//!
//! Object files `{src}.{load}.{suffix}` land in
//! `base/{dst}/{load[1..]}{suffix[..3]}/{load[1..]}{suffix}`, resource files
//! `{src}.{load}` in `base/{dst}/RES/{load[1..]}`. Slicing is by character,
//! never by byte.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tapemig_core::{LinkTask, NameLookup, PathShape, TransformError};

/// Directory that collects resource-shaped files under a destination.
pub const RESOURCE_DIR: &str = "RES";

const BUCKET_SUFFIX_CHARS: usize = 3;

/// Pure mapping from a sliced file to its link target.
#[derive(Clone)]
pub struct PathTransformer {
    lookup: Arc<dyn NameLookup>,
}

impl PathTransformer {
    /// Build a transformer resolving identifiers through `lookup`.
    #[must_use]
    pub const fn new(lookup: Arc<dyn NameLookup>) -> Self {
        Self { lookup }
    }

    /// Target path for `source` below `target_base`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::UnsupportedPath`] when the file name has
    /// neither shape and [`TransformError::MappingNotFound`] when the source
    /// identifier is unmapped.
    pub fn transform(&self, source: &Path, target_base: &Path) -> Result<PathBuf, TransformError> {
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| TransformError::UnsupportedPath {
                path: source.to_path_buf(),
                components: 0,
            })?;
        let shape =
            PathShape::classify(file_name).map_err(|components| TransformError::UnsupportedPath {
                path: source.to_path_buf(),
                components,
            })?;
        let dst = self.lookup.resolve(shape.src())?;

        let (dir, leaf) = match shape {
            PathShape::Object {
                load_id, suffix, ..
            } => {
                let load = drop_first_char(load_id);
                let bucket = format!("{load}{}", leading_chars(suffix, BUCKET_SUFFIX_CHARS));
                (target_base.join(dst).join(bucket), format!("{load}{suffix}"))
            }
            PathShape::Resource { load_id, .. } => (
                target_base.join(dst).join(RESOURCE_DIR),
                drop_first_char(load_id).to_string(),
            ),
        };
        // An empty leaf would name the bucket directory itself.
        if leaf.is_empty() {
            return Err(TransformError::UnsupportedPath {
                path: source.to_path_buf(),
                components: file_name.split('.').count(),
            });
        }
        let target = dir.join(leaf);
        Ok(target)
    }

    /// Link task pairing `source` with its derived target.
    ///
    /// # Errors
    ///
    /// Propagates any [`PathTransformer::transform`] failure.
    pub fn task(&self, source: &Path, target_base: &Path) -> Result<LinkTask, TransformError> {
        Ok(LinkTask {
            source_file: source.to_path_buf(),
            target_path: self.transform(source, target_base)?,
        })
    }
}

impl std::fmt::Debug for PathTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathTransformer").finish_non_exhaustive()
    }
}

fn drop_first_char(value: &str) -> &str {
    value.char_indices().nth(1).map_or("", |(idx, _)| &value[idx..])
}

fn leading_chars(value: &str, count: usize) -> &str {
    value
        .char_indices()
        .nth(count)
        .map_or(value, |(idx, _)| &value[..idx])
}
