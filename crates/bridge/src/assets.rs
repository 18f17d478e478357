//! Mapping of enhancer asset URLs onto files shipped with the enhancer.
//!
//! The desktop host serves every request under [`enhancer_base_url`] from a
//! local directory instead of the network.

use std::path::{Path, PathBuf};

use enhancer_core::constants::ENHANCER_ASSET_PATH;

/// Base URL for enhancer assets inside the app at `app_url`. Always ends
/// with `/`.
#[must_use]
pub fn enhancer_base_url(app_url: &str) -> String {
    format!("{}/{ENHANCER_ASSET_PATH}/", app_url.trim_end_matches('/'))
}

/// Local file that `url` refers to, when `url` lies under `base`.
///
/// Query strings and fragments are ignored. Returns `None` for URLs outside
/// `base`, for the base itself, and for paths that would climb out of
/// `root`.
#[must_use]
pub fn resolve_enhancer_asset(url: &str, base: &str, root: &Path) -> Option<PathBuf> {
    let rest = url.strip_prefix(base)?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();

    let mut path = root.to_path_buf();
    let mut segments = 0usize;
    for segment in rest.split('/') {
        match segment {
            "" | "." => {},
            ".." => return None,
            s if s.contains(['\\', ':']) => return None,
            s => {
                path.push(s);
                segments += 1;
            },
        }
    }
    (segments > 0).then_some(path)
}
