// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::path::{Path, PathBuf};

use path_clean::clean;

pub type FindInParent = fn(&Path, &str) -> Option<PathBuf>;

/// Walk up from `path` looking for `filename`
pub fn find_in_parent(path: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = PathBuf::from(path);

    loop {
        let file_path = current.join(filename);
        if file_path.exists() {
            return Some(file_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// An explicit cli file wins, then the nearest file above cwd, then the default config dir
pub fn resolve_config_path<P: Into<PathBuf>>(
    find_in_parent: FindInParent,
    cwd: P,
    default_config_dir: P,
    default_filename: &str,
    cli_file: Option<P>,
) -> PathBuf {
    let cwd = cwd.into();

    if let Some(cli_file) = cli_file.map(Into::into) {
        if cli_file.is_absolute() {
            return cli_file;
        }
        return clean(cwd.join(cli_file));
    }

    if let Some(found) = find_in_parent(&cwd, default_filename) {
        return found;
    }

    clean(default_config_dir.into().join(default_filename))
}

#[cfg(test)]
mod tests {
    use super::resolve_config_path;
    use std::path::{Path, PathBuf};

    const NAME: &str = "cipherbatch.config.yaml";

    fn not_found(_: &Path, _: &str) -> Option<PathBuf> {
        None
    }

    fn found(_: &Path, _: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/srv/ledger/cipherbatch.config.yaml"))
    }

    #[test]
    fn falls_back_to_default_dir() {
        let path = resolve_config_path(
            not_found,
            PathBuf::from("/srv/ledger/batch"),
            PathBuf::from("/home/op/.config/cipherbatch"),
            NAME,
            None,
        );
        assert_eq!(
            path,
            PathBuf::from("/home/op/.config/cipherbatch/cipherbatch.config.yaml")
        );
    }

    #[test]
    fn cli_file_overrides_search() {
        let path = resolve_config_path(
            found,
            PathBuf::from("/srv/ledger/batch"),
            PathBuf::from("/home/op/.config/cipherbatch"),
            NAME,
            Some(PathBuf::from("/etc/cb.yaml")),
        );
        assert_eq!(path, PathBuf::from("/etc/cb.yaml"));

        let path = resolve_config_path(
            found,
            PathBuf::from("/srv/ledger/batch"),
            PathBuf::from("/home/op/.config/cipherbatch"),
            NAME,
            Some(PathBuf::from("../cb.yaml")),
        );
        assert_eq!(path, PathBuf::from("/srv/ledger/cb.yaml"));
    }

    #[test]
    fn search_result_beats_default() {
        let path = resolve_config_path(
            found,
            PathBuf::from("/srv/ledger/batch"),
            PathBuf::from("/home/op/.config/cipherbatch"),
            NAME,
            None,
        );
        assert_eq!(path, PathBuf::from("/srv/ledger/cipherbatch.config.yaml"));
    }
}
