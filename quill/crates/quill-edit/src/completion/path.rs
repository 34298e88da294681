//! Filesystem path and executable completion.

use super::base::{Completer, CompleteEvent, Completion, Completions};
use crate::document::{char_len, Document};
use crate::history::expand_user;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

type PathsFn = Box<dyn Fn() -> Vec<PathBuf> + Send + Sync>;
type FilterFn = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// Completes file and directory names relative to a set of base paths.
pub struct PathCompleter {
    only_directories: bool,
    get_paths: PathsFn,
    file_filter: FilterFn,
    min_input_len: usize,
    expanduser: bool,
}

impl fmt::Debug for PathCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathCompleter")
            .field("only_directories", &self.only_directories)
            .field("min_input_len", &self.min_input_len)
            .field("expanduser", &self.expanduser)
            .finish_non_exhaustive()
    }
}

impl Default for PathCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCompleter {
    /// Completes paths relative to the working directory.
    pub fn new() -> Self {
        Self {
            only_directories: false,
            get_paths: Box::new(|| vec![PathBuf::from(".")]),
            file_filter: Box::new(|_| true),
            min_input_len: 0,
            expanduser: false,
        }
    }

    /// Offer directories only.
    pub fn only_directories(mut self, value: bool) -> Self {
        self.only_directories = value;
        self
    }

    /// Base directories searched for relative input.
    pub fn get_paths(mut self, get_paths: impl Fn() -> Vec<PathBuf> + Send + Sync + 'static) -> Self {
        self.get_paths = Box::new(get_paths);
        self
    }

    /// Keeps only files for which `filter` returns true. Directories are
    /// always offered.
    pub fn file_filter(mut self, filter: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        self.file_filter = Box::new(filter);
        self
    }

    /// Do not complete until this many characters were typed.
    pub fn min_input_len(mut self, len: usize) -> Self {
        self.min_input_len = len;
        self
    }

    /// Expand a leading `~`.
    pub fn expanduser(mut self, value: bool) -> Self {
        self.expanduser = value;
        self
    }

    fn candidates(&self, text: &str) -> Vec<(PathBuf, String, String)> {
        let text = if self.expanduser {
            expand_user(Path::new(text)).to_string_lossy().into_owned()
        } else {
            text.to_string()
        };
        let (dir_part, prefix) = match text.rfind('/') {
            Some(i) => (Some(&text[..=i]), &text[i + 1..]),
            None => (None, text.as_str()),
        };
        let directories: Vec<PathBuf> = match dir_part {
            Some(dir) => (self.get_paths)().iter().map(|p| p.join(dir)).collect(),
            None => (self.get_paths)(),
        };

        let mut found = Vec::new();
        for directory in directories {
            let Ok(entries) = fs::read_dir(&directory) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with(prefix) {
                    let rest = name[prefix.len()..].to_string();
                    found.push((directory.join(&name), name, rest));
                }
            }
        }
        found.sort_by(|a, b| a.1.cmp(&b.1));
        found
    }
}

impl Completer for PathCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, _event: &CompleteEvent) -> Completions<'a> {
        let text = document.text_before_cursor();
        if char_len(text) < self.min_input_len {
            return Box::new(std::iter::empty());
        }
        let completions: Vec<Completion> = self
            .candidates(text)
            .into_iter()
            .filter_map(|(full, mut name, rest)| {
                if full.is_dir() {
                    name.push('/');
                } else if self.only_directories || !(self.file_filter)(&full) {
                    return None;
                }
                Some(Completion::new(rest, 0).with_display(name))
            })
            .collect();
        Box::new(completions.into_iter())
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Completes executables found on `PATH`.
#[derive(Debug)]
pub struct ExecutableCompleter {
    inner: PathCompleter,
}

impl Default for ExecutableCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutableCompleter {
    /// Creates the completer. `PATH` is read at completion time.
    pub fn new() -> Self {
        Self {
            inner: PathCompleter::new()
                .min_input_len(1)
                .expanduser(true)
                .get_paths(|| {
                    std::env::var_os("PATH")
                        .map(|p| std::env::split_paths(&p).collect())
                        .unwrap_or_default()
                })
                .file_filter(is_executable),
        }
    }
}

impl Completer for ExecutableCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a> {
        self.inner.get_completions(document, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("alpha.txt"), "").unwrap();
        fs::write(dir.path().join("alpine.rs"), "").unwrap();
        fs::create_dir(dir.path().join("albums")).unwrap();
        fs::write(dir.path().join("albums").join("one.mp3"), "").unwrap();
        dir
    }

    fn complete(completer: &PathCompleter, text: &str) -> Vec<(String, String)> {
        completer
            .get_completions(&Document::new(text), &CompleteEvent::requested())
            .map(|c| (c.text.clone(), c.display_text()))
            .collect()
    }

    #[test]
    fn test_lists_matching_entries_sorted() {
        let dir = fixture();
        let base = dir.path().to_path_buf();
        let completer = PathCompleter::new().get_paths(move || vec![base.clone()]);
        assert_eq!(
            complete(&completer, "al"),
            vec![
                ("bums".to_string(), "albums/".to_string()),
                ("pha.txt".to_string(), "alpha.txt".to_string()),
                ("pine.rs".to_string(), "alpine.rs".to_string()),
            ]
        );
        assert_eq!(complete(&completer, "albums/o"), vec![("ne.mp3".to_string(), "one.mp3".to_string())]);
    }

    #[test]
    fn test_only_directories_and_filter() {
        let dir = fixture();
        let base = dir.path().to_path_buf();
        let dirs_only = PathCompleter::new()
            .only_directories(true)
            .get_paths(move || vec![base.clone()]);
        assert_eq!(complete(&dirs_only, "al").len(), 1);

        let base = dir.path().to_path_buf();
        let rust_only = PathCompleter::new()
            .get_paths(move || vec![base.clone()])
            .file_filter(|p| p.extension().is_some_and(|e| e == "rs"));
        let names: Vec<String> = complete(&rust_only, "al").into_iter().map(|(_, d)| d).collect();
        assert_eq!(names, vec!["albums/", "alpine.rs"]);
    }

    #[test]
    fn test_min_input_len() {
        let dir = fixture();
        let base = dir.path().to_path_buf();
        let completer = PathCompleter::new()
            .min_input_len(3)
            .get_paths(move || vec![base.clone()]);
        assert!(complete(&completer, "al").is_empty());
        assert_eq!(complete(&completer, "alp").len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_filter() {
        use std::os::unix::fs::PermissionsExt;
        let dir = fixture();
        let script = dir.path().join("alrun");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(is_executable(&script));
        assert!(!is_executable(&dir.path().join("alpha.txt")));
    }
}
