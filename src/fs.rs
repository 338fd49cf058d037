use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// One entry of a directory listing.
///
/// `is_file` and `is_dir` describe the link target when `is_symlink` is set;
/// a dangling link has both false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub name: String,
    pub is_file: bool,
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// Read-only view of a filesystem, as consumed by the pattern engine.
pub trait FileSystem {
    /// List the direct children of a directory, sorted by name.
    fn list_directory(&self, path: &Path) -> io::Result<Vec<FsEntry>>;

    /// Whether something exists at `path` (following symlinks).
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Canonical absolute path with every symlink resolved.
    fn real_path(&self, path: &Path) -> io::Result<PathBuf>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn list_directory(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
        let mut entries = Vec::new();
        let walker = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_symlink = entry.path_is_symlink();
            let (is_file, is_dir) = if is_symlink {
                match std::fs::metadata(entry.path()) {
                    Ok(target) => (target.is_file(), target.is_dir()),
                    Err(_) => (false, false),
                }
            } else {
                let file_type = entry.file_type();
                (file_type.is_file(), file_type.is_dir())
            };
            entries.push(FsEntry {
                name,
                is_file,
                is_dir,
                is_symlink,
            });
        }

        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        dunce::canonicalize(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(String),
    Symlink(PathBuf),
}

const MAX_LINK_HOPS: usize = 32;

/// In-memory filesystem with absolute paths, used to exercise the engine
/// against trees that are awkward to build on disk (case-insensitive
/// volumes, escaping links).
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    nodes: BTreeMap<PathBuf, Node>,
    case_insensitive: bool,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir);
        Self {
            nodes,
            case_insensitive: false,
        }
    }

    /// Resolve names case-insensitively, like a default macOS volume.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: &str) -> &mut Self {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.nodes
            .insert(path.to_path_buf(), Node::File(contents.to_string()));
        self
    }

    /// Add a symlink at `path` pointing to the absolute `target`.
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.nodes
            .insert(path.to_path_buf(), Node::Symlink(target.as_ref().to_path_buf()));
        self
    }

    fn ensure_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(dir) = parent {
            self.nodes.entry(dir.to_path_buf()).or_insert(Node::Dir);
            parent = dir.parent();
        }
    }

    fn find_child(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        let exact = dir.join(name);
        if self.nodes.contains_key(&exact) {
            return Some(exact);
        }
        if !self.case_insensitive {
            return None;
        }
        let wanted = name.to_lowercase();
        self.children(dir)
            .find(|child| {
                child
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase() == wanted)
                    .unwrap_or(false)
            })
            .cloned()
    }

    fn children<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = &'a PathBuf> + 'a {
        self.nodes
            .keys()
            .filter(move |p| p.parent() == Some(dir) && p.as_path() != dir)
    }

    /// Resolve `path` to the stored key of the node it names, following
    /// symlinks on every component (and on the last one when `follow_last`).
    fn resolve(&self, path: &Path, follow_last: bool, hops: usize) -> io::Result<PathBuf> {
        if hops > MAX_LINK_HOPS {
            return Err(io::Error::new(io::ErrorKind::Other, "too many levels of symbolic links"));
        }

        let components: Vec<Component<'_>> = path.components().collect();
        let mut current = PathBuf::from("/");
        for (idx, component) in components.iter().enumerate() {
            let is_last = idx + 1 == components.len();
            match component {
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
                Component::ParentDir => {
                    current.pop();
                }
                Component::Normal(name) => {
                    let child = self
                        .find_child(&current, &name.to_string_lossy())
                        .ok_or_else(|| not_found(path))?;
                    match self.nodes.get(&child) {
                        Some(Node::Symlink(target)) if !is_last || follow_last => {
                            current = self.resolve(target, true, hops + 1)?;
                        }
                        Some(_) => current = child,
                        None => return Err(not_found(path)),
                    }
                }
            }
        }
        Ok(current)
    }

    fn node(&self, path: &Path) -> io::Result<&Node> {
        let resolved = self.resolve(path, true, 0)?;
        self.nodes.get(&resolved).ok_or_else(|| not_found(path))
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

impl FileSystem for MemoryFileSystem {
    fn list_directory(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
        let dir = self.resolve(path, true, 0)?;
        if !matches!(self.nodes.get(&dir), Some(Node::Dir)) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("not a directory: {}", path.display()),
            ));
        }

        let mut entries = Vec::new();
        for child in self.children(&dir) {
            let name = match child.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            let is_symlink = matches!(self.nodes.get(child), Some(Node::Symlink(_)));
            let target = self.node(child).ok();
            entries.push(FsEntry {
                name,
                is_file: matches!(target, Some(Node::File(_))),
                is_dir: matches!(target, Some(Node::Dir)),
                is_symlink,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        self.node(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.node(path), Ok(Node::Dir))
    }

    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        self.resolve(path, true, 0)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.node(path)? {
            Node::File(contents) => Ok(contents.clone()),
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("not a file: {}", path.display()),
            )),
        }
    }
}
