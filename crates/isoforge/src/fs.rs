//! Directory tree of the image, shared by the ISO 9660 and Joliet name spaces.

use crate::{
  error::{Error, Result},
  name::{self, MappedName, NameMapper},
  path::IsoPath,
};
use std::collections::HashMap;

/// Index of a directory within a [`Tree`]. The root is always `DirectoryId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectoryId(pub(crate) usize);

/// Index of a file within a [`Tree`], in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) usize);

impl DirectoryId {
  pub const ROOT: DirectoryId = DirectoryId(0);
}

/// Represents a file in the filesystem.
#[derive(Debug, Clone)]
pub struct FileEntry {
  pub(crate) name: MappedName,
  pub(crate) joliet_units: Vec<u16>,
  pub(crate) size: u64,
  pub(crate) parent: DirectoryId,
}

impl FileEntry {
  pub fn iso_name(&self) -> &str {
    &self.name.iso
  }

  pub fn joliet_name(&self) -> &str {
    &self.name.joliet
  }

  pub fn size(&self) -> u64 {
    self.size
  }

  pub fn parent(&self) -> DirectoryId {
    self.parent
  }
}

/// Represents a directory in the filesystem, which can contain files and subdirectories.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
  /// `None` for the root directory.
  pub(crate) name: Option<MappedName>,
  pub(crate) joliet_units: Vec<u16>,
  pub(crate) parent: Option<DirectoryId>,
  pub(crate) dirs: Vec<DirectoryId>,
  pub(crate) files: Vec<FileId>,
  mapper: NameMapper,
  /// Children keyed by the name they were requested under.
  children: HashMap<String, Child>,
}

impl DirectoryEntry {
  fn new(name: Option<MappedName>, joliet_units: Vec<u16>, parent: Option<DirectoryId>) -> Self {
    Self {
      name,
      joliet_units,
      parent,
      dirs: vec![],
      files: vec![],
      mapper: NameMapper::new(),
      children: HashMap::new(),
    }
  }

  pub fn iso_name(&self) -> Option<&str> {
    self.name.as_ref().map(|name| name.iso.as_str())
  }

  pub fn joliet_name(&self) -> Option<&str> {
    self.name.as_ref().map(|name| name.joliet.as_str())
  }

  pub fn parent(&self) -> Option<DirectoryId> {
    self.parent
  }

  pub fn dirs(&self) -> &[DirectoryId] {
    &self.dirs
  }

  pub fn files(&self) -> &[FileId] {
    &self.files
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Child {
  Directory(DirectoryId),
  File(FileId),
}

/// Files and directories of one image. Entries are immutable once inserted.
#[derive(Debug, Clone)]
pub struct Tree {
  dirs: Vec<DirectoryEntry>,
  files: Vec<FileEntry>,
}

impl Default for Tree {
  fn default() -> Self {
    Self {
      dirs: vec![DirectoryEntry::new(None, vec![], None)],
      files: vec![],
    }
  }
}

impl Tree {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn root(&self) -> &DirectoryEntry {
    &self.dirs[DirectoryId::ROOT.0]
  }

  pub fn directory(&self, id: DirectoryId) -> &DirectoryEntry {
    &self.dirs[id.0]
  }

  pub fn file(&self, id: FileId) -> &FileEntry {
    &self.files[id.0]
  }

  pub fn directory_count(&self) -> usize {
    self.dirs.len()
  }

  pub fn file_count(&self) -> usize {
    self.files.len()
  }

  /// Files in insertion order.
  pub fn files(&self) -> impl Iterator<Item = (FileId, &FileEntry)> {
    self.files.iter().enumerate().map(|(ix, file)| (FileId(ix), file))
  }

  /// Inserts a file at `path`, creating intermediate directories as needed.
  pub fn insert_file(&mut self, path: &IsoPath, size: u64) -> Result<FileId> {
    let Some(file_name) = path.file_name() else {
      return Err(Error::InvalidName {
        name: path.as_str().to_string(),
        reason: "no file name",
      });
    };

    let mut parent = DirectoryId::ROOT;

    for component in path.parent_components() {
      parent = self.directory_child(parent, component)?;
    }

    if self.dirs[parent.0].children.contains_key(file_name) {
      return Err(Error::DuplicateName(path.as_str().to_string()));
    }

    let directory = &mut self.dirs[parent.0];
    let mapped = directory.mapper.assign(file_name)?;
    let joliet_units = name::encode_joliet(&mapped.joliet)?;
    let id = FileId(self.files.len());

    log::debug!(
      "Mapped {:?} to {:?} (Joliet {:?})",
      path.as_str(),
      mapped.iso,
      mapped.joliet
    );

    directory.children.insert(file_name.to_string(), Child::File(id));
    directory.files.push(id);

    self.files.push(FileEntry {
      name: mapped,
      joliet_units,
      size,
      parent,
    });

    Ok(id)
  }

  /// Returns the child directory `name` of `parent`, creating it if missing.
  fn directory_child(&mut self, parent: DirectoryId, name: &str) -> Result<DirectoryId> {
    match self.dirs[parent.0].children.get(name) {
      Some(Child::Directory(id)) => return Ok(*id),
      Some(Child::File(_)) => return Err(Error::DuplicateName(name.to_string())),
      None => {}
    }

    let mapped = self.dirs[parent.0].mapper.assign_directory(name)?;
    let joliet_units = name::encode_joliet(&mapped.joliet)?;
    let id = DirectoryId(self.dirs.len());

    log::debug!("Mapped directory {:?} to {:?}", name, mapped.iso);

    let directory = &mut self.dirs[parent.0];
    directory.children.insert(name.to_string(), Child::Directory(id));
    directory.dirs.push(id);

    self
      .dirs
      .push(DirectoryEntry::new(Some(mapped), joliet_units, Some(parent)));

    Ok(id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn creates_intermediate_directories_once() {
    let mut tree = Tree::new();

    let a = tree.insert_file(IsoPath::new("FILES/test.txt"), 4).unwrap();
    let b = tree.insert_file(IsoPath::new("FILES/other.txt"), 5).unwrap();
    let c = tree.insert_file(IsoPath::new("autorun.inf"), 6).unwrap();

    assert_eq!(tree.directory_count(), 2);
    assert_eq!(tree.file(a).parent(), tree.file(b).parent());
    assert_eq!(tree.file(c).parent(), DirectoryId::ROOT);

    let files_dir = tree.directory(tree.file(a).parent());
    assert_eq!(files_dir.iso_name(), Some("FILES"));
    assert_eq!(files_dir.files(), &[a, b]);
    assert_eq!(tree.root().dirs().len(), 1);
    assert_eq!(tree.file(a).iso_name(), "TEST.TXT;1");
  }

  #[test]
  fn duplicate_paths_are_rejected() {
    let mut tree = Tree::new();

    tree.insert_file(IsoPath::new("a/readme.txt"), 1).unwrap();

    assert!(matches!(
      tree.insert_file(IsoPath::new("a\\readme.txt"), 1),
      Err(Error::DuplicateName(_))
    ));
    assert!(matches!(
      tree.insert_file(IsoPath::new("a/readme.txt/inner"), 1),
      Err(Error::DuplicateName(_))
    ));
  }

  #[test]
  fn names_collide_per_directory_only() {
    let mut tree = Tree::new();

    let a = tree.insert_file(IsoPath::new("readme.txt"), 1).unwrap();
    let b = tree.insert_file(IsoPath::new("sub/readme.txt"), 1).unwrap();
    let c = tree.insert_file(IsoPath::new("README.TXT"), 1).unwrap();

    assert_eq!(tree.file(a).iso_name(), "README.TXT;1");
    assert_eq!(tree.file(b).iso_name(), "README.TXT;1");
    assert_eq!(tree.file(c).iso_name(), "README1.TXT;1");
    assert_eq!(tree.file(c).joliet_name(), "README.TXT");
  }

  #[test]
  fn names_equal_after_cutting_are_distinct_entries() {
    let mut tree = Tree::new();
    let long = "d".repeat(70);

    let a = tree
      .insert_file(IsoPath::new(&format!("{long}/{}", "x".repeat(70) + "1.txt")), 1)
      .unwrap();
    let b = tree
      .insert_file(IsoPath::new(&format!("{long}/{}", "x".repeat(70) + "2.txt")), 1)
      .unwrap();
    let c = tree
      .insert_file(IsoPath::new(&format!("{long}1/c.txt")), 1)
      .unwrap();

    assert_eq!(tree.file(a).parent(), tree.file(b).parent());
    assert_ne!(tree.file(a).joliet_name(), tree.file(b).joliet_name());
    assert_eq!(tree.directory_count(), 3);
    assert_eq!(
      tree.directory(tree.file(c).parent()).joliet_name(),
      Some(format!("{}~1", "d".repeat(62)).as_str())
    );
  }

  #[test]
  fn path_without_file_name_is_invalid() {
    assert!(matches!(
      Tree::new().insert_file(IsoPath::new("//"), 1),
      Err(Error::InvalidName { .. })
    ));
  }
}
