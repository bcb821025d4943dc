//! Sector layout of an image, computed in a single pass before any byte is written.

use crate::{
  error::{Error, Result},
  fs::{DirectoryId, FileId, Tree},
  lba::{self, LbaAllocator, SECTOR_SIZE, SYSTEM_AREA_SECTORS},
  name,
  spec::{self, DirectoryRecord, Identifier, PathTableRecord},
};
use std::collections::VecDeque;

/// Contiguous run of sectors holding `length` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
  pub lba: u32,
  pub length: u32,
}

impl Extent {
  pub fn sectors(&self) -> u32 {
    lba::sectors_for(self.length as u64) as u32
  }

  pub fn byte_offset(&self) -> u64 {
    self.lba as u64 * SECTOR_SIZE as u64
  }
}

/// Name space a directory hierarchy is recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
  Iso9660,
  Joliet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryChild {
  Directory(DirectoryId),
  File(FileId),
}

/// A directory as recorded in one name space.
#[derive(Debug, Clone)]
pub struct PlannedDirectory {
  pub id: DirectoryId,
  /// Identifier of this directory in its parent and in the path table.
  pub identifier: Identifier,
  /// 1-based path table number of the parent; the root is its own parent.
  pub parent_number: u16,
  pub extent: Extent,
  /// Children sorted by identifier, excluding `.` and `..`.
  pub children: Vec<(Identifier, DirectoryChild)>,
}

/// Path tables and directory extents of one name space.
#[derive(Debug, Clone)]
pub struct NamespaceLayout {
  pub namespace: Namespace,
  pub path_table_size: u32,
  pub type_l_path_table: u32,
  pub type_m_path_table: u32,
  /// Directories in path table order; the root comes first.
  pub directories: Vec<PlannedDirectory>,
  /// Position of every directory in `directories`, indexed by [`DirectoryId`].
  positions: Vec<usize>,
}

impl NamespaceLayout {
  pub fn root(&self) -> &PlannedDirectory {
    &self.directories[0]
  }

  pub fn directory(&self, id: DirectoryId) -> &PlannedDirectory {
    &self.directories[self.positions[id.0]]
  }
}

/// Sectors of the volume descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorLayout {
  pub primary: u32,
  pub boot_record: Option<u32>,
  pub supplementary: Option<u32>,
  pub terminator: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
  SystemArea,
  VolumeDescriptor,
  PathTable(Namespace),
  Directory(Namespace, DirectoryId),
  BootCatalog,
  File(FileId),
}

/// A planned object and the sectors it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
  pub kind: RegionKind,
  pub lba: u32,
  pub sectors: u32,
}

/// Absolute sector of every object on the image. Read-only once planned.
#[derive(Debug, Clone)]
pub struct LayoutPlan {
  pub descriptors: DescriptorLayout,
  pub iso: NamespaceLayout,
  pub joliet: Option<NamespaceLayout>,
  pub boot_catalog: Option<u32>,
  pub boot_file: Option<FileId>,
  /// File extents indexed by [`FileId`].
  pub files: Vec<Extent>,
  pub total_sectors: u32,
}

impl LayoutPlan {
  pub fn file_extent(&self, id: FileId) -> Extent {
    self.files[id.0]
  }

  pub fn image_size(&self) -> u64 {
    self.total_sectors as u64 * SECTOR_SIZE as u64
  }

  /// Every planned object in sector order.
  pub fn regions(&self) -> Vec<Region> {
    let mut regions = vec![Region {
      kind: RegionKind::SystemArea,
      lba: 0,
      sectors: SYSTEM_AREA_SECTORS,
    }];

    let descriptors = [
      Some(self.descriptors.primary),
      self.descriptors.boot_record,
      self.descriptors.supplementary,
      Some(self.descriptors.terminator),
    ];
    regions.extend(descriptors.into_iter().flatten().map(|lba| Region {
      kind: RegionKind::VolumeDescriptor,
      lba,
      sectors: 1,
    }));

    let namespaces = || std::iter::once(&self.iso).chain(self.joliet.as_ref());

    for layout in namespaces() {
      let sectors = lba::sectors_for(layout.path_table_size as u64) as u32;
      for lba in [layout.type_l_path_table, layout.type_m_path_table] {
        regions.push(Region {
          kind: RegionKind::PathTable(layout.namespace),
          lba,
          sectors,
        });
      }
    }

    for layout in namespaces() {
      regions.extend(layout.directories.iter().map(|dir| Region {
        kind: RegionKind::Directory(layout.namespace, dir.id),
        lba: dir.extent.lba,
        sectors: dir.extent.sectors(),
      }));
    }

    if let Some(lba) = self.boot_catalog {
      regions.push(Region {
        kind: RegionKind::BootCatalog,
        lba,
        sectors: 1,
      });
    }

    regions.extend(self.files.iter().enumerate().map(|(ix, extent)| Region {
      kind: RegionKind::File(FileId(ix)),
      lba: extent.lba,
      sectors: extent.sectors(),
    }));

    regions
  }
}

/// Offsets of directory records packed into sectors, where a record never
/// straddles a sector boundary. Returns the offsets and the whole-sector length.
pub(crate) fn pack_directory_records(lengths: impl IntoIterator<Item = usize>) -> (Vec<usize>, u32) {
  let sector_size = SECTOR_SIZE as usize;
  let mut offsets = vec![];
  let mut sector = 0;
  let mut used = 0;

  for len in lengths {
    if used + len > sector_size {
      sector += 1;
      used = 0;
    }

    offsets.push(sector * sector_size + used);
    used += len;
  }

  (offsets, ((sector + 1) * sector_size) as u32)
}

/// Lengths of the `.` and `..` records followed by every child record.
pub(crate) fn directory_record_lengths(dir: &PlannedDirectory) -> impl Iterator<Item = usize> + '_ {
  let dot = DirectoryRecord::extent_for(1);

  [dot, dot].into_iter().chain(
    dir
      .children
      .iter()
      .map(|(identifier, _)| DirectoryRecord::extent_for(identifier.len())),
  )
}

pub struct LayoutPlanner {
  joliet: bool,
}

impl LayoutPlanner {
  pub fn new(joliet: bool) -> Self {
    Self { joliet }
  }

  /// Assigns a sector to every descriptor, path table, directory and file of `tree`.
  ///
  /// `boot_entry` is the file the El Torito catalog points at; its presence adds a
  /// boot record descriptor and a boot catalog sector.
  pub fn plan(&self, tree: &Tree, boot_entry: Option<FileId>) -> Result<LayoutPlan> {
    if tree.file_count() == 0 {
      return Err(Error::EmptyImage);
    }

    validate(tree)?;

    let mut iso = order_directories(tree, Namespace::Iso9660)?;
    let mut joliet = self
      .joliet
      .then(|| order_directories(tree, Namespace::Joliet))
      .transpose()?;

    let mut allocator = LbaAllocator::new(SECTOR_SIZE, SYSTEM_AREA_SECTORS);
    let descriptor_size = spec::DESCRIPTOR_SIZE as u64;

    let descriptors = DescriptorLayout {
      primary: allocator.allocate(descriptor_size)?,
      boot_record: boot_entry
        .map(|_| allocator.allocate(descriptor_size))
        .transpose()?,
      supplementary: joliet
        .as_ref()
        .map(|_| allocator.allocate(descriptor_size))
        .transpose()?,
      terminator: allocator.allocate(descriptor_size)?,
    };

    for layout in std::iter::once(&mut iso).chain(joliet.as_mut()) {
      layout.type_l_path_table = allocator.allocate(layout.path_table_size as u64)?;
      layout.type_m_path_table = allocator.allocate(layout.path_table_size as u64)?;
    }

    for layout in std::iter::once(&mut iso).chain(joliet.as_mut()) {
      for dir in layout.directories.iter_mut() {
        let (_, length) = pack_directory_records(directory_record_lengths(dir));
        dir.extent = Extent {
          lba: allocator.allocate(length as u64)?,
          length,
        };
      }
    }

    let boot_catalog = boot_entry
      .map(|_| allocator.allocate(descriptor_size))
      .transpose()?;

    let mut files = Vec::with_capacity(tree.file_count());

    for (id, file) in tree.files() {
      let length = u32::try_from(file.size()).map_err(|_| Error::FileTooLarge {
        name: file.joliet_name().to_string(),
        size: file.size(),
      })?;
      let extent = Extent {
        lba: allocator.allocate(file.size())?,
        length,
      };

      log::debug!(
        "Planned file {:?} ({:?}) at LBA {} ({} bytes)",
        file.iso_name(),
        id,
        extent.lba,
        extent.length
      );

      files.push(extent);
    }

    let plan = LayoutPlan {
      descriptors,
      iso,
      joliet,
      boot_catalog,
      boot_file: boot_entry,
      files,
      total_sectors: allocator.next_lba(),
    };

    log::info!(
      "Planned {} sectors: {} directories, {} files",
      plan.total_sectors,
      tree.directory_count(),
      tree.file_count()
    );

    Ok(plan)
  }
}

fn validate(tree: &Tree) -> Result<()> {
  let check_joliet = |name: &str, units: &[u16]| {
    if units.is_empty() || units.len() > spec::JOLIET_MAX_UNITS {
      return Err(Error::InvalidName {
        name: name.to_string(),
        reason: "Joliet name must be 1 to 64 UCS-2 code units",
      });
    }
    Ok(())
  };

  for (_, file) in tree.files() {
    name::validate_file_identifier(file.iso_name())?;
    check_joliet(file.joliet_name(), &file.joliet_units)?;
  }

  for ix in 1..tree.directory_count() {
    let dir = tree.directory(DirectoryId(ix));
    name::validate_directory_identifier(dir.iso_name().unwrap_or_default())?;
    check_joliet(dir.joliet_name().unwrap_or_default(), &dir.joliet_units)?;
  }

  Ok(())
}

fn file_identifier(tree: &Tree, namespace: Namespace, id: FileId) -> Identifier {
  let file = tree.file(id);
  match namespace {
    Namespace::Iso9660 => Identifier {
      kind: spec::IdentifierKind::StandardFileIdentifier,
      bytes: file.iso_name().as_bytes().to_vec(),
    },
    Namespace::Joliet => Identifier::joliet_file_identifier(&file.joliet_units),
  }
}

fn directory_identifier(tree: &Tree, namespace: Namespace, id: DirectoryId) -> Identifier {
  let dir = tree.directory(id);
  match (namespace, dir.iso_name()) {
    (_, None) => Identifier::root_directory(),
    (Namespace::Iso9660, Some(iso_name)) => Identifier {
      kind: spec::IdentifierKind::StandardDirectoryIdentifier,
      bytes: iso_name.as_bytes().to_vec(),
    },
    (Namespace::Joliet, Some(_)) => Identifier::joliet_directory_identifier(&dir.joliet_units),
  }
}

/// Breadth-first directory order with children sorted by identifier, which is
/// the order path tables require.
fn order_directories(tree: &Tree, namespace: Namespace) -> Result<NamespaceLayout> {
  let mut directories: Vec<PlannedDirectory> = Vec::with_capacity(tree.directory_count());
  let mut positions = vec![0; tree.directory_count()];
  let mut queue = VecDeque::from([(DirectoryId::ROOT, 1u16)]);

  while let Some((id, parent_number)) = queue.pop_front() {
    let number = u16::try_from(directories.len() + 1).map_err(|_| Error::VolumeTooLarge)?;
    let dir = tree.directory(id);

    let mut children: Vec<_> = dir
      .dirs()
      .iter()
      .map(|&child| {
        (
          directory_identifier(tree, namespace, child),
          DirectoryChild::Directory(child),
        )
      })
      .chain(dir.files().iter().map(|&child| {
        (
          file_identifier(tree, namespace, child),
          DirectoryChild::File(child),
        )
      }))
      .collect();
    children.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

    for (_, child) in &children {
      if let DirectoryChild::Directory(child) = child {
        queue.push_back((*child, number));
      }
    }

    positions[id.0] = directories.len();
    directories.push(PlannedDirectory {
      id,
      identifier: directory_identifier(tree, namespace, id),
      parent_number,
      extent: Extent { lba: 0, length: 0 },
      children,
    });
  }

  let path_table_size = directories
    .iter()
    .map(|dir| PathTableRecord::extent_for(dir.identifier.len()) as u32)
    .sum();

  Ok(NamespaceLayout {
    namespace,
    path_table_size,
    type_l_path_table: 0,
    type_m_path_table: 0,
    directories,
    positions,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::path::IsoPath;

  fn tree(files: &[(&str, u64)]) -> Tree {
    let mut tree = Tree::new();
    for (name, size) in files {
      tree.insert_file(IsoPath::new(name), *size).unwrap();
    }
    tree
  }

  fn assert_contiguous(plan: &LayoutPlan) {
    let regions = plan.regions();
    let mut next = 0;

    for region in &regions {
      assert_eq!(region.lba, next, "gap or overlap before {:?}", region.kind);
      next += region.sectors;
    }

    assert_eq!(next, plan.total_sectors);
  }

  #[test]
  fn empty_tree_is_rejected() {
    assert!(matches!(
      LayoutPlanner::new(true).plan(&Tree::new(), None),
      Err(Error::EmptyImage)
    ));
  }

  #[test]
  fn single_file_layout() {
    let plan = LayoutPlanner::new(true)
      .plan(&tree(&[("readme.txt", 5)]), None)
      .unwrap();

    assert_eq!(plan.descriptors.primary, 16);
    assert_eq!(plan.descriptors.boot_record, None);
    assert_eq!(plan.descriptors.supplementary, Some(17));
    assert_eq!(plan.descriptors.terminator, 18);
    assert_eq!(plan.iso.type_l_path_table, 19);
    assert_eq!(plan.iso.type_m_path_table, 20);
    assert_eq!(plan.iso.path_table_size, 10);

    let joliet = plan.joliet.as_ref().unwrap();
    assert_eq!(joliet.type_l_path_table, 21);
    assert_eq!(joliet.type_m_path_table, 22);
    assert_eq!(plan.iso.root().extent, Extent { lba: 23, length: 2048 });
    assert_eq!(joliet.root().extent.lba, 24);
    assert_eq!(plan.file_extent(FileId(0)), Extent { lba: 25, length: 5 });
    assert_eq!(plan.total_sectors, 26);
    assert_contiguous(&plan);
  }

  #[test]
  fn boot_entry_adds_record_and_catalog() {
    let plan = LayoutPlanner::new(false)
      .plan(&tree(&[("a.txt", 3000), ("boot.img", 512)]), Some(FileId(1)))
      .unwrap();

    assert_eq!(plan.descriptors.boot_record, Some(17));
    assert_eq!(plan.descriptors.supplementary, None);
    assert_eq!(plan.descriptors.terminator, 18);
    assert!(plan.joliet.is_none());
    assert_eq!(plan.boot_catalog, Some(22));
    assert_eq!(plan.file_extent(FileId(0)).lba, 23);
    assert_eq!(plan.file_extent(FileId(1)).lba, 25);
    assert_eq!(plan.total_sectors, 26);
    assert_contiguous(&plan);
  }

  #[test]
  fn path_table_is_breadth_first_and_sorted() {
    let plan = LayoutPlanner::new(true)
      .plan(
        &tree(&[("zeta/b/x.txt", 1), ("alpha/y.txt", 1), ("zeta/a/z.txt", 1)]),
        None,
      )
      .unwrap();

    let names: Vec<_> = plan
      .iso
      .directories
      .iter()
      .map(|dir| (dir.identifier.as_bytes().to_vec(), dir.parent_number))
      .collect();

    assert_eq!(
      names,
      [
        (vec![0], 1),
        (b"ALPHA".to_vec(), 1),
        (b"ZETA".to_vec(), 1),
        (b"A".to_vec(), 3),
        (b"B".to_vec(), 3),
      ]
    );
    assert_eq!(plan.iso.path_table_size, 10 + 14 + 12 + 10 + 10);
    assert_contiguous(&plan);
  }

  #[test]
  fn zero_length_files_take_no_sectors() {
    let plan = LayoutPlanner::new(false)
      .plan(&tree(&[("empty.txt", 0), ("full.txt", 1)]), None)
      .unwrap();

    assert_eq!(plan.file_extent(FileId(0)).lba, plan.file_extent(FileId(1)).lba);
    assert_eq!(plan.file_extent(FileId(0)).sectors(), 0);
    assert_contiguous(&plan);
  }

  #[test]
  fn large_directories_span_sectors() {
    let names: Vec<_> = (0..100).map(|ix| format!("file{ix:03}.txt")).collect();
    let files: Vec<_> = names.iter().map(|name| (name.as_str(), 1)).collect();
    let plan = LayoutPlanner::new(false).plan(&tree(&files), None).unwrap();

    assert!(plan.iso.root().extent.sectors() > 1);
    assert_eq!(plan.iso.root().extent.length % 2048, 0);
    assert_contiguous(&plan);
  }

  #[test]
  fn records_never_straddle_sectors() {
    let (offsets, length) = pack_directory_records([34, 34, 1000, 1000, 46]);

    assert_eq!(offsets, [0, 34, 68, 2048, 3048]);
    assert_eq!(length, 4096);
  }

  #[test]
  fn oversized_files_are_rejected() {
    assert!(matches!(
      LayoutPlanner::new(false).plan(&tree(&[("big.bin", u32::MAX as u64 + 1)]), None),
      Err(Error::FileTooLarge { .. })
    ));
  }
}
