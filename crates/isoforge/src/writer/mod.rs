//! Serialization of a planned image into a byte stream, in sector order.

use crate::{
  eltorito::BootCatalogSector,
  error::{Error, Result},
  fs::Tree,
  layout::{self, DirectoryChild, LayoutPlan, NamespaceLayout, PlannedDirectory},
  lba::SECTOR_SIZE,
  manifest::Source,
  serialize::{Endianness, IsoSerialize},
  spec::{self, FileFlags, Identifier},
};
use std::{
  io::Write,
  sync::atomic::{AtomicBool, Ordering},
};

pub mod path_table;
pub mod sector;
pub mod volume;

pub use sector::SectorWriter;
pub use volume::{VolumeDescriptorSet, VolumeOptions};

/// Emits descriptors, path tables, directories and file data of a [`LayoutPlan`].
pub struct ImageWriter<'p> {
  plan: &'p LayoutPlan,
  tree: &'p Tree,
  descriptors: &'p VolumeDescriptorSet,
  recording_date: spec::NumericalDate,
  boot_catalog: Option<&'p BootCatalogSector>,
  cancel: Option<&'p AtomicBool>,
}

impl<'p> ImageWriter<'p> {
  pub fn new(
    plan: &'p LayoutPlan,
    tree: &'p Tree,
    descriptors: &'p VolumeDescriptorSet,
    recording_time: chrono::DateTime<chrono::Utc>,
  ) -> Self {
    Self {
      plan,
      tree,
      descriptors,
      recording_date: recording_time.into(),
      boot_catalog: None,
      cancel: None,
    }
  }

  pub fn with_boot_catalog(mut self, boot_catalog: &'p BootCatalogSector) -> Self {
    self.boot_catalog = Some(boot_catalog);
    self
  }

  /// Flag polled between stages and before every file; once set the write
  /// stops with [`Error::Cancelled`].
  pub fn with_cancel_flag(mut self, cancel: &'p AtomicBool) -> Self {
    self.cancel = Some(cancel);
    self
  }

  fn check_cancelled(&self) -> Result<()> {
    match self.cancel {
      Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
      _ => Ok(()),
    }
  }

  /// Writes the whole image to `sink`. `sources` holds the bytes of every file
  /// in [`crate::fs::FileId`] order; each one is dropped right after its data is written.
  pub fn write<'s, W: Write>(&self, sources: Vec<Source<'s>>, sink: W) -> Result<W> {
    if sources.len() != self.plan.files.len() {
      return Err(Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!(
          "{} sources supplied for {} planned files",
          sources.len(),
          self.plan.files.len()
        ),
      )));
    }

    let mut writer = SectorWriter::new(sink, SECTOR_SIZE as u64);

    // 1. Volume descriptors, after the zero filled system area.

    self.check_cancelled()?;
    self.descriptors.write(self.plan, &mut writer)?;

    // 2. Path tables, type L then type M for each name space.

    self.check_cancelled()?;

    for layout in self.namespaces() {
      let table = path_table::PathTable::from_layout(layout);
      table.write(&mut writer, layout.type_l_path_table, Endianness::Little)?;
      table.write(&mut writer, layout.type_m_path_table, Endianness::Big)?;
    }

    // 3. Directory records.

    self.check_cancelled()?;

    for layout in self.namespaces() {
      for dir in &layout.directories {
        self.write_directory(&mut writer, layout, dir)?;
      }
    }

    // 4. Boot catalog.

    if let (Some(catalog), Some(lba)) = (self.boot_catalog, self.plan.boot_catalog) {
      writer.seek_lba(lba)?;
      writer.write_all(catalog.as_bytes())?;
    }

    // 5. File data, in insertion order.

    for ((id, file), source) in self.tree.files().zip(sources) {
      self.check_cancelled()?;

      let extent = self.plan.file_extent(id);

      log::debug!(
        "Writing file content (ext. LBA {}): {}",
        extent.lba,
        file.joliet_name()
      );

      writer.seek_lba(extent.lba)?;
      source.write_to(file.joliet_name(), &mut writer)?;
    }

    writer.seek_lba(self.plan.total_sectors)?;
    writer.flush()?;

    log::info!(
      "Wrote {} sectors ({} bytes)",
      self.plan.total_sectors,
      writer.position()
    );

    Ok(writer.into_inner())
  }

  fn namespaces(&self) -> impl Iterator<Item = &'p NamespaceLayout> {
    std::iter::once(&self.plan.iso).chain(self.plan.joliet.as_ref())
  }

  fn write_directory<W: Write>(
    &self,
    writer: &mut SectorWriter<W>,
    layout: &NamespaceLayout,
    dir: &PlannedDirectory,
  ) -> Result<()> {
    let parent = &layout.directories[dir.parent_number as usize - 1];
    let (offsets, length) = layout::pack_directory_records(layout::directory_record_lengths(dir));

    let dot = volume::directory_record(
      dir.extent,
      &self.recording_date,
      FileFlags::DIRECTORY,
      Identifier::current_directory(),
    );
    let dotdot = volume::directory_record(
      parent.extent,
      &self.recording_date,
      FileFlags::DIRECTORY,
      Identifier::parent_directory(),
    );
    let children = dir.children.iter().map(|(identifier, child)| {
      let (extent, flags) = match child {
        DirectoryChild::Directory(id) => (layout.directory(*id).extent, FileFlags::DIRECTORY),
        DirectoryChild::File(id) => (self.plan.file_extent(*id), FileFlags::empty()),
      };
      volume::directory_record(extent, &self.recording_date, flags, identifier.clone())
    });

    let mut buf = vec![0u8; length as usize];

    for (record, offset) in [dot, dotdot].into_iter().chain(children).zip(offsets) {
      log::debug!("Writing directory record: {:?}", record);
      record.serialize(&mut (), &mut buf[offset..])?;
    }

    writer.seek_lba(dir.extent.lba)?;
    writer.write_all(&buf)?;

    Ok(())
  }
}
