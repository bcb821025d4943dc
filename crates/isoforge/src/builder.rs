//! High-level interface for building ISO 9660 images with optional Joliet and El Torito extensions.

use crate::{
  eltorito::ElToritoBuilder,
  layout::LayoutPlanner,
  manifest::{Manifest, Source},
  name,
  path::IsoPath,
  spec,
  writer::{ImageWriter, VolumeDescriptorSet, VolumeOptions},
};

use super::prelude::*;
use std::{
  io::{Seek, SeekFrom, Write},
  path::Path,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

/// Volume label used when neither an explicit label nor a usable file name is available.
pub const FALLBACK_VOLUME_LABEL: &str = "EXE2ISO";

/// Turns a [`Manifest`] into a complete image.
#[derive(Debug, Default, Clone)]
pub struct ImageBuilder {
  cancel: Option<Arc<AtomicBool>>,
}

impl ImageBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Aborts the build with [`Error::Cancelled`] once `cancel` is set. The flag
  /// is polled between stages and between files.
  pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
    self.cancel = Some(cancel);
    self
  }

  fn check_cancelled(&self) -> Result<()> {
    match &self.cancel {
      Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
      _ => Ok(()),
    }
  }

  /// Builds the image in memory.
  pub fn build(&self, manifest: Manifest<'_>) -> Result<Vec<u8>> {
    self.write_image(manifest, vec![])
  }

  /// Builds the image to `path`. The file only appears once the image is complete.
  pub fn build_to_path(&self, manifest: Manifest<'_>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let directory = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };

    let temporary = tempfile::NamedTempFile::new_in(directory)?;
    let (file, temporary_path) = temporary.into_parts();

    let file = self.write_image(manifest, std::io::BufWriter::new(file))?;
    file
      .into_inner()
      .map_err(|err| err.into_error())?
      .sync_all()?;

    temporary_path.persist(path).map_err(|err| err.error)?;

    log::info!("Image written to {}", path.display());

    Ok(())
  }

  /// Writes the image to `sink` and returns the sink.
  ///
  /// The image is staged in an anonymous temporary file, so `sink` receives
  /// nothing unless the whole image was built.
  pub fn write_to<W: Write>(&self, manifest: Manifest<'_>, mut sink: W) -> Result<W> {
    let staging = std::io::BufWriter::new(tempfile::tempfile()?);
    let mut staging = self
      .write_image(manifest, staging)?
      .into_inner()
      .map_err(|err| err.into_error())?;

    self.check_cancelled()?;

    staging.seek(SeekFrom::Start(0))?;
    std::io::copy(&mut staging, &mut sink)?;
    sink.flush()?;

    Ok(sink)
  }

  fn write_image<W: Write>(&self, manifest: Manifest<'_>, sink: W) -> Result<W> {
    if manifest.is_empty() {
      return Err(Error::EmptyImage);
    }

    self.check_cancelled()?;

    let volume_label = derive_volume_label(&manifest);

    log::info!(
      "Building image {:?} from {} entries (Joliet: {}, bootable: {})",
      volume_label,
      manifest.entries.len(),
      manifest.joliet,
      manifest.boot_image.is_some()
    );

    let Manifest {
      entries,
      boot_image,
      joliet,
      recording_time,
      system_identifier,
      application_identifier,
      ..
    } = manifest;

    // 1. Build the directory tree

    let mut tree = crate::fs::Tree::new();
    let mut sources: Vec<Source<'_>> = Vec::with_capacity(entries.len() + 1);

    for entry in entries {
      tree.insert_file(IsoPath::new(&entry.name), entry.source.size())?;
      sources.push(entry.source);
    }

    // 2. Validate the boot image and place it in the root directory

    let boot = match boot_image {
      Some(boot_image) => {
        crate::eltorito::check_image_size(boot_image.source.size())?;
        let bytes = boot_image.source.into_bytes(&boot_image.file_name)?;
        let eltorito = ElToritoBuilder::new(
          &bytes,
          boot_image.load_size_sectors,
          boot_image.platform_id,
        )?;
        let id = tree.insert_file(IsoPath::new(&boot_image.file_name), bytes.len() as u64)?;
        sources.push(Source::Bytes(bytes));
        Some((id, eltorito))
      }
      None => None,
    };

    // 3. Allocate LBAs

    self.check_cancelled()?;

    let plan = LayoutPlanner::new(joliet).plan(&tree, boot.as_ref().map(|(id, _)| *id))?;

    let catalog = boot
      .as_ref()
      .map(|(id, eltorito)| eltorito.build(plan.file_extent(*id).lba))
      .transpose()?;

    // 4. Write

    self.check_cancelled()?;

    let descriptors = VolumeDescriptorSet::new(
      &plan,
      &VolumeOptions {
        volume_label: &volume_label,
        system_identifier: &system_identifier,
        application_identifier: &application_identifier,
        recording_time,
      },
    )?;

    let mut writer = ImageWriter::new(&plan, &tree, &descriptors, recording_time);

    if let Some(catalog) = &catalog {
      writer = writer.with_boot_catalog(catalog);
    }

    if let Some(cancel) = &self.cancel {
      writer = writer.with_cancel_flag(cancel);
    }

    writer.write(sources, sink)
  }
}

/// Volume label of `manifest`: the explicit label, else the base name of the
/// first entry, else [`FALLBACK_VOLUME_LABEL`].
///
/// The result is uppercased, holds only d-characters and is at most 32 long.
pub fn derive_volume_label(manifest: &Manifest<'_>) -> String {
  let explicit = manifest
    .volume_label
    .as_deref()
    .map(str::trim)
    .filter(|label| !label.is_empty());

  let derived = || {
    let entry = manifest.entries.first()?;
    let file_name = IsoPath::new(&entry.name).file_name()?;
    let (base, _) = name::split_extension(file_name);
    Some(base).filter(|base| !base.is_empty())
  };

  let label = explicit
    .or_else(derived)
    .unwrap_or(FALLBACK_VOLUME_LABEL);

  name::normalize(label)
    .chars()
    .take(spec::VOLUME_IDENTIFIER_LENGTH)
    .collect()
}
