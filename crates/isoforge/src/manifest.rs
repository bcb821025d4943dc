//! Inputs of a single image build.

use crate::{
  error::{Error, Result},
  spec::ElToritoPlatformId,
};
use std::{
  borrow::Cow,
  io::{Read, Write},
  path::Path,
};

/// Boot load size used when none is given, in 512 byte virtual sectors.
pub const DEFAULT_BOOT_LOAD_SIZE: u32 = 4;

/// Joliet name of the boot image when it is placed on the disc.
pub const DEFAULT_BOOT_FILE_NAME: &str = "boot.img";

/// Application identifier recorded in the volume descriptors by default.
pub const DEFAULT_APPLICATION_IDENTIFIER: &str = "ISOFORGE";

/// Bytes of a single file. Each source is read exactly once, when its data is
/// written to the image.
pub enum Source<'a> {
  /// Bytes already in memory, owned or borrowed from the caller.
  Bytes(Cow<'a, [u8]>),
  /// File backed by an actual file on the host filesystem.
  File { handle: std::fs::File, size: u64 },
  /// Any other reader; `size` must match the number of bytes it yields.
  Reader {
    reader: Box<dyn Read + Send + 'a>,
    size: u64,
  },
}

impl<'a> Source<'a> {
  pub fn from_reader(reader: impl Read + Send + 'a, size: u64) -> Self {
    Source::Reader {
      reader: Box::new(reader),
      size,
    }
  }

  pub fn size(&self) -> u64 {
    match self {
      Source::Bytes(bytes) => bytes.len() as u64,
      Source::File { size, .. } | Source::Reader { size, .. } => *size,
    }
  }

  /// Streams the whole source into `sink`, consuming it.
  pub(crate) fn write_to<W: Write + ?Sized>(self, name: &str, sink: &mut W) -> Result<()> {
    let expected = self.size();

    let actual = match self {
      Source::Bytes(bytes) => {
        sink.write_all(&bytes)?;
        bytes.len() as u64
      }
      Source::File { handle, size } => {
        std::io::copy(&mut std::io::BufReader::new(handle).take(size), sink)?
      }
      Source::Reader { reader, size } => std::io::copy(&mut reader.take(size), sink)?,
    };

    if actual != expected {
      return Err(Error::SourceSizeMismatch {
        name: name.to_string(),
        expected,
        actual,
      });
    }

    Ok(())
  }

  /// Reads the whole source into memory, consuming it.
  pub(crate) fn into_bytes(self, name: &str) -> Result<Cow<'a, [u8]>> {
    match self {
      Source::Bytes(bytes) => Ok(bytes),
      other => {
        let mut buf = Vec::with_capacity(other.size().min(1 << 26) as usize);
        other.write_to(name, &mut buf)?;
        Ok(Cow::Owned(buf))
      }
    }
  }
}

impl std::fmt::Debug for Source<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Source::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
      Source::File { size, .. } => f.debug_struct("File").field("size", size).finish(),
      Source::Reader { size, .. } => f.debug_struct("Reader").field("size", size).finish(),
    }
  }
}

impl From<Vec<u8>> for Source<'_> {
  fn from(vec: Vec<u8>) -> Self {
    Source::Bytes(Cow::Owned(vec))
  }
}

impl<'a> From<&'a [u8]> for Source<'a> {
  fn from(bytes: &'a [u8]) -> Self {
    Source::Bytes(Cow::Borrowed(bytes))
  }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Source<'a> {
  fn from(bytes: &'a [u8; N]) -> Self {
    Source::Bytes(Cow::Borrowed(bytes))
  }
}

impl TryFrom<std::fs::File> for Source<'_> {
  type Error = std::io::Error;

  fn try_from(file: std::fs::File) -> std::io::Result<Self> {
    Ok(Source::File {
      size: file.metadata()?.len(),
      handle: file,
    })
  }
}

/// A file to place on the image under `name`, e.g. `FILES/test.txt`.
#[derive(Debug)]
pub struct ManifestEntry<'a> {
  pub name: String,
  pub source: Source<'a>,
}

/// Boot image referenced by the El Torito boot catalog.
#[derive(Debug)]
pub struct BootImage<'a> {
  pub source: Source<'a>,
  /// Number of 512 byte virtual sectors the firmware loads.
  pub load_size_sectors: u32,
  /// Name of the boot image in the root directory.
  pub file_name: String,
  pub platform_id: ElToritoPlatformId,
}

impl<'a> BootImage<'a> {
  pub fn new(source: impl Into<Source<'a>>) -> Self {
    Self {
      source: source.into(),
      load_size_sectors: DEFAULT_BOOT_LOAD_SIZE,
      file_name: DEFAULT_BOOT_FILE_NAME.to_string(),
      platform_id: ElToritoPlatformId::X86,
    }
  }

  pub fn with_load_size(mut self, load_size_sectors: u32) -> Self {
    self.load_size_sectors = load_size_sectors;
    self
  }

  pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
    self.file_name = file_name.into();
    self
  }
}

/// Ordered list of files plus the options of one build.
#[derive(Debug)]
pub struct Manifest<'a> {
  pub(crate) entries: Vec<ManifestEntry<'a>>,
  pub(crate) volume_label: Option<String>,
  pub(crate) boot_image: Option<BootImage<'a>>,
  pub(crate) joliet: bool,
  pub(crate) recording_time: chrono::DateTime<chrono::Utc>,
  pub(crate) system_identifier: String,
  pub(crate) application_identifier: String,
}

impl Default for Manifest<'_> {
  fn default() -> Self {
    Self {
      entries: vec![],
      volume_label: None,
      boot_image: None,
      joliet: true,
      recording_time: chrono::DateTime::UNIX_EPOCH,
      system_identifier: String::new(),
      application_identifier: DEFAULT_APPLICATION_IDENTIFIER.to_string(),
    }
  }
}

impl<'a> Manifest<'a> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn entries(&self) -> &[ManifestEntry<'a>] {
    &self.entries
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Appends a file. Entries are laid out in the order they are added.
  pub fn add(&mut self, name: impl Into<String>, source: impl Into<Source<'a>>) -> &mut Self {
    self.entries.push(ManifestEntry {
      name: name.into(),
      source: source.into(),
    });
    self
  }

  /// Captures the file or directory at `path` and appends it under `destination`.
  ///
  /// * A file lands at `destination/<file name>`.
  /// * Directory contents land at `destination/<relative path>`, in file name order.
  pub fn capture(&mut self, destination: &str, path: impl AsRef<Path>) -> Result<&mut Self> {
    let path = path.as_ref();
    let join = |relative: &str| {
      let destination = destination.trim_matches(['/', '\\']);
      if destination.is_empty() {
        relative.to_string()
      } else {
        format!("{destination}/{relative}")
      }
    };

    if path.is_file() {
      let Some(file_name) = path.file_name() else {
        return Err(Error::NotAFile(path.to_path_buf()));
      };
      let source = Source::try_from(std::fs::File::open(path)?)?;
      self.add(join(&file_name.to_string_lossy()), source);
      return Ok(self);
    }

    if !path.is_dir() {
      return Err(Error::NotAFile(path.to_path_buf()));
    }

    for entry in walkdir::WalkDir::new(path).sort_by_file_name() {
      let entry = entry?;

      if !entry.file_type().is_file() {
        continue;
      }

      let relative = entry
        .path()
        .strip_prefix(path)
        .map_err(|_| Error::NotAFile(entry.path().to_path_buf()))?
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

      log::debug!("Captured {} as {}", entry.path().display(), join(&relative));

      let source = Source::try_from(std::fs::File::open(entry.path())?)?;
      self.add(join(&relative), source);
    }

    Ok(self)
  }

  pub fn set_volume_label(&mut self, label: impl Into<String>) -> &mut Self {
    self.volume_label = Some(label.into());
    self
  }

  pub fn set_boot_image(&mut self, boot_image: BootImage<'a>) -> &mut Self {
    self.boot_image = Some(boot_image);
    self
  }

  /// Enables or disables the Joliet supplementary volume descriptor.
  pub fn set_joliet(&mut self, joliet: bool) -> &mut Self {
    self.joliet = joliet;
    self
  }

  /// Timestamp recorded in every descriptor and directory record.
  pub fn set_recording_time(&mut self, time: chrono::DateTime<chrono::Utc>) -> &mut Self {
    self.recording_time = time;
    self
  }

  pub fn set_system_identifier(&mut self, identifier: impl Into<String>) -> &mut Self {
    self.system_identifier = identifier.into();
    self
  }

  pub fn set_application_identifier(&mut self, identifier: impl Into<String>) -> &mut Self {
    self.application_identifier = identifier.into();
    self
  }
}
