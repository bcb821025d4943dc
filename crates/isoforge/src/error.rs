use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("walkdir error: {0}")]
  WalkDir(#[from] walkdir::Error),
  #[error("Not a file: {0}")]
  NotAFile(PathBuf),
  #[error("No input files specified")]
  EmptyImage,
  #[error("Invalid name {name:?}: {reason}")]
  InvalidName { name: String, reason: &'static str },
  #[error("Name collision counter exhausted for {name:?}")]
  NameCollisionExhausted { name: String },
  #[error("Duplicate entry: {0}")]
  DuplicateName(String),
  #[error("Boot image too large: {0}")]
  BootImageTooLarge(String),
  #[error("Boot load size of {declared} sectors exceeds the {available} sectors available in the boot image")]
  BootLoadSizeExceedsImage { declared: u16, available: u32 },
  #[error("File too large for a single extent: {name} ({size} bytes)")]
  FileTooLarge { name: String, size: u64 },
  #[error("Source for {name} produced {actual} bytes, expected {expected}")]
  SourceSizeMismatch {
    name: String,
    expected: u64,
    actual: u64,
  },
  #[error("Volume exceeds the addressable sector range")]
  VolumeTooLarge,
  #[error("Build cancelled")]
  Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
