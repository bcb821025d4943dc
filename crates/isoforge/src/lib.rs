//! Writer for ISO 9660 images with Joliet names and El Torito boot support.

pub mod builder;
pub mod eltorito;
pub mod error;
pub mod fs;
pub mod layout;
pub mod lba;
pub mod manifest;
pub mod name;
pub mod path;
pub mod serialize;
pub mod spec;
pub mod writer;

pub mod prelude {
  pub use crate::error::{Error, Result};
}

pub use builder::ImageBuilder;
pub use manifest::{BootImage, Manifest, Source};
