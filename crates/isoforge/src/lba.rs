use crate::error::{Error, Result};

/// Logical sector size used for every structure on the volume.
pub const SECTOR_SIZE: u32 = 2048;

/// Number of sectors reserved for the system area at the start of the volume.
pub const SYSTEM_AREA_SECTORS: u32 = 16;

/// Number of whole sectors required to hold `size` bytes.
pub fn sectors_for(size: u64) -> u64 {
  size.div_ceil(SECTOR_SIZE as u64)
}

/// Hands out consecutive, gap-free sector ranges.
#[derive(Debug)]
pub struct LbaAllocator {
  sector_size: u32,
  next_lba: u32,
}

impl LbaAllocator {
  pub fn new(sector_size: u32, offset: u32) -> Self {
    Self {
      sector_size,
      next_lba: offset,
    }
  }

  /// Reserves enough sectors for `size` bytes and returns the first one.
  ///
  /// A zero sized allocation returns the next free sector without consuming it.
  pub fn allocate(&mut self, size: u64) -> Result<u32> {
    let lba = self.next_lba;
    let sectors = u32::try_from(size.div_ceil(self.sector_size as u64))
      .map_err(|_| Error::VolumeTooLarge)?;

    self.next_lba = self
      .next_lba
      .checked_add(sectors)
      .ok_or(Error::VolumeTooLarge)?;

    Ok(lba)
  }

  pub fn next_lba(&self) -> u32 {
    self.next_lba
  }
}
