use std::io::Write;

const ZEROS: [u8; 2048] = [0; 2048];

/// Sequential sink that tracks its position and zero fills forward to sector
/// boundaries. Objects must be written in ascending sector order.
pub struct SectorWriter<Storage> {
  storage: Storage,
  position: u64,
  sector_size: u64,
}

impl<Storage> SectorWriter<Storage>
where
  Storage: Write,
{
  pub fn new(storage: Storage, sector_size: u64) -> Self {
    Self {
      storage,
      position: 0,
      sector_size,
    }
  }

  pub fn position(&self) -> u64 {
    self.position
  }

  /// Zero fills up to the start of sector `lba`.
  pub fn seek_lba(&mut self, lba: u32) -> std::io::Result<()> {
    let target = lba as u64 * self.sector_size;

    if target < self.position {
      return Err(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!(
          "cannot move back to sector {} from byte offset {}",
          lba, self.position
        ),
      ));
    }

    self.fill_zeros(target - self.position)
  }

  /// Zero fills the remainder of the current sector.
  pub fn pad_to_sector(&mut self) -> std::io::Result<()> {
    let remainder = self.position % self.sector_size;

    if remainder != 0 {
      self.fill_zeros(self.sector_size - remainder)?;
    }

    Ok(())
  }

  fn fill_zeros(&mut self, mut count: u64) -> std::io::Result<()> {
    while count > 0 {
      let chunk = count.min(ZEROS.len() as u64) as usize;
      self.write_all(&ZEROS[..chunk])?;
      count -= chunk as u64;
    }

    Ok(())
  }

  pub fn into_inner(self) -> Storage {
    self.storage
  }
}

impl<Storage> Write for SectorWriter<Storage>
where
  Storage: Write,
{
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    let written = self.storage.write(buf)?;
    self.position += written as u64;
    Ok(written)
  }

  fn flush(&mut self) -> std::io::Result<()> {
    self.storage.flush()
  }
}
