//! El Torito boot catalog construction.

use crate::{
  error::{Error, Result},
  lba::SECTOR_SIZE,
  serialize::IsoSerialize,
  spec::{
    self, ElToritoBootIndicator, ElToritoEmulationType, ElToritoInitialSectionEntry,
    ElToritoPlatformId, ElToritoValidationEntry,
  },
};

/// Size of the virtual sectors counted by the boot catalog.
pub const VIRTUAL_SECTOR_SIZE: u64 = 512;

/// Largest boot image the 16-bit sector count of the catalog can describe.
pub const MAX_BOOT_IMAGE_SIZE: u64 = u16::MAX as u64 * VIRTUAL_SECTOR_SIZE;

/// Offset of the first partition's system indicator in a master boot record.
const MBR_PARTITION_TYPE_OFFSET: usize = 0x1C2;

/// The single 2048 byte boot catalog sector.
#[derive(Clone)]
pub struct BootCatalogSector(pub Box<[u8; spec::DESCRIPTOR_SIZE]>);

impl BootCatalogSector {
  pub fn as_bytes(&self) -> &[u8] {
    &self.0[..]
  }
}

impl std::fmt::Debug for BootCatalogSector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BootCatalogSector")
      .field("validation", &&self.0[..32])
      .field("initial", &&self.0[32..64])
      .finish()
  }
}

/// Validated boot parameters, ready to be pointed at the planned boot image.
#[derive(Debug, Clone)]
pub struct ElToritoBuilder {
  platform_id: ElToritoPlatformId,
  load_size: u16,
  system_type: u8,
}

impl ElToritoBuilder {
  /// Checks that `image` and `load_size_sectors` fit the 16-bit sector count
  /// field of the catalog.
  pub fn new(
    image: &[u8],
    load_size_sectors: u32,
    platform_id: ElToritoPlatformId,
  ) -> Result<Self> {
    check_image_size(image.len() as u64)?;

    let image_sectors = (image.len() as u64).div_ceil(VIRTUAL_SECTOR_SIZE);

    let load_size = u16::try_from(load_size_sectors).map_err(|_| {
      Error::BootImageTooLarge(format!(
        "load size of {} sectors exceeds {}",
        load_size_sectors,
        u16::MAX
      ))
    })?;

    // The image is zero padded to whole ISO sectors, so that much may be loaded.
    let available = (image.len() as u64).div_ceil(SECTOR_SIZE as u64)
      * (SECTOR_SIZE as u64 / VIRTUAL_SECTOR_SIZE);

    if load_size as u64 > available {
      return Err(Error::BootLoadSizeExceedsImage {
        declared: load_size,
        available: available as u32,
      });
    }

    if (load_size as u64) < image_sectors {
      log::warn!(
        "Boot catalog loads {} of {} virtual sectors of the boot image",
        load_size,
        image_sectors
      );
    }

    Ok(Self {
      platform_id,
      load_size,
      system_type: partition_system_type(image),
    })
  }

  pub fn load_size(&self) -> u16 {
    self.load_size
  }

  pub fn system_type(&self) -> u8 {
    self.system_type
  }

  /// Builds the catalog for a boot image planned at `boot_image_lba`.
  pub fn build(&self, boot_image_lba: u32) -> Result<BootCatalogSector> {
    let mut sector = Box::new([0u8; spec::DESCRIPTOR_SIZE]);

    let validation = ElToritoValidationEntry {
      platform_id: self.platform_id,
      manufacturer_id: [0; 24],
    };

    let initial = ElToritoInitialSectionEntry {
      boot_indicator: ElToritoBootIndicator::Bootable,
      boot_media_type: ElToritoEmulationType::NoEmulation,
      load_segment: 0,
      system_type: self.system_type,
      sector_count: self.load_size,
      virtual_disk_location: boot_image_lba,
    };

    validation.serialize(&mut (), &mut sector[..32])?;
    initial.serialize(&mut (), &mut sector[32..64])?;

    log::debug!(
      "Boot catalog entry: LBA {}, {} virtual sectors",
      boot_image_lba,
      self.load_size
    );

    Ok(BootCatalogSector(sector))
  }
}

/// Rejects boot images longer than [`MAX_BOOT_IMAGE_SIZE`], before any byte is read.
pub fn check_image_size(size: u64) -> Result<()> {
  if size > MAX_BOOT_IMAGE_SIZE {
    return Err(Error::BootImageTooLarge(format!(
      "{} bytes is {} virtual sectors, the catalog holds at most {}",
      size,
      size.div_ceil(VIRTUAL_SECTOR_SIZE),
      u16::MAX
    )));
  }

  Ok(())
}

/// System indicator of the first partition when the image carries an MBR, else 0.
fn partition_system_type(image: &[u8]) -> u8 {
  match image.get(510..512) {
    Some([0x55, 0xAA]) => image[MBR_PARTITION_TYPE_OFFSET],
    _ => 0,
  }
}
