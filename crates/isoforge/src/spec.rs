//! ISO 9660 structure types including the Joliet and El Torito extensions.

use crate::serialize::{self, Endianness, IsoSerialize};
use byteorder::{ByteOrder, LittleEndian};

/// Size of every volume descriptor and of the boot catalog.
pub const DESCRIPTOR_SIZE: usize = 2048;

/// Maximum length of a Joliet identifier in UCS-2 code units.
pub const JOLIET_MAX_UNITS: usize = 64;

/// Maximum length of the volume identifier.
pub const VOLUME_IDENTIFIER_LENGTH: usize = 32;

/// `[A-Z0-9_]`
pub fn is_d_character(c: u8) -> bool {
  c.is_ascii_uppercase() || c.is_ascii_digit() || c == b'_'
}

/// `[ !"%&'()*+,-./:;<=>?A-Z0-9_]`
pub fn is_a_character(c: u8) -> bool {
  is_d_character(c) || b" !\"%&'()*+,-./:;<=>?".contains(&c)
}

/// Kind of identifier. Used to determine how to interpret the bytes and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentifierKind {
  /// `[\s\!\"\%\&\'\(\)\*\+\,\-\.\/\:\;\<\=\>\?A-Z0-9_]`
  ACharacters,
  /// `[0-9A-Z_]`
  DCharacters,
  /// Joliet (UCS-2 big endian) descriptor text.
  JolietText,
  /// Joliet (UCS-2 big endian) encoded file identifier.
  JolietFileIdentifier,
  /// Joliet (UCS-2 big endian) encoded directory identifier.
  JolietDirectoryIdentifier,
  /// `NAME.EXT;VERSION` built from d-characters.
  StandardFileIdentifier,
  /// Up to eight d-characters.
  StandardDirectoryIdentifier,
  /// Special case for the `.` entry in a directory.
  CurrentDirectory,
  /// Special case for the `..` entry in a directory.
  ParentDirectory,
  /// Special case for the root directory identifier.
  RootDirectory,
}

/// Generic representation of an identifier used within various
/// places in the ISO 9660 and Joliet specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
  pub(crate) kind: IdentifierKind,
  pub(crate) bytes: Vec<u8>,
}

impl Identifier {
  pub fn kind(&self) -> IdentifierKind {
    self.kind
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  fn is_joliet(&self) -> bool {
    matches!(
      self.kind,
      IdentifierKind::JolietText
        | IdentifierKind::JolietFileIdentifier
        | IdentifierKind::JolietDirectoryIdentifier
    )
  }

  /// Single `0x00` byte, as recorded in the volume descriptors and path tables.
  pub fn root_directory() -> Self {
    Self {
      kind: IdentifierKind::RootDirectory,
      bytes: vec![0],
    }
  }

  pub fn current_directory() -> Self {
    Self {
      kind: IdentifierKind::CurrentDirectory,
      bytes: vec![0],
    }
  }

  pub fn parent_directory() -> Self {
    Self {
      kind: IdentifierKind::ParentDirectory,
      bytes: vec![1],
    }
  }

  /// `BASE.EXT;VERSION` with a 1-8 character base and 1-3 character extension.
  pub fn standard_file_identifier(name: impl AsRef<str>) -> Option<Self> {
    let name = name.as_ref();
    let (stem, version) = name.split_once(';')?;
    let (base, extension) = stem.split_once('.')?;

    let valid = (1..=8).contains(&base.len())
      && (1..=3).contains(&extension.len())
      && base.bytes().chain(extension.bytes()).all(is_d_character)
      && !version.is_empty()
      && version.bytes().all(|c| c.is_ascii_digit())
      && version.parse::<u16>().is_ok_and(|v| (1..=32767).contains(&v));

    valid.then(|| Self {
      kind: IdentifierKind::StandardFileIdentifier,
      bytes: name.as_bytes().to_vec(),
    })
  }

  pub fn standard_directory_identifier(name: impl AsRef<str>) -> Option<Self> {
    let name = name.as_ref();
    let valid = (1..=8).contains(&name.len()) && name.bytes().all(is_d_character);

    valid.then(|| Self {
      kind: IdentifierKind::StandardDirectoryIdentifier,
      bytes: name.as_bytes().to_vec(),
    })
  }

  /// Descriptor text restricted to d-characters, such as the volume identifier.
  pub fn d_characters(text: impl AsRef<str>, max_len: usize) -> Option<Self> {
    let text = text.as_ref();
    let valid = text.len() <= max_len && text.bytes().all(is_d_character);

    valid.then(|| Self {
      kind: IdentifierKind::DCharacters,
      bytes: text.as_bytes().to_vec(),
    })
  }

  /// Descriptor text restricted to a-characters. Anything else becomes `_`.
  pub fn a_characters(text: impl AsRef<str>, max_len: usize) -> Self {
    let bytes = text
      .as_ref()
      .to_uppercase()
      .chars()
      .map(|c| match u8::try_from(c) {
        Ok(c) if is_a_character(c) => c,
        _ => b'_',
      })
      .take(max_len)
      .collect();

    Self {
      kind: IdentifierKind::ACharacters,
      bytes,
    }
  }

  pub fn joliet_file_identifier(units: &[u16]) -> Self {
    Self {
      kind: IdentifierKind::JolietFileIdentifier,
      bytes: ucs2_be_bytes(units),
    }
  }

  pub fn joliet_directory_identifier(units: &[u16]) -> Self {
    Self {
      kind: IdentifierKind::JolietDirectoryIdentifier,
      bytes: ucs2_be_bytes(units),
    }
  }

  /// Descriptor text for the Joliet supplementary volume descriptor, cut to
  /// `max_bytes` on a code unit boundary.
  pub fn joliet_text(units: &[u16], max_bytes: usize) -> Self {
    let units = &units[..units.len().min(max_bytes / 2)];

    Self {
      kind: IdentifierKind::JolietText,
      bytes: ucs2_be_bytes(units),
    }
  }

  /// Writes the identifier into a fixed width descriptor field, padding with
  /// spaces in the matching character set.
  pub(crate) fn write_field(&self, out: &mut [u8]) {
    if self.is_joliet() {
      serialize::write_padded(out, &self.bytes, &[0x00, b' ']);
    } else {
      serialize::write_padded(out, &self.bytes, b" ");
    }
  }
}

fn ucs2_be_bytes(units: &[u16]) -> Vec<u8> {
  units.iter().flat_map(|unit| unit.to_be_bytes()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JolietLevel {
  /// UCS-2 Level 1
  Level1,
  /// UCS-2 Level 2
  Level2,
  /// UCS-2 Level 3
  Level3,
}

/// Escape sequences conforming to ISO/IEC 2022, including the escape characters.
///
/// If all the bytes of the escape sequences are zero, it shall mean that the set
/// of a1-characters is identical to the set of a-characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeSequences(pub(crate) [u8; 32]);

impl EscapeSequences {
  pub fn joliet(level: JolietLevel) -> Self {
    let mut bytes = [0u8; 32];
    bytes[..3].copy_from_slice(match level {
      JolietLevel::Level1 => b"%/@",
      JolietLevel::Level2 => b"%/C",
      JolietLevel::Level3 => b"%/E",
    });
    Self(bytes)
  }
}

bitflags::bitflags! {
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct FileFlags: u8 {
    /// Existence bit; the entry is hidden from directory listings when set.
    const HIDDEN = 1 << 0;
    const DIRECTORY = 1 << 1;
    const ASSOCIATED_FILE = 1 << 2;
    const RECORD = 1 << 3;
    const PROTECTION = 1 << 4;
    const MULTI_EXTENT = 1 << 7;
  }

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct VolumeFlags: u8 {
    /// If zero, shall mean that the escape sequences field specifies only
    /// escape sequences registered by ISO/IEC 2375.
    const UNREGISTERED_ESCAPE_SEQUENCES = 1 << 0;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardIdentifier {
  /// Standard ISO 9660 identifier; "CD001"
  Cd001,
}

impl StandardIdentifier {
  pub fn as_bytes(&self) -> &'static [u8; 5] {
    match self {
      StandardIdentifier::Cd001 => b"CD001",
    }
  }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDescriptorType {
  BootRecord = 0,
  Primary = 1,
  Supplementary = 2,
  Terminator = 255,
}

impl From<VolumeDescriptorType> for u8 {
  fn from(value: VolumeDescriptorType) -> u8 {
    value as u8
  }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDescriptorVersion {
  Standard = 1,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStructureVersion {
  Standard = 1,
}

/// Date and time as 16 ASCII digits plus a GMT offset (ISO 9660 8.4.26.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitsDate {
  pub year: u16,
  pub month: u8,
  pub day: u8,
  pub hour: u8,
  pub minute: u8,
  pub second: u8,
  pub hundredths: u8,
  /// Offset from GMT in 15 minute intervals.
  pub gmt_offset: i8,
}

impl DigitsDate {
  /// All digits zero and a zero offset, meaning "not specified".
  pub fn unspecified() -> Self {
    Self {
      year: 0,
      month: 0,
      day: 0,
      hour: 0,
      minute: 0,
      second: 0,
      hundredths: 0,
      gmt_offset: 0,
    }
  }
}

fn gmt_offset_quarters<Tz: chrono::TimeZone>(dt: &chrono::DateTime<Tz>) -> i8 {
  use chrono::Offset;

  let seconds = dt.offset().fix().local_minus_utc();
  (seconds / (15 * 60)).clamp(-48, 52) as i8
}

impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for DigitsDate {
  fn from(dt: chrono::DateTime<Tz>) -> Self {
    use chrono::{Datelike, Timelike};

    Self {
      year: dt.year().clamp(0, 9999) as u16,
      month: dt.month() as u8,
      day: dt.day() as u8,
      hour: dt.hour() as u8,
      minute: dt.minute() as u8,
      second: dt.second().min(59) as u8,
      hundredths: (dt.timestamp_subsec_millis().min(999) / 10) as u8,
      gmt_offset: gmt_offset_quarters(&dt),
    }
  }
}

impl IsoSerialize for DigitsDate {
  type Context = ();

  fn extent(&self) -> usize {
    17
  }

  fn serialize(&self, _: &mut (), out: &mut [u8]) -> std::io::Result<()> {
    serialize::ensure_len(out, self.extent())?;

    let digits = format!(
      "{:04}{:02}{:02}{:02}{:02}{:02}{:02}",
      self.year, self.month, self.day, self.hour, self.minute, self.second, self.hundredths
    );

    out[..16].copy_from_slice(digits.as_bytes());
    out[16] = self.gmt_offset as u8;

    Ok(())
  }
}

/// Compact 7 byte date used in directory records (ISO 9660 9.1.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericalDate {
  pub years_since_1900: u8,
  pub month: u8,
  pub day: u8,
  pub hour: u8,
  pub minute: u8,
  pub second: u8,
  /// Offset from GMT in 15 minute intervals.
  pub gmt_offset: i8,
}

impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for NumericalDate {
  fn from(dt: chrono::DateTime<Tz>) -> Self {
    use chrono::{Datelike, Timelike};

    Self {
      years_since_1900: (dt.year().clamp(1900, 2155) - 1900) as u8,
      month: dt.month() as u8,
      day: dt.day() as u8,
      hour: dt.hour() as u8,
      minute: dt.minute() as u8,
      second: dt.second().min(59) as u8,
      gmt_offset: gmt_offset_quarters(&dt),
    }
  }
}

impl IsoSerialize for NumericalDate {
  type Context = ();

  fn extent(&self) -> usize {
    7
  }

  fn serialize(&self, _: &mut (), out: &mut [u8]) -> std::io::Result<()> {
    serialize::ensure_len(out, self.extent())?;

    out[0] = self.years_since_1900;
    out[1] = self.month;
    out[2] = self.day;
    out[3] = self.hour;
    out[4] = self.minute;
    out[5] = self.second;
    out[6] = self.gmt_offset as u8;

    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct DirectoryRecord {
  pub extended_attribute_length: u8,
  pub extent_location: u32,
  pub data_length: u32,
  pub recording_date: NumericalDate,
  pub file_flags: FileFlags,
  pub file_unit_size: u8,
  pub interleave_gap_size: u8,
  pub volume_sequence_number: u16,
  pub file_identifier: Identifier,
}

impl DirectoryRecord {
  /// Size of a record whose identifier is `identifier_length` bytes long,
  /// including the padding byte that keeps records at even lengths.
  pub fn extent_for(identifier_length: usize) -> usize {
    33 + identifier_length + (identifier_length % 2 == 0) as usize
  }
}

impl IsoSerialize for DirectoryRecord {
  type Context = ();

  fn extent(&self) -> usize {
    Self::extent_for(self.file_identifier.len())
  }

  fn serialize(&self, _: &mut (), out: &mut [u8]) -> std::io::Result<()> {
    let extent = self.extent();
    serialize::ensure_len(out, extent)?;

    let identifier = self.file_identifier.as_bytes();

    out[0] = extent as u8;
    out[1] = self.extended_attribute_length;
    serialize::write_both_u32(&mut out[2..10], self.extent_location);
    serialize::write_both_u32(&mut out[10..18], self.data_length);
    self.recording_date.serialize(&mut (), &mut out[18..25])?;
    out[25] = self.file_flags.bits();
    out[26] = self.file_unit_size;
    out[27] = self.interleave_gap_size;
    serialize::write_both_u16(&mut out[28..32], self.volume_sequence_number);
    out[32] = identifier.len() as u8;
    out[33..33 + identifier.len()].copy_from_slice(identifier);
    out[33 + identifier.len()..extent].fill(0);

    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct PathTableRecord {
  pub extended_attribute_record_length: u8,
  pub extent_location: u32,
  /// 1-based index of the parent directory within the path table.
  pub parent_directory_number: u16,
  pub directory_identifier: Identifier,
}

impl PathTableRecord {
  pub fn extent_for(identifier_length: usize) -> usize {
    8 + identifier_length + identifier_length % 2
  }
}

impl IsoSerialize for PathTableRecord {
  type Context = Endianness;

  fn extent(&self) -> usize {
    Self::extent_for(self.directory_identifier.len())
  }

  fn serialize(&self, endianness: &mut Endianness, out: &mut [u8]) -> std::io::Result<()> {
    let extent = self.extent();
    serialize::ensure_len(out, extent)?;

    let identifier = self.directory_identifier.as_bytes();

    out[0] = identifier.len() as u8;
    out[1] = self.extended_attribute_record_length;
    serialize::write_u32(*endianness, &mut out[2..6], self.extent_location);
    serialize::write_u16(*endianness, &mut out[6..8], self.parent_directory_number);
    out[8..8 + identifier.len()].copy_from_slice(identifier);
    out[8 + identifier.len()..extent].fill(0);

    Ok(())
  }
}

/// Fields shared by the primary and supplementary volume descriptors.
#[derive(Debug, Clone)]
pub struct VolumeInfo {
  pub system_identifier: Identifier,
  pub volume_identifier: Identifier,
  pub volume_space_size: u32,
  pub volume_set_size: u16,
  pub volume_sequence_number: u16,
  pub logical_block_size: u16,
  pub path_table_size: u32,
  pub type_l_path_table_location: u32,
  pub optional_type_l_path_table_location: u32,
  pub type_m_path_table_location: u32,
  pub optional_type_m_path_table_location: u32,
  pub root_directory_record: DirectoryRecord,
  pub volume_set_identifier: Identifier,
  pub publisher_identifier: Identifier,
  pub data_preparer_identifier: Identifier,
  pub application_identifier: Identifier,
  pub copyright_file_identifier: Identifier,
  pub abstract_file_identifier: Identifier,
  pub bibliographic_file_identifier: Identifier,
  pub creation_date: DigitsDate,
  pub modification_date: DigitsDate,
  pub expiration_date: DigitsDate,
  pub effective_date: DigitsDate,
  pub file_structure_version: FileStructureVersion,
}

impl VolumeInfo {
  fn serialize_into(&self, out: &mut [u8]) -> std::io::Result<()> {
    self.system_identifier.write_field(&mut out[8..40]);
    self.volume_identifier.write_field(&mut out[40..72]);
    serialize::write_both_u32(&mut out[80..88], self.volume_space_size);
    serialize::write_both_u16(&mut out[120..124], self.volume_set_size);
    serialize::write_both_u16(&mut out[124..128], self.volume_sequence_number);
    serialize::write_both_u16(&mut out[128..132], self.logical_block_size);
    serialize::write_both_u32(&mut out[132..140], self.path_table_size);
    LittleEndian::write_u32(&mut out[140..144], self.type_l_path_table_location);
    LittleEndian::write_u32(&mut out[144..148], self.optional_type_l_path_table_location);
    serialize::write_u32(
      Endianness::Big,
      &mut out[148..152],
      self.type_m_path_table_location,
    );
    serialize::write_u32(
      Endianness::Big,
      &mut out[152..156],
      self.optional_type_m_path_table_location,
    );
    self.root_directory_record.serialize(&mut (), &mut out[156..190])?;
    self.volume_set_identifier.write_field(&mut out[190..318]);
    self.publisher_identifier.write_field(&mut out[318..446]);
    self.data_preparer_identifier.write_field(&mut out[446..574]);
    self.application_identifier.write_field(&mut out[574..702]);
    self.copyright_file_identifier.write_field(&mut out[702..739]);
    self.abstract_file_identifier.write_field(&mut out[739..776]);
    self.bibliographic_file_identifier.write_field(&mut out[776..813]);
    self.creation_date.serialize(&mut (), &mut out[813..830])?;
    self.modification_date.serialize(&mut (), &mut out[830..847])?;
    self.expiration_date.serialize(&mut (), &mut out[847..864])?;
    self.effective_date.serialize(&mut (), &mut out[864..881])?;
    out[881] = self.file_structure_version as u8;

    Ok(())
  }
}

fn write_descriptor_header(
  out: &mut [u8],
  descriptor_type: VolumeDescriptorType,
  standard_identifier: StandardIdentifier,
  version: VolumeDescriptorVersion,
) {
  out[0] = descriptor_type.into();
  out[1..6].copy_from_slice(standard_identifier.as_bytes());
  out[6] = version as u8;
}

#[derive(Debug, Clone)]
pub struct PrimaryVolumeDescriptor {
  pub standard_identifier: StandardIdentifier,
  pub version: VolumeDescriptorVersion,
  pub volume: VolumeInfo,
}

impl IsoSerialize for PrimaryVolumeDescriptor {
  type Context = ();

  fn extent(&self) -> usize {
    DESCRIPTOR_SIZE
  }

  fn serialize(&self, _: &mut (), out: &mut [u8]) -> std::io::Result<()> {
    serialize::ensure_len(out, DESCRIPTOR_SIZE)?;
    out[..DESCRIPTOR_SIZE].fill(0);

    write_descriptor_header(
      out,
      VolumeDescriptorType::Primary,
      self.standard_identifier,
      self.version,
    );
    self.volume.serialize_into(out)
  }
}

#[derive(Debug, Clone)]
pub struct SupplementaryVolumeDescriptor {
  pub standard_identifier: StandardIdentifier,
  pub version: VolumeDescriptorVersion,
  pub volume_flags: VolumeFlags,
  pub escape_sequences: EscapeSequences,
  pub volume: VolumeInfo,
}

impl IsoSerialize for SupplementaryVolumeDescriptor {
  type Context = ();

  fn extent(&self) -> usize {
    DESCRIPTOR_SIZE
  }

  fn serialize(&self, _: &mut (), out: &mut [u8]) -> std::io::Result<()> {
    serialize::ensure_len(out, DESCRIPTOR_SIZE)?;
    out[..DESCRIPTOR_SIZE].fill(0);

    write_descriptor_header(
      out,
      VolumeDescriptorType::Supplementary,
      self.standard_identifier,
      self.version,
    );
    out[7] = self.volume_flags.bits();
    self.volume.serialize_into(out)?;
    out[88..120].copy_from_slice(&self.escape_sequences.0);

    Ok(())
  }
}

#[derive(Debug, Clone, Copy)]
pub struct VolumeDescriptorSetTerminator;

impl IsoSerialize for VolumeDescriptorSetTerminator {
  type Context = ();

  fn extent(&self) -> usize {
    DESCRIPTOR_SIZE
  }

  fn serialize(&self, _: &mut (), out: &mut [u8]) -> std::io::Result<()> {
    serialize::ensure_len(out, DESCRIPTOR_SIZE)?;
    out[..DESCRIPTOR_SIZE].fill(0);

    write_descriptor_header(
      out,
      VolumeDescriptorType::Terminator,
      StandardIdentifier::Cd001,
      VolumeDescriptorVersion::Standard,
    );

    Ok(())
  }
}

/// Boot system identifier of an El Torito boot record.
pub const EL_TORITO_BOOT_SYSTEM_IDENTIFIER: &[u8] = b"EL TORITO SPECIFICATION";

#[derive(Debug, Clone)]
pub struct ElToritoBootRecordVolumeDescriptor {
  pub standard_identifier: StandardIdentifier,
  pub version: VolumeDescriptorVersion,
  /// Absolute sector of the boot catalog.
  pub boot_catalog_pointer: u32,
}

impl IsoSerialize for ElToritoBootRecordVolumeDescriptor {
  type Context = ();

  fn extent(&self) -> usize {
    DESCRIPTOR_SIZE
  }

  fn serialize(&self, _: &mut (), out: &mut [u8]) -> std::io::Result<()> {
    serialize::ensure_len(out, DESCRIPTOR_SIZE)?;
    out[..DESCRIPTOR_SIZE].fill(0);

    write_descriptor_header(
      out,
      VolumeDescriptorType::BootRecord,
      self.standard_identifier,
      self.version,
    );
    serialize::write_padded(&mut out[7..39], EL_TORITO_BOOT_SYSTEM_IDENTIFIER, &[0]);
    LittleEndian::write_u32(&mut out[71..75], self.boot_catalog_pointer);

    Ok(())
  }
}

/// Size of a single boot catalog entry.
pub const EL_TORITO_ENTRY_SIZE: usize = 32;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElToritoPlatformId {
  X86 = 0,
  PowerPc = 1,
  Mac = 2,
  Efi = 0xEF,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElToritoBootIndicator {
  Bootable = 0x88,
  NonBootable = 0x00,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElToritoEmulationType {
  NoEmulation = 0,
  Floppy12M = 1,
  Floppy144M = 2,
  Floppy288M = 3,
  HardDisk = 4,
}

#[derive(Debug, Clone)]
pub struct ElToritoValidationEntry {
  pub platform_id: ElToritoPlatformId,
  pub manufacturer_id: [u8; 24],
}

impl ElToritoValidationEntry {
  pub const HEADER_ID: u8 = 1;
  pub const KEY_BYTES: [u8; 2] = [0x55, 0xAA];

  fn bytes_without_checksum(&self) -> [u8; EL_TORITO_ENTRY_SIZE] {
    let mut bytes = [0u8; EL_TORITO_ENTRY_SIZE];
    bytes[0] = Self::HEADER_ID;
    bytes[1] = self.platform_id as u8;
    bytes[4..28].copy_from_slice(&self.manufacturer_id);
    bytes[30..32].copy_from_slice(&Self::KEY_BYTES);
    bytes
  }

  /// Value that makes the sixteen little endian words of the entry sum to zero.
  pub fn checksum(&self) -> u16 {
    let bytes = self.bytes_without_checksum();
    let sum = bytes
      .chunks_exact(2)
      .fold(0u16, |sum, word| sum.wrapping_add(LittleEndian::read_u16(word)));

    0u16.wrapping_sub(sum)
  }
}

impl IsoSerialize for ElToritoValidationEntry {
  type Context = ();

  fn extent(&self) -> usize {
    EL_TORITO_ENTRY_SIZE
  }

  fn serialize(&self, _: &mut (), out: &mut [u8]) -> std::io::Result<()> {
    serialize::ensure_len(out, EL_TORITO_ENTRY_SIZE)?;

    out[..EL_TORITO_ENTRY_SIZE].copy_from_slice(&self.bytes_without_checksum());
    LittleEndian::write_u16(&mut out[28..30], self.checksum());

    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct ElToritoInitialSectionEntry {
  pub boot_indicator: ElToritoBootIndicator,
  pub boot_media_type: ElToritoEmulationType,
  /// Zero selects the traditional `0x7C0` segment.
  pub load_segment: u16,
  pub system_type: u8,
  /// Number of 512 byte virtual sectors loaded by the firmware.
  pub sector_count: u16,
  pub virtual_disk_location: u32,
}

impl IsoSerialize for ElToritoInitialSectionEntry {
  type Context = ();

  fn extent(&self) -> usize {
    EL_TORITO_ENTRY_SIZE
  }

  fn serialize(&self, _: &mut (), out: &mut [u8]) -> std::io::Result<()> {
    serialize::ensure_len(out, EL_TORITO_ENTRY_SIZE)?;
    out[..EL_TORITO_ENTRY_SIZE].fill(0);

    out[0] = self.boot_indicator as u8;
    out[1] = self.boot_media_type as u8;
    LittleEndian::write_u16(&mut out[2..4], self.load_segment);
    out[4] = self.system_type;
    LittleEndian::write_u16(&mut out[6..8], self.sector_count);
    LittleEndian::write_u32(&mut out[8..12], self.virtual_disk_location);

    Ok(())
  }
}
