use crate::{
  error::{Error, Result},
  lba::SECTOR_SIZE,
  layout::{Extent, LayoutPlan, NamespaceLayout},
  serialize::IsoSerialize,
  spec::{self, DirectoryRecord, Identifier},
  writer::sector::SectorWriter,
};
use std::io::Write;

/// Descriptor text of one build.
#[derive(Debug, Clone)]
pub struct VolumeOptions<'o> {
  /// Already normalized to d-characters.
  pub volume_label: &'o str,
  pub system_identifier: &'o str,
  pub application_identifier: &'o str,
  pub recording_time: chrono::DateTime<chrono::Utc>,
}

/// Primary, boot record, supplementary and terminator descriptors, in that order.
#[derive(Debug, Clone)]
pub struct VolumeDescriptorSet {
  pub primary: spec::PrimaryVolumeDescriptor,
  pub boot_record: Option<spec::ElToritoBootRecordVolumeDescriptor>,
  pub supplementary: Option<spec::SupplementaryVolumeDescriptor>,
  pub terminator: spec::VolumeDescriptorSetTerminator,
}

pub(crate) fn directory_record(
  extent: Extent,
  recording_date: &spec::NumericalDate,
  file_flags: spec::FileFlags,
  file_identifier: Identifier,
) -> DirectoryRecord {
  DirectoryRecord {
    extended_attribute_length: 0,
    extent_location: extent.lba,
    data_length: extent.length,
    recording_date: recording_date.clone(),
    file_flags,
    file_unit_size: 0,
    interleave_gap_size: 0,
    volume_sequence_number: 1,
    file_identifier,
  }
}

fn joliet_text(text: &str, max_bytes: usize) -> Identifier {
  let units: Vec<u16> = text
    .chars()
    .filter_map(|c| u16::try_from(c as u32).ok())
    .collect();
  Identifier::joliet_text(&units, max_bytes)
}

impl VolumeDescriptorSet {
  pub fn new(plan: &LayoutPlan, options: &VolumeOptions<'_>) -> Result<Self> {
    let volume_identifier =
      Identifier::d_characters(options.volume_label, spec::VOLUME_IDENTIFIER_LENGTH).ok_or_else(
        || Error::InvalidName {
          name: options.volume_label.to_string(),
          reason: "volume identifier must be at most 32 d-characters",
        },
      )?;

    let recording_date = spec::NumericalDate::from(options.recording_time);
    let timestamp = spec::DigitsDate::from(options.recording_time);

    let volume_info = |layout: &NamespaceLayout, text: &dyn Fn(&str, usize) -> Identifier| {
      spec::VolumeInfo {
        system_identifier: text(options.system_identifier, 32),
        volume_identifier: text(options.volume_label, 32),
        volume_space_size: plan.total_sectors,
        volume_set_size: 1,
        volume_sequence_number: 1,
        logical_block_size: SECTOR_SIZE as u16,
        path_table_size: layout.path_table_size,
        type_l_path_table_location: layout.type_l_path_table,
        optional_type_l_path_table_location: 0,
        type_m_path_table_location: layout.type_m_path_table,
        optional_type_m_path_table_location: 0,
        root_directory_record: directory_record(
          layout.root().extent,
          &recording_date,
          spec::FileFlags::DIRECTORY,
          Identifier::root_directory(),
        ),
        volume_set_identifier: text("", 128),
        publisher_identifier: text("", 128),
        data_preparer_identifier: text("", 128),
        application_identifier: text(options.application_identifier, 128),
        copyright_file_identifier: text("", 37),
        abstract_file_identifier: text("", 37),
        bibliographic_file_identifier: text("", 37),
        creation_date: timestamp.clone(),
        modification_date: timestamp.clone(),
        expiration_date: spec::DigitsDate::unspecified(),
        effective_date: spec::DigitsDate::unspecified(),
        file_structure_version: spec::FileStructureVersion::Standard,
      }
    };

    let mut primary_info = volume_info(&plan.iso, &|text, len| {
      Identifier::a_characters(text, len)
    });
    primary_info.volume_identifier = volume_identifier;

    let primary = spec::PrimaryVolumeDescriptor {
      standard_identifier: spec::StandardIdentifier::Cd001,
      version: spec::VolumeDescriptorVersion::Standard,
      volume: primary_info,
    };

    let supplementary = plan
      .joliet
      .as_ref()
      .map(|layout| spec::SupplementaryVolumeDescriptor {
        standard_identifier: spec::StandardIdentifier::Cd001,
        version: spec::VolumeDescriptorVersion::Standard,
        volume_flags: spec::VolumeFlags::empty(),
        escape_sequences: spec::EscapeSequences::joliet(spec::JolietLevel::Level3),
        volume: volume_info(layout, &joliet_text),
      });

    let boot_record = plan
      .boot_catalog
      .map(|lba| spec::ElToritoBootRecordVolumeDescriptor {
        standard_identifier: spec::StandardIdentifier::Cd001,
        version: spec::VolumeDescriptorVersion::Standard,
        boot_catalog_pointer: lba,
      });

    Ok(Self {
      primary,
      boot_record,
      supplementary,
      terminator: spec::VolumeDescriptorSetTerminator,
    })
  }

  /// Writes every descriptor at its planned sector.
  pub fn write<W: Write>(&self, plan: &LayoutPlan, writer: &mut SectorWriter<W>) -> Result<()> {
    let mut bytes = [0u8; spec::DESCRIPTOR_SIZE];

    self.primary.serialize(&mut (), &mut bytes)?;
    writer.seek_lba(plan.descriptors.primary)?;
    writer.write_all(&bytes)?;

    if let (Some(boot_record), Some(lba)) = (&self.boot_record, plan.descriptors.boot_record) {
      log::debug!("Writing boot record at LBA {}", lba);
      boot_record.serialize(&mut (), &mut bytes)?;
      writer.seek_lba(lba)?;
      writer.write_all(&bytes)?;
    }

    if let (Some(supplementary), Some(lba)) =
      (&self.supplementary, plan.descriptors.supplementary)
    {
      log::debug!("Writing Joliet supplementary volume descriptor at LBA {}", lba);
      supplementary.serialize(&mut (), &mut bytes)?;
      writer.seek_lba(lba)?;
      writer.write_all(&bytes)?;
    }

    self.terminator.serialize(&mut (), &mut bytes)?;
    writer.seek_lba(plan.descriptors.terminator)?;
    writer.write_all(&bytes)?;

    Ok(())
  }
}
