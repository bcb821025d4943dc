use crate::{
  layout::NamespaceLayout,
  serialize::{Endianness, IsoSerialize},
  spec,
  writer::sector::SectorWriter,
};
use std::io::Write;

/// Path table records of one name space, in path table order.
pub struct PathTable {
  records: Vec<spec::PathTableRecord>,
}

impl PathTable {
  pub fn from_layout(layout: &NamespaceLayout) -> Self {
    let records = layout
      .directories
      .iter()
      .map(|dir| spec::PathTableRecord {
        extended_attribute_record_length: 0,
        extent_location: dir.extent.lba,
        parent_directory_number: dir.parent_number,
        directory_identifier: dir.identifier.clone(),
      })
      .collect();

    Self { records }
  }

  /// Writes the table at `lba` in the given byte order.
  pub fn write<W: Write>(
    &self,
    writer: &mut SectorWriter<W>,
    lba: u32,
    mut endianness: Endianness,
  ) -> std::io::Result<()> {
    writer.seek_lba(lba)?;

    let mut record_bytes = vec![];

    for record in &self.records {
      log::debug!("Writing ({:?}) path table record: {:?}", endianness, record);

      record_bytes.resize(record.extent(), 0);
      record.serialize(&mut endianness, &mut record_bytes)?;
      writer.write_all(&record_bytes)?;
    }

    writer.pad_to_sector()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{fs::Tree, layout::LayoutPlanner, path::IsoPath};

  #[test]
  fn records_in_both_byte_orders() {
    let mut tree = Tree::new();
    tree.insert_file(IsoPath::new("FILES/test.txt"), 1).unwrap();

    let plan = LayoutPlanner::new(false).plan(&tree, None).unwrap();
    let table = PathTable::from_layout(&plan.iso);
    assert_eq!(plan.iso.path_table_size, 24);

    let files_lba = plan.iso.directories[1].extent.lba;

    let mut writer = SectorWriter::new(vec![], 2048);
    table.write(&mut writer, 0, Endianness::Little).unwrap();
    table.write(&mut writer, 1, Endianness::Big).unwrap();
    let bytes = writer.into_inner();

    assert_eq!(bytes.len(), 4096);

    // Root: identifier length 1, identifier 0x00, one pad byte.
    assert_eq!(bytes[0], 1);
    assert_eq!(&bytes[6..8], &1u16.to_le_bytes());
    assert_eq!(&bytes[10..12], &[5, 0]);
    assert_eq!(&bytes[12..16], &files_lba.to_le_bytes());
    assert_eq!(&bytes[16..18], &1u16.to_le_bytes());
    assert_eq!(&bytes[18..23], b"FILES");

    let big = &bytes[2048..];
    assert_eq!(&big[12..16], &files_lba.to_be_bytes());
    assert_eq!(&big[16..18], &1u16.to_be_bytes());
  }
}
