use isoforge::{
  error::Error,
  fs::Tree,
  layout::{LayoutPlanner, RegionKind},
  path::IsoPath,
  BootImage, ImageBuilder, Manifest,
};

const SECTOR: usize = 2048;

fn sector(image: &[u8], lba: u32) -> &[u8] {
  &image[lba as usize * SECTOR..(lba as usize + 1) * SECTOR]
}

fn le_u32(bytes: &[u8]) -> u32 {
  u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[derive(Debug, Clone)]
struct Record {
  identifier: Vec<u8>,
  lba: u32,
  length: u32,
  directory: bool,
}

fn parse_record(bytes: &[u8]) -> Record {
  let id_len = bytes[32] as usize;

  assert_eq!(&bytes[2..6], &bytes[6..10].iter().rev().copied().collect::<Vec<_>>()[..]);

  Record {
    identifier: bytes[33..33 + id_len].to_vec(),
    lba: le_u32(&bytes[2..6]),
    length: le_u32(&bytes[10..14]),
    directory: bytes[25] & 0x02 != 0,
  }
}

/// Every record of a directory extent, `.` and `..` included.
fn directory_records(image: &[u8], dir: &Record) -> Vec<Record> {
  let mut records = vec![];

  for ix in 0..dir.length as usize / SECTOR {
    let data = sector(image, dir.lba + ix as u32);
    let mut offset = 0;

    while offset < SECTOR && data[offset] != 0 {
      let len = data[offset] as usize;
      assert!(offset + len <= SECTOR, "record straddles a sector");
      records.push(parse_record(&data[offset..offset + len]));
      offset += len;
    }
  }

  records
}

/// Root directory record of the descriptor at `lba`.
fn root_record(image: &[u8], lba: u32) -> Record {
  parse_record(&sector(image, lba)[156..190])
}

/// Every file below `dir`, keyed by its path of raw identifiers.
fn walk(image: &[u8], dir: &Record, prefix: &str, decode: &dyn Fn(&[u8]) -> String) -> Vec<(String, Vec<u8>)> {
  let mut files = vec![];

  for record in directory_records(image, dir).into_iter().skip(2) {
    let path = format!("{prefix}{}", decode(&record.identifier));
    if record.directory {
      files.extend(walk(image, &record, &format!("{path}/"), decode));
    } else {
      let start = record.lba as usize * SECTOR;
      files.push((path, image[start..start + record.length as usize].to_vec()));
    }
  }

  files
}

fn ascii(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes).into_owned()
}

fn ucs2(bytes: &[u8]) -> String {
  let units: Vec<u16> = bytes
    .chunks_exact(2)
    .map(|unit| u16::from_be_bytes([unit[0], unit[1]]))
    .collect();
  String::from_utf16_lossy(&units)
}

fn is_iso_file_name(name: &str) -> bool {
  let Some((stem, version)) = name.split_once(';') else {
    return false;
  };
  let Some((base, extension)) = stem.split_once('.') else {
    return false;
  };
  let d = |text: &str, max: usize| {
    (1..=max).contains(&text.len())
      && text
        .bytes()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == b'_')
  };

  d(base, 8) && d(extension, 3) && !version.is_empty() && version.bytes().all(|c| c.is_ascii_digit())
}

#[test]
fn test_readme_scenario() {
  let mut manifest = Manifest::new();
  manifest.add("readme.txt", b"hello");

  let image = ImageBuilder::new().build(manifest).unwrap();

  assert_eq!(image.len(), 26 * SECTOR);
  assert!(image[..16 * SECTOR].iter().all(|&b| b == 0));

  let pvd = sector(&image, 16);
  assert_eq!(pvd[0], 1);
  assert_eq!(&pvd[1..6], b"CD001");
  assert_eq!(&pvd[40..72], format!("{:<32}", "README").as_bytes());

  let svd = sector(&image, 17);
  assert_eq!(svd[0], 2);
  assert_eq!(&svd[88..91], b"%/E");
  assert_eq!(sector(&image, 18)[0], 255);

  let iso = walk(&image, &root_record(&image, 16), "/", &ascii);
  assert_eq!(iso, [("/README.TXT;1".to_string(), b"hello".to_vec())]);

  let joliet = walk(&image, &root_record(&image, 17), "/", &ucs2);
  assert_eq!(joliet, [("/readme.txt".to_string(), b"hello".to_vec())]);
}

#[test]
fn test_round_trip_nested_files() {
  let big: Vec<u8> = (0..5000u32).map(|ix| (ix % 251) as u8).collect();
  let exact = vec![0x5Au8; 2048];

  let mut manifest = Manifest::new();
  manifest
    .add("autorun.inf", b"[autorun]\r\nopen=setup.exe\r\n")
    .add("FILES/test.txt", b"nested")
    .add("FILES/deeper/data.bin", big.clone())
    .add("FILES/empty.txt", b"")
    .add("exact.dat", exact.clone());

  let image = ImageBuilder::new().build(manifest).unwrap();

  let mut iso = walk(&image, &root_record(&image, 16), "/", &ascii);
  iso.sort();

  assert_eq!(
    iso,
    [
      ("/AUTORUN.INF;1".to_string(), b"[autorun]\r\nopen=setup.exe\r\n".to_vec()),
      ("/EXACT.DAT;1".to_string(), exact.clone()),
      ("/FILES/DEEPER/DATA.BIN;1".to_string(), big.clone()),
      ("/FILES/EMPTY.TXT;1".to_string(), vec![]),
      ("/FILES/TEST.TXT;1".to_string(), b"nested".to_vec()),
    ]
  );

  let mut joliet = walk(&image, &root_record(&image, 17), "/", &ucs2);
  joliet.sort();

  assert_eq!(joliet[2], ("/FILES/deeper/data.bin".to_string(), big));
  assert_eq!(joliet[4], ("/FILES/test.txt".to_string(), b"nested".to_vec()));
}

#[test]
fn test_image_length_matches_layout() {
  let files: [(&str, usize); 4] = [
    ("a.txt", 1),
    ("b/c.txt", 2048),
    ("b/d.txt", 2049),
    ("e.bin", 10_000),
  ];

  let mut tree = Tree::new();
  let mut manifest = Manifest::new();

  for (name, size) in files {
    tree.insert_file(IsoPath::new(name), size as u64).unwrap();
    manifest.add(name, vec![1u8; size]);
  }

  let plan = LayoutPlanner::new(true).plan(&tree, None).unwrap();
  let metadata_sectors = plan
    .regions()
    .iter()
    .filter(|region| !matches!(region.kind, RegionKind::File(_)))
    .map(|region| region.lba + region.sectors)
    .max()
    .unwrap() as usize;
  let data_sectors: usize = files.iter().map(|(_, size)| size.div_ceil(SECTOR)).sum();

  let image = ImageBuilder::new().build(manifest).unwrap();

  assert_eq!(image.len(), (metadata_sectors + data_sectors) * SECTOR);
  assert_eq!(image.len() as u64, plan.image_size());
}

#[test]
fn test_deterministic_output() {
  let build = || {
    let mut manifest = Manifest::new();
    manifest
      .add("setup.exe", b"MZ\x90\x00".as_slice())
      .add("docs/readme.txt", b"read me")
      .set_recording_time(chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap())
      .set_boot_image(BootImage::new(vec![0xEBu8; 2048]));
    ImageBuilder::new().build(manifest).unwrap()
  };

  assert_eq!(build(), build());
}

#[test]
fn test_boot_catalog() {
  let boot: Vec<u8> = (0..512u32).map(|ix| ix as u8).collect();

  let mut manifest = Manifest::new();
  manifest
    .add("setup.exe", b"MZ")
    .set_boot_image(BootImage::new(boot.clone()).with_load_size(4));

  let image = ImageBuilder::new().build(manifest).unwrap();

  let boot_record = sector(&image, 17);
  assert_eq!(boot_record[0], 0);
  assert_eq!(&boot_record[1..6], b"CD001");
  assert_eq!(&boot_record[7..30], b"EL TORITO SPECIFICATION");
  assert!(boot_record[30..39].iter().all(|&b| b == 0));

  let catalog = sector(&image, le_u32(&boot_record[71..75]));
  let sum = catalog[..32]
    .chunks_exact(2)
    .fold(0u16, |sum, w| sum.wrapping_add(u16::from_le_bytes([w[0], w[1]])));
  assert_eq!(sum, 0);
  assert_eq!(catalog[0], 1);
  assert_eq!(&catalog[30..32], &[0x55, 0xAA]);

  assert_eq!(catalog[32], 0x88);
  assert_eq!(catalog[33], 0);
  assert_eq!(u16::from_le_bytes([catalog[38], catalog[39]]), 4);

  let boot_lba = le_u32(&catalog[40..44]);
  assert_eq!(&sector(&image, boot_lba)[..512], &boot[..]);
  assert!(sector(&image, boot_lba)[512..].iter().all(|&b| b == 0));

  // The boot image is also a regular file in the root directory.
  let root = root_record(&image, 16);
  let entry = directory_records(&image, &root)
    .into_iter()
    .find(|record| record.identifier == b"BOOT.IMG;1")
    .unwrap();
  assert_eq!(entry.lba, boot_lba);
  assert_eq!(entry.length, 512);
}

#[test]
fn test_boot_load_size_past_image() {
  let mut manifest = Manifest::new();
  manifest
    .add("a.txt", b"a")
    .set_boot_image(BootImage::new(vec![0u8; 512]).with_load_size(5));

  assert!(matches!(
    ImageBuilder::new().build(manifest),
    Err(Error::BootLoadSizeExceedsImage { declared: 5, available: 4 })
  ));
}

#[test]
fn test_without_joliet() {
  let mut manifest = Manifest::new();
  manifest.add("readme.txt", b"hello").set_joliet(false);

  let image = ImageBuilder::new().build(manifest).unwrap();

  assert_eq!(sector(&image, 17)[0], 255);
  assert_eq!(image.len(), 22 * SECTOR);
}

#[test]
fn test_empty_manifest() {
  assert!(matches!(
    ImageBuilder::new().build(Manifest::new()),
    Err(Error::EmptyImage)
  ));
}

#[test]
fn test_collision_names() {
  let mut manifest = Manifest::new();
  for ix in 0..10 {
    manifest.add(format!("longname{ix}.txt"), b"x");
  }

  let image = ImageBuilder::new().build(manifest).unwrap();
  let names: Vec<String> = directory_records(&image, &root_record(&image, 16))
    .into_iter()
    .skip(2)
    .map(|record| ascii(&record.identifier))
    .collect();

  assert_eq!(names.len(), 10);
  assert!(names.iter().all(|name| is_iso_file_name(name)), "{names:?}");

  let mut unique = names.clone();
  unique.dedup();
  assert_eq!(unique.len(), 10);

  let mut manifest = Manifest::new();
  for ix in 0..11 {
    manifest.add(format!("longname{ix}.txt"), b"x");
  }

  assert!(matches!(
    ImageBuilder::new().build(manifest),
    Err(Error::NameCollisionExhausted { .. })
  ));
}

#[test]
fn test_odd_names_map_to_valid_identifiers() {
  let names = [
    "Read Me.Text",
    "archive.tar.gz",
    ".hidden",
    "noext",
    "ünïcödé.txt",
    "trailing.",
    "a-b+c=d.e-f",
  ];

  let mut manifest = Manifest::new();
  for name in names {
    manifest.add(name, b"x");
  }

  let image = ImageBuilder::new().build(manifest).unwrap();
  let iso: Vec<String> = directory_records(&image, &root_record(&image, 16))
    .into_iter()
    .skip(2)
    .map(|record| ascii(&record.identifier))
    .collect();

  assert_eq!(iso.len(), names.len());
  assert!(iso.iter().all(|name| is_iso_file_name(name)), "{iso:?}");

  let mut joliet: Vec<String> = directory_records(&image, &root_record(&image, 17))
    .into_iter()
    .skip(2)
    .map(|record| ucs2(&record.identifier))
    .collect();
  joliet.sort();

  let mut expected: Vec<String> = names.iter().map(|name| name.to_string()).collect();
  expected.sort();

  assert_eq!(joliet, expected);
}

#[test]
fn test_long_joliet_names_sharing_a_prefix() {
  let first = "x".repeat(70) + "1.txt";
  let second = "x".repeat(70) + "2.txt";

  let mut manifest = Manifest::new();
  manifest.add(first.as_str(), b"one").add(second.as_str(), b"two");

  let image = ImageBuilder::new().build(manifest).unwrap();

  let mut joliet = walk(&image, &root_record(&image, 17), "/", &ucs2);
  joliet.sort();

  assert_eq!(
    joliet,
    [
      (format!("/{}", "x".repeat(64)), b"one".to_vec()),
      (format!("/{}~1.txt", "x".repeat(58)), b"two".to_vec()),
    ]
  );

  let mut iso = walk(&image, &root_record(&image, 16), "/", &ascii);
  iso.sort();

  assert_eq!(
    iso,
    [
      ("/XXXXXXX1.TXT;1".to_string(), b"two".to_vec()),
      ("/XXXXXXXX.TXT;1".to_string(), b"one".to_vec()),
    ]
  );
}

#[test]
fn test_build_to_path() {
  let dir = tempfile::tempdir().unwrap();
  let output = dir.path().join("out.iso");

  let mut manifest = Manifest::new();
  manifest.add("readme.txt", b"hello");

  ImageBuilder::new().build_to_path(manifest, &output).unwrap();

  let image = std::fs::read(&output).unwrap();
  assert_eq!(image.len(), 26 * SECTOR);
  assert_eq!(&sector(&image, 16)[1..6], b"CD001");
}

#[test]
fn test_failed_build_leaves_no_file() {
  let dir = tempfile::tempdir().unwrap();
  let output = dir.path().join("out.iso");

  assert!(ImageBuilder::new()
    .build_to_path(Manifest::new(), &output)
    .is_err());

  assert!(!output.exists());
  assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_capture_directory() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::create_dir_all(dir.path().join("sub")).unwrap();
  std::fs::write(dir.path().join("top.txt"), b"top").unwrap();
  std::fs::write(dir.path().join("sub/inner.txt"), b"inner").unwrap();

  let mut manifest = Manifest::new();
  manifest.capture("data", dir.path()).unwrap();

  let names: Vec<&str> = manifest.entries().iter().map(|entry| entry.name.as_str()).collect();
  assert_eq!(names, ["data/sub/inner.txt", "data/top.txt"]);

  let image = ImageBuilder::new().build(manifest).unwrap();
  let mut files = walk(&image, &root_record(&image, 17), "/", &ucs2);
  files.sort();

  assert_eq!(
    files,
    [
      ("/data/sub/inner.txt".to_string(), b"inner".to_vec()),
      ("/data/top.txt".to_string(), b"top".to_vec()),
    ]
  );
}

#[test]
fn test_capture_missing_path() {
  let dir = tempfile::tempdir().unwrap();

  assert!(matches!(
    Manifest::new().capture("", dir.path().join("missing")),
    Err(Error::NotAFile(_))
  ));
}
