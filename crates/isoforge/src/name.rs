//! Mapping of arbitrary file names onto ISO 9660 8.3 identifiers and Joliet names.

use crate::{
  error::{Error, Result},
  spec::{self, Identifier},
};
use std::collections::HashSet;

/// Version suffix appended to every ISO 9660 file identifier.
pub const FILE_VERSION: &str = "1";

/// Highest counter tried when resolving a collision; the counter replaces a
/// single character so it has to stay a single digit.
pub const MAX_COLLISION_COUNTER: u32 = 9;

/// Highest counter tried when two Joliet names are equal once cut to
/// [`spec::JOLIET_MAX_UNITS`] code units.
pub const MAX_JOLIET_COLLISION_COUNTER: u32 = 9999;

const FALLBACK_FILE_BASE: &str = "FILE";
const FALLBACK_EXTENSION: &str = "BIN";
const FALLBACK_DIRECTORY: &str = "DIR";

/// Identifiers assigned to a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedName {
  /// ISO 9660 identifier, e.g. `README.TXT;1` or `FILES`.
  pub iso: String,
  /// Joliet name, e.g. `readme.txt`.
  pub joliet: String,
}

/// Assigns unique ISO 9660 identifiers and Joliet names within one directory.
///
/// Names are resolved in the order they are first seen, so the same sequence
/// of names always yields the same identifiers.
#[derive(Debug, Default, Clone)]
pub struct NameMapper {
  used: HashSet<String>,
  used_joliet: HashSet<String>,
}

impl NameMapper {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_used(&self, iso_name: &str) -> bool {
    self.used.contains(iso_name)
  }

  /// Maps a file name to `BASE.EXT;1` and a Joliet name.
  pub fn assign(&mut self, filename: &str) -> Result<MappedName> {
    let joliet = self.claim_joliet(filename)?;
    let (base, extension) = split_extension(filename);

    let base = or_fallback(truncate(&normalize(base), 8), FALLBACK_FILE_BASE);
    let extension = or_fallback(truncate(&normalize(extension), 3), FALLBACK_EXTENSION);

    let iso = self.claim(&base, |stem| format!("{stem}.{extension};{FILE_VERSION}"))?;

    Ok(MappedName { iso, joliet })
  }

  /// Maps a directory name to at most eight d-characters and a Joliet name.
  pub fn assign_directory(&mut self, name: &str) -> Result<MappedName> {
    let joliet = self.claim_joliet(name)?;
    let base = or_fallback(truncate(&normalize(name), 8), FALLBACK_DIRECTORY);

    let iso = self.claim(&base, |stem| stem.to_string())?;

    Ok(MappedName { iso, joliet })
  }

  fn claim(&mut self, base: &str, render: impl Fn(&str) -> String) -> Result<String> {
    let candidate = render(base);

    if self.used.insert(candidate.clone()) {
      return Ok(candidate);
    }

    let stem = truncate(base, 7);

    for counter in 1..=MAX_COLLISION_COUNTER {
      let candidate = render(&format!("{stem}{counter}"));

      if self.used.insert(candidate.clone()) {
        log::debug!("Resolved name collision on {:?} as {:?}", base, candidate);
        return Ok(candidate);
      }
    }

    Err(Error::NameCollisionExhausted { name: candidate })
  }

  /// Cut Joliet names that are already taken get `~N` before their extension,
  /// e.g. `very long name~1.txt`, staying within 64 code units.
  fn claim_joliet(&mut self, name: &str) -> Result<String> {
    let full = joliet_characters(name)?;
    let candidate = truncate(&full, spec::JOLIET_MAX_UNITS);

    if self.used_joliet.insert(candidate.clone()) {
      return Ok(candidate);
    }

    let (base, extension) = split_extension(&full);

    for counter in 1..=MAX_JOLIET_COLLISION_COUNTER {
      let marker = format!("~{counter}");
      let tail = format!("{marker}.{extension}");

      // The extension is dropped when it leaves no room for the base.
      let renamed = if !extension.is_empty() && tail.chars().count() < spec::JOLIET_MAX_UNITS {
        let room = spec::JOLIET_MAX_UNITS - tail.chars().count();
        format!("{}{tail}", truncate(base, room))
      } else {
        let room = spec::JOLIET_MAX_UNITS - marker.len();
        format!("{}{marker}", truncate(&full, room))
      };

      if self.used_joliet.insert(renamed.clone()) {
        log::debug!("Resolved Joliet name collision on {:?} as {:?}", candidate, renamed);
        return Ok(renamed);
      }
    }

    Err(Error::NameCollisionExhausted { name: candidate })
  }
}

/// Splits `name` into base and extension, ignoring leading dots so that
/// `.profile` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
  let leading_dots = name.len() - name.trim_start_matches('.').len();

  match name[leading_dots..].rfind('.') {
    Some(pos) => {
      let pos = leading_dots + pos;
      (&name[..pos], &name[pos + 1..])
    }
    None => (name, ""),
  }
}

/// Uppercases `text` and replaces every character outside `[A-Z0-9_]` with `_`.
pub fn normalize(text: &str) -> String {
  text
    .to_uppercase()
    .chars()
    .map(|c| match u8::try_from(c) {
      Ok(c) if spec::is_d_character(c) => c as char,
      _ => '_',
    })
    .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
  text.chars().take(max_chars).collect()
}

fn or_fallback(text: String, fallback: &str) -> String {
  if text.is_empty() {
    fallback.to_string()
  } else {
    text
  }
}

/// Joliet name for `name`: case and punctuation preserved, cut to
/// [`spec::JOLIET_MAX_UNITS`] code units.
///
/// Control characters and characters outside the basic multilingual plane
/// cannot be recorded and become `_`.
pub fn joliet_name(name: &str) -> Result<String> {
  Ok(truncate(&joliet_characters(name)?, spec::JOLIET_MAX_UNITS))
}

/// `name` with every character a Joliet name cannot hold replaced by `_`.
fn joliet_characters(name: &str) -> Result<String> {
  if name.is_empty() {
    return Err(Error::InvalidName {
      name: name.to_string(),
      reason: "empty name",
    });
  }

  Ok(
    name
      .chars()
      .map(|c| {
        if c.is_control() || c.len_utf16() > 1 {
          '_'
        } else {
          c
        }
      })
      .collect(),
  )
}

/// Encodes a Joliet name as UCS-2 code units.
pub fn encode_joliet(name: &str) -> Result<Vec<u16>> {
  let invalid = |reason| Error::InvalidName {
    name: name.to_string(),
    reason,
  };

  if name.is_empty() {
    return Err(invalid("empty name"));
  }

  let mut buffer = [0u16; spec::JOLIET_MAX_UNITS];
  let len = ucs2::encode(name, &mut buffer).map_err(|err| match err {
    ucs2::Error::BufferOverflow => invalid("longer than 64 UCS-2 code units"),
    ucs2::Error::MultiByte => invalid("not representable in UCS-2"),
  })?;

  Ok(buffer[..len].to_vec())
}

/// Checks an assigned ISO 9660 file identifier.
pub fn validate_file_identifier(iso_name: &str) -> Result<Identifier> {
  Identifier::standard_file_identifier(iso_name).ok_or_else(|| Error::InvalidName {
    name: iso_name.to_string(),
    reason: "not a BASE.EXT;VERSION identifier of d-characters",
  })
}

/// Checks an assigned ISO 9660 directory identifier.
pub fn validate_directory_identifier(iso_name: &str) -> Result<Identifier> {
  Identifier::standard_directory_identifier(iso_name).ok_or_else(|| Error::InvalidName {
    name: iso_name.to_string(),
    reason: "not 1-8 d-characters",
  })
}
