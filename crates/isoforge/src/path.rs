/// On-disc path of a manifest entry, e.g. `FILES/test.txt`.
///
/// Both `/` and `\` separate components; empty components are skipped so
/// `/FILES//test.txt` and `FILES/test.txt` name the same entry.
#[derive(Debug)]
#[repr(transparent)]
pub struct IsoPath(str);

impl IsoPath {
  pub fn new<S: AsRef<str> + ?Sized>(s: &S) -> &Self {
    // SAFETY: `IsoPath` is a transparent wrapper around `str`.
    unsafe { &*(s.as_ref() as *const str as *const IsoPath) }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Returns the components of this path as an iterator.
  pub fn components(&self) -> Components<'_> {
    Components { path: &self.0 }
  }

  /// Last component of the path, if any.
  pub fn file_name(&self) -> Option<&str> {
    self.components().last()
  }

  /// Every component except the last one.
  pub fn parent_components(&self) -> impl Iterator<Item = &str> {
    let count = self.components().count().saturating_sub(1);
    self.components().take(count)
  }
}

impl AsRef<IsoPath> for str {
  fn as_ref(&self) -> &IsoPath {
    IsoPath::new(self)
  }
}

pub struct Components<'a> {
  path: &'a str,
}

impl<'a> Iterator for Components<'a> {
  type Item = &'a str;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if self.path.is_empty() {
        return None;
      }

      let part = if let Some(pos) = self.path.find(['/', '\\']) {
        let part = &self.path[..pos];
        self.path = &self.path[pos + 1..];
        part
      } else {
        let part = self.path;
        self.path = "";
        part
      };

      if !part.is_empty() {
        return Some(part);
      }
    }
  }
}
