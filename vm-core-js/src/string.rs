use std::fmt;

/// Contents of a heap string cell.
///
/// Strings are sequences of UTF-16 code units and may contain unpaired surrogates.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsString {
  units: Box<[u16]>,
}

impl JsString {
  pub fn from_code_units(units: &[u16]) -> Self {
    Self {
      units: units.into(),
    }
  }

  pub fn from_text(text: &str) -> Self {
    let units: Vec<u16> = text.encode_utf16().collect();
    Self {
      units: units.into_boxed_slice(),
    }
  }

  pub fn len_code_units(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  pub fn as_code_units(&self) -> &[u16] {
    &self.units
  }

  pub fn to_utf8_lossy(&self) -> String {
    String::from_utf16_lossy(&self.units)
  }

  pub(crate) fn heap_size_bytes(&self) -> usize {
    Self::heap_size_bytes_for_len(self.units.len())
  }

  /// Payload bytes for a string of `units_len` code units. The heap adds the per-cell header.
  pub(crate) fn heap_size_bytes_for_len(units_len: usize) -> usize {
    units_len.saturating_mul(2)
  }
}

impl fmt::Debug for JsString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&self.to_utf8_lossy(), f)
  }
}

/// Parses `units` as a canonical array index (`"0"`, `"1"`, ... up to `2^32 - 2`, no leading
/// zeros).
pub(crate) fn parse_array_index(units: &[u16]) -> Option<u32> {
  let (&first, rest) = units.split_first()?;
  if first == u16::from(b'0') {
    return rest.is_empty().then_some(0);
  }
  let mut n: u64 = 0;
  for &unit in units {
    if !(u16::from(b'0')..=u16::from(b'9')).contains(&unit) {
      return None;
    }
    n = n * 10 + u64::from(unit - u16::from(b'0'));
    if n > u64::from(u32::MAX - 1) {
      return None;
    }
  }
  Some(n as u32)
}
