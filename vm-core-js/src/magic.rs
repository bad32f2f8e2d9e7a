use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::fmt;

macro_rules! magic_strings {
  ($($variant:ident => $text:literal,)*) => {
    /// Built-in strings that can be referenced from a [`Value`](crate::Value) without a heap cell.
    ///
    /// Engine-created strings (property names of built-ins, `typeof` results, conversions of
    /// `true`/`false`/`undefined`, ...) use these, so most string values produced by the core never
    /// allocate. A heap string and a magic string with the same contents are equal under every
    /// comparison the engine performs.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
    #[repr(u16)]
    pub enum MagicString {
      $($variant,)*
    }

    impl MagicString {
      /// Every magic string, in declaration order.
      pub const ALL: &'static [MagicString] = &[$(MagicString::$variant,)*];

      /// The string's contents.
      pub const fn as_str(self) -> &'static str {
        match self {
          $(MagicString::$variant => $text,)*
        }
      }
    }
  };
}

magic_strings! {
  Empty => "",
  Undefined => "undefined",
  Null => "null",
  True => "true",
  False => "false",
  NaN => "NaN",
  Infinity => "Infinity",
  NegativeInfinity => "-Infinity",
  Zero => "0",
  TypeObject => "object",
  TypeBoolean => "boolean",
  TypeNumber => "number",
  TypeString => "string",
  TypeFunction => "function",
  Object => "Object",
  Array => "Array",
  Function => "Function",
  Boolean => "Boolean",
  Number => "Number",
  String => "String",
  Arguments => "Arguments",
  Error => "Error",
  TypeError => "TypeError",
  RangeError => "RangeError",
  ReferenceError => "ReferenceError",
  SyntaxError => "SyntaxError",
  EvalError => "EvalError",
  UriError => "URIError",
  Length => "length",
  Name => "name",
  Message => "message",
  Prototype => "prototype",
  Constructor => "constructor",
  ValueOf => "valueOf",
  ToString => "toString",
  GlobalThis => "globalThis",
  Callee => "callee",
}

static BY_TEXT: Lazy<AHashMap<&'static str, MagicString>> = Lazy::new(|| {
  MagicString::ALL
    .iter()
    .map(|&magic| (magic.as_str(), magic))
    .collect()
});

impl MagicString {
  /// Finds the magic string with exactly these contents.
  pub fn lookup(text: &str) -> Option<MagicString> {
    BY_TEXT.get(text).copied()
  }

  /// Finds the magic string whose UTF-16 encoding equals `units`.
  pub fn lookup_code_units(units: &[u16]) -> Option<MagicString> {
    // Every magic string is ASCII.
    if units.len() > 32 || units.iter().any(|&u| u > 0x7f) {
      return None;
    }
    let text: String = units.iter().map(|&u| u as u8 as char).collect();
    Self::lookup(&text)
  }

  /// Length in UTF-16 code units.
  #[inline]
  pub fn len_code_units(self) -> usize {
    self.as_str().len()
  }

  /// The contents as UTF-16 code units.
  pub fn code_units(self) -> impl Iterator<Item = u16> {
    self.as_str().encode_utf16()
  }
}

impl fmt::Display for MagicString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
