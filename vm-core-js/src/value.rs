use crate::{GcNumber, GcObject, GcString, Heap, MagicString, VmError};
use std::borrow::Cow;
use std::fmt;

/// Values that carry no payload besides their identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SimpleValue {
  Undefined,
  Null,
  False,
  True,
  /// Marks an absent completion value (`Normal(empty)`). Never observable by scripts.
  Empty,
  /// Marks a binding that has not been initialized yet. Never observable by scripts.
  Uninitialized,
}

impl SimpleValue {
  #[inline]
  pub fn from_bool(b: bool) -> Self {
    if b {
      SimpleValue::True
    } else {
      SimpleValue::False
    }
  }

  #[inline]
  pub fn as_bool(self) -> Option<bool> {
    match self {
      SimpleValue::True => Some(true),
      SimpleValue::False => Some(false),
      _ => None,
    }
  }
}

/// The coarse type of a [`Value`], as carried by its tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ValueTag {
  Simple,
  Number,
  String,
  Object,
}

impl fmt::Display for ValueTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ValueTag::Simple => "simple",
      ValueTag::Number => "number",
      ValueTag::String => "string",
      ValueTag::Object => "object",
    })
  }
}

/// A tagged ECMAScript value.
///
/// Values are `Copy` and borrow whatever heap cell they reference; they do not keep it alive. Take
/// a counted reference with [`Heap::retain`] (or receive an [`Owned`](crate::Owned) from an
/// allocation) to hold onto a heap value.
///
/// Number and string values each have two representations that are indistinguishable to scripts:
/// - numbers are stored inline as [`Value::Integer`] when they are an `i32` other than `-0`, and
///   boxed in a [`GcNumber`] cell otherwise;
/// - strings are either a built-in [`MagicString`] or a [`GcString`] cell.
///
/// Only the canonical form is ever produced by the engine: [`Heap::alloc_number`] picks the inline
/// form when it can, so `Value` equality on numbers still requires [`Heap::strict_equals`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Value {
  Simple(SimpleValue),
  Integer(i32),
  Number(GcNumber),
  MagicString(MagicString),
  String(GcString),
  Object(GcObject),
}

impl Value {
  pub const UNDEFINED: Value = Value::Simple(SimpleValue::Undefined);
  pub const NULL: Value = Value::Simple(SimpleValue::Null);
  pub const TRUE: Value = Value::Simple(SimpleValue::True);
  pub const FALSE: Value = Value::Simple(SimpleValue::False);
  pub const EMPTY: Value = Value::Simple(SimpleValue::Empty);
  pub const UNINITIALIZED: Value = Value::Simple(SimpleValue::Uninitialized);

  #[inline]
  pub fn from_bool(b: bool) -> Self {
    Value::Simple(SimpleValue::from_bool(b))
  }

  pub fn tag(self) -> ValueTag {
    match self {
      Value::Simple(_) => ValueTag::Simple,
      Value::Integer(_) | Value::Number(_) => ValueTag::Number,
      Value::MagicString(_) | Value::String(_) => ValueTag::String,
      Value::Object(_) => ValueTag::Object,
    }
  }

  #[inline]
  pub fn is_simple(self) -> bool {
    matches!(self, Value::Simple(_))
  }

  #[inline]
  pub fn is_undefined(self) -> bool {
    self == Value::UNDEFINED
  }

  #[inline]
  pub fn is_null(self) -> bool {
    self == Value::NULL
  }

  #[inline]
  pub fn is_empty(self) -> bool {
    self == Value::EMPTY
  }

  #[inline]
  pub fn is_uninitialized(self) -> bool {
    self == Value::UNINITIALIZED
  }

  #[inline]
  pub fn is_boolean(self) -> bool {
    matches!(self, Value::Simple(SimpleValue::True | SimpleValue::False))
  }

  #[inline]
  pub fn is_number(self) -> bool {
    self.tag() == ValueTag::Number
  }

  #[inline]
  pub fn is_string(self) -> bool {
    self.tag() == ValueTag::String
  }

  #[inline]
  pub fn is_object(self) -> bool {
    matches!(self, Value::Object(_))
  }

  /// Whether this value references a heap cell.
  #[inline]
  pub fn is_heap_ref(self) -> bool {
    matches!(self, Value::Number(_) | Value::String(_) | Value::Object(_))
  }

  /// Whether this is a language value other than an object (`empty` and `uninitialized` are not
  /// language values).
  #[inline]
  pub fn is_primitive(self) -> bool {
    match self {
      Value::Simple(simple) => !matches!(simple, SimpleValue::Empty | SimpleValue::Uninitialized),
      Value::Object(_) => false,
      _ => true,
    }
  }

  fn mismatch(self, expected: ValueTag) -> VmError {
    VmError::TagMismatch {
      expected,
      found: self.tag(),
    }
  }

  pub fn as_simple(self) -> Result<SimpleValue, VmError> {
    match self {
      Value::Simple(simple) => Ok(simple),
      other => Err(other.mismatch(ValueTag::Simple)),
    }
  }

  pub fn as_boolean(self) -> Result<bool, VmError> {
    self.as_simple()?.as_bool().ok_or(VmError::NotBoolean(self))
  }

  pub fn as_object(self) -> Result<GcObject, VmError> {
    match self {
      Value::Object(obj) => Ok(obj),
      other => Err(other.mismatch(ValueTag::Object)),
    }
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::from_bool(b)
  }
}

impl From<SimpleValue> for Value {
  fn from(simple: SimpleValue) -> Self {
    Value::Simple(simple)
  }
}

impl From<MagicString> for Value {
  fn from(magic: MagicString) -> Self {
    Value::MagicString(magic)
  }
}

impl From<GcNumber> for Value {
  fn from(n: GcNumber) -> Self {
    Value::Number(n)
  }
}

impl From<GcString> for Value {
  fn from(s: GcString) -> Self {
    Value::String(s)
  }
}

impl From<GcObject> for Value {
  fn from(obj: GcObject) -> Self {
    Value::Object(obj)
  }
}

/// Returns the inline representation of `n`, if it has one.
pub(crate) fn inline_integer(n: f64) -> Option<i32> {
  let is_integral = n.is_finite() && n.trunc() == n;
  if !is_integral || n < i32::MIN as f64 || n > i32::MAX as f64 {
    return None;
  }
  if n == 0.0 && n.is_sign_negative() {
    return None;
  }
  Some(n as i32)
}

impl Heap {
  /// Reads a number value regardless of representation.
  pub fn number_value(&self, value: Value) -> Result<f64, VmError> {
    match value {
      Value::Integer(i) => Ok(i as f64),
      Value::Number(n) => self.get_number(n),
      other => Err(other.mismatch(ValueTag::Number)),
    }
  }

  /// Reads a string value's code units regardless of representation.
  pub fn string_units(&self, value: Value) -> Result<Cow<'_, [u16]>, VmError> {
    match value {
      Value::MagicString(magic) => Ok(Cow::Owned(magic.code_units().collect())),
      Value::String(s) => Ok(Cow::Borrowed(self.get_string(s)?.as_code_units())),
      other => Err(other.mismatch(ValueTag::String)),
    }
  }

  /// Reads a string value as (lossily decoded) Rust text.
  pub fn string_to_utf8(&self, value: Value) -> Result<String, VmError> {
    match value {
      Value::MagicString(magic) => Ok(magic.as_str().to_owned()),
      Value::String(s) => Ok(self.get_string(s)?.to_utf8_lossy()),
      other => Err(other.mismatch(ValueTag::String)),
    }
  }

  pub(crate) fn string_contents_eq(&self, a: Value, b: Value) -> Result<bool, VmError> {
    match (a, b) {
      (Value::MagicString(x), Value::MagicString(y)) => Ok(x == y),
      (Value::String(x), Value::String(y)) if x == y => Ok(true),
      _ => Ok(self.string_units(a)? == self.string_units(b)?),
    }
  }

  /// `===`.
  pub fn strict_equals(&self, a: Value, b: Value) -> Result<bool, VmError> {
    if a.tag() != b.tag() {
      return Ok(false);
    }
    match a.tag() {
      ValueTag::Number => Ok(self.number_value(a)? == self.number_value(b)?),
      ValueTag::String => self.string_contents_eq(a, b),
      ValueTag::Simple | ValueTag::Object => Ok(a == b),
    }
  }

  /// `SameValue`: like [`Heap::strict_equals`] except that `NaN` equals itself and `+0` differs
  /// from `-0`.
  pub fn same_value(&self, a: Value, b: Value) -> Result<bool, VmError> {
    if a.tag() != b.tag() {
      return Ok(false);
    }
    match a.tag() {
      ValueTag::Number => {
        let (x, y) = (self.number_value(a)?, self.number_value(b)?);
        if x.is_nan() && y.is_nan() {
          return Ok(true);
        }
        Ok(x.to_bits() == y.to_bits() || (x == y && x != 0.0))
      }
      ValueTag::String => self.string_contents_eq(a, b),
      ValueTag::Simple | ValueTag::Object => Ok(a == b),
    }
  }
}
