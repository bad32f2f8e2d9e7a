//! Type conversions (`ToBoolean`, `ToNumber`, `ToString`, `ToObject`, `ToPrimitive`, `typeof`).

use crate::class::{ClassTag, ObjectKind};
use crate::error_object::throw_type_error;
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::{
  try_normal, Completion, Heap, MagicString, OwnedValue, SimpleValue, Value, Vm, VmError,
};

/// Hint for [`Vm::to_primitive`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PreferredType {
  Default,
  Number,
  String,
}

/// Formats a number the way `ToString` does.
pub(crate) fn number_to_string(n: f64) -> String {
  if n == 0.0 {
    // Covers -0.
    return "0".to_owned();
  }
  let mut buf = ryu_js::Buffer::new();
  buf.format(n).to_owned()
}

/// `ToNumber` applied to a string.
pub fn string_to_number(text: &str) -> f64 {
  let trimmed = text.trim_matches(is_js_whitespace);
  if trimmed.is_empty() {
    return 0.0;
  }
  if let Some(hex) = trimmed
    .strip_prefix("0x")
    .or_else(|| trimmed.strip_prefix("0X"))
  {
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
      return f64::NAN;
    }
    return hex.bytes().fold(0.0, |acc, b| {
      acc * 16.0 + f64::from((b as char).to_digit(16).unwrap_or(0))
    });
  }
  let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
  if unsigned == "Infinity" {
    return if trimmed.starts_with('-') {
      f64::NEG_INFINITY
    } else {
      f64::INFINITY
    };
  }
  // `f64::from_str` also accepts spellings such as "inf" and "NaN" that are not numeric literals.
  if !trimmed
    .bytes()
    .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
  {
    return f64::NAN;
  }
  trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// WhiteSpace and LineTerminator code points. Space separators (Zs) are listed explicitly;
/// `char::is_whitespace` would also admit U+0085 and U+001C..=U+001F.
fn is_js_whitespace(c: char) -> bool {
  matches!(
    c,
    '\t'
      | '\u{b}'
      | '\u{c}'
      | ' '
      | '\u{a0}'
      | '\u{feff}'
      | '\u{1680}'
      | '\u{2000}'..='\u{200a}'
      | '\u{202f}'
      | '\u{205f}'
      | '\u{3000}'
      | '\n'
      | '\r'
      | '\u{2028}'
      | '\u{2029}'
  )
}

impl Heap {
  /// `ToBoolean`.
  pub fn to_boolean(&self, value: Value) -> Result<bool, VmError> {
    match value {
      Value::Simple(SimpleValue::True) => Ok(true),
      Value::Simple(SimpleValue::False | SimpleValue::Undefined | SimpleValue::Null) => Ok(false),
      Value::Simple(SimpleValue::Empty | SimpleValue::Uninitialized) => {
        Err(VmError::NotALanguageValue(value))
      }
      Value::Integer(i) => Ok(i != 0),
      Value::Number(n) => {
        let n = self.get_number(n)?;
        Ok(!n.is_nan() && n != 0.0)
      }
      Value::MagicString(magic) => Ok(magic != MagicString::Empty),
      Value::String(s) => Ok(!self.get_string(s)?.is_empty()),
      Value::Object(_) => Ok(true),
    }
  }

  /// The `typeof` operator.
  pub fn type_of(&self, value: Value) -> Result<MagicString, VmError> {
    Ok(match value {
      Value::Simple(SimpleValue::Undefined) => MagicString::Undefined,
      Value::Simple(SimpleValue::Null) => MagicString::TypeObject,
      Value::Simple(SimpleValue::True | SimpleValue::False) => MagicString::TypeBoolean,
      Value::Simple(SimpleValue::Empty | SimpleValue::Uninitialized) => {
        return Err(VmError::NotALanguageValue(value))
      }
      Value::Integer(_) | Value::Number(_) => MagicString::TypeNumber,
      Value::MagicString(_) | Value::String(_) => MagicString::TypeString,
      Value::Object(obj) => match self.object_class(obj)? {
        ClassTag::Function => MagicString::TypeFunction,
        _ => MagicString::TypeObject,
      },
    })
  }

  /// `ToString` for primitives. Objects need [`Vm::to_string`], which may run script code.
  pub fn primitive_to_string(&mut self, value: Value) -> Result<OwnedValue, VmError> {
    match value {
      Value::Simple(SimpleValue::Undefined) => Ok(OwnedValue::magic(MagicString::Undefined)),
      Value::Simple(SimpleValue::Null) => Ok(OwnedValue::magic(MagicString::Null)),
      Value::Simple(SimpleValue::True) => Ok(OwnedValue::magic(MagicString::True)),
      Value::Simple(SimpleValue::False) => Ok(OwnedValue::magic(MagicString::False)),
      Value::Integer(i) => self.alloc_string_value(&i.to_string()),
      Value::Number(n) => {
        let n = self.get_number(n)?;
        self.alloc_string_value(&number_to_string(n))
      }
      Value::MagicString(_) | Value::String(_) => self.retain(value),
      Value::Simple(SimpleValue::Empty | SimpleValue::Uninitialized) | Value::Object(_) => {
        Err(VmError::NotALanguageValue(value))
      }
    }
  }

  /// `ToNumber` for primitives.
  pub fn primitive_to_number(&mut self, value: Value) -> Result<OwnedValue, VmError> {
    match value {
      Value::Simple(SimpleValue::Undefined) => self.alloc_number(f64::NAN),
      Value::Simple(SimpleValue::Null | SimpleValue::False) => Ok(OwnedValue::integer(0)),
      Value::Simple(SimpleValue::True) => Ok(OwnedValue::integer(1)),
      Value::Integer(_) | Value::Number(_) => self.retain(value),
      Value::MagicString(_) | Value::String(_) => {
        let n = string_to_number(&self.string_to_utf8(value)?);
        self.alloc_number(n)
      }
      Value::Simple(SimpleValue::Empty | SimpleValue::Uninitialized) | Value::Object(_) => {
        Err(VmError::NotALanguageValue(value))
      }
    }
  }
}

impl Vm {
  /// `ToPrimitive`. Objects are converted with [[DefaultValue]]: `valueOf` then `toString`, or the
  /// reverse for a `String` hint.
  pub fn to_primitive(
    &mut self,
    heap: &mut Heap,
    value: Value,
    hint: PreferredType,
  ) -> Result<Completion, VmError> {
    let Value::Object(obj) = value else {
      return Ok(Completion::normal(heap.retain(value)?));
    };
    let methods = match hint {
      PreferredType::String => [MagicString::ToString, MagicString::ValueOf],
      PreferredType::Default | PreferredType::Number => {
        [MagicString::ValueOf, MagicString::ToString]
      }
    };
    for name in methods {
      let method = try_normal!(self.get(heap, obj, PropertyKey::Magic(name)));
      if !self.is_callable(heap, method.get())? {
        heap.release(method);
        continue;
      }
      let result = self.call(heap, method.get(), value, &[]);
      heap.release(method);
      let result = try_normal!(result);
      if result.get().is_primitive() {
        return Ok(Completion::normal(result));
      }
      heap.release(result);
    }
    throw_type_error(self, heap, "cannot convert object to primitive value")
  }

  /// `ToNumber`.
  pub fn to_number(&mut self, heap: &mut Heap, value: Value) -> Result<Completion, VmError> {
    if !value.is_object() {
      return Ok(Completion::normal(heap.primitive_to_number(value)?));
    }
    let primitive = try_normal!(self.to_primitive(heap, value, PreferredType::Number));
    let number = heap.primitive_to_number(primitive.get());
    heap.release(primitive);
    Ok(Completion::normal(number?))
  }

  /// `ToString`.
  pub fn to_string(&mut self, heap: &mut Heap, value: Value) -> Result<Completion, VmError> {
    if !value.is_object() {
      return Ok(Completion::normal(heap.primitive_to_string(value)?));
    }
    let primitive = try_normal!(self.to_primitive(heap, value, PreferredType::String));
    let string = heap.primitive_to_string(primitive.get());
    heap.release(primitive);
    Ok(Completion::normal(string?))
  }

  /// `ToPropertyKey`: completes with a string value usable with [`PropertyKey::from_value`].
  pub fn to_property_key(&mut self, heap: &mut Heap, value: Value) -> Result<Completion, VmError> {
    self.to_string(heap, value)
  }

  /// `ToObject`. Primitives are wrapped in a fresh object of the matching class; `undefined` and
  /// `null` throw a `TypeError`.
  pub fn to_object(&mut self, heap: &mut Heap, value: Value) -> Result<Completion, VmError> {
    let intrinsics = self.require_intrinsics()?;
    let wrapper = match value {
      Value::Object(_) => return Ok(Completion::normal(heap.retain(value)?)),
      Value::Simple(SimpleValue::Undefined | SimpleValue::Null) => {
        return throw_type_error(self, heap, "cannot convert undefined or null to object");
      }
      Value::Simple(SimpleValue::True | SimpleValue::False) => heap.alloc_object(
        Some(intrinsics.boolean_wrapper_prototype()),
        ObjectKind::Boolean {
          primitive: value.as_boolean()?,
        },
      )?,
      Value::Integer(_) | Value::Number(_) => heap.alloc_object(
        Some(intrinsics.number_prototype()),
        ObjectKind::Number { primitive: value },
      )?,
      Value::MagicString(_) | Value::String(_) => {
        let len = heap.string_units(value)?.len();
        let wrapper = heap.alloc_object(
          Some(intrinsics.string_prototype()),
          ObjectKind::String { primitive: value },
        )?;
        heap.initialize(wrapper, |heap, wrapper| {
          // Lengths past `i32::MAX` are boxed.
          let length = heap.alloc_number(len as f64)?;
          let defined = heap.define_property(
            wrapper,
            PropertyKey::Magic(MagicString::Length),
            PropertyDescriptor::data(length.get(), false, false, false),
          );
          heap.release(length);
          defined
        })?
      }
      Value::Simple(SimpleValue::Empty | SimpleValue::Uninitialized) => {
        return Err(VmError::NotALanguageValue(value));
      }
    };
    Ok(Completion::normal(wrapper.into_value()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn string_to_number_follows_numeric_literal_grammar() {
    assert_eq!(string_to_number(""), 0.0);
    assert_eq!(string_to_number("  \n"), 0.0);
    assert_eq!(string_to_number(" 42 "), 42.0);
    assert_eq!(string_to_number("-1.5e2"), -150.0);
    assert_eq!(string_to_number(".5"), 0.5);
    assert_eq!(string_to_number("0x1F"), 31.0);
    assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
    assert!(string_to_number("inf").is_nan());
    assert!(string_to_number("NaN").is_nan());
    assert!(string_to_number("0x").is_nan());
    assert!(string_to_number("12px").is_nan());
  }

  #[test]
  fn only_ecmascript_whitespace_is_trimmed() {
    assert_eq!(string_to_number("\t\u{b}\u{c}\u{feff}1\r\n"), 1.0);
    assert_eq!(string_to_number("\u{2028}2\u{2029}"), 2.0);
    assert_eq!(string_to_number("\u{1680}\u{2003}3\u{202f}\u{3000}"), 3.0);
    assert_eq!(string_to_number("\u{205f}\u{200a}"), 0.0);
    assert!(string_to_number("\u{85}1").is_nan());
    assert!(string_to_number("1\u{85}").is_nan());
    assert!(string_to_number("\u{1c}1").is_nan());
    assert!(string_to_number("\u{180e}1").is_nan());
    assert!(string_to_number("\u{200b}1").is_nan());
  }

  #[test]
  fn number_formatting() {
    assert_eq!(number_to_string(-0.0), "0");
    assert_eq!(number_to_string(1.5), "1.5");
    assert_eq!(number_to_string(f64::NAN), "NaN");
    assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    assert_eq!(number_to_string(1e21), "1e+21");
    assert_eq!(number_to_string(123456789.0), "123456789");
  }
}
