//! Object classes and their internal slots.

use crate::error_object::ErrorKind;
use crate::function::NativeFunctionId;
use crate::gc::{Trace, Tracer};
use crate::{GcObject, Heap, MagicString, Value, VmError};
use std::fmt;

/// The [[Class]] of an object. Fixed at allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ClassTag {
  Object,
  Array,
  Function,
  Boolean,
  Number,
  String,
  Error,
  Arguments,
}

impl ClassTag {
  /// The class name, as reported by the [`InternalSlot::Class`] slot.
  pub fn name(self) -> MagicString {
    match self {
      ClassTag::Object => MagicString::Object,
      ClassTag::Array => MagicString::Array,
      ClassTag::Function => MagicString::Function,
      ClassTag::Boolean => MagicString::Boolean,
      ClassTag::Number => MagicString::Number,
      ClassTag::String => MagicString::String,
      ClassTag::Error => MagicString::Error,
      ClassTag::Arguments => MagicString::Arguments,
    }
  }
}

impl fmt::Display for ClassTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name().as_str())
  }
}

/// Engine-private per-object state.
///
/// Internal slots never appear among an object's properties: property enumeration, lookup and
/// deletion cannot observe them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum InternalSlot {
  /// Every object's class name. Read-only.
  Class,
  /// `Boolean` wrappers.
  PrimitiveBoolean,
  /// `Number` wrappers.
  PrimitiveNumber,
  /// `String` wrappers.
  PrimitiveString,
  /// `Error` objects: which constructor family they belong to. Read-only.
  ErrorKind,
  /// `Function` objects: the native behaviour behind [[Call]]/[[Construct]]. Read-only.
  NativeFunction,
}

impl fmt::Display for InternalSlot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      InternalSlot::Class => "[[Class]]",
      InternalSlot::PrimitiveBoolean => "[[BooleanData]]",
      InternalSlot::PrimitiveNumber => "[[NumberData]]",
      InternalSlot::PrimitiveString => "[[StringData]]",
      InternalSlot::ErrorKind => "[[ErrorData]]",
      InternalSlot::NativeFunction => "[[NativeFunction]]",
    })
  }
}

/// The contents of an internal slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InternalValue {
  Value(Value),
  ErrorKind(ErrorKind),
  NativeFunction(NativeFunctionId),
}

impl InternalValue {
  pub fn as_value(self) -> Option<Value> {
    match self {
      InternalValue::Value(value) => Some(value),
      _ => None,
    }
  }
}

/// Class-specific state of an object. The class tag is derived from it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ObjectKind {
  Ordinary,
  Array,
  Function { native: NativeFunctionId },
  Boolean { primitive: bool },
  /// `primitive` is a number value.
  Number { primitive: Value },
  /// `primitive` is a string value.
  String { primitive: Value },
  Error { kind: ErrorKind },
  Arguments,
}

impl ObjectKind {
  pub fn class(&self) -> ClassTag {
    match self {
      ObjectKind::Ordinary => ClassTag::Object,
      ObjectKind::Array => ClassTag::Array,
      ObjectKind::Function { .. } => ClassTag::Function,
      ObjectKind::Boolean { .. } => ClassTag::Boolean,
      ObjectKind::Number { .. } => ClassTag::Number,
      ObjectKind::String { .. } => ClassTag::String,
      ObjectKind::Error { .. } => ClassTag::Error,
      ObjectKind::Arguments => ClassTag::Arguments,
    }
  }

  /// Internal slots defined for objects of this kind.
  pub fn slots(&self) -> &'static [InternalSlot] {
    match self {
      ObjectKind::Ordinary | ObjectKind::Array | ObjectKind::Arguments => &[InternalSlot::Class],
      ObjectKind::Function { .. } => &[InternalSlot::Class, InternalSlot::NativeFunction],
      ObjectKind::Boolean { .. } => &[InternalSlot::Class, InternalSlot::PrimitiveBoolean],
      ObjectKind::Number { .. } => &[InternalSlot::Class, InternalSlot::PrimitiveNumber],
      ObjectKind::String { .. } => &[InternalSlot::Class, InternalSlot::PrimitiveString],
      ObjectKind::Error { .. } => &[InternalSlot::Class, InternalSlot::ErrorKind],
    }
  }

  /// The heap value this kind holds an edge to, if any.
  pub(crate) fn referenced_value(&self) -> Option<Value> {
    match *self {
      ObjectKind::Number { primitive } | ObjectKind::String { primitive } => {
        primitive.is_heap_ref().then_some(primitive)
      }
      _ => None,
    }
  }

  /// Checks the primitive payload of wrapper kinds.
  pub(crate) fn validate(&self, heap: &Heap) -> Result<(), VmError> {
    match *self {
      ObjectKind::Number { primitive } => check_slot_value(
        heap,
        InternalSlot::PrimitiveNumber,
        primitive,
        Value::is_number,
      ),
      ObjectKind::String { primitive } => check_slot_value(
        heap,
        InternalSlot::PrimitiveString,
        primitive,
        Value::is_string,
      ),
      _ => Ok(()),
    }
  }

  fn get_slot(&self, slot: InternalSlot) -> Option<InternalValue> {
    let value = match (slot, *self) {
      (InternalSlot::Class, kind) => InternalValue::Value(Value::MagicString(kind.class().name())),
      (InternalSlot::PrimitiveBoolean, ObjectKind::Boolean { primitive }) => {
        InternalValue::Value(Value::from_bool(primitive))
      }
      (InternalSlot::PrimitiveNumber, ObjectKind::Number { primitive })
      | (InternalSlot::PrimitiveString, ObjectKind::String { primitive }) => {
        InternalValue::Value(primitive)
      }
      (InternalSlot::ErrorKind, ObjectKind::Error { kind }) => InternalValue::ErrorKind(kind),
      (InternalSlot::NativeFunction, ObjectKind::Function { native }) => {
        InternalValue::NativeFunction(native)
      }
      _ => return None,
    };
    Some(value)
  }
}

fn check_slot_value(
  heap: &Heap,
  slot: InternalSlot,
  value: Value,
  is_expected_type: fn(Value) -> bool,
) -> Result<(), VmError> {
  if !is_expected_type(value) {
    return Err(VmError::InvalidInternalValue { slot });
  }
  if !heap.is_valid_value(value) {
    return Err(VmError::InvalidHandle);
  }
  Ok(())
}

impl Trace for ObjectKind {
  fn trace(&self, tracer: &mut Tracer) {
    if let Some(value) = self.referenced_value() {
      tracer.trace_value(value);
    }
  }
}

impl Heap {
  pub fn object_class(&self, obj: GcObject) -> Result<ClassTag, VmError> {
    Ok(self.get_object(obj)?.kind.class())
  }

  pub fn object_kind(&self, obj: GcObject) -> Result<ObjectKind, VmError> {
    Ok(self.get_object(obj)?.kind)
  }

  /// Reads an internal slot.
  ///
  /// Fails with [`VmError::MissingInternalSlot`] if the object's class does not define `slot`.
  pub fn get_internal(&self, obj: GcObject, slot: InternalSlot) -> Result<InternalValue, VmError> {
    let kind = self.get_object(obj)?.kind;
    kind.get_slot(slot).ok_or(VmError::MissingInternalSlot {
      class: kind.class(),
      slot,
    })
  }

  /// Writes an internal slot.
  ///
  /// Only the primitive slots of wrapper objects are writable; the value must have the slot's type.
  pub fn set_internal(
    &mut self,
    obj: GcObject,
    slot: InternalSlot,
    value: InternalValue,
  ) -> Result<(), VmError> {
    let kind = self.get_object(obj)?.kind;
    if kind.get_slot(slot).is_none() {
      return Err(VmError::MissingInternalSlot {
        class: kind.class(),
        slot,
      });
    }
    if slot == InternalSlot::Class {
      return Err(VmError::InvalidInternalValue { slot });
    }

    let new_kind = match (kind, value) {
      (ObjectKind::Boolean { .. }, InternalValue::Value(value)) => {
        let primitive = value
          .as_simple()
          .ok()
          .and_then(|simple| simple.as_bool())
          .ok_or(VmError::InvalidInternalValue { slot })?;
        ObjectKind::Boolean { primitive }
      }
      (ObjectKind::Number { .. }, InternalValue::Value(primitive)) => ObjectKind::Number { primitive },
      (ObjectKind::String { .. }, InternalValue::Value(primitive)) => ObjectKind::String { primitive },
      _ => return Err(VmError::InvalidInternalValue { slot }),
    };
    new_kind.validate(self)?;

    if let Some(value) = new_kind.referenced_value() {
      self.add_edge(value)?;
    }
    self.get_object_mut(obj)?.kind = new_kind;
    if let Some(value) = kind.referenced_value() {
      self.drop_edge(value);
    }
    Ok(())
  }

  /// Reads the [[BooleanData]] of a `Boolean` wrapper.
  pub fn boolean_data(&self, obj: GcObject) -> Result<bool, VmError> {
    self
      .get_internal(obj, InternalSlot::PrimitiveBoolean)?
      .as_value()
      .ok_or(VmError::InvalidInternalValue {
        slot: InternalSlot::PrimitiveBoolean,
      })?
      .as_boolean()
  }
}
