use crate::{GcNumber, GcObject, GcString, HeapId, MagicString, SimpleValue, Value};
use std::fmt;

/// A handle type that may reference a heap cell.
pub trait HeapRef: Copy + PartialEq + fmt::Debug {
  /// The referenced cell, or `None` if the value is stored inline.
  fn heap_id(self) -> Option<HeapId>;
}

impl HeapRef for GcObject {
  #[inline]
  fn heap_id(self) -> Option<HeapId> {
    Some(self.0)
  }
}

impl HeapRef for GcString {
  #[inline]
  fn heap_id(self) -> Option<HeapId> {
    Some(self.0)
  }
}

impl HeapRef for GcNumber {
  #[inline]
  fn heap_id(self) -> Option<HeapId> {
    Some(self.0)
  }
}

impl HeapRef for Value {
  #[inline]
  fn heap_id(self) -> Option<HeapId> {
    match self {
      Value::Number(n) => Some(n.0),
      Value::String(s) => Some(s.0),
      Value::Object(obj) => Some(obj.0),
      Value::Simple(_) | Value::Integer(_) | Value::MagicString(_) => None,
    }
  }
}

/// A counted (external) reference to a heap value.
///
/// Every `Owned` handle contributes one to its cell's reference count and keeps the cell alive,
/// both against reference-count release and against [`Heap::collect_garbage`](crate::Heap::collect_garbage).
/// It is not `Clone`: take another reference with [`Heap::retain`](crate::Heap::retain), and give each one
/// back with [`Heap::release`](crate::Heap::release). Dropping an `Owned` without releasing it leaks the
/// count (the cell then lives as long as the heap).
///
/// Handles for inline values (booleans, small integers, magic strings) carry no count and can be
/// made without a heap.
#[must_use = "owned handles must be given back with `Heap::release`"]
#[derive(PartialEq)]
pub struct Owned<T: HeapRef> {
  handle: T,
}

/// An owned reference to any value.
pub type OwnedValue = Owned<Value>;

impl<T: HeapRef> Owned<T> {
  /// Wraps a handle whose count has already been taken on the caller's behalf.
  #[inline]
  pub(crate) fn adopt(handle: T) -> Self {
    Self { handle }
  }

  /// Borrows the handle. The result stays valid for as long as `self` is held.
  #[inline]
  pub fn get(&self) -> T {
    self.handle
  }

  /// Gives up the handle without touching the count; the caller takes over the reference.
  #[inline]
  pub(crate) fn into_raw(self) -> T {
    self.handle
  }

  /// Converts into an owned [`Value`], carrying the same reference.
  #[inline]
  pub fn into_value(self) -> OwnedValue
  where
    T: Into<Value>,
  {
    Owned {
      handle: self.handle.into(),
    }
  }
}

impl<T: HeapRef> fmt::Debug for Owned<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Owned").field(&self.handle).finish()
  }
}

impl OwnedValue {
  /// Wraps an inline value. Returns `None` for heap references, which must be retained instead.
  pub fn inline(value: Value) -> Option<Self> {
    (!value.is_heap_ref()).then_some(Self { handle: value })
  }

  #[inline]
  pub fn undefined() -> Self {
    Self::simple(SimpleValue::Undefined)
  }

  #[inline]
  pub fn null() -> Self {
    Self::simple(SimpleValue::Null)
  }

  #[inline]
  pub fn empty() -> Self {
    Self::simple(SimpleValue::Empty)
  }

  #[inline]
  pub fn simple(simple: SimpleValue) -> Self {
    Self {
      handle: Value::Simple(simple),
    }
  }

  #[inline]
  pub fn boolean(b: bool) -> Self {
    Self::simple(SimpleValue::from_bool(b))
  }

  #[inline]
  pub fn integer(i: i32) -> Self {
    Self {
      handle: Value::Integer(i),
    }
  }

  #[inline]
  pub fn magic(magic: MagicString) -> Self {
    Self {
      handle: Value::MagicString(magic),
    }
  }
}
