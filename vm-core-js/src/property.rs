use crate::heap::HeapObject;
use crate::string::parse_array_index;
use crate::{GcObject, GcString, Heap, MagicString, Value, VmError};

/// A property name.
///
/// Keys compare by string contents: a magic key and a heap-string key with the same code units
/// name the same property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
  Magic(MagicString),
  String(GcString),
}

impl PropertyKey {
  #[inline]
  pub fn as_value(self) -> Value {
    match self {
      PropertyKey::Magic(magic) => Value::MagicString(magic),
      PropertyKey::String(s) => Value::String(s),
    }
  }

  /// Reinterprets a string value as a key. Non-string values must go through
  /// [`Vm::to_property_key`](crate::Vm::to_property_key) first.
  pub fn from_value(value: Value) -> Result<Self, VmError> {
    match value {
      Value::MagicString(magic) => Ok(PropertyKey::Magic(magic)),
      Value::String(s) => Ok(PropertyKey::String(s)),
      other => Err(VmError::TagMismatch {
        expected: crate::ValueTag::String,
        found: other.tag(),
      }),
    }
  }
}

impl From<MagicString> for PropertyKey {
  fn from(magic: MagicString) -> Self {
    PropertyKey::Magic(magic)
  }
}

impl From<GcString> for PropertyKey {
  fn from(s: GcString) -> Self {
    PropertyKey::String(s)
  }
}

/// A concrete property descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
  pub enumerable: bool,
  pub configurable: bool,
  pub kind: PropertyKind,
}

/// The kind of property described by a [`PropertyDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
  Data { value: Value, writable: bool },
  /// `get`/`set` are function objects or `undefined`.
  Accessor { get: Value, set: Value },
}

impl PropertyDescriptor {
  pub fn data(value: Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
    Self {
      enumerable,
      configurable,
      kind: PropertyKind::Data { value, writable },
    }
  }

  /// Writable, enumerable and configurable: what a plain assignment creates.
  pub fn plain_data(value: Value) -> Self {
    Self::data(value, true, true, true)
  }

  pub fn accessor(get: Value, set: Value, enumerable: bool, configurable: bool) -> Self {
    Self {
      enumerable,
      configurable,
      kind: PropertyKind::Accessor { get, set },
    }
  }

  #[inline]
  pub fn is_data_descriptor(&self) -> bool {
    matches!(self.kind, PropertyKind::Data { .. })
  }

  #[inline]
  pub fn is_accessor_descriptor(&self) -> bool {
    matches!(self.kind, PropertyKind::Accessor { .. })
  }

  /// Heap values this descriptor holds edges to.
  pub(crate) fn referenced_values(&self) -> [Option<Value>; 2] {
    match self.kind {
      PropertyKind::Data { value, .. } => [Some(value), None],
      PropertyKind::Accessor { get, set } => [Some(get), Some(set)],
    }
  }
}

/// A partial property descriptor, as passed to [[DefineOwnProperty]].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptorPatch {
  pub enumerable: Option<bool>,
  pub configurable: Option<bool>,
  pub value: Option<Value>,
  pub writable: Option<bool>,
  pub get: Option<Value>,
  pub set: Option<Value>,
}

impl PropertyDescriptorPatch {
  /// Rejects patches that mix data and accessor fields.
  pub fn validate(&self) -> Result<(), VmError> {
    if self.is_data_descriptor() && self.is_accessor_descriptor() {
      return Err(VmError::InvalidPropertyDescriptorPatch);
    }
    Ok(())
  }

  pub fn is_data_descriptor(&self) -> bool {
    self.value.is_some() || self.writable.is_some()
  }

  pub fn is_accessor_descriptor(&self) -> bool {
    self.get.is_some() || self.set.is_some()
  }

  pub fn is_generic_descriptor(&self) -> bool {
    !self.is_data_descriptor() && !self.is_accessor_descriptor()
  }

  pub fn is_empty(&self) -> bool {
    self.is_generic_descriptor() && self.enumerable.is_none() && self.configurable.is_none()
  }

  pub(crate) fn referenced_values(&self) -> [Option<Value>; 3] {
    [self.value, self.get, self.set]
  }
}

impl From<PropertyDescriptor> for PropertyDescriptorPatch {
  fn from(desc: PropertyDescriptor) -> Self {
    let mut patch = PropertyDescriptorPatch {
      enumerable: Some(desc.enumerable),
      configurable: Some(desc.configurable),
      ..Default::default()
    };
    match desc.kind {
      PropertyKind::Data { value, writable } => {
        patch.value = Some(value);
        patch.writable = Some(writable);
      }
      PropertyKind::Accessor { get, set } => {
        patch.get = Some(get);
        patch.set = Some(set);
      }
    }
    patch
  }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PropertyEntry {
  pub(crate) key: PropertyKey,
  pub(crate) desc: PropertyDescriptor,
}

impl Heap {
  /// Compares two keys by contents.
  pub fn property_key_eq(&self, a: &PropertyKey, b: &PropertyKey) -> Result<bool, VmError> {
    if a == b {
      return Ok(true);
    }
    self.string_contents_eq(a.as_value(), b.as_value())
  }

  /// Parses `key` as an array index (`"0"` ..= `"4294967294"`, canonical form only).
  pub fn property_key_to_array_index(&self, key: &PropertyKey) -> Result<Option<u32>, VmError> {
    Ok(parse_array_index(&self.string_units(key.as_value())?))
  }

  fn find_property(&self, obj: GcObject, key: &PropertyKey) -> Result<Option<usize>, VmError> {
    let object = self.get_object(obj)?;
    for (i, entry) in object.properties.iter().enumerate() {
      if self.property_key_eq(&entry.key, key)? {
        return Ok(Some(i));
      }
    }
    Ok(None)
  }

  /// [[GetOwnProperty]].
  pub fn object_get_own_property(
    &self,
    obj: GcObject,
    key: &PropertyKey,
  ) -> Result<Option<PropertyDescriptor>, VmError> {
    let Some(i) = self.find_property(obj, key)? else {
      return Ok(None);
    };
    Ok(Some(self.get_object(obj)?.properties[i].desc))
  }

  /// Creates or replaces an own property without any [[DefineOwnProperty]] validation.
  ///
  /// New properties are appended, so own keys keep their insertion order. Replacing keeps the
  /// property's position.
  pub fn define_property(
    &mut self,
    obj: GcObject,
    key: PropertyKey,
    desc: PropertyDescriptor,
  ) -> Result<(), VmError> {
    let values = desc.referenced_values();
    if !self.is_valid_value(key.as_value())
      || !values.iter().flatten().all(|&v| self.is_valid_value(v))
    {
      return Err(VmError::InvalidHandle);
    }

    if let Some(i) = self.find_property(obj, &key)? {
      for &value in values.iter().flatten() {
        self.add_edge(value)?;
      }
      let old = core::mem::replace(&mut self.get_object_mut(obj)?.properties[i].desc, desc);
      for value in old.referenced_values().into_iter().flatten() {
        self.drop_edge(value);
      }
      return Ok(());
    }

    let idx = self.validate(obj.0).ok_or(VmError::InvalidHandle)?;
    let new_count = self
      .get_object(obj)?
      .properties
      .len()
      .checked_add(1)
      .ok_or(VmError::OutOfMemory)?;
    let new_bytes = HeapObject::heap_size_bytes_for_property_count(new_count);
    let grow_by = new_bytes.saturating_sub(self.slots[idx].bytes);

    let mut pinned = vec![Value::Object(obj), key.as_value()];
    pinned.extend(values.iter().flatten());
    let mut scope = self.reserve(grow_by, &pinned)?;

    // Grow the table fallibly so a huge object cannot abort the host on allocator failure.
    let mut buf: Vec<PropertyEntry> = Vec::new();
    buf
      .try_reserve_exact(new_count)
      .map_err(|_| VmError::OutOfMemory)?;
    buf.extend_from_slice(&scope.get_object(obj)?.properties);
    buf.push(PropertyEntry { key, desc });

    scope.add_edge(key.as_value())?;
    for &value in values.iter().flatten() {
      scope.add_edge(value)?;
    }
    scope.get_object_mut(obj)?.properties = buf.into_boxed_slice();
    scope.update_slot_bytes(idx, new_bytes);
    Ok(())
  }

  /// Removes an own property.
  ///
  /// Returns `false` (and changes nothing) if the property is non-configurable; deleting an absent
  /// property succeeds.
  pub fn object_delete_own_property(
    &mut self,
    obj: GcObject,
    key: &PropertyKey,
  ) -> Result<bool, VmError> {
    let Some(i) = self.find_property(obj, key)? else {
      return Ok(true);
    };
    let object = self.get_object(obj)?;
    let entry = object.properties[i];
    if !entry.desc.configurable {
      return Ok(false);
    }

    let new_count = object.properties.len() - 1;
    let mut buf: Vec<PropertyEntry> = Vec::new();
    buf
      .try_reserve_exact(new_count)
      .map_err(|_| VmError::OutOfMemory)?;
    buf.extend_from_slice(&object.properties[..i]);
    buf.extend_from_slice(&object.properties[i + 1..]);

    let idx = self.validate(obj.0).ok_or(VmError::InvalidHandle)?;
    self.get_object_mut(obj)?.properties = buf.into_boxed_slice();
    self.update_slot_bytes(idx, HeapObject::heap_size_bytes_for_property_count(new_count));

    self.drop_edge(entry.key.as_value());
    for value in entry.desc.referenced_values().into_iter().flatten() {
      self.drop_edge(value);
    }
    Ok(true)
  }

  /// Own keys in enumeration order: array indices ascending, then the remaining keys in insertion
  /// order.
  pub fn own_property_keys(&self, obj: GcObject) -> Result<Vec<PropertyKey>, VmError> {
    let object = self.get_object(obj)?;
    let mut indices: Vec<(u32, PropertyKey)> = Vec::new();
    let mut others: Vec<PropertyKey> = Vec::new();
    for entry in object.properties.iter() {
      match self.property_key_to_array_index(&entry.key)? {
        Some(index) => indices.push((index, entry.key)),
        None => others.push(entry.key),
      }
    }
    indices.sort_by_key(|&(index, _)| index);

    let mut keys = Vec::with_capacity(indices.len() + others.len());
    keys.extend(indices.into_iter().map(|(_, key)| key));
    keys.extend(others);
    Ok(keys)
  }

  /// Number of own properties.
  pub fn own_property_count(&self, obj: GcObject) -> Result<usize, VmError> {
    Ok(self.get_object(obj)?.properties.len())
  }
}
