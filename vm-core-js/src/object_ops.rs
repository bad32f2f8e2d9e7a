//! Prototype chains and the object internal methods ([[Get]], [[Put]], [[Delete]],
//! [[DefineOwnProperty]]).

use crate::error_object::throw_type_error;
use crate::property::{PropertyDescriptor, PropertyDescriptorPatch, PropertyKey, PropertyKind};
use crate::{
  try_normal, Completion, GcObject, Heap, OwnedValue, Value, Vm, VmError, MAX_PROTOTYPE_CHAIN,
};
use ahash::AHashSet;

/// Result of a property lookup along a prototype chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyLookup {
  /// The object the property was found on, and its descriptor.
  pub found: Option<(GcObject, PropertyDescriptor)>,
  /// Objects examined, including the one the property was found on.
  pub visited: usize,
}

impl Heap {
  pub fn object_prototype(&self, obj: GcObject) -> Result<Option<GcObject>, VmError> {
    Ok(self.get_object(obj)?.prototype)
  }

  /// Sets an object's [[Prototype]], rejecting cycles.
  pub fn object_set_prototype(
    &mut self,
    obj: GcObject,
    prototype: Option<GcObject>,
  ) -> Result<(), VmError> {
    self.get_object(obj)?;
    if prototype == Some(obj) {
      return Err(VmError::PrototypeCycle);
    }

    // Walk the new chain looking for `obj`. Bounded in case an unchecked cycle already exists.
    let mut current = prototype;
    let mut steps = 0usize;
    while let Some(p) = current {
      if steps >= MAX_PROTOTYPE_CHAIN {
        return Err(VmError::PrototypeChainTooDeep);
      }
      steps += 1;
      if p == obj {
        return Err(VmError::PrototypeCycle);
      }
      current = self.object_prototype(p)?;
    }

    // SAFETY: the walk above proved the new chain does not reach `obj`.
    unsafe { self.object_set_prototype_unchecked(obj, prototype) }
  }

  /// Sets an object's [[Prototype]] without the cycle check.
  ///
  /// # Safety
  ///
  /// A cycle violates the object model's invariants. Lookups still terminate (with
  /// [`VmError::PrototypeChainTooDeep`]), but nothing else is guaranteed. Intended for tests and
  /// low-level embeddings.
  pub unsafe fn object_set_prototype_unchecked(
    &mut self,
    obj: GcObject,
    prototype: Option<GcObject>,
  ) -> Result<(), VmError> {
    if let Some(proto) = prototype {
      self.get_object(proto)?;
      self.add_edge(Value::Object(proto))?;
    }
    let old = core::mem::replace(&mut self.get_object_mut(obj)?.prototype, prototype);
    if let Some(old) = old {
      self.drop_edge(Value::Object(old));
    }
    Ok(())
  }

  pub fn object_is_extensible(&self, obj: GcObject) -> Result<bool, VmError> {
    Ok(self.get_object(obj)?.extensible)
  }

  pub fn object_prevent_extensions(&mut self, obj: GcObject) -> Result<(), VmError> {
    self.get_object_mut(obj)?.extensible = false;
    Ok(())
  }

  /// Finds `key` on `obj` or its prototype chain.
  pub fn lookup_property(
    &self,
    obj: GcObject,
    key: &PropertyKey,
  ) -> Result<PropertyLookup, VmError> {
    let mut current = Some(obj);
    let mut visited = 0usize;
    while let Some(o) = current {
      if visited >= MAX_PROTOTYPE_CHAIN {
        return Err(VmError::PrototypeChainTooDeep);
      }
      visited += 1;
      if let Some(desc) = self.object_get_own_property(o, key)? {
        return Ok(PropertyLookup {
          found: Some((o, desc)),
          visited,
        });
      }
      current = self.object_prototype(o)?;
    }
    Ok(PropertyLookup {
      found: None,
      visited,
    })
  }

  /// [[GetProperty]]: the descriptor of `key` on `obj` or its nearest ancestor that has it.
  pub fn get_property(
    &self,
    obj: GcObject,
    key: &PropertyKey,
  ) -> Result<Option<PropertyDescriptor>, VmError> {
    Ok(self.lookup_property(obj, key)?.found.map(|(_, desc)| desc))
  }

  /// [[HasProperty]].
  pub fn has_property(&self, obj: GcObject, key: &PropertyKey) -> Result<bool, VmError> {
    Ok(self.lookup_property(obj, key)?.found.is_some())
  }

  /// Enumerable own keys, in enumeration order.
  pub fn own_enumerable_keys(&self, obj: GcObject) -> Result<Vec<PropertyKey>, VmError> {
    let mut keys = Vec::new();
    for key in self.own_property_keys(obj)? {
      if let Some(desc) = self.object_get_own_property(obj, &key)? {
        if desc.enumerable {
          keys.push(key);
        }
      }
    }
    Ok(keys)
  }

  /// The keys a `for-in` loop over `obj` visits: enumerable properties of `obj` and its ancestors,
  /// skipping names shadowed by a nearer property (enumerable or not).
  pub fn enumerable_keys(&self, obj: GcObject) -> Result<Vec<PropertyKey>, VmError> {
    let mut seen: AHashSet<Vec<u16>> = AHashSet::new();
    let mut keys = Vec::new();
    let mut current = Some(obj);
    let mut steps = 0usize;
    while let Some(o) = current {
      if steps >= MAX_PROTOTYPE_CHAIN {
        return Err(VmError::PrototypeChainTooDeep);
      }
      steps += 1;
      for key in self.own_property_keys(o)? {
        let units = self.string_units(key.as_value())?.into_owned();
        if !seen.insert(units) {
          continue;
        }
        if let Some(desc) = self.object_get_own_property(o, &key)? {
          if desc.enumerable {
            keys.push(key);
          }
        }
      }
      current = self.object_prototype(o)?;
    }
    Ok(keys)
  }
}

impl Vm {
  /// [[Get]]. Getters run with `obj` as `this`.
  pub fn get(
    &mut self,
    heap: &mut Heap,
    obj: GcObject,
    key: PropertyKey,
  ) -> Result<Completion, VmError> {
    self.get_with_receiver(heap, obj, key, Value::Object(obj))
  }

  /// [[Get]] with an explicit `this` for getters (a primitive base keeps its primitive `this`).
  pub fn get_with_receiver(
    &mut self,
    heap: &mut Heap,
    obj: GcObject,
    key: PropertyKey,
    receiver: Value,
  ) -> Result<Completion, VmError> {
    let Some(desc) = heap.get_property(obj, &key)? else {
      return Ok(Completion::normal(OwnedValue::undefined()));
    };
    match desc.kind {
      PropertyKind::Data { value, .. } => Ok(Completion::normal(heap.retain(value)?)),
      PropertyKind::Accessor { get, .. } => {
        if get.is_undefined() {
          return Ok(Completion::normal(OwnedValue::undefined()));
        }
        self.call(heap, get, receiver, &[])
      }
    }
  }

  /// `GetValue` on a property reference whose base may be a primitive.
  pub fn get_value(
    &mut self,
    heap: &mut Heap,
    base: Value,
    key: PropertyKey,
  ) -> Result<Completion, VmError> {
    if let Value::Object(obj) = base {
      return self.get(heap, obj, key);
    }
    let wrapper = try_normal!(self.to_object(heap, base));
    let obj = wrapper.get().as_object()?;
    let result = self.get_with_receiver(heap, obj, key, base);
    heap.release(wrapper);
    result
  }

  /// [[Put]].
  ///
  /// Completes with `true` on success. A rejected assignment completes with `false`, or throws a
  /// `TypeError` when `strict`.
  pub fn put(
    &mut self,
    heap: &mut Heap,
    obj: GcObject,
    key: PropertyKey,
    value: Value,
    strict: bool,
  ) -> Result<Completion, VmError> {
    let own = heap.object_get_own_property(obj, &key)?;
    let inherited = match own {
      Some(_) => None,
      None => match heap.object_prototype(obj)? {
        Some(proto) => heap.get_property(proto, &key)?,
        None => None,
      },
    };

    // [[CanPut]].
    let can_put = match own.or(inherited) {
      Some(PropertyDescriptor {
        kind: PropertyKind::Accessor { set, .. },
        ..
      }) => !set.is_undefined(),
      Some(PropertyDescriptor {
        kind: PropertyKind::Data { writable, .. },
        ..
      }) => {
        if own.is_some() {
          writable
        } else {
          writable && heap.object_is_extensible(obj)?
        }
      }
      None => heap.object_is_extensible(obj)?,
    };
    if !can_put {
      return reject(self, heap, strict, "cannot assign to read-only property");
    }

    match own.or(inherited) {
      Some(PropertyDescriptor {
        kind: PropertyKind::Accessor { set, .. },
        ..
      }) => {
        let result = try_normal!(self.call(heap, set, Value::Object(obj), &[value]));
        heap.release(result);
        Ok(Completion::normal_bool(true))
      }
      Some(PropertyDescriptor {
        kind: PropertyKind::Data { .. },
        enumerable,
        configurable,
      }) if own.is_some() => {
        heap.define_property(
          obj,
          key,
          PropertyDescriptor::data(value, true, enumerable, configurable),
        )?;
        Ok(Completion::normal_bool(true))
      }
      _ => {
        heap.define_property(obj, key, PropertyDescriptor::plain_data(value))?;
        Ok(Completion::normal_bool(true))
      }
    }
  }

  /// [[Delete]].
  ///
  /// Completes with `true` if the property is gone afterwards. A non-configurable property
  /// completes with `false`, or throws a `TypeError` when `strict`.
  pub fn delete_property(
    &mut self,
    heap: &mut Heap,
    obj: GcObject,
    key: PropertyKey,
    strict: bool,
  ) -> Result<Completion, VmError> {
    if heap.object_delete_own_property(obj, &key)? {
      return Ok(Completion::normal_bool(true));
    }
    reject(self, heap, strict, "cannot delete non-configurable property")
  }

  /// [[DefineOwnProperty]].
  ///
  /// Completes with whether the definition was applied. With `throw`, a rejected definition throws
  /// a `TypeError` instead.
  pub fn define_own_property(
    &mut self,
    heap: &mut Heap,
    obj: GcObject,
    key: PropertyKey,
    patch: PropertyDescriptorPatch,
    throw: bool,
  ) -> Result<Completion, VmError> {
    if validate_and_apply_property_descriptor(heap, obj, key, patch)? {
      return Ok(Completion::normal_bool(true));
    }
    reject(self, heap, throw, "cannot redefine property")
  }
}

fn reject(vm: &Vm, heap: &mut Heap, throw: bool, message: &str) -> Result<Completion, VmError> {
  if throw {
    return throw_type_error(vm, heap, message);
  }
  Ok(Completion::normal_bool(false))
}

fn validate_and_apply_property_descriptor(
  heap: &mut Heap,
  obj: GcObject,
  key: PropertyKey,
  desc: PropertyDescriptorPatch,
) -> Result<bool, VmError> {
  desc.validate()?;
  if !desc
    .referenced_values()
    .into_iter()
    .flatten()
    .all(|value| heap.is_valid_value(value))
  {
    return Err(VmError::InvalidHandle);
  }

  let Some(current) = heap.object_get_own_property(obj, &key)? else {
    if !heap.object_is_extensible(obj)? {
      return Ok(false);
    }
    let enumerable = desc.enumerable.unwrap_or(false);
    let configurable = desc.configurable.unwrap_or(false);
    let new_desc = if desc.is_accessor_descriptor() {
      PropertyDescriptor::accessor(
        desc.get.unwrap_or(Value::UNDEFINED),
        desc.set.unwrap_or(Value::UNDEFINED),
        enumerable,
        configurable,
      )
    } else {
      // Generic descriptors create data properties.
      PropertyDescriptor::data(
        desc.value.unwrap_or(Value::UNDEFINED),
        desc.writable.unwrap_or(false),
        enumerable,
        configurable,
      )
    };
    heap.define_property(obj, key, new_desc)?;
    return Ok(true);
  };

  if desc.is_empty() {
    return Ok(true);
  }

  if !current.configurable {
    if desc.configurable == Some(true) {
      return Ok(false);
    }
    if desc.enumerable.is_some_and(|e| e != current.enumerable) {
      return Ok(false);
    }
    match current.kind {
      PropertyKind::Data { .. } if desc.is_accessor_descriptor() => return Ok(false),
      PropertyKind::Accessor { .. } if desc.is_data_descriptor() => return Ok(false),
      PropertyKind::Data { value, writable } if desc.is_data_descriptor() && !writable => {
        if desc.writable == Some(true) {
          return Ok(false);
        }
        if let Some(new_value) = desc.value {
          if !heap.same_value(new_value, value)? {
            return Ok(false);
          }
        }
      }
      PropertyKind::Accessor { get, set } if desc.is_accessor_descriptor() => {
        if let Some(new_get) = desc.get {
          if !heap.same_value(new_get, get)? {
            return Ok(false);
          }
        }
        if let Some(new_set) = desc.set {
          if !heap.same_value(new_set, set)? {
            return Ok(false);
          }
        }
      }
      _ => {}
    }
  }

  heap.define_property(obj, key, apply_descriptor_patch(current, desc))?;
  Ok(true)
}

fn apply_descriptor_patch(
  current: PropertyDescriptor,
  desc: PropertyDescriptorPatch,
) -> PropertyDescriptor {
  let enumerable = desc.enumerable.unwrap_or(current.enumerable);
  let configurable = desc.configurable.unwrap_or(current.configurable);
  if desc.is_generic_descriptor() {
    return PropertyDescriptor {
      enumerable,
      configurable,
      kind: current.kind,
    };
  }

  let kind = match (current.kind, desc.is_accessor_descriptor()) {
    (PropertyKind::Data { value, writable }, false) => PropertyKind::Data {
      value: desc.value.unwrap_or(value),
      writable: desc.writable.unwrap_or(writable),
    },
    (PropertyKind::Accessor { get, set }, true) => PropertyKind::Accessor {
      get: desc.get.unwrap_or(get),
      set: desc.set.unwrap_or(set),
    },
    // Converting between kinds resets the other kind's attributes to their defaults.
    (PropertyKind::Data { .. }, true) => PropertyKind::Accessor {
      get: desc.get.unwrap_or(Value::UNDEFINED),
      set: desc.set.unwrap_or(Value::UNDEFINED),
    },
    (PropertyKind::Accessor { .. }, false) => PropertyKind::Data {
      value: desc.value.unwrap_or(Value::UNDEFINED),
      writable: desc.writable.unwrap_or(false),
    },
  };
  PropertyDescriptor {
    enumerable,
    configurable,
    kind,
  }
}
