//! Native implementations of built-in functions.

use crate::function::NativeFunctionMeta;
use crate::{Completion, OwnedValue, Scope, Value, Vm, VmError};

#[cfg(feature = "boolean")]
use crate::class::{ClassTag, ObjectKind};
#[cfg(feature = "boolean")]
use crate::error_object::throw_type_error;
#[cfg(feature = "boolean")]
use crate::intrinsics::{alloc_rooted_function, alloc_rooted_object, define_method};
#[cfg(feature = "boolean")]
use crate::property::{PropertyDescriptor, PropertyKey};
#[cfg(feature = "boolean")]
use crate::{try_normal, GcObject, Heap, MagicString, RootId};

/// `Function.prototype` is itself callable and returns `undefined`.
pub(crate) const FUNCTION_PROTOTYPE: NativeFunctionMeta = NativeFunctionMeta {
  name: "",
  length: 0,
  call: function_prototype_call,
  construct: None,
};

pub fn function_prototype_call(
  _vm: &mut Vm,
  _scope: &mut Scope<'_>,
  _this: Value,
  _args: &[Value],
) -> Result<Completion, VmError> {
  Ok(Completion::normal(OwnedValue::undefined()))
}

#[cfg(feature = "boolean")]
const BOOLEAN_PROTOTYPE_VALUE_OF: NativeFunctionMeta = NativeFunctionMeta {
  name: "valueOf",
  length: 0,
  call: boolean_prototype_value_of,
  construct: None,
};

#[cfg(feature = "boolean")]
const BOOLEAN_PROTOTYPE_TO_STRING: NativeFunctionMeta = NativeFunctionMeta {
  name: "toString",
  length: 0,
  call: boolean_prototype_to_string,
  construct: None,
};

#[cfg(feature = "boolean")]
const BOOLEAN_CONSTRUCTOR: NativeFunctionMeta = NativeFunctionMeta {
  name: "Boolean",
  length: 1,
  call: boolean_constructor_call,
  construct: Some(boolean_constructor_construct),
};

/// Creates `Boolean.prototype` and the `Boolean` constructor, returning both (rooted).
#[cfg(feature = "boolean")]
pub(crate) fn init_boolean(
  vm: &mut Vm,
  heap: &mut Heap,
  roots: &mut Vec<RootId>,
  object_prototype: GcObject,
  function_prototype: GcObject,
) -> Result<(GcObject, GcObject), VmError> {
  // `Boolean.prototype` is itself a Boolean object whose value is false.
  let prototype = alloc_rooted_object(
    heap,
    roots,
    Some(object_prototype),
    ObjectKind::Boolean { primitive: false },
  )?;
  define_method(
    vm,
    heap,
    prototype,
    function_prototype,
    MagicString::ValueOf,
    BOOLEAN_PROTOTYPE_VALUE_OF,
  )?;
  define_method(
    vm,
    heap,
    prototype,
    function_prototype,
    MagicString::ToString,
    BOOLEAN_PROTOTYPE_TO_STRING,
  )?;

  let id = vm.register_native(BOOLEAN_CONSTRUCTOR);
  let constructor = alloc_rooted_function(vm, heap, roots, Some(function_prototype), id)?;
  heap.define_property(
    constructor,
    PropertyKey::Magic(MagicString::Prototype),
    PropertyDescriptor::data(prototype.into(), false, false, false),
  )?;
  heap.define_property(
    prototype,
    PropertyKey::Magic(MagicString::Constructor),
    PropertyDescriptor::data(constructor.into(), true, false, true),
  )?;
  Ok((prototype, constructor))
}

/// `thisBooleanValue`: a boolean primitive, or the [[BooleanData]] of a `Boolean` wrapper.
#[cfg(feature = "boolean")]
fn this_boolean_value(heap: &Heap, this: Value) -> Result<Option<bool>, VmError> {
  if this.is_boolean() {
    return this.as_boolean().map(Some);
  }
  let Value::Object(obj) = this else {
    return Ok(None);
  };
  if heap.object_class(obj)? != ClassTag::Boolean {
    return Ok(None);
  }
  heap.boolean_data(obj).map(Some)
}

/// `Boolean.prototype.valueOf()`.
#[cfg(feature = "boolean")]
pub fn boolean_prototype_value_of(
  vm: &mut Vm,
  scope: &mut Scope<'_>,
  this: Value,
  _args: &[Value],
) -> Result<Completion, VmError> {
  match this_boolean_value(scope, this)? {
    Some(b) => Ok(Completion::normal_bool(b)),
    None => throw_type_error(
      vm,
      scope,
      "Boolean.prototype.valueOf requires that 'this' be a Boolean",
    ),
  }
}

/// `Boolean.prototype.toString()`.
#[cfg(feature = "boolean")]
pub fn boolean_prototype_to_string(
  vm: &mut Vm,
  scope: &mut Scope<'_>,
  this: Value,
  args: &[Value],
) -> Result<Completion, VmError> {
  let value = try_normal!(boolean_prototype_value_of(vm, scope, this, args));
  let text = if value.get().as_boolean()? {
    MagicString::True
  } else {
    MagicString::False
  };
  scope.release(value);
  Ok(Completion::normal(OwnedValue::magic(text)))
}

/// `Boolean(value)` called as a function: `ToBoolean(value)`.
#[cfg(feature = "boolean")]
pub fn boolean_constructor_call(
  _vm: &mut Vm,
  scope: &mut Scope<'_>,
  _this: Value,
  args: &[Value],
) -> Result<Completion, VmError> {
  let value = args.first().copied().unwrap_or(Value::UNDEFINED);
  Ok(Completion::normal_bool(scope.to_boolean(value)?))
}

/// `new Boolean(value)`: a wrapper object holding `ToBoolean(value)`.
#[cfg(feature = "boolean")]
pub fn boolean_constructor_construct(
  vm: &mut Vm,
  scope: &mut Scope<'_>,
  args: &[Value],
  _new_target: Value,
) -> Result<Completion, VmError> {
  let value = args.first().copied().unwrap_or(Value::UNDEFINED);
  let primitive = scope.to_boolean(value)?;
  let prototype = vm.require_intrinsics()?.boolean_prototype();
  let wrapper = scope.alloc_object(Some(prototype), ObjectKind::Boolean { primitive })?;
  Ok(Completion::normal(wrapper.into_value()))
}
