use crate::class::ObjectKind;
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::{Completion, GcObject, MagicString, Owned, Scope, Value, Vm, VmError};

/// Index of a native function registered with [`Vm::register_native`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NativeFunctionId(pub u32);

/// A built-in [[Call]] implemented in Rust.
///
/// # Rooting
///
/// `this` and `args` are rooted by the caller for the duration of the call. Anything else a native
/// function holds across an allocation must be rooted with [`Scope::push_root`] or owned.
///
/// Script exceptions are returned as `Ok(Completion::Throw(..))`; `Err` is reserved for engine
/// faults.
pub type NativeCallFn = for<'scope> fn(
  &mut Vm,
  &mut Scope<'scope>,
  this: Value,
  args: &[Value],
) -> Result<Completion, VmError>;

/// A built-in [[Construct]] implemented in Rust. Same rooting rules as [`NativeCallFn`].
pub type NativeConstructFn = for<'scope> fn(
  &mut Vm,
  &mut Scope<'scope>,
  args: &[Value],
  new_target: Value,
) -> Result<Completion, VmError>;

/// Registry entry for a native function.
///
/// Contains no heap handles; `name` and `length` become properties of each function object
/// instantiated from it.
#[derive(Clone, Copy)]
pub struct NativeFunctionMeta {
  pub name: &'static str,
  pub length: u32,
  pub call: NativeCallFn,
  pub construct: Option<NativeConstructFn>,
}

impl std::fmt::Debug for NativeFunctionMeta {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NativeFunctionMeta")
      .field("name", &self.name)
      .field("length", &self.length)
      .field("constructor", &self.construct.is_some())
      .finish()
  }
}

/// Allocates a `Function`-class object for a registered native, with the non-enumerable `length`
/// and `name` properties it is specified with.
pub fn alloc_native_function(
  vm: &Vm,
  scope: &mut Scope<'_>,
  prototype: Option<GcObject>,
  id: NativeFunctionId,
) -> Result<Owned<GcObject>, VmError> {
  let meta = *vm.native_meta(id)?;
  let func = scope.alloc_object(prototype, ObjectKind::Function { native: id })?;

  let length = i32::try_from(meta.length).unwrap_or(i32::MAX);
  scope.initialize(func, |heap, func| {
    heap.define_property(
      func,
      PropertyKey::Magic(MagicString::Length),
      PropertyDescriptor::data(Value::Integer(length), false, false, true),
    )?;
    let name = heap.alloc_string_value(meta.name)?;
    let defined = heap.define_property(
      func,
      PropertyKey::Magic(MagicString::Name),
      PropertyDescriptor::data(name.get(), false, false, true),
    );
    heap.release(name);
    defined
  })
}
