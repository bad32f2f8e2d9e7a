use crate::class::ObjectKind;
use crate::error_object::ErrorKind;
use crate::function::{alloc_native_function, NativeFunctionId, NativeFunctionMeta};
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::{builtins, GcObject, Heap, MagicString, RootId, Value, Vm, VmError};

/// The built-in objects of a realm.
///
/// Each is held by a persistent root owned by the [`Realm`](crate::Realm), so deleting the
/// properties that expose them (e.g. `delete Boolean.prototype.constructor`) cannot free them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intrinsics {
  object_prototype: GcObject,
  function_prototype: GcObject,
  array_prototype: GcObject,
  number_prototype: GcObject,
  string_prototype: GcObject,
  error_prototypes: [GcObject; ErrorKind::COUNT],
  #[cfg(feature = "boolean")]
  boolean_prototype: GcObject,
  #[cfg(feature = "boolean")]
  boolean_constructor: GcObject,
}

/// Allocates an object and registers a persistent root for it.
pub(crate) fn alloc_rooted_object(
  heap: &mut Heap,
  roots: &mut Vec<RootId>,
  prototype: Option<GcObject>,
  kind: ObjectKind,
) -> Result<GcObject, VmError> {
  let obj = heap.alloc_object(prototype, kind)?;
  let handle = obj.get();
  let root = heap.add_root(Value::Object(handle));
  heap.release(obj);
  roots.push(root?);
  Ok(handle)
}

pub(crate) fn alloc_rooted_function(
  vm: &Vm,
  heap: &mut Heap,
  roots: &mut Vec<RootId>,
  prototype: Option<GcObject>,
  id: NativeFunctionId,
) -> Result<GcObject, VmError> {
  let func = alloc_native_function(vm, &mut heap.scope(), prototype, id)?;
  let handle = func.get();
  let root = heap.add_root(Value::Object(handle));
  heap.release(func);
  roots.push(root?);
  Ok(handle)
}

/// Registers `meta` and installs a function for it as a non-enumerable method of `target`.
#[cfg_attr(not(feature = "boolean"), allow(dead_code))]
pub(crate) fn define_method(
  vm: &mut Vm,
  heap: &mut Heap,
  target: GcObject,
  function_prototype: GcObject,
  key: MagicString,
  meta: NativeFunctionMeta,
) -> Result<(), VmError> {
  let id = vm.register_native(meta);
  let func = alloc_native_function(vm, &mut heap.scope(), Some(function_prototype), id)?;
  let defined = heap.define_property(
    target,
    PropertyKey::Magic(key),
    PropertyDescriptor::data(func.get().into(), true, false, true),
  );
  heap.release(func);
  defined
}

fn define_hidden(
  heap: &mut Heap,
  target: GcObject,
  key: MagicString,
  value: Value,
) -> Result<(), VmError> {
  heap.define_property(
    target,
    PropertyKey::Magic(key),
    PropertyDescriptor::data(value, true, false, true),
  )
}

impl Intrinsics {
  pub(crate) fn init(
    vm: &mut Vm,
    heap: &mut Heap,
    roots: &mut Vec<RootId>,
  ) -> Result<Self, VmError> {
    let object_prototype = alloc_rooted_object(heap, roots, None, ObjectKind::Ordinary)?;

    let noop = vm.register_native(builtins::FUNCTION_PROTOTYPE);
    let function_prototype =
      alloc_rooted_function(vm, heap, roots, Some(object_prototype), noop)?;

    let array_prototype =
      alloc_rooted_object(heap, roots, Some(object_prototype), ObjectKind::Array)?;
    heap.define_property(
      array_prototype,
      PropertyKey::Magic(MagicString::Length),
      PropertyDescriptor::data(Value::Integer(0), true, false, false),
    )?;

    let number_prototype = alloc_rooted_object(
      heap,
      roots,
      Some(object_prototype),
      ObjectKind::Number {
        primitive: Value::Integer(0),
      },
    )?;

    let string_prototype = alloc_rooted_object(
      heap,
      roots,
      Some(object_prototype),
      ObjectKind::String {
        primitive: Value::MagicString(MagicString::Empty),
      },
    )?;
    heap.define_property(
      string_prototype,
      PropertyKey::Magic(MagicString::Length),
      PropertyDescriptor::data(Value::Integer(0), false, false, false),
    )?;

    // `Error.prototype` first: the other kinds inherit from it.
    let mut error_prototypes = [object_prototype; ErrorKind::COUNT];
    for (i, kind) in ErrorKind::ALL.into_iter().enumerate() {
      let parent = if kind == ErrorKind::Error {
        object_prototype
      } else {
        error_prototypes[0]
      };
      let proto = alloc_rooted_object(heap, roots, Some(parent), ObjectKind::Error { kind })?;
      define_hidden(heap, proto, MagicString::Name, kind.name().into())?;
      define_hidden(heap, proto, MagicString::Message, MagicString::Empty.into())?;
      error_prototypes[i] = proto;
    }

    #[cfg(feature = "boolean")]
    let (boolean_prototype, boolean_constructor) =
      builtins::init_boolean(vm, heap, roots, object_prototype, function_prototype)?;

    Ok(Self {
      object_prototype,
      function_prototype,
      array_prototype,
      number_prototype,
      string_prototype,
      error_prototypes,
      #[cfg(feature = "boolean")]
      boolean_prototype,
      #[cfg(feature = "boolean")]
      boolean_constructor,
    })
  }

  pub fn object_prototype(&self) -> GcObject {
    self.object_prototype
  }

  pub fn function_prototype(&self) -> GcObject {
    self.function_prototype
  }

  pub fn array_prototype(&self) -> GcObject {
    self.array_prototype
  }

  pub fn number_prototype(&self) -> GcObject {
    self.number_prototype
  }

  pub fn string_prototype(&self) -> GcObject {
    self.string_prototype
  }

  pub fn error_prototype(&self, kind: ErrorKind) -> GcObject {
    self.error_prototypes[kind as usize]
  }

  #[cfg(feature = "boolean")]
  pub fn boolean_prototype(&self) -> GcObject {
    self.boolean_prototype
  }

  #[cfg(feature = "boolean")]
  pub fn boolean_constructor(&self) -> GcObject {
    self.boolean_constructor
  }

  /// Prototype given to `Boolean` wrappers created by `ToObject`.
  #[cfg(feature = "boolean")]
  pub fn boolean_wrapper_prototype(&self) -> GcObject {
    self.boolean_prototype
  }

  /// Without the `boolean` built-ins there is no `Boolean.prototype`; wrappers inherit from
  /// `Object.prototype`.
  #[cfg(not(feature = "boolean"))]
  pub fn boolean_wrapper_prototype(&self) -> GcObject {
    self.object_prototype
  }
}
