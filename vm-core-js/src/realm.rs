use crate::class::ObjectKind;
use crate::intrinsics::alloc_rooted_object;
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::{GcObject, Heap, Intrinsics, MagicString, RootId, Value, Vm, VmError};

/// A realm: a global object plus its intrinsics.
///
/// The realm owns persistent roots registered with the [`Heap`]. Call [`Realm::teardown`] to
/// unregister them when the embedding is finished with the realm (for example when running many
/// tests with a fresh realm each while reusing one heap). Cycles inside the realm's object graph
/// (e.g. `Boolean.prototype.constructor.prototype`) are reclaimed by the next collection.
#[derive(Debug)]
pub struct Realm {
  global_object: GcObject,
  intrinsics: Intrinsics,
  roots: Vec<RootId>,
  torn_down: bool,
}

impl Realm {
  /// Creates a realm on `heap` and makes it the VM's active realm.
  pub fn new(vm: &mut Vm, heap: &mut Heap) -> Result<Self, VmError> {
    let mut roots = Vec::new();
    match Self::init(vm, heap, &mut roots) {
      Ok((global_object, intrinsics)) => {
        vm.set_intrinsics(Some(intrinsics));
        tracing::debug!(roots = roots.len(), used_bytes = heap.used_bytes(), "realm created");
        Ok(Self {
          global_object,
          intrinsics,
          roots,
          torn_down: false,
        })
      }
      Err(err) => {
        for root in roots {
          heap.remove_root(root);
        }
        Err(err)
      }
    }
  }

  fn init(
    vm: &mut Vm,
    heap: &mut Heap,
    roots: &mut Vec<RootId>,
  ) -> Result<(GcObject, Intrinsics), VmError> {
    let intrinsics = Intrinsics::init(vm, heap, roots)?;
    let global_object = alloc_rooted_object(
      heap,
      roots,
      Some(intrinsics.object_prototype()),
      ObjectKind::Ordinary,
    )?;

    let define_global = |heap: &mut Heap, key: MagicString, value: Value, writable: bool| {
      heap.define_property(
        global_object,
        PropertyKey::Magic(key),
        PropertyDescriptor::data(value, writable, false, writable),
      )
    };
    define_global(heap, MagicString::GlobalThis, global_object.into(), true)?;
    define_global(heap, MagicString::Undefined, Value::UNDEFINED, false)?;

    for (key, n) in [
      (MagicString::NaN, f64::NAN),
      (MagicString::Infinity, f64::INFINITY),
    ] {
      let value = heap.alloc_number(n)?;
      let defined = define_global(heap, key, value.get(), false);
      heap.release(value);
      defined?;
    }

    #[cfg(feature = "boolean")]
    define_global(
      heap,
      MagicString::Boolean,
      intrinsics.boolean_constructor().into(),
      true,
    )?;

    Ok((global_object, intrinsics))
  }

  pub fn global_object(&self) -> GcObject {
    self.global_object
  }

  pub fn intrinsics(&self) -> &Intrinsics {
    &self.intrinsics
  }

  /// Unregisters the realm's persistent roots and, if it is the VM's active realm, deactivates it.
  ///
  /// Idempotent.
  pub fn teardown(&mut self, vm: &mut Vm, heap: &mut Heap) {
    if self.torn_down {
      return;
    }
    if vm.intrinsics() == Some(&self.intrinsics) {
      vm.set_intrinsics(None);
    }
    for root in self.roots.drain(..) {
      heap.remove_root(root);
    }
    self.torn_down = true;
  }
}

impl Drop for Realm {
  fn drop(&mut self) {
    debug_assert!(
      self.torn_down || std::thread::panicking(),
      "Realm dropped without calling teardown(); persistent roots leaked"
    );
  }
}
