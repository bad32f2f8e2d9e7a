use proptest::prelude::*;
use vm_core_js::{
  GcObject, Heap, HeapLimits, InternalSlot, InternalValue, MagicString, ObjectKind, Owned,
  PropertyDescriptor, PropertyKey, Value, VmError,
};

#[test]
fn release_frees_immediately() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let s = heap.alloc_string("short-lived")?;
  let handle = s.get();
  assert!(heap.used_bytes() > 0);

  heap.release(s);
  assert_eq!(heap.used_bytes(), 0);
  assert!(matches!(heap.get_string(handle), Err(VmError::InvalidHandle)));
  assert_eq!(heap.gc_runs(), 0);
  Ok(())
}

#[test]
fn copied_handles_go_stale_when_the_owner_releases() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let obj = heap.alloc_ordinary_object(None)?;
  let copy = obj.get();
  heap.release(obj);

  // The freed slot is reused, but the copy still names the old generation.
  let replacement = heap.alloc_ordinary_object(None)?;
  assert_eq!(replacement.get().index(), copy.index());
  assert_ne!(replacement.get(), copy);
  assert!(!heap.is_valid_object(copy));
  assert!(heap.is_valid_object(replacement.get()));
  assert_eq!(
    heap.object_get_own_property(copy, &PropertyKey::Magic(MagicString::Name)),
    Err(VmError::InvalidHandle)
  );
  assert!(matches!(heap.retain(copy), Err(VmError::InvalidHandle)));
  assert_eq!(heap.ref_count(replacement.get()), Some(1));

  heap.release(replacement);
  assert_eq!(heap.live_cells(), 0);
  Ok(())
}

#[test]
fn retain_takes_an_additional_reference() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let obj = heap.alloc_ordinary_object(None)?;
  let second = heap.retain(obj.get())?;
  assert_eq!(heap.ref_count(obj.get()), Some(2));

  heap.release(obj);
  assert!(heap.is_valid_object(second.get()));
  heap.release(second);
  assert_eq!(heap.live_cells(), 0);
  Ok(())
}

#[test]
fn releasing_the_head_of_a_chain_frees_the_whole_chain() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());

  let mut head = heap.alloc_ordinary_object(None)?;
  for _ in 0..50_000 {
    let next = heap.alloc_ordinary_object(Some(head.get()))?;
    heap.release(head);
    head = next;
  }
  assert_eq!(heap.live_cells(), 50_001);

  heap.release(head);
  assert_eq!(heap.live_cells(), 0);
  assert_eq!(heap.used_bytes(), 0);
  assert_eq!(heap.gc_runs(), 0);
  Ok(())
}

#[test]
fn deleting_a_property_frees_its_value() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let obj = heap.alloc_ordinary_object(None)?;
  let payload = heap.alloc_string("payload")?;
  let payload_handle = payload.get();
  let key = PropertyKey::Magic(MagicString::Message);

  heap.define_property(
    obj.get(),
    key,
    PropertyDescriptor::plain_data(payload_handle.into()),
  )?;
  heap.release(payload);
  assert_eq!(heap.ref_count(payload_handle), Some(1));

  assert!(heap.object_delete_own_property(obj.get(), &key)?);
  assert!(!heap.is_valid_string(payload_handle));
  assert_eq!(heap.own_property_count(obj.get())?, 0);

  heap.release(obj);
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

#[test]
fn overwriting_a_property_releases_the_previous_value() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let obj = heap.alloc_ordinary_object(None)?;
  let old = heap.alloc_number(0.25)?;
  let old_value = old.get();
  let key = PropertyKey::Magic(MagicString::Length);

  heap.define_property(obj.get(), key, PropertyDescriptor::plain_data(old_value))?;
  heap.release(old);
  assert!(heap.is_valid_value(old_value));

  heap.define_property(obj.get(), key, PropertyDescriptor::plain_data(Value::Integer(3)))?;
  assert!(!heap.is_valid_value(old_value));

  heap.release(obj);
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

#[test]
fn property_keys_are_counted_references() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let obj = heap.alloc_ordinary_object(None)?;
  let name = heap.alloc_string("custom")?;
  let name_handle = name.get();

  heap.define_property(
    obj.get(),
    PropertyKey::String(name_handle),
    PropertyDescriptor::plain_data(Value::TRUE),
  )?;
  heap.release(name);
  assert!(heap.is_valid_string(name_handle));

  heap.release(obj);
  assert!(!heap.is_valid_string(name_handle));
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

#[test]
fn wrapper_primitive_is_released_when_the_slot_is_overwritten() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let n = heap.alloc_number(0.5)?;
  let boxed = n.get();
  let wrapper = heap.alloc_object(None, ObjectKind::Number { primitive: boxed })?;
  heap.release(n);
  assert!(heap.is_valid_value(boxed));

  heap.set_internal(
    wrapper.get(),
    InternalSlot::PrimitiveNumber,
    InternalValue::Value(Value::Integer(1)),
  )?;
  assert!(!heap.is_valid_value(boxed));

  heap.release(wrapper);
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

const KEYS: [MagicString; 4] = [
  MagicString::Length,
  MagicString::Name,
  MagicString::Message,
  MagicString::Constructor,
];

#[derive(Debug, Clone)]
enum Op {
  Alloc,
  AllocWithPrototype(usize),
  Link { from: usize, to: usize, key: usize },
  Unlink { from: usize, key: usize },
  Retain(usize),
  Release(usize),
  Collect,
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => Just(Op::Alloc),
    1 => any::<usize>().prop_map(Op::AllocWithPrototype),
    4 => (any::<usize>(), any::<usize>(), 0..KEYS.len())
      .prop_map(|(from, to, key)| Op::Link { from, to, key }),
    2 => (any::<usize>(), 0..KEYS.len()).prop_map(|(from, key)| Op::Unlink { from, key }),
    1 => any::<usize>().prop_map(Op::Retain),
    3 => any::<usize>().prop_map(Op::Release),
    1 => Just(Op::Collect),
  ]
}

fn pick(owned: &[Owned<GcObject>], i: usize) -> Option<GcObject> {
  (!owned.is_empty()).then(|| owned[i % owned.len()].get())
}

fn run_ops(ops: &[Op]) -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let mut owned: Vec<Owned<GcObject>> = Vec::new();

  for op in ops {
    match *op {
      Op::Alloc => owned.push(heap.alloc_ordinary_object(None)?),
      Op::AllocWithPrototype(i) => {
        let proto = pick(&owned, i);
        owned.push(heap.alloc_ordinary_object(proto)?);
      }
      Op::Link { from, to, key } => {
        if let (Some(from), Some(to)) = (pick(&owned, from), pick(&owned, to)) {
          heap.define_property(
            from,
            PropertyKey::Magic(KEYS[key]),
            PropertyDescriptor::plain_data(to.into()),
          )?;
        }
      }
      Op::Unlink { from, key } => {
        if let Some(from) = pick(&owned, from) {
          heap.object_delete_own_property(from, &PropertyKey::Magic(KEYS[key]))?;
        }
      }
      Op::Retain(i) => {
        if let Some(obj) = pick(&owned, i) {
          owned.push(heap.retain(obj)?);
        }
      }
      Op::Release(i) => {
        if !owned.is_empty() {
          let len = owned.len();
          heap.release(owned.swap_remove(i % len));
        }
      }
      Op::Collect => heap.collect_garbage(),
    }

    for obj in &owned {
      assert!(heap.is_valid_object(obj.get()), "owned handle was freed");
      let handles = owned.iter().filter(|o| o.get() == obj.get()).count() as u32;
      let count = heap.ref_count(obj.get()).unwrap_or(0);
      assert!(count >= handles, "{count} references for {handles} owned handles");
    }
  }

  // A collection keeps exactly what is still owned, and a second one finds nothing more.
  heap.collect_garbage();
  let live = heap.live_cells();
  heap.collect_garbage();
  assert_eq!(heap.live_cells(), live);

  for obj in owned {
    heap.release(obj);
  }
  heap.collect_garbage();
  assert_eq!(heap.live_cells(), 0);
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

proptest! {
  #[test]
  fn references_balance_under_random_mutation(ops in proptest::collection::vec(op(), 1..96)) {
    run_ops(&ops).map_err(|err| TestCaseError::fail(err.to_string()))?;
  }
}
