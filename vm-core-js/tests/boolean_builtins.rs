#![cfg(feature = "boolean")]

use vm_core_js::{
  ClassTag, Completion, ErrorKind, GcObject, Heap, HeapLimits, MagicString, OwnedValue,
  PropertyKey, Realm, Value, Vm, VmError, VmOptions,
};

struct Env {
  heap: Heap,
  vm: Vm,
  realm: Realm,
}

impl Env {
  fn new() -> Result<Self, VmError> {
    let mut heap = Heap::new(HeapLimits::default());
    let mut vm = Vm::new(VmOptions::default());
    let realm = Realm::new(&mut vm, &mut heap)?;
    Ok(Self { heap, vm, realm })
  }

  fn get(&mut self, obj: GcObject, key: MagicString) -> Result<OwnedValue, VmError> {
    match self.vm.get(&mut self.heap, obj, PropertyKey::Magic(key))?.into_normal() {
      Ok(value) => Ok(value),
      Err(abrupt) => panic!("unexpected abrupt completion: {abrupt:?}"),
    }
  }

  fn boolean_prototype(&self) -> GcObject {
    self.realm.intrinsics().boolean_prototype()
  }

  fn call_method(
    &mut self,
    key: MagicString,
    this: Value,
    args: &[Value],
  ) -> Result<Completion, VmError> {
    let method = self.get(self.boolean_prototype(), key)?;
    let result = self.vm.call(&mut self.heap, method.get(), this, args);
    self.heap.release(method);
    result
  }

  fn assert_type_error(&mut self, completion: Completion) -> Result<(), VmError> {
    assert!(completion.is_throw(), "expected a throw, got {completion:?}");
    let err = completion.value().ok_or(VmError::InvalidHandle)?.as_object()?;
    assert_eq!(self.heap.object_class(err)?, ClassTag::Error);
    assert_eq!(
      self.heap.object_prototype(err)?,
      Some(self.realm.intrinsics().error_prototype(ErrorKind::Type))
    );
    completion.release(&mut self.heap);
    Ok(())
  }

  fn finish(mut self) {
    self.realm.teardown(&mut self.vm, &mut self.heap);
    self.heap.collect_garbage();
    assert_eq!(self.heap.used_bytes(), 0, "something leaked a reference");
  }
}

#[test]
fn value_of_on_primitives_does_not_allocate() -> Result<(), VmError> {
  let mut env = Env::new()?;
  let cells = env.heap.live_cells();

  let result = env.call_method(MagicString::ValueOf, Value::TRUE, &[])?;
  assert!(result.is_normal_true());
  let result = env.call_method(MagicString::ValueOf, Value::FALSE, &[])?;
  assert!(result.is_normal_false());
  assert_eq!(env.heap.live_cells(), cells);

  env.finish();
  Ok(())
}

#[test]
fn value_of_unwraps_boolean_objects() -> Result<(), VmError> {
  let mut env = Env::new()?;
  let boolean = env.get(env.realm.global_object(), MagicString::Boolean)?;

  let wrapper = env.vm.construct(&mut env.heap, boolean.get(), &[Value::TRUE])?;
  let wrapper_value = wrapper.value().ok_or(VmError::InvalidHandle)?;
  let result = env.call_method(MagicString::ValueOf, wrapper_value, &[])?;
  assert!(result.is_normal_true());

  // Boolean.prototype is itself a Boolean object holding false.
  let proto = env.boolean_prototype();
  let result = env.call_method(MagicString::ValueOf, proto.into(), &[])?;
  assert!(result.is_normal_false());

  wrapper.release(&mut env.heap);
  env.heap.release(boolean);
  env.finish();
  Ok(())
}

#[test]
fn value_of_rejects_other_receivers() -> Result<(), VmError> {
  let mut env = Env::new()?;
  let plain = env
    .heap
    .alloc_ordinary_object(Some(env.realm.intrinsics().object_prototype()))?;

  for this in [
    Value::Integer(1),
    Value::UNDEFINED,
    Value::MagicString(MagicString::True),
    plain.get().into(),
  ] {
    let result = env.call_method(MagicString::ValueOf, this, &[])?;
    env.assert_type_error(result)?;
    let result = env.call_method(MagicString::ToString, this, &[])?;
    env.assert_type_error(result)?;
  }

  env.heap.release(plain);
  env.finish();
  Ok(())
}

#[test]
fn to_string_returns_magic_strings() -> Result<(), VmError> {
  let mut env = Env::new()?;
  let cells = env.heap.live_cells();

  let result = env.call_method(MagicString::ToString, Value::TRUE, &[])?;
  assert_eq!(result.value(), Some(Value::MagicString(MagicString::True)));
  let result = env.call_method(MagicString::ToString, Value::FALSE, &[])?;
  assert_eq!(result.value(), Some(Value::MagicString(MagicString::False)));
  assert_eq!(env.heap.live_cells(), cells);

  env.finish();
  Ok(())
}

#[test]
fn to_string_on_a_true_wrapper_leaves_it_unchanged() -> Result<(), VmError> {
  let mut env = Env::new()?;
  let boolean = env.get(env.realm.global_object(), MagicString::Boolean)?;
  let wrapper = env.vm.construct(&mut env.heap, boolean.get(), &[Value::TRUE])?;
  let wrapper_value = wrapper.value().ok_or(VmError::InvalidHandle)?;
  let wrapper_object = wrapper_value.as_object()?;
  let properties = env.heap.own_property_count(wrapper_object)?;
  let cells = env.heap.live_cells();

  let result = env.call_method(MagicString::ToString, wrapper_value, &[])?;
  assert_eq!(result, Completion::normal(OwnedValue::magic(MagicString::True)));
  assert_eq!(env.heap.live_cells(), cells);
  assert!(env.heap.boolean_data(wrapper_object)?);
  assert_eq!(env.heap.own_property_count(wrapper_object)?, properties);

  wrapper.release(&mut env.heap);
  env.heap.release(boolean);
  env.finish();
  Ok(())
}

#[test]
fn boolean_called_as_a_function_converts() -> Result<(), VmError> {
  let mut env = Env::new()?;
  let boolean = env.get(env.realm.global_object(), MagicString::Boolean)?;
  let text = env.heap.alloc_string("text")?;
  let empty = env.heap.alloc_string("")?;

  let cases = [
    (vec![], false),
    (vec![Value::UNDEFINED], false),
    (vec![Value::Integer(0)], false),
    (vec![Value::Integer(-3)], true),
    (vec![Value::MagicString(MagicString::Empty)], false),
    (vec![Value::String(text.get())], true),
    (vec![Value::String(empty.get())], false),
    (vec![Value::TRUE, Value::FALSE], true),
    (vec![boolean.get()], true),
  ];
  for (args, expected) in cases {
    let result = env
      .vm
      .call(&mut env.heap, boolean.get(), Value::UNDEFINED, &args)?;
    assert_eq!(
      result,
      Completion::normal_bool(expected),
      "Boolean({args:?})"
    );
  }

  env.heap.release(text);
  env.heap.release(empty);
  env.heap.release(boolean);
  env.finish();
  Ok(())
}

#[test]
fn boolean_constructed_with_new_wraps() -> Result<(), VmError> {
  let mut env = Env::new()?;
  let boolean = env.get(env.realm.global_object(), MagicString::Boolean)?;
  assert!(env.vm.is_constructor(&env.heap, boolean.get())?);

  let result = env.vm.construct(&mut env.heap, boolean.get(), &[Value::Integer(0)])?;
  let wrapper = result.value().ok_or(VmError::InvalidHandle)?.as_object()?;
  assert_eq!(env.heap.object_class(wrapper)?, ClassTag::Boolean);
  assert!(!env.heap.boolean_data(wrapper)?);
  assert_eq!(
    env.heap.object_prototype(wrapper)?,
    Some(env.boolean_prototype())
  );
  assert_eq!(env.heap.own_property_count(wrapper)?, 0);
  // Objects are truthy regardless of the wrapped value.
  assert!(env.heap.to_boolean(wrapper.into())?);
  result.release(&mut env.heap);

  env.heap.release(boolean);
  env.finish();
  Ok(())
}

#[test]
fn constructor_and_prototype_are_linked() -> Result<(), VmError> {
  let mut env = Env::new()?;
  let global = env.realm.global_object();
  let boolean = env.get(global, MagicString::Boolean)?;
  let boolean_object = boolean.get().as_object()?;
  assert_eq!(boolean_object, env.realm.intrinsics().boolean_constructor());

  let prototype = env.get(boolean_object, MagicString::Prototype)?;
  assert_eq!(prototype.get(), Value::Object(env.boolean_prototype()));
  let constructor = env.get(env.boolean_prototype(), MagicString::Constructor)?;
  assert_eq!(constructor.get(), boolean.get());

  let length = env.get(boolean_object, MagicString::Length)?;
  assert_eq!(length.get(), Value::Integer(1));
  let name = env.get(boolean_object, MagicString::Name)?;
  assert_eq!(env.heap.string_to_utf8(name.get())?, "Boolean");
  assert_eq!(env.heap.type_of(boolean.get())?, MagicString::TypeFunction);

  // Boolean.prototype is not writable, enumerable or configurable.
  let desc = env
    .heap
    .object_get_own_property(boolean_object, &PropertyKey::Magic(MagicString::Prototype))?
    .ok_or(VmError::InvalidHandle)?;
  assert!(!desc.enumerable && !desc.configurable);
  let strict_put = env.vm.put(
    &mut env.heap,
    boolean_object,
    PropertyKey::Magic(MagicString::Prototype),
    Value::NULL,
    true,
  )?;
  env.assert_type_error(strict_put)?;

  // The methods are non-enumerable.
  assert_eq!(env.heap.own_enumerable_keys(env.boolean_prototype())?, Vec::new());

  for value in [boolean, prototype, constructor, length, name] {
    env.heap.release(value);
  }
  env.finish();
  Ok(())
}

#[test]
fn primitive_receivers_find_boolean_prototype_methods() -> Result<(), VmError> {
  let mut env = Env::new()?;

  let to_string = env.vm.get_value(
    &mut env.heap,
    Value::TRUE,
    PropertyKey::Magic(MagicString::ToString),
  )?;
  let method = to_string.value().ok_or(VmError::InvalidHandle)?;
  let result = env.vm.call(&mut env.heap, method, Value::TRUE, &[])?;
  assert_eq!(result.value(), Some(Value::MagicString(MagicString::True)));

  let wrapper = env.vm.to_object(&mut env.heap, Value::FALSE)?;
  let wrapper_object = wrapper.value().ok_or(VmError::InvalidHandle)?.as_object()?;
  assert_eq!(
    env.heap.object_prototype(wrapper_object)?,
    Some(env.boolean_prototype())
  );
  let converted = env.vm.to_string(&mut env.heap, wrapper_object.into())?;
  assert_eq!(
    converted.value(),
    Some(Value::MagicString(MagicString::False))
  );

  wrapper.release(&mut env.heap);
  to_string.release(&mut env.heap);
  env.finish();
  Ok(())
}

#[test]
fn deleting_the_exposing_properties_keeps_the_intrinsics() -> Result<(), VmError> {
  let mut env = Env::new()?;
  let proto = env.boolean_prototype();
  let global = env.realm.global_object();

  let deleted = env.vm.delete_property(
    &mut env.heap,
    proto,
    PropertyKey::Magic(MagicString::Constructor),
    true,
  )?;
  assert!(deleted.is_normal_true());
  let deleted = env.vm.delete_property(
    &mut env.heap,
    global,
    PropertyKey::Magic(MagicString::Boolean),
    true,
  )?;
  assert!(deleted.is_normal_true());

  env.heap.collect_garbage();
  assert!(env.heap.is_valid_object(env.realm.intrinsics().boolean_constructor()));
  let result = env.vm.construct(
    &mut env.heap,
    env.realm.intrinsics().boolean_constructor().into(),
    &[Value::TRUE],
  )?;
  let wrapper = result.value().ok_or(VmError::InvalidHandle)?.as_object()?;
  assert!(env.heap.boolean_data(wrapper)?);
  result.release(&mut env.heap);

  env.finish();
  Ok(())
}
