use vm_core_js::{
  alloc_native_function, string_to_number, ClassTag, Completion, Heap, HeapLimits, InternalSlot,
  InternalValue, MagicString, NativeFunctionMeta, OwnedValue, PreferredType, PropertyDescriptor,
  PropertyKey, PropertyKind, Realm, Scope, Value, Vm, VmError, VmOptions,
};

#[test]
fn to_boolean_follows_truthiness() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let nan = heap.alloc_number(f64::NAN)?;
  let negative_zero = heap.alloc_number(-0.0)?;
  let half = heap.alloc_number(0.5)?;
  let empty = heap.alloc_string("")?;
  let text = heap.alloc_string("0")?;
  let obj = heap.alloc_ordinary_object(None)?;

  let cases = [
    (Value::UNDEFINED, false),
    (Value::NULL, false),
    (Value::FALSE, false),
    (Value::TRUE, true),
    (Value::Integer(0), false),
    (Value::Integer(-1), true),
    (nan.get(), false),
    (negative_zero.get(), false),
    (half.get(), true),
    (Value::MagicString(MagicString::Empty), false),
    (Value::MagicString(MagicString::Zero), true),
    (Value::String(empty.get()), false),
    (Value::String(text.get()), true),
    (Value::Object(obj.get()), true),
  ];
  for (value, expected) in cases {
    assert_eq!(heap.to_boolean(value)?, expected, "ToBoolean({value:?})");
  }
  assert_eq!(
    heap.to_boolean(Value::EMPTY),
    Err(VmError::NotALanguageValue(Value::EMPTY))
  );

  for value in [nan, negative_zero, half] {
    heap.release(value);
  }
  heap.release(empty);
  heap.release(text);
  heap.release(obj);
  Ok(())
}

#[test]
fn type_of_reports_the_language_type() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let obj = heap.alloc_ordinary_object(None)?;
  let func = heap.alloc_object(
    None,
    vm_core_js::ObjectKind::Function {
      native: vm_core_js::NativeFunctionId(0),
    },
  )?;

  assert_eq!(heap.type_of(Value::UNDEFINED)?, MagicString::Undefined);
  assert_eq!(heap.type_of(Value::NULL)?, MagicString::TypeObject);
  assert_eq!(heap.type_of(Value::TRUE)?, MagicString::TypeBoolean);
  assert_eq!(heap.type_of(Value::Integer(1))?, MagicString::TypeNumber);
  assert_eq!(
    heap.type_of(Value::MagicString(MagicString::Name))?,
    MagicString::TypeString
  );
  assert_eq!(heap.type_of(obj.get().into())?, MagicString::TypeObject);
  assert_eq!(heap.type_of(func.get().into())?, MagicString::TypeFunction);
  assert_eq!(
    heap.type_of(Value::UNINITIALIZED),
    Err(VmError::NotALanguageValue(Value::UNINITIALIZED))
  );

  heap.release(obj);
  heap.release(func);
  Ok(())
}

#[test]
fn primitive_to_string_formats_numbers() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let cases = [
    (0.0, "0"),
    (-0.0, "0"),
    (42.0, "42"),
    (-1.5, "-1.5"),
    (0.1, "0.1"),
    (1e21, "1e+21"),
    (f64::NAN, "NaN"),
    (f64::INFINITY, "Infinity"),
  ];
  for (n, expected) in cases {
    let number = heap.alloc_number(n)?;
    let string = heap.primitive_to_string(number.get())?;
    assert_eq!(heap.string_to_utf8(string.get())?, expected);
    heap.release(string);
    heap.release(number);
  }

  // Results that spell a magic string do not allocate.
  let nan = heap.alloc_number(f64::NAN)?;
  let cells = heap.live_cells();
  let string = heap.primitive_to_string(nan.get())?;
  assert_eq!(string.get(), Value::MagicString(MagicString::NaN));
  assert_eq!(heap.live_cells(), cells);
  heap.release(string);
  heap.release(nan);

  let string = heap.primitive_to_string(Value::NULL)?;
  assert_eq!(string.get(), Value::MagicString(MagicString::Null));
  heap.release(string);
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

#[test]
fn primitive_to_number_parses_strings() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let cases = [
    ("  12 ", Some(12.0)),
    ("0x10", Some(16.0)),
    ("1e3", Some(1000.0)),
    ("", Some(0.0)),
    ("-Infinity", Some(f64::NEG_INFINITY)),
    ("twelve", None),
  ];
  for (text, expected) in cases {
    let s = heap.alloc_string_value(text)?;
    let n = heap.primitive_to_number(s.get())?;
    let actual = heap.number_value(n.get())?;
    match expected {
      Some(expected) => assert_eq!(actual, expected, "ToNumber({text:?})"),
      None => assert!(actual.is_nan(), "ToNumber({text:?})"),
    }
    heap.release(n);
    heap.release(s);
  }

  assert_eq!(
    heap.primitive_to_number(Value::TRUE)?,
    OwnedValue::integer(1)
  );
  assert_eq!(heap.primitive_to_number(Value::NULL)?, OwnedValue::integer(0));
  let undefined = heap.primitive_to_number(Value::UNDEFINED)?;
  assert!(heap.number_value(undefined.get())?.is_nan());
  heap.release(undefined);

  assert_eq!(string_to_number("\u{a0}7\n"), 7.0);
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

fn value_of_seven(
  _vm: &mut Vm,
  _scope: &mut Scope<'_>,
  _this: Value,
  _args: &[Value],
) -> Result<Completion, VmError> {
  Ok(Completion::normal(OwnedValue::integer(7)))
}

fn returns_this(
  _vm: &mut Vm,
  scope: &mut Scope<'_>,
  this: Value,
  _args: &[Value],
) -> Result<Completion, VmError> {
  Ok(Completion::normal(scope.retain(this)?))
}

#[test]
fn to_primitive_prefers_value_of_for_numbers() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let mut vm = Vm::new(VmOptions::default());
  let mut realm = Realm::new(&mut vm, &mut heap)?;
  let function_prototype = realm.intrinsics().function_prototype();

  let seven = vm.register_native(NativeFunctionMeta {
    name: "valueOf",
    length: 0,
    call: value_of_seven,
    construct: None,
  });
  let value_of = alloc_native_function(&vm, &mut heap.scope(), Some(function_prototype), seven)?;
  let obj = heap.alloc_ordinary_object(Some(realm.intrinsics().object_prototype()))?;
  heap.define_property(
    obj.get(),
    PropertyKey::Magic(MagicString::ValueOf),
    PropertyDescriptor::data(value_of.get().into(), true, false, true),
  )?;

  let primitive = vm.to_primitive(&mut heap, obj.get().into(), PreferredType::Number)?;
  assert_eq!(primitive, Completion::normal(OwnedValue::integer(7)));
  let number = vm.to_number(&mut heap, obj.get().into())?;
  assert_eq!(number, Completion::normal(OwnedValue::integer(7)));
  // With a string hint `toString` comes first, but it is absent here.
  let string = vm.to_string(&mut heap, obj.get().into())?;
  assert_eq!(heap.string_to_utf8(string.value().ok_or(VmError::InvalidHandle)?)?, "7");
  string.release(&mut heap);

  heap.release(obj);
  heap.release(value_of);
  realm.teardown(&mut vm, &mut heap);
  heap.collect_garbage();
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

#[test]
fn to_primitive_throws_when_no_method_returns_a_primitive() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let mut vm = Vm::new(VmOptions::default());
  let mut realm = Realm::new(&mut vm, &mut heap)?;

  let id = vm.register_native(NativeFunctionMeta {
    name: "valueOf",
    length: 0,
    call: returns_this,
    construct: None,
  });
  let method = alloc_native_function(
    &vm,
    &mut heap.scope(),
    Some(realm.intrinsics().function_prototype()),
    id,
  )?;
  let obj = heap.alloc_ordinary_object(None)?;
  for key in [MagicString::ValueOf, MagicString::ToString] {
    heap.define_property(
      obj.get(),
      PropertyKey::Magic(key),
      PropertyDescriptor::plain_data(method.get().into()),
    )?;
  }

  let result = vm.to_primitive(&mut heap, obj.get().into(), PreferredType::Default)?;
  assert!(result.is_throw());
  result.release(&mut heap);

  // An object without any conversion methods cannot be converted either.
  let bare = heap.alloc_ordinary_object(None)?;
  let result = vm.to_string(&mut heap, bare.get().into())?;
  assert!(result.is_throw());
  result.release(&mut heap);

  heap.release(bare);
  heap.release(obj);
  heap.release(method);
  realm.teardown(&mut vm, &mut heap);
  heap.collect_garbage();
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

#[test]
fn to_object_wraps_primitives() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let mut vm = Vm::new(VmOptions::default());
  let mut realm = Realm::new(&mut vm, &mut heap)?;
  let intrinsics = *realm.intrinsics();

  let number = vm.to_object(&mut heap, Value::Integer(5))?;
  let number_object = number.value().ok_or(VmError::InvalidHandle)?.as_object()?;
  assert_eq!(heap.object_class(number_object)?, ClassTag::Number);
  assert_eq!(
    heap.object_prototype(number_object)?,
    Some(intrinsics.number_prototype())
  );
  assert_eq!(
    heap.get_internal(number_object, InternalSlot::PrimitiveNumber)?,
    InternalValue::Value(Value::Integer(5))
  );
  number.release(&mut heap);

  let s = heap.alloc_string("wrapped")?;
  let string = vm.to_object(&mut heap, s.get().into())?;
  let string_object = string.value().ok_or(VmError::InvalidHandle)?.as_object()?;
  assert_eq!(heap.object_class(string_object)?, ClassTag::String);
  assert_eq!(
    heap.object_get_own_property(string_object, &PropertyKey::Magic(MagicString::Length))?,
    Some(PropertyDescriptor::data(Value::Integer(7), false, false, false))
  );
  // The wrapper keeps its primitive alive.
  heap.release(s);
  let primitive = heap
    .get_internal(string_object, InternalSlot::PrimitiveString)?
    .as_value()
    .ok_or(VmError::InvalidHandle)?;
  assert_eq!(heap.string_to_utf8(primitive)?, "wrapped");
  string.release(&mut heap);

  let boolean = vm.to_object(&mut heap, Value::TRUE)?;
  let boolean_object = boolean.value().ok_or(VmError::InvalidHandle)?.as_object()?;
  assert_eq!(heap.object_class(boolean_object)?, ClassTag::Boolean);
  assert!(heap.boolean_data(boolean_object)?);
  assert_eq!(
    heap.object_prototype(boolean_object)?,
    Some(intrinsics.boolean_wrapper_prototype())
  );
  boolean.release(&mut heap);

  // Objects pass through unchanged.
  let obj = heap.alloc_ordinary_object(None)?;
  let same = vm.to_object(&mut heap, obj.get().into())?;
  assert_eq!(same.value(), Some(obj.get().into()));
  same.release(&mut heap);
  heap.release(obj);

  for value in [Value::UNDEFINED, Value::NULL] {
    let result = vm.to_object(&mut heap, value)?;
    assert!(result.is_throw());
    result.release(&mut heap);
  }

  realm.teardown(&mut vm, &mut heap);
  heap.collect_garbage();
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}

#[test]
fn string_wrapper_length_counts_code_units() -> Result<(), VmError> {
  let mut heap = Heap::new(HeapLimits::default());
  let mut vm = Vm::new(VmOptions::default());
  let mut realm = Realm::new(&mut vm, &mut heap)?;
  let length_key = PropertyKey::Magic(MagicString::Length);

  for (text, expected) in [("", 0.0), ("name", 4.0), ("a\u{1f600}b", 4.0)] {
    let s = heap.alloc_string_value(text)?;
    let wrapper = vm.to_object(&mut heap, s.get())?;
    let wrapper_object = wrapper.value().ok_or(VmError::InvalidHandle)?.as_object()?;
    let Some(desc) = heap.object_get_own_property(wrapper_object, &length_key)? else {
      panic!("{text:?} wrapper has no length");
    };
    let PropertyKind::Data { value, writable } = desc.kind else {
      panic!("{text:?} wrapper length is an accessor");
    };
    assert!(!writable && !desc.enumerable && !desc.configurable);
    assert_eq!(heap.number_value(value)?, expected, "{text:?}");
    wrapper.release(&mut heap);
    heap.release(s);
  }

  realm.teardown(&mut vm, &mut heap);
  heap.collect_garbage();
  assert_eq!(heap.used_bytes(), 0);
  Ok(())
}
