use crate::class::ObjectKind;
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::{Completion, GcObject, Heap, Intrinsics, MagicString, Owned, Vm, VmError};

/// The native error constructor families.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ErrorKind {
  Error,
  Type,
  Range,
  Reference,
  Syntax,
  Eval,
  Uri,
}

impl ErrorKind {
  pub const COUNT: usize = 7;

  /// Every kind, in declaration order.
  pub const ALL: [ErrorKind; ErrorKind::COUNT] = [
    ErrorKind::Error,
    ErrorKind::Type,
    ErrorKind::Range,
    ErrorKind::Reference,
    ErrorKind::Syntax,
    ErrorKind::Eval,
    ErrorKind::Uri,
  ];

  /// The constructor name, which is also the prototype's `name` property.
  pub fn name(self) -> MagicString {
    match self {
      ErrorKind::Error => MagicString::Error,
      ErrorKind::Type => MagicString::TypeError,
      ErrorKind::Range => MagicString::RangeError,
      ErrorKind::Reference => MagicString::ReferenceError,
      ErrorKind::Syntax => MagicString::SyntaxError,
      ErrorKind::Eval => MagicString::EvalError,
      ErrorKind::Uri => MagicString::UriError,
    }
  }
}

/// Allocates an error instance of the given kind with an own, non-enumerable `message`.
///
/// The instance inherits `name` from the kind's prototype.
pub fn new_standard_error(
  heap: &mut Heap,
  intrinsics: &Intrinsics,
  kind: ErrorKind,
  message: &str,
) -> Result<Owned<GcObject>, VmError> {
  let err = heap.alloc_object(
    Some(intrinsics.error_prototype(kind)),
    ObjectKind::Error { kind },
  )?;
  heap.initialize(err, |heap, err| {
    let message = heap.alloc_string_value(message)?;
    let defined = heap.define_property(
      err,
      PropertyKey::Magic(MagicString::Message),
      PropertyDescriptor::data(message.get(), true, false, true),
    );
    heap.release(message);
    defined
  })
}

/// Creates an error of the given kind and returns it as a `throw` completion.
pub fn throw_error(
  vm: &Vm,
  heap: &mut Heap,
  kind: ErrorKind,
  message: &str,
) -> Result<Completion, VmError> {
  let intrinsics = vm.require_intrinsics()?;
  let err = new_standard_error(heap, &intrinsics, kind, message)?;
  Ok(Completion::throw(err.into_value()))
}

pub fn throw_type_error(vm: &Vm, heap: &mut Heap, message: &str) -> Result<Completion, VmError> {
  throw_error(vm, heap, ErrorKind::Type, message)
}
