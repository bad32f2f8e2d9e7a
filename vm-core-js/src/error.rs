use crate::class::{ClassTag, InternalSlot};
use crate::function::NativeFunctionId;
use crate::value::{Value, ValueTag};

/// Engine faults.
///
/// These are not script exceptions: a script-visible exception travels as a
/// [`Completion::Throw`](crate::Completion::Throw) inside `Ok(..)`. A `VmError` means the host asked for
/// something impossible (a stale handle, the wrong tag, a slot the class lacks) or a hard resource
/// limit was reached. Callers propagate it with `?` and abandon the operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
  /// An allocation did not fit in the heap's byte limit, even after a full collection.
  #[error("out of memory")]
  OutOfMemory,

  /// A handle was used after its cell was freed (or the handle is otherwise malformed).
  #[error("invalid handle")]
  InvalidHandle,

  /// A value was extracted as a type it does not carry.
  #[error("value tag mismatch: expected {expected}, found {found}")]
  TagMismatch { expected: ValueTag, found: ValueTag },

  #[error("expected a boolean, found {0:?}")]
  NotBoolean(Value),

  /// `empty` or `uninitialized` reached an operation that only accepts language values.
  #[error("{0:?} is not a language value")]
  NotALanguageValue(Value),

  /// An internal slot was accessed on an object whose class does not define it.
  #[error("{class} objects have no {slot} internal slot")]
  MissingInternalSlot { class: ClassTag, slot: InternalSlot },

  /// An internal slot was given a value of the wrong type, or is read-only.
  #[error("invalid value for the {slot} internal slot")]
  InvalidInternalValue { slot: InternalSlot },

  /// A prototype mutation would introduce a cycle.
  #[error("prototype cycle")]
  PrototypeCycle,

  /// A prototype chain walk exceeded [`MAX_PROTOTYPE_CHAIN`](crate::MAX_PROTOTYPE_CHAIN).
  #[error("prototype chain too deep")]
  PrototypeChainTooDeep,

  /// Native calls nested deeper than [`VmOptions::max_stack_depth`](crate::VmOptions::max_stack_depth).
  #[error("stack overflow")]
  StackOverflow,

  #[error("unknown native function {0:?}")]
  UnknownNativeFunction(NativeFunctionId),

  /// An operation needed realm intrinsics (e.g. to create a `TypeError`) before any realm was set
  /// up on the VM.
  #[error("realm intrinsics are not initialized")]
  MissingIntrinsics,

  /// The provided property descriptor patch is invalid.
  #[error("invalid property descriptor patch: cannot mix data and accessor fields")]
  InvalidPropertyDescriptorPatch,

  /// A cell's reference count would overflow `u32`.
  #[error("reference count overflow")]
  RefCountOverflow,
}
