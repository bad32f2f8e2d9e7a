//! Value, object and completion core for an embedded ECMAScript engine.
//!
//! This crate is the layer an interpreter is built on. It provides:
//! - Tagged values ([`Value`]) with inline small integers, magic strings and simple values
//! - A non-moving, generation-checked cell heap ([`Heap`]) with reference counting for prompt
//!   reclamation plus a mark/sweep collector for cycles
//! - Objects with class tags, internal slots and ordered own properties ([`ObjectKind`],
//!   [`PropertyDescriptor`])
//! - Completion records ([`Completion`]) and the `try_normal!` propagation macro
//! - Realms with intrinsics ([`Realm`], [`Intrinsics`]) and the `Boolean` built-ins
//!
//! # Ownership and handle validity
//!
//! Heap cells (boxed numbers, strings, objects) are referenced with stable handles containing
//! `{ index, generation }`. The generation is bumped whenever a slot is freed, so a stale handle is
//! detected and reported as [`VmError::InvalidHandle`] instead of aliasing a newer cell.
//!
//! A bare [`Value`] is a *borrowed* reference: it does not keep its cell alive. Operations that
//! produce a new reference return an [`Owned`] handle (or a [`Completion`] carrying one), which the
//! holder must hand back with [`Heap::release`] or store somewhere that takes ownership. A cell is
//! freed as soon as the last owned handle and the last incoming heap edge are gone.
//!
//! Reference counting alone cannot reclaim cycles. [`Heap::collect_garbage`] marks from every cell
//! with an outstanding owned handle ([`Scope`] roots and persistent [`RootId`] roots count as owned
//! handles) and sweeps the rest. The heap runs it automatically when an allocation would exceed
//! [`HeapLimits::max_bytes`].
//!
//! Handles carry no lifetime. [`Owned::get`] hands out a `Copy` handle, and nothing in the type
//! system stops it from being used after the owned handle is released. Such use is caught at run
//! time: accessors return [`VmError::InvalidHandle`], and [`Heap::is_valid_value`] and its typed
//! siblings report `false`. Tying handles to a borrow of the [`Heap`] would rule out holding them
//! across calls that need `&mut Heap`, which is nearly every call.
//!
//! Every cell is charged a fixed slot header on top of its payload, so even empty strings count
//! against the byte limit.

pub mod builtins;
mod class;
mod completion;
mod conversion;
mod error;
mod error_object;
mod function;
mod gc;
mod handle;
mod heap;
mod intrinsics;
mod magic;
mod object_ops;
mod owned;
mod property;
mod realm;
mod string;
mod value;
mod vm;

pub use crate::class::ClassTag;
pub use crate::class::InternalSlot;
pub use crate::class::InternalValue;
pub use crate::class::ObjectKind;
pub use crate::completion::Completion;
pub use crate::completion::CompletionKind;
pub use crate::completion::LoopControl;
pub use crate::conversion::string_to_number;
pub use crate::conversion::PreferredType;
pub use crate::error::VmError;
pub use crate::error_object::new_standard_error;
pub use crate::error_object::throw_error;
pub use crate::error_object::throw_type_error;
pub use crate::error_object::ErrorKind;
pub use crate::function::alloc_native_function;
pub use crate::function::NativeCallFn;
pub use crate::function::NativeConstructFn;
pub use crate::function::NativeFunctionId;
pub use crate::function::NativeFunctionMeta;
pub use crate::handle::GcNumber;
pub use crate::handle::GcObject;
pub use crate::handle::GcString;
pub use crate::handle::HeapId;
pub use crate::handle::RootId;
pub use crate::heap::Heap;
pub use crate::heap::HeapLimits;
pub use crate::heap::Scope;
pub use crate::heap::MAX_PROTOTYPE_CHAIN;
pub use crate::intrinsics::Intrinsics;
pub use crate::magic::MagicString;
pub use crate::object_ops::PropertyLookup;
pub use crate::owned::HeapRef;
pub use crate::owned::Owned;
pub use crate::owned::OwnedValue;
pub use crate::property::PropertyDescriptor;
pub use crate::property::PropertyDescriptorPatch;
pub use crate::property::PropertyKey;
pub use crate::property::PropertyKind;
pub use crate::realm::Realm;
pub use crate::string::JsString;
pub use crate::value::SimpleValue;
pub use crate::value::Value;
pub use crate::value::ValueTag;
pub use crate::vm::Vm;
pub use crate::vm::VmOptions;
