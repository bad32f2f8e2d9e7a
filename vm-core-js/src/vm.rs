use crate::class::ObjectKind;
use crate::error_object::{throw_error, ErrorKind};
use crate::function::{NativeFunctionId, NativeFunctionMeta};
use crate::intrinsics::Intrinsics;
use crate::{Completion, Heap, Value, VmError};

/// Construction-time VM options.
#[derive(Debug, Clone)]
pub struct VmOptions {
  /// Maximum nesting of native [[Call]]/[[Construct]] invocations.
  pub max_stack_depth: usize,
}

impl Default for VmOptions {
  fn default() -> Self {
    Self {
      max_stack_depth: 1024,
    }
  }
}

/// Engine state that is not stored in the [`Heap`]: the native function registry, the active
/// realm's intrinsics and the native call depth.
#[derive(Debug)]
pub struct Vm {
  options: VmOptions,
  natives: Vec<NativeFunctionMeta>,
  intrinsics: Option<Intrinsics>,
  depth: usize,
}

impl Vm {
  pub fn new(options: VmOptions) -> Self {
    Self {
      options,
      natives: Vec::new(),
      intrinsics: None,
      depth: 0,
    }
  }

  pub fn options(&self) -> &VmOptions {
    &self.options
  }

  /// Current native call depth.
  pub fn depth(&self) -> usize {
    self.depth
  }

  /// Adds a native function to the registry. Function objects reference it by the returned id.
  pub fn register_native(&mut self, meta: NativeFunctionMeta) -> NativeFunctionId {
    self.natives.push(meta);
    NativeFunctionId((self.natives.len() - 1) as u32)
  }

  pub fn native_meta(&self, id: NativeFunctionId) -> Result<&NativeFunctionMeta, VmError> {
    self
      .natives
      .get(id.0 as usize)
      .ok_or(VmError::UnknownNativeFunction(id))
  }

  pub fn intrinsics(&self) -> Option<&Intrinsics> {
    self.intrinsics.as_ref()
  }

  pub(crate) fn require_intrinsics(&self) -> Result<Intrinsics, VmError> {
    self.intrinsics.ok_or(VmError::MissingIntrinsics)
  }

  pub(crate) fn set_intrinsics(&mut self, intrinsics: Option<Intrinsics>) {
    self.intrinsics = intrinsics;
  }

  fn native_of(&self, heap: &Heap, value: Value) -> Result<Option<NativeFunctionId>, VmError> {
    let Value::Object(obj) = value else {
      return Ok(None);
    };
    match heap.object_kind(obj)? {
      ObjectKind::Function { native } => Ok(Some(native)),
      _ => Ok(None),
    }
  }

  pub fn is_callable(&self, heap: &Heap, value: Value) -> Result<bool, VmError> {
    Ok(self.native_of(heap, value)?.is_some())
  }

  pub fn is_constructor(&self, heap: &Heap, value: Value) -> Result<bool, VmError> {
    match self.native_of(heap, value)? {
      Some(id) => Ok(self.native_meta(id)?.construct.is_some()),
      None => Ok(false),
    }
  }

  fn enter(&mut self) -> Result<(), VmError> {
    if self.depth >= self.options.max_stack_depth {
      tracing::debug!(depth = self.depth, "native call depth exceeded");
      return Err(VmError::StackOverflow);
    }
    self.depth += 1;
    Ok(())
  }

  /// [[Call]].
  ///
  /// Throws a `TypeError` if `callee` is not callable. A `return` completion from the callee
  /// becomes the normal result of the call.
  pub fn call(
    &mut self,
    heap: &mut Heap,
    callee: Value,
    this: Value,
    args: &[Value],
  ) -> Result<Completion, VmError> {
    let Some(id) = self.native_of(heap, callee)? else {
      return throw_error(self, heap, ErrorKind::Type, "value is not a function");
    };
    let call = self.native_meta(id)?.call;

    let mut scope = heap.scope();
    scope.push_root(callee)?;
    scope.push_root(this)?;
    for &arg in args {
      scope.push_root(arg)?;
    }

    self.enter()?;
    let result = call(self, &mut scope, this, args);
    self.depth -= 1;
    Ok(result?.catch_return())
  }

  /// [[Construct]].
  ///
  /// Throws a `TypeError` if `callee` is not a constructor.
  pub fn construct(
    &mut self,
    heap: &mut Heap,
    callee: Value,
    args: &[Value],
  ) -> Result<Completion, VmError> {
    let construct = match self.native_of(heap, callee)? {
      Some(id) => self.native_meta(id)?.construct,
      None => None,
    };
    let Some(construct) = construct else {
      return throw_error(self, heap, ErrorKind::Type, "value is not a constructor");
    };

    let mut scope = heap.scope();
    scope.push_root(callee)?;
    for &arg in args {
      scope.push_root(arg)?;
    }

    self.enter()?;
    let result = construct(self, &mut scope, args, callee);
    self.depth -= 1;
    Ok(result?.catch_return())
  }
}
