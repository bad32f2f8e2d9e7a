use crate::{Heap, OwnedValue, Value, VmError};

/// The outcome of evaluating an operation.
///
/// Every evaluating operation returns `Result<Completion, VmError>`: `Err` is an engine fault,
/// while script-level control flow (exceptions included) is a `Completion`. The carried values are
/// owned; a completion must be propagated, unwrapped or [released](Completion::release).
#[must_use = "completions own their value and must be propagated or released"]
#[derive(Debug, PartialEq)]
pub enum Completion {
  /// Execution continues. `empty` marks "no value" (e.g. after an empty statement).
  Normal(OwnedValue),
  /// An exception is propagating.
  Throw(OwnedValue),
  /// A function body is returning.
  Return(OwnedValue),
  /// `break`, optionally labelled.
  Break(Option<String>),
  /// `continue`, optionally labelled.
  Continue(Option<String>),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CompletionKind {
  Normal,
  Throw,
  Return,
  Break,
  Continue,
}

/// What a loop body's completion means for the loop. See [`Completion::catch_loop`].
#[derive(Debug, PartialEq)]
pub enum LoopControl {
  /// Run the next iteration. Carries the body's value (`empty` after a `continue`).
  Next(OwnedValue),
  /// Leave the loop normally.
  Exit,
  /// Leave the loop and propagate this completion.
  Propagate(Completion),
}

impl Completion {
  #[inline]
  pub fn normal(value: OwnedValue) -> Self {
    Completion::Normal(value)
  }

  #[inline]
  pub fn empty() -> Self {
    Completion::Normal(OwnedValue::empty())
  }

  #[inline]
  pub fn normal_bool(b: bool) -> Self {
    Completion::Normal(OwnedValue::boolean(b))
  }

  #[inline]
  pub fn throw(value: OwnedValue) -> Self {
    Completion::Throw(value)
  }

  pub fn kind(&self) -> CompletionKind {
    match self {
      Completion::Normal(_) => CompletionKind::Normal,
      Completion::Throw(_) => CompletionKind::Throw,
      Completion::Return(_) => CompletionKind::Return,
      Completion::Break(_) => CompletionKind::Break,
      Completion::Continue(_) => CompletionKind::Continue,
    }
  }

  #[inline]
  pub fn is_normal(&self) -> bool {
    matches!(self, Completion::Normal(_))
  }

  #[inline]
  pub fn is_abrupt(&self) -> bool {
    !self.is_normal()
  }

  #[inline]
  pub fn is_throw(&self) -> bool {
    matches!(self, Completion::Throw(_))
  }

  /// Borrows the carried value. `None` for `break`/`continue`.
  pub fn value(&self) -> Option<Value> {
    match self {
      Completion::Normal(v) | Completion::Throw(v) | Completion::Return(v) => Some(v.get()),
      Completion::Break(_) | Completion::Continue(_) => None,
    }
  }

  pub fn is_normal_true(&self) -> bool {
    matches!(self, Completion::Normal(v) if v.get() == Value::TRUE)
  }

  pub fn is_normal_false(&self) -> bool {
    matches!(self, Completion::Normal(v) if v.get() == Value::FALSE)
  }

  pub fn is_normal_empty(&self) -> bool {
    matches!(self, Completion::Normal(v) if v.get().is_empty())
  }

  /// Splits a normal completion from an abrupt one.
  pub fn into_normal(self) -> Result<OwnedValue, Completion> {
    match self {
      Completion::Normal(value) => Ok(value),
      abrupt => Err(abrupt),
    }
  }

  /// Gives back the carried value's reference.
  pub fn release(self, heap: &mut Heap) {
    match self {
      Completion::Normal(v) | Completion::Throw(v) | Completion::Return(v) => heap.release(v),
      Completion::Break(_) | Completion::Continue(_) => {}
    }
  }

  /// `UpdateEmpty`: replaces the value of `Normal(empty)` with `value`.
  pub fn update_empty(self, heap: &mut Heap, value: Value) -> Result<Self, VmError> {
    match self {
      Completion::Normal(v) if v.get().is_empty() => {
        heap.release(v);
        Ok(Completion::Normal(heap.retain(value)?))
      }
      other => Ok(other),
    }
  }

  /// Converts a `return` reaching a function boundary into the call's normal result.
  pub fn catch_return(self) -> Self {
    match self {
      Completion::Return(value) => Completion::Normal(value),
      other => other,
    }
  }

  /// Interprets a loop body's completion for a loop carrying `labels` (its own label set).
  ///
  /// Unlabelled `break`/`continue` always target the innermost loop; labelled ones only if the
  /// label belongs to this loop.
  pub fn catch_loop(self, labels: &[&str]) -> LoopControl {
    let targets_this_loop =
      |label: &Option<String>| label.as_deref().map_or(true, |label| labels.contains(&label));
    match self {
      Completion::Normal(value) => LoopControl::Next(value),
      Completion::Continue(label) if targets_this_loop(&label) => {
        LoopControl::Next(OwnedValue::empty())
      }
      Completion::Break(label) if targets_this_loop(&label) => LoopControl::Exit,
      other => LoopControl::Propagate(other),
    }
  }
}

/// Unwraps the normal value of a `Result<Completion, VmError>`, returning from the enclosing
/// function on an engine fault (`Err`) or an abrupt completion (`Ok(abrupt)`).
///
/// A second argument is a block to run before returning an abrupt completion, typically releasing
/// values owned by the caller:
///
/// ```ignore
/// let value = try_normal!(vm.get(scope, obj, key), { scope.release(other) });
/// ```
#[macro_export]
macro_rules! try_normal {
  ($completion:expr) => {
    match $completion? {
      $crate::Completion::Normal(value) => value,
      abrupt => return ::core::result::Result::Ok(abrupt),
    }
  };
  ($completion:expr, $cleanup:block) => {
    match $completion? {
      $crate::Completion::Normal(value) => value,
      abrupt => {
        $cleanup;
        return ::core::result::Result::Ok(abrupt);
      }
    }
  };
}
