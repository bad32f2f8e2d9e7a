use crate::class::ObjectKind;
use crate::gc::{Trace, Tracer};
use crate::property::PropertyEntry;
use crate::string::JsString;
use crate::value::inline_integer;
use crate::{
  GcNumber, GcObject, GcString, HeapId, HeapRef, Owned, OwnedValue, RootId, Value, VmError,
};
use core::mem;
use std::ops::{Deref, DerefMut};

/// Hard upper bound for `[[Prototype]]` chain traversals.
///
/// [`Heap::object_set_prototype`] rejects cycles, but
/// [`Heap::object_set_prototype_unchecked`] can still build one; every walk stops here.
pub const MAX_PROTOTYPE_CHAIN: usize = 10_000;

/// Bytes charged for every cell on top of its payload: the slot that holds it.
pub(crate) const CELL_HEADER_BYTES: usize = mem::size_of::<Slot>();

/// Heap configuration and memory limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapLimits {
  /// Hard memory limit for live heap cells, in bytes.
  ///
  /// An allocation that would exceed it first runs a full collection, then fails with
  /// [`VmError::OutOfMemory`] if it still does not fit.
  pub max_bytes: usize,
}

impl HeapLimits {
  pub fn new(max_bytes: usize) -> Self {
    Self { max_bytes }
  }
}

impl Default for HeapLimits {
  fn default() -> Self {
    Self::new(64 * 1024 * 1024)
  }
}

/// A non-moving heap of reference-counted cells, backed up by a mark/sweep collector for cycles.
///
/// Cells live in a `Vec` of slots. Handles store the slot index and a per-slot generation, so they
/// stay stable across `Vec` reallocations and stale handles are detected when slots are reused.
///
/// Each cell keeps two counts:
/// - `external_refs`: [`Owned`] handles, [`Scope`] stack roots and persistent roots;
/// - `internal_refs`: edges from other cells (prototype links, property keys and values, internal
///   slot values).
///
/// A cell is freed as soon as both counts reach zero, and freeing it drops its outgoing edges,
/// which may free more cells. Cells kept alive only by a cycle of edges are reclaimed by
/// [`Heap::collect_garbage`], whose roots are exactly the cells with `external_refs > 0`.
pub struct Heap {
  limits: HeapLimits,

  /// Bytes used by live cells.
  pub(crate) used_bytes: usize,
  pub(crate) gc_runs: u64,

  pub(crate) slots: Vec<Slot>,
  pub(crate) marks: Vec<u8>,
  pub(crate) free_list: Vec<u32>,

  root_stack: Vec<Value>,
  persistent_roots: Vec<Option<Value>>,
  persistent_roots_free: Vec<u32>,
}

#[derive(Debug)]
pub(crate) struct Slot {
  pub(crate) generation: u32,
  pub(crate) value: Option<HeapCell>,
  pub(crate) bytes: usize,
  pub(crate) external_refs: u32,
  pub(crate) internal_refs: u32,
}

impl Slot {
  fn new() -> Self {
    Self {
      generation: 0,
      value: None,
      bytes: 0,
      external_refs: 0,
      internal_refs: 0,
    }
  }

  #[inline]
  pub(crate) fn ref_count(&self) -> u32 {
    self.external_refs.saturating_add(self.internal_refs)
  }
}

#[derive(Debug)]
pub(crate) enum HeapCell {
  Number(f64),
  String(JsString),
  Object(HeapObject),
}

/// Shared header and property table of every object.
#[derive(Debug)]
pub(crate) struct HeapObject {
  pub(crate) prototype: Option<GcObject>,
  pub(crate) extensible: bool,
  pub(crate) kind: ObjectKind,
  pub(crate) properties: Box<[PropertyEntry]>,
}

impl HeapObject {
  pub(crate) fn heap_size_bytes_for_property_count(count: usize) -> usize {
    CELL_HEADER_BYTES
      .saturating_add(mem::size_of::<HeapObject>())
      .saturating_add(count.saturating_mul(mem::size_of::<PropertyEntry>()))
  }
}

impl Heap {
  pub fn new(limits: HeapLimits) -> Self {
    Self {
      limits,
      used_bytes: 0,
      gc_runs: 0,
      slots: Vec::new(),
      marks: Vec::new(),
      free_list: Vec::new(),
      root_stack: Vec::new(),
      persistent_roots: Vec::new(),
      persistent_roots_free: Vec::new(),
    }
  }

  pub fn limits(&self) -> HeapLimits {
    self.limits
  }

  /// Enters a stack-rooting scope.
  ///
  /// Stack roots pushed via [`Scope::push_root`] are released when the returned `Scope` is dropped.
  pub fn scope(&mut self) -> Scope<'_> {
    let root_stack_len_at_entry = self.root_stack.len();
    Scope {
      heap: self,
      root_stack_len_at_entry,
    }
  }

  /// Bytes currently used by live cells.
  pub fn used_bytes(&self) -> usize {
    self.used_bytes
  }

  /// Total number of collection cycles that have run.
  pub fn gc_runs(&self) -> u64 {
    self.gc_runs
  }

  /// Number of live cells.
  pub fn live_cells(&self) -> usize {
    self.slots.len() - self.free_list.len()
  }

  /// Combined external and internal reference count of a live cell. `None` for inline values and
  /// stale handles.
  pub fn ref_count<T: HeapRef>(&self, handle: T) -> Option<u32> {
    let idx = self.validate(handle.heap_id()?)?;
    Some(self.slots[idx].ref_count())
  }

  pub fn is_valid_object(&self, obj: GcObject) -> bool {
    matches!(self.get_cell(obj.0), Ok(HeapCell::Object(_)))
  }

  pub fn is_valid_string(&self, s: GcString) -> bool {
    matches!(self.get_cell(s.0), Ok(HeapCell::String(_)))
  }

  pub fn is_valid_number(&self, n: GcNumber) -> bool {
    matches!(self.get_cell(n.0), Ok(HeapCell::Number(_)))
  }

  /// Whether `value` is inline or references a live cell of the right kind.
  pub fn is_valid_value(&self, value: Value) -> bool {
    match value {
      Value::Number(n) => self.is_valid_number(n),
      Value::String(s) => self.is_valid_string(s),
      Value::Object(obj) => self.is_valid_object(obj),
      Value::Simple(_) | Value::Integer(_) | Value::MagicString(_) => true,
    }
  }

  /// Takes another counted reference to a live value.
  pub fn retain<T: HeapRef>(&mut self, handle: T) -> Result<Owned<T>, VmError> {
    if let Some(id) = handle.heap_id() {
      self.retain_id(id)?;
    }
    Ok(Owned::adopt(handle))
  }

  /// Gives back a counted reference. Frees the cell (and, transitively, whatever only it kept
  /// alive) once nothing else references it.
  pub fn release<T: HeapRef>(&mut self, owned: Owned<T>) {
    if let Some(id) = owned.into_raw().heap_id() {
      self.release_id(id);
    }
  }

  pub(crate) fn retain_id(&mut self, id: HeapId) -> Result<(), VmError> {
    let idx = self.validate(id).ok_or(VmError::InvalidHandle)?;
    let slot = &mut self.slots[idx];
    slot.external_refs = slot
      .external_refs
      .checked_add(1)
      .ok_or(VmError::RefCountOverflow)?;
    Ok(())
  }

  pub(crate) fn release_id(&mut self, id: HeapId) {
    let Some(idx) = self.validate(id) else {
      tracing::warn!(?id, "released a stale handle");
      return;
    };
    let slot = &mut self.slots[idx];
    debug_assert!(slot.external_refs > 0, "external reference underflow: {id:?}");
    slot.external_refs = slot.external_refs.saturating_sub(1);
    if slot.ref_count() == 0 {
      self.free_cascade(idx);
    }
  }

  /// Records a new heap edge to `value`'s cell.
  pub(crate) fn add_edge(&mut self, value: Value) -> Result<(), VmError> {
    let Some(id) = value.heap_id() else {
      return Ok(());
    };
    let idx = self.validate(id).ok_or(VmError::InvalidHandle)?;
    let slot = &mut self.slots[idx];
    slot.internal_refs = slot
      .internal_refs
      .checked_add(1)
      .ok_or(VmError::RefCountOverflow)?;
    Ok(())
  }

  /// Drops a heap edge to `value`'s cell, freeing it if that was the last reference.
  pub(crate) fn drop_edge(&mut self, value: Value) {
    let Some(idx) = value.heap_id().and_then(|id| self.validate(id)) else {
      return;
    };
    let slot = &mut self.slots[idx];
    debug_assert!(slot.internal_refs > 0, "internal reference underflow");
    slot.internal_refs = slot.internal_refs.saturating_sub(1);
    if slot.ref_count() == 0 {
      self.free_cascade(idx);
    }
  }

  /// Frees the cell at `idx` and every cell whose count drops to zero as a consequence.
  ///
  /// Iterative so that long chains (e.g. a linked list of objects) cannot exhaust the native stack.
  fn free_cascade(&mut self, idx: usize) {
    let mut pending = vec![idx];
    let mut freed = 0usize;
    while let Some(idx) = pending.pop() {
      let Some(cell) = self.free_slot(idx) else {
        continue;
      };
      freed += 1;
      let mut tracer = Tracer::new();
      cell.trace(&mut tracer);
      for id in tracer.into_edges() {
        let Some(target) = self.validate(id) else {
          continue;
        };
        let slot = &mut self.slots[target];
        slot.internal_refs = slot.internal_refs.saturating_sub(1);
        if slot.ref_count() == 0 {
          pending.push(target);
        }
      }
    }
    tracing::trace!(freed, "reference counts released cells");
  }

  /// Empties slot `idx`, returning its cell so the caller can drop the cell's edges.
  pub(crate) fn free_slot(&mut self, idx: usize) -> Option<HeapCell> {
    let slot = &mut self.slots[idx];
    let cell = slot.value.take()?;
    self.used_bytes = self.used_bytes.saturating_sub(slot.bytes);
    slot.bytes = 0;
    slot.external_refs = 0;
    slot.internal_refs = 0;
    slot.generation = slot.generation.wrapping_add(1);
    self.free_list.push(idx as u32);
    Some(cell)
  }

  /// Adds a persistent root, keeping `value` alive until the returned [`RootId`] is removed.
  pub fn add_root(&mut self, value: Value) -> Result<RootId, VmError> {
    if let Some(id) = value.heap_id() {
      self.retain_id(id)?;
    }
    let idx = match self.persistent_roots_free.pop() {
      Some(idx) => idx as usize,
      None => {
        self.persistent_roots.push(None);
        self.persistent_roots.len() - 1
      }
    };
    self.persistent_roots[idx] = Some(value);
    Ok(RootId(idx as u32))
  }

  /// Returns the current value of a persistent root.
  pub fn get_root(&self, id: RootId) -> Option<Value> {
    self
      .persistent_roots
      .get(id.0 as usize)
      .and_then(|slot| *slot)
  }

  /// Replaces a persistent root's value.
  pub fn set_root(&mut self, id: RootId, value: Value) -> Result<(), VmError> {
    let Some(old) = self.get_root(id) else {
      tracing::warn!(?id, "set_root on a removed root");
      return Ok(());
    };
    if let Some(new_id) = value.heap_id() {
      self.retain_id(new_id)?;
    }
    self.persistent_roots[id.0 as usize] = Some(value);
    if let Some(old_id) = old.heap_id() {
      self.release_id(old_id);
    }
    Ok(())
  }

  /// Removes a persistent root previously created by [`Heap::add_root`].
  pub fn remove_root(&mut self, id: RootId) {
    let Some(value) = self
      .persistent_roots
      .get_mut(id.0 as usize)
      .and_then(Option::take)
    else {
      tracing::warn!(?id, "removed a root twice");
      return;
    };
    self.persistent_roots_free.push(id.0);
    if let Some(heap_id) = value.heap_id() {
      self.release_id(heap_id);
    }
  }

  /// Allocates a string, reusing no storage: identical contents still produce distinct cells.
  pub fn alloc_string(&mut self, text: &str) -> Result<Owned<GcString>, VmError> {
    self.alloc_js_string(JsString::from_text(text))
  }

  pub fn alloc_string_from_code_units(
    &mut self,
    units: &[u16],
  ) -> Result<Owned<GcString>, VmError> {
    self.alloc_js_string(JsString::from_code_units(units))
  }

  fn alloc_js_string(&mut self, s: JsString) -> Result<Owned<GcString>, VmError> {
    let new_bytes = CELL_HEADER_BYTES.saturating_add(s.heap_size_bytes());
    self.ensure_can_allocate(new_bytes)?;
    let id = self.alloc_unchecked(HeapCell::String(s), new_bytes);
    Ok(Owned::adopt(GcString(id)))
  }

  /// Allocates a string value, preferring a [`MagicString`](crate::MagicString) when the contents
  /// match one.
  pub fn alloc_string_value(&mut self, text: &str) -> Result<OwnedValue, VmError> {
    if let Some(magic) = crate::MagicString::lookup(text) {
      return Ok(OwnedValue::magic(magic));
    }
    Ok(self.alloc_string(text)?.into_value())
  }

  /// Same as [`Heap::alloc_string_value`] for UTF-16 contents.
  pub fn alloc_string_value_from_code_units(
    &mut self,
    units: &[u16],
  ) -> Result<OwnedValue, VmError> {
    if let Some(magic) = crate::MagicString::lookup_code_units(units) {
      return Ok(OwnedValue::magic(magic));
    }
    Ok(self.alloc_string_from_code_units(units)?.into_value())
  }

  /// Produces a number value, boxing it only when it has no inline representation.
  pub fn alloc_number(&mut self, n: f64) -> Result<OwnedValue, VmError> {
    if let Some(i) = inline_integer(n) {
      return Ok(OwnedValue::integer(i));
    }
    let new_bytes = CELL_HEADER_BYTES + mem::size_of::<f64>();
    self.ensure_can_allocate(new_bytes)?;
    let id = self.alloc_unchecked(HeapCell::Number(n), new_bytes);
    Ok(Owned::adopt(GcNumber(id)).into_value())
  }

  /// Allocates an object with the given prototype and class-specific state.
  pub fn alloc_object(
    &mut self,
    prototype: Option<GcObject>,
    kind: ObjectKind,
  ) -> Result<Owned<GcObject>, VmError> {
    if let Some(proto) = prototype {
      self.get_object(proto)?;
    }
    kind.validate(self)?;

    let new_bytes = HeapObject::heap_size_bytes_for_property_count(0);
    let mut pinned = Vec::with_capacity(2);
    pinned.extend(prototype.map(Value::Object));
    pinned.extend(kind.referenced_value());
    let mut scope = self.reserve(new_bytes, &pinned)?;

    for &value in &pinned {
      scope.add_edge(value)?;
    }
    let id = scope.alloc_unchecked(
      HeapCell::Object(HeapObject {
        prototype,
        extensible: true,
        kind,
        properties: Box::default(),
      }),
      new_bytes,
    );
    Ok(Owned::adopt(GcObject(id)))
  }

  /// Runs `init` on a freshly allocated cell, releasing the cell if `init` fails.
  pub fn initialize<T: HeapRef>(
    &mut self,
    owned: Owned<T>,
    init: impl FnOnce(&mut Heap, T) -> Result<(), VmError>,
  ) -> Result<Owned<T>, VmError> {
    match init(self, owned.get()) {
      Ok(()) => Ok(owned),
      Err(err) => {
        self.release(owned);
        Err(err)
      }
    }
  }

  /// Allocates a plain `Object`-class object.
  pub fn alloc_ordinary_object(
    &mut self,
    prototype: Option<GcObject>,
  ) -> Result<Owned<GcObject>, VmError> {
    self.alloc_object(prototype, ObjectKind::Ordinary)
  }

  pub fn get_string(&self, s: GcString) -> Result<&JsString, VmError> {
    match self.get_cell(s.0)? {
      HeapCell::String(s) => Ok(s),
      _ => Err(VmError::InvalidHandle),
    }
  }

  pub fn get_number(&self, n: GcNumber) -> Result<f64, VmError> {
    match self.get_cell(n.0)? {
      HeapCell::Number(n) => Ok(*n),
      _ => Err(VmError::InvalidHandle),
    }
  }

  pub(crate) fn get_object(&self, obj: GcObject) -> Result<&HeapObject, VmError> {
    match self.get_cell(obj.0)? {
      HeapCell::Object(obj) => Ok(obj),
      _ => Err(VmError::InvalidHandle),
    }
  }

  pub(crate) fn get_object_mut(&mut self, obj: GcObject) -> Result<&mut HeapObject, VmError> {
    let idx = self.validate(obj.0).ok_or(VmError::InvalidHandle)?;
    match self.slots[idx].value.as_mut() {
      Some(HeapCell::Object(obj)) => Ok(obj),
      _ => Err(VmError::InvalidHandle),
    }
  }

  fn get_cell(&self, id: HeapId) -> Result<&HeapCell, VmError> {
    let idx = self.validate(id).ok_or(VmError::InvalidHandle)?;
    self.slots[idx].value.as_ref().ok_or(VmError::InvalidHandle)
  }

  pub(crate) fn validate(&self, id: HeapId) -> Option<usize> {
    let idx = id.index() as usize;
    let slot = self.slots.get(idx)?;
    if slot.generation != id.generation() || slot.value.is_none() {
      return None;
    }
    Some(idx)
  }

  /// Makes room for `new_bytes` more bytes, collecting garbage first if the limit would be
  /// exceeded.
  ///
  /// Every value the caller still needs must be rooted: the collection frees anything not
  /// reachable from a cell with external references.
  pub(crate) fn ensure_can_allocate(&mut self, new_bytes: usize) -> Result<(), VmError> {
    if self.used_bytes.saturating_add(new_bytes) <= self.limits.max_bytes {
      return Ok(());
    }
    tracing::debug!(
      used_bytes = self.used_bytes,
      new_bytes,
      max_bytes = self.limits.max_bytes,
      "allocation exceeds heap limit; collecting"
    );
    self.collect_garbage();
    if self.used_bytes.saturating_add(new_bytes) > self.limits.max_bytes {
      tracing::debug!(
        used_bytes = self.used_bytes,
        new_bytes,
        "out of memory after collection"
      );
      return Err(VmError::OutOfMemory);
    }
    Ok(())
  }

  /// Roots `pinned` in a new scope and makes room for `new_bytes`. The caller finishes its
  /// mutation through the returned scope so the pinned values stay alive until it is done.
  pub(crate) fn reserve(
    &mut self,
    new_bytes: usize,
    pinned: &[Value],
  ) -> Result<Scope<'_>, VmError> {
    let mut scope = self.scope();
    for &value in pinned {
      scope.push_root(value)?;
    }
    scope.ensure_can_allocate(new_bytes)?;
    Ok(scope)
  }

  pub(crate) fn update_slot_bytes(&mut self, idx: usize, new_bytes: usize) {
    let slot = &mut self.slots[idx];
    let old_bytes = slot.bytes;
    if new_bytes >= old_bytes {
      self.used_bytes = self.used_bytes.saturating_add(new_bytes - old_bytes);
    } else {
      self.used_bytes = self.used_bytes.saturating_sub(old_bytes - new_bytes);
    }
    slot.bytes = new_bytes;
  }

  /// Places `cell` in a free slot with a single external reference (owned by the caller).
  fn alloc_unchecked(&mut self, cell: HeapCell, new_bytes: usize) -> HeapId {
    let idx = match self.free_list.pop() {
      Some(idx) => idx as usize,
      None => {
        let idx = self.slots.len();
        self.slots.push(Slot::new());
        self.marks.push(0);
        idx
      }
    };

    let slot = &mut self.slots[idx];
    debug_assert!(slot.value.is_none(), "free list returned an occupied slot");
    slot.value = Some(cell);
    slot.bytes = new_bytes;
    slot.external_refs = 1;
    slot.internal_refs = 0;
    self.used_bytes = self.used_bytes.saturating_add(new_bytes);

    HeapId::from_parts(idx as u32, slot.generation)
  }
}

/// A stack-rooting scope.
///
/// Every root pushed with [`Scope::push_root`] holds an external reference that is released when
/// the scope is dropped. The scope dereferences to the [`Heap`] so all heap operations remain
/// available while it is alive.
pub struct Scope<'a> {
  heap: &'a mut Heap,
  root_stack_len_at_entry: usize,
}

impl Drop for Scope<'_> {
  fn drop(&mut self) {
    let popped: Vec<Value> = self
      .heap
      .root_stack
      .drain(self.root_stack_len_at_entry..)
      .collect();
    for value in popped.into_iter().rev() {
      if let Some(id) = value.heap_id() {
        self.heap.release_id(id);
      }
    }
  }
}

impl<'a> Scope<'a> {
  /// Roots `value` until this scope is dropped.
  ///
  /// Returns the same value so call sites can write `let v = scope.push_root(v)?;`.
  pub fn push_root(&mut self, value: Value) -> Result<Value, VmError> {
    if let Some(id) = value.heap_id() {
      self.heap.retain_id(id)?;
    }
    self.heap.root_stack.push(value);
    Ok(value)
  }

  /// Creates a nested child scope that borrows the same heap.
  pub fn reborrow(&mut self) -> Scope<'_> {
    self.heap.scope()
  }

  pub fn heap(&self) -> &Heap {
    self.heap
  }

  pub fn heap_mut(&mut self) -> &mut Heap {
    self.heap
  }
}

impl Deref for Scope<'_> {
  type Target = Heap;

  fn deref(&self) -> &Heap {
    self.heap
  }
}

impl DerefMut for Scope<'_> {
  fn deref_mut(&mut self) -> &mut Heap {
    self.heap
  }
}
