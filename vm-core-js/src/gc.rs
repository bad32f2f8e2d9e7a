//! Edge tracing and the cycle collector.

use crate::heap::{HeapCell, HeapObject};
use crate::property::PropertyKind;
use crate::{GcObject, Heap, HeapId, HeapRef, Value};

/// Reports the outgoing heap edges of a cell.
///
/// The edges reported here must be exactly the edges counted in the targets' internal reference
/// counts: freeing a cell decrements one count per reported edge.
pub(crate) trait Trace {
  fn trace(&self, tracer: &mut Tracer);
}

#[derive(Default)]
pub(crate) struct Tracer {
  edges: Vec<HeapId>,
}

impl Tracer {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn trace_value(&mut self, value: Value) {
    if let Some(id) = value.heap_id() {
      self.edges.push(id);
    }
  }

  #[inline]
  pub(crate) fn trace_object(&mut self, obj: GcObject) {
    self.edges.push(obj.0);
  }

  pub(crate) fn into_edges(self) -> Vec<HeapId> {
    self.edges
  }

  fn drain_into(&mut self, worklist: &mut Vec<HeapId>) {
    worklist.append(&mut self.edges);
  }
}

impl Trace for HeapCell {
  fn trace(&self, tracer: &mut Tracer) {
    match self {
      HeapCell::Number(_) | HeapCell::String(_) => {}
      HeapCell::Object(obj) => obj.trace(tracer),
    }
  }
}

impl Trace for HeapObject {
  fn trace(&self, tracer: &mut Tracer) {
    if let Some(proto) = self.prototype {
      tracer.trace_object(proto);
    }
    self.kind.trace(tracer);
    for entry in self.properties.iter() {
      tracer.trace_value(entry.key.as_value());
      match entry.desc.kind {
        PropertyKind::Data { value, .. } => tracer.trace_value(value),
        PropertyKind::Accessor { get, set } => {
          tracer.trace_value(get);
          tracer.trace_value(set);
        }
      }
    }
  }
}

impl Heap {
  /// Runs a full mark/sweep cycle.
  ///
  /// Marking starts from every cell with external references (owned handles, scope roots and
  /// persistent roots). Unmarked cells are freed and the edges they held on surviving cells are
  /// dropped from those cells' internal counts, so reference counting stays exact afterwards.
  pub fn collect_garbage(&mut self) {
    let _span = tracing::debug_span!("gc", run = self.gc_runs).entered();
    self.gc_runs += 1;
    debug_assert_eq!(self.slots.len(), self.marks.len());

    // Mark.
    let mut worklist: Vec<HeapId> = Vec::new();
    for (idx, slot) in self.slots.iter().enumerate() {
      if slot.value.is_some() && slot.external_refs > 0 {
        worklist.push(HeapId::from_parts(idx as u32, slot.generation));
      }
    }
    let mut tracer = Tracer::new();
    while let Some(id) = worklist.pop() {
      let Some(idx) = self.validate(id) else {
        continue;
      };
      if self.marks[idx] != 0 {
        continue;
      }
      self.marks[idx] = 1;
      if let Some(cell) = self.slots[idx].value.as_ref() {
        cell.trace(&mut tracer);
      }
      tracer.drain_into(&mut worklist);
    }

    // Sweep.
    let bytes_before = self.used_bytes;
    let mut freed = 0usize;
    let mut dropped_edges = Tracer::new();
    for idx in 0..self.slots.len() {
      let marked = self.marks[idx] != 0;
      self.marks[idx] = 0;
      if marked {
        continue;
      }
      if let Some(cell) = self.free_slot(idx) {
        cell.trace(&mut dropped_edges);
        freed += 1;
      }
    }

    // Edges from freed cells into survivors no longer exist.
    for id in dropped_edges.into_edges() {
      let Some(idx) = self.validate(id) else {
        continue;
      };
      let slot = &mut self.slots[idx];
      slot.internal_refs = slot.internal_refs.saturating_sub(1);
      debug_assert!(
        slot.ref_count() > 0,
        "a surviving cell must still be referenced: {id:?}"
      );
    }

    tracing::debug!(
      freed,
      reclaimed_bytes = bytes_before - self.used_bytes,
      live_cells = self.live_cells(),
      "collection finished"
    );
  }
}
