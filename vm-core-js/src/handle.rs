use core::fmt;

/// A stable identifier for a cell in the [`Heap`](crate::Heap).
///
/// This is a packed `{ index: u32, generation: u32 }`. The generation is bumped each time the slot
/// at `index` is freed, so a handle kept past the death of its cell is detected instead of silently
/// aliasing whatever is allocated into the slot next.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HeapId(pub(crate) u64);

impl HeapId {
  pub(crate) fn from_parts(index: u32, generation: u32) -> Self {
    Self((index as u64) | ((generation as u64) << 32))
  }

  /// The slot index within the heap.
  #[inline]
  pub fn index(self) -> u32 {
    self.0 as u32
  }

  /// The generation of the slot when this handle was created.
  #[inline]
  pub fn generation(self) -> u32 {
    (self.0 >> 32) as u32
  }
}

impl fmt::Debug for HeapId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}@{}", self.index(), self.generation())
  }
}

macro_rules! cell_handle {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    #[repr(transparent)]
    pub struct $name(pub(crate) HeapId);

    impl $name {
      /// The underlying [`HeapId`].
      #[inline]
      pub fn id(self) -> HeapId {
        self.0
      }

      /// The slot index within the heap.
      #[inline]
      pub fn index(self) -> u32 {
        self.0.index()
      }
    }
  };
}

cell_handle!(
  /// A heap-allocated object.
  GcObject
);

cell_handle!(
  /// A heap-allocated string whose contents are not one of the built-in
  /// [`MagicString`](crate::MagicString)s.
  GcString
);

cell_handle!(
  /// A heap-allocated number: any `f64` that cannot be stored inline as a 32-bit integer (fractions,
  /// `NaN`, infinities, `-0` and integers outside the `i32` range).
  GcNumber
);

/// Identifier of a persistent root registered with [`Heap::add_root`](crate::Heap::add_root).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct RootId(pub(crate) u32);
