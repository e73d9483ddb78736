use core::mem::{self, MaybeUninit};
use core::ptr;

/// Inline storage of a [`SmallPtr`](crate::SmallPtr).
///
/// `N` bytes, aligned to a pointer. The buffer always has room for two
/// pointers, so a heap handle (thin or fat) fits even when `N` is tiny.
#[repr(C)]
#[allow(dead_code)]
pub(crate) union Buffer<const N: usize> {
    bytes: [MaybeUninit<u8>; N],
    handle: [MaybeUninit<usize>; 2],
}

impl<const N: usize> Buffer<N> {
    /// Number of bytes a value may occupy inline.
    pub(crate) const CAPACITY: usize = N;

    /// Alignment every inline value must satisfy.
    pub(crate) const ALIGN: usize = mem::align_of::<Self>();

    #[inline]
    pub(crate) const fn uninit() -> Self {
        Buffer {
            handle: [MaybeUninit::uninit(); 2],
        }
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *const u8 {
        ptr::from_ref(self).cast()
    }

    #[inline]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        ptr::from_mut(self).cast()
    }
}
