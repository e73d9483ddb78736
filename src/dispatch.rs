//! The per-type dispatcher and the payload it communicates through.
//!
//! A [`SmallPtr`](crate::SmallPtr) stores exactly one [`Dispatch`] next to its
//! buffer. That single function implements every storage operation for the
//! concrete type that was placed into the container; the variant of the
//! [`Payload`] passed to it selects the operation, and results are written back
//! into the same variant.

use core::marker::PhantomData;
use core::ptr;

/// Operation tag plus its in/out parameters.
pub(crate) enum Payload<T: ?Sized> {
    /// Produce a shared pointer to the stored value.
    GetConst {
        slot: *const u8,
        value: Option<*const T>,
    },
    /// Produce a unique pointer to the stored value.
    GetMutable {
        slot: *mut u8,
        value: Option<*mut T>,
    },
    /// Move the value (or its heap handle) from one buffer into another.
    ///
    /// After the call `from` is logically uninitialized.
    RelocateTo { from: *mut u8, to: *mut u8 },
    /// Report whether the value lives on the heap.
    ReportsHeap { heap: bool },
    /// Run the destructor and release the heap allocation, if any.
    Destroy { slot: *mut u8 },
}

/// Type-erased storage operations for one concrete stored type.
///
/// The function itself takes an untyped pointer to a [`Payload<T>`]; only the
/// marker remembers `T`, which keeps `Dispatch<T>` (and the container holding
/// it) covariant in `T`.
///
/// # Safety
///
/// Every slot pointer handed to a dispatcher must be the buffer of a container
/// whose live value was placed there by the storage policy this dispatcher
/// belongs to. `RelocateTo::to` must point to an unoccupied buffer.
pub(crate) struct Dispatch<T: ?Sized> {
    raw: unsafe fn(*mut ()),
    _marker: PhantomData<fn() -> *const T>,
}

impl<T: ?Sized> Dispatch<T> {
    /// # Safety
    ///
    /// `raw` must treat its argument as a `&mut Payload<T>`.
    #[inline]
    pub(crate) const unsafe fn from_raw(raw: unsafe fn(*mut ())) -> Self {
        Dispatch {
            raw,
            _marker: PhantomData,
        }
    }

    #[inline]
    unsafe fn call(self, payload: &mut Payload<T>) {
        (self.raw)(ptr::from_mut(payload).cast());
    }
}

impl<T: ?Sized> Clone for Dispatch<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Dispatch<T> {}

/// Calls `dispatch` for a shared pointer to the value held in `slot`.
///
/// # Safety
///
/// See [`Dispatch`].
#[inline]
pub(crate) unsafe fn get_const<T: ?Sized>(dispatch: Dispatch<T>, slot: *const u8) -> *const T {
    let mut payload = Payload::GetConst { slot, value: None };
    dispatch.call(&mut payload);
    match payload {
        Payload::GetConst {
            value: Some(value), ..
        } => value,
        _ => unreachable!("dispatcher did not answer GetConst"),
    }
}

/// Calls `dispatch` for a unique pointer to the value held in `slot`.
///
/// # Safety
///
/// See [`Dispatch`].
#[inline]
pub(crate) unsafe fn get_mutable<T: ?Sized>(dispatch: Dispatch<T>, slot: *mut u8) -> *mut T {
    let mut payload = Payload::GetMutable { slot, value: None };
    dispatch.call(&mut payload);
    match payload {
        Payload::GetMutable {
            value: Some(value), ..
        } => value,
        _ => unreachable!("dispatcher did not answer GetMutable"),
    }
}

/// Moves the value held in `from` into the unoccupied buffer `to`.
///
/// # Safety
///
/// See [`Dispatch`]. `from` holds no value afterwards.
#[inline]
pub(crate) unsafe fn relocate<T: ?Sized>(dispatch: Dispatch<T>, from: *mut u8, to: *mut u8) {
    debug_assert!(from != to, "relocating a value onto itself");
    dispatch.call(&mut Payload::RelocateTo { from, to });
}

/// Whether the values `dispatch` manages live on the heap.
#[inline]
pub(crate) fn reports_heap<T: ?Sized>(dispatch: Dispatch<T>) -> bool {
    let mut payload = Payload::ReportsHeap { heap: false };
    // SAFETY: ReportsHeap never touches a buffer.
    unsafe { dispatch.call(&mut payload) };
    match payload {
        Payload::ReportsHeap { heap } => heap,
        _ => unreachable!("dispatcher did not answer ReportsHeap"),
    }
}

/// Drops the value held in `slot` and frees its allocation, if any.
///
/// # Safety
///
/// See [`Dispatch`]. The value in `slot` must not be used afterwards.
#[inline]
pub(crate) unsafe fn destroy<T: ?Sized>(dispatch: Dispatch<T>, slot: *mut u8) {
    dispatch.call(&mut Payload::Destroy { slot });
}
