//! Storage policies: how one concrete type is kept in a container's buffer.
//!
//! Each policy has a `dispatch` function that it hands out as a [`Dispatch`].
//! The container picks the policy once, when a value is placed, and from then
//! on only talks to the value through that function.

use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;

use crate::buffer::Buffer;
use crate::dispatch::{Dispatch, Payload};
use crate::interface::Interface;

/// Compile-time placement rule for a concrete type `D` and a buffer of `N` bytes.
pub(crate) struct Placement<D, const N: usize>(PhantomData<D>);

impl<D, const N: usize> Placement<D, N> {
    /// Whether `D` is stored inside the buffer rather than on the heap.
    pub(crate) const INLINE: bool =
        mem::size_of::<D>() <= Buffer::<N>::CAPACITY && mem::align_of::<D>() <= Buffer::<N>::ALIGN;
}

/// `D` lives inside the buffer.
pub(crate) struct Inline<D>(PhantomData<D>);

impl<D> Inline<D> {
    /// Moves `value` into `slot` and returns the dispatcher that owns it from now on.
    ///
    /// # Safety
    ///
    /// `slot` must be an unoccupied buffer that satisfies [`Placement::INLINE`] for `D`.
    pub(crate) unsafe fn store<T>(slot: *mut u8, value: D) -> Dispatch<T>
    where
        T: ?Sized + Interface<D>,
    {
        debug_assert_eq!(slot.align_offset(mem::align_of::<D>()), 0);
        slot.cast::<D>().write(value);
        Dispatch::from_raw(Self::dispatch::<T>)
    }

    unsafe fn dispatch<T>(payload: *mut ())
    where
        T: ?Sized + Interface<D>,
    {
        match &mut *payload.cast::<Payload<T>>() {
            Payload::GetConst { slot, value } => {
                *value = Some(T::upcast(slot.cast::<D>().cast_mut()).cast_const());
            }
            Payload::GetMutable { slot, value } => {
                *value = Some(T::upcast(slot.cast::<D>()));
            }
            Payload::RelocateTo { from, to } => {
                // Construct the new instance, the source is left without a value.
                ptr::copy_nonoverlapping(from.cast::<D>().cast_const(), to.cast::<D>(), 1);
            }
            Payload::ReportsHeap { heap } => *heap = false,
            Payload::Destroy { slot } => ptr::drop_in_place(slot.cast::<D>()),
        }
    }
}

/// `D` lives in its own allocation, the buffer holds a thin handle to it.
pub(crate) struct Heap<D>(PhantomData<D>);

impl<D> Heap<D> {
    /// # Safety
    ///
    /// `slot` must be an unoccupied buffer.
    pub(crate) unsafe fn store<T>(slot: *mut u8, value: Box<D>) -> Dispatch<T>
    where
        T: ?Sized + Interface<D>,
    {
        slot.cast::<NonNull<D>>().write(NonNull::from(Box::leak(value)));
        Dispatch::from_raw(Self::dispatch::<T>)
    }

    unsafe fn handle(slot: *const u8) -> NonNull<D> {
        slot.cast::<NonNull<D>>().read()
    }

    unsafe fn dispatch<T>(payload: *mut ())
    where
        T: ?Sized + Interface<D>,
    {
        match &mut *payload.cast::<Payload<T>>() {
            Payload::GetConst { slot, value } => {
                *value = Some(T::upcast(Self::handle(*slot).as_ptr()).cast_const());
            }
            Payload::GetMutable { slot, value } => {
                *value = Some(T::upcast(Self::handle(*slot).as_ptr()));
            }
            Payload::RelocateTo { from, to } => {
                to.cast::<NonNull<D>>().write(Self::handle(*from));
            }
            Payload::ReportsHeap { heap } => *heap = true,
            Payload::Destroy { slot } => drop(Box::from_raw(Self::handle(*slot).as_ptr())),
        }
    }
}

/// A `Box<T>` handed over by the caller. Only `T` is known, so the value can
/// never be relocated into a buffer; the buffer holds the (possibly fat) handle.
pub(crate) struct Adopted<T: ?Sized>(PhantomData<T>);

impl<T: ?Sized> Adopted<T> {
    /// # Safety
    ///
    /// `slot` must be an unoccupied buffer.
    pub(crate) unsafe fn store<const N: usize>(slot: *mut u8, value: Box<T>) -> Dispatch<T> {
        debug_assert!(mem::size_of::<NonNull<T>>() <= mem::size_of::<Buffer<N>>());
        slot.cast::<NonNull<T>>().write(NonNull::from(Box::leak(value)));
        Dispatch::from_raw(Self::dispatch)
    }

    unsafe fn handle(slot: *const u8) -> NonNull<T> {
        slot.cast::<NonNull<T>>().read()
    }

    unsafe fn dispatch(payload: *mut ()) {
        match &mut *payload.cast::<Payload<T>>() {
            Payload::GetConst { slot, value } => {
                *value = Some(Self::handle(*slot).as_ptr().cast_const());
            }
            Payload::GetMutable { slot, value } => {
                *value = Some(Self::handle(*slot).as_ptr());
            }
            Payload::RelocateTo { from, to } => {
                to.cast::<NonNull<T>>().write(Self::handle(*from));
            }
            Payload::ReportsHeap { heap } => *heap = true,
            Payload::Destroy { slot } => drop(Box::from_raw(Self::handle(*slot).as_ptr())),
        }
    }
}
