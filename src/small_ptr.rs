use core::cmp::Ordering;
use core::fmt;
use core::hash::{self, Hash};
use core::marker::PhantomData;
use core::ops;
use core::pin::Pin;
use core::ptr;

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;

use crate::buffer::Buffer;
use crate::dispatch::{self, Dispatch};
use crate::interface::Interface;
use crate::probe::Movability;
use crate::storage::{Adopted, Heap, Inline, Placement};

/// Store a value inline or on the heap depending on its size and movability.
///
/// This macro is similar to [`SmallPtr::new`], but it also looks at whether the
/// concrete type is [`Unpin`]. Types that are not (self-referential futures,
/// types holding [`PhantomPinned`](core::marker::PhantomPinned)) may rely on
/// their own address and are therefore always placed on the heap, where moving
/// the container never moves them.
///
/// The decision is made from the type of the expression at the call site. In
/// generic code where the type is not known to be `Unpin`, the value goes to
/// the heap.
///
/// # Example
///
/// ```
/// use smallptr::{small_ptr, SmallPtr};
/// use std::fmt::Debug;
/// use std::marker::PhantomPinned;
///
/// let small: SmallPtr<dyn Debug, 16> = small_ptr!(42u32);
/// assert!(small.uses_stack());
///
/// let pinned: SmallPtr<dyn Debug, 16> = small_ptr!(PhantomPinned);
/// assert!(pinned.uses_heap());
/// ```
#[macro_export]
macro_rules! small_ptr {
    ( $e: expr ) => {{
        #[allow(unused_imports)]
        use $crate::__private::{ViaAddress as _, ViaUnpin as _};
        let val = $e;
        let movability = (&$crate::__private::Probe::of(&val)).movability();
        $crate::SmallPtr::__new_probed(val, movability)
    }};
}

/// Replace the value of a [`SmallPtr`], with the same placement rules as
/// [`small_ptr!`].
///
/// # Example
///
/// ```
/// use smallptr::{emplace, SmallPtr};
/// use std::fmt::Debug;
///
/// let mut value: SmallPtr<dyn Debug, 16> = SmallPtr::new(1u8);
/// emplace!(value, [0u64; 4]);
/// assert!(value.uses_heap());
/// ```
#[macro_export]
macro_rules! emplace {
    ( $ptr: expr, $e: expr ) => {{
        #[allow(unused_imports)]
        use $crate::__private::{ViaAddress as _, ViaUnpin as _};
        let val = $e;
        let movability = (&$crate::__private::Probe::of(&val)).movability();
        ($ptr).__emplace_probed(val, movability)
    }};
}

/// An owning pointer that stores its value inline when it fits in `N` bytes
/// and on the heap otherwise.
///
/// `T` is the interface the value is used through, typically a trait object.
/// Which concrete types can be stored is governed by [`Interface`].
///
/// The container holds a single function pointer besides the buffer. That
/// function knows the concrete type and performs every operation on the value,
/// so nothing but the value itself (or its heap handle) lives in the buffer.
///
/// A `SmallPtr` may be empty. [`get`](SmallPtr::get) returns `None` then, and
/// dereferencing panics.
///
/// Like `Box<T>`, it is covariant in `T`, so a `SmallPtr<dyn Trait + 'static>`
/// can be used where a shorter lifetime is expected.
pub struct SmallPtr<T: ?Sized, const N: usize = 64> {
    dispatch: Option<Dispatch<T>>,
    buffer: Buffer<N>,
    _phantom: PhantomData<T>,
}

impl<T: ?Sized, const N: usize> SmallPtr<T, N> {
    /// Creates an empty `SmallPtr`.
    #[inline]
    pub const fn empty() -> SmallPtr<T, N> {
        SmallPtr {
            dispatch: None,
            buffer: Buffer::uninit(),
            _phantom: PhantomData,
        }
    }

    /// Box value on stack or heap depending on its size.
    ///
    /// The value is stored inline when `size_of::<D>() <= N` and its alignment
    /// does not exceed that of a pointer, and on the heap otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use smallptr::SmallPtr;
    ///
    /// let small: SmallPtr<[usize], 32> = SmallPtr::new([0usize; 2]);
    /// let large: SmallPtr<[usize], 32> = SmallPtr::new([1usize; 8]);
    ///
    /// assert_eq!(small.len(), 2);
    /// assert_eq!(large[7], 1);
    ///
    /// assert!(small.uses_stack());
    /// assert!(large.uses_heap());
    /// ```
    pub fn new<D>(val: D) -> SmallPtr<T, N>
    where
        T: Interface<D>,
    {
        let mut result = Self::empty();
        result.place(val);
        result
    }

    /// Constructs the value with `f` and stores it like [`new`](SmallPtr::new).
    pub fn new_with<D, F>(f: F) -> SmallPtr<T, N>
    where
        T: Interface<D>,
        F: FnOnce() -> D,
    {
        Self::new(f())
    }

    /// Stores the value on the heap regardless of its size.
    ///
    /// Use this for values that must keep their address, see also
    /// [`pin`](SmallPtr::pin).
    pub fn new_pinned<D>(val: D) -> SmallPtr<T, N>
    where
        T: Interface<D>,
    {
        let mut result = Self::empty();
        result.place_heap(Box::new(val));
        result
    }

    /// Stores the value on the heap and pins it.
    ///
    /// # Example
    ///
    /// ```
    /// use smallptr::SmallPtr;
    /// use std::future::Future;
    ///
    /// let mut fut: std::pin::Pin<SmallPtr<dyn Future<Output = u8>>> = SmallPtr::pin(async { 3 });
    /// let _: std::pin::Pin<&mut dyn Future<Output = u8>> = fut.as_mut();
    /// ```
    pub fn pin<D>(val: D) -> Pin<SmallPtr<T, N>>
    where
        T: Interface<D>,
    {
        // SAFETY: heap values never move until they are destroyed, and a
        // pinned container cannot be emptied or re-filled without unsafe code.
        unsafe { Pin::new_unchecked(Self::new_pinned(val)) }
    }

    /// Takes ownership of a boxed value. The value stays where it is, so the
    /// result always uses the heap.
    ///
    /// # Example
    ///
    /// ```
    /// use smallptr::SmallPtr;
    ///
    /// let boxed: Box<[u8]> = Box::new([1, 2]);
    /// let adopted: SmallPtr<[u8]> = SmallPtr::from_box(boxed);
    /// assert!(adopted.uses_heap());
    /// ```
    pub fn from_box(boxed: Box<T>) -> SmallPtr<T, N> {
        let mut result = Self::empty();
        result.adopt(boxed);
        result
    }

    #[doc(hidden)]
    pub fn __new_probed<D>(val: D, movability: Movability) -> SmallPtr<T, N>
    where
        T: Interface<D>,
    {
        match movability {
            Movability::Relocatable => Self::new(val),
            Movability::AddressSensitive => Self::new_pinned(val),
        }
    }

    /// Destroys the current value, if any, and stores `val` in its place.
    ///
    /// `val` is fully constructed before the old value is destroyed.
    pub fn emplace<D>(&mut self, val: D)
    where
        T: Interface<D>,
    {
        self.reset();
        self.place(val);
    }

    /// Destroys the current value, if any, then constructs the replacement
    /// with `f`.
    ///
    /// If `f` panics, the container is left empty and the old value has been
    /// destroyed exactly once.
    ///
    /// # Example
    ///
    /// ```
    /// use smallptr::SmallPtr;
    ///
    /// let mut text: SmallPtr<dyn std::fmt::Display, 32> = SmallPtr::new(1u8);
    /// text.emplace_with(|| String::from("two"));
    /// assert_eq!(text.to_string(), "two");
    /// ```
    pub fn emplace_with<D, F>(&mut self, f: F)
    where
        T: Interface<D>,
        F: FnOnce() -> D,
    {
        self.reset();
        let val = f();
        self.place(val);
    }

    /// Like [`emplace_with`](SmallPtr::emplace_with) for a fallible constructor.
    ///
    /// On `Err` the container is left empty and the error is returned as is.
    pub fn try_emplace_with<D, E, F>(&mut self, f: F) -> Result<(), E>
    where
        T: Interface<D>,
        F: FnOnce() -> Result<D, E>,
    {
        self.reset();
        let val = f()?;
        self.place(val);
        Ok(())
    }

    /// Destroys the current value, if any, and stores `val` on the heap.
    pub fn emplace_pinned<D>(&mut self, val: D)
    where
        T: Interface<D>,
    {
        self.reset();
        self.place_heap(Box::new(val));
    }

    #[doc(hidden)]
    pub fn __emplace_probed<D>(&mut self, val: D, movability: Movability)
    where
        T: Interface<D>,
    {
        match movability {
            Movability::Relocatable => self.emplace(val),
            Movability::AddressSensitive => self.emplace_pinned(val),
        }
    }

    /// Destroys the current value. Does nothing if the container is empty.
    pub fn reset(&mut self) {
        // Empty first, so a panicking destructor cannot cause a second drop.
        if let Some(dispatch) = self.dispatch.take() {
            // SAFETY: the dispatcher was installed together with the value.
            unsafe { dispatch::destroy(dispatch, self.buffer.as_mut_ptr()) }
        }
    }

    /// Destroys the current value and takes ownership of `boxed`.
    pub fn reset_with(&mut self, boxed: Box<T>) {
        self.reset();
        self.adopt(boxed);
    }

    /// Moves the value out into a new container, leaving this one empty.
    ///
    /// Inline values are relocated into the new buffer; heap values only hand
    /// over their handle and keep their address.
    ///
    /// # Example
    ///
    /// ```
    /// use smallptr::SmallPtr;
    ///
    /// let mut source: SmallPtr<u32> = SmallPtr::new(7);
    /// let target = source.take();
    /// assert!(source.is_empty());
    /// assert_eq!(*target, 7);
    /// ```
    pub fn take(&mut self) -> SmallPtr<T, N> {
        let mut result = Self::empty();
        result.move_from(self);
        result
    }

    /// Destroys the current value, then moves the value of `source` into this
    /// container. `source` is left empty.
    pub fn move_from(&mut self, source: &mut SmallPtr<T, N>) {
        self.reset();
        if let Some(dispatch) = source.dispatch.take() {
            // SAFETY: `self` was just emptied and `source` held a value placed
            // by `dispatch`, which is now owned by `self`.
            unsafe {
                dispatch::relocate(dispatch, source.buffer.as_mut_ptr(), self.buffer.as_mut_ptr());
            }
            self.dispatch = Some(dispatch);
        }
    }

    /// Exchanges the values of two containers. Each container keeps its own
    /// buffer; inline values are relocated between them.
    pub fn swap(&mut self, other: &mut SmallPtr<T, N>) {
        let mut temp = Self::empty();
        temp.move_from(other);
        other.move_from(self);
        self.move_from(&mut temp);
    }

    /// Returns a reference to the value, or `None` if the container is empty.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: the pointer targets the live value owned by `self`.
        self.as_ptr().map(|ptr| unsafe { &*ptr })
    }

    /// Returns a mutable reference to the value, or `None` if the container is
    /// empty.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        // SAFETY: as in `get`, and `self` is borrowed uniquely.
        self.as_mut_ptr().map(|ptr| unsafe { &mut *ptr })
    }

    /// Raw pointer to the value, or `None` if the container is empty.
    ///
    /// The pointer is invalidated by anything that destroys or moves the value,
    /// including moving an inline container.
    #[inline]
    pub fn as_ptr(&self) -> Option<*const T> {
        let dispatch = self.dispatch?;
        // SAFETY: the buffer holds a value placed by `dispatch`.
        Some(unsafe { dispatch::get_const(dispatch, self.buffer.as_ptr()) })
    }

    /// Mutable raw pointer to the value, or `None` if the container is empty.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> Option<*mut T> {
        let dispatch = self.dispatch?;
        // SAFETY: the buffer holds a value placed by `dispatch`.
        Some(unsafe { dispatch::get_mutable(dispatch, self.buffer.as_mut_ptr()) })
    }

    /// Returns true if the container holds no value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dispatch.is_none()
    }

    /// Returns true if the value is heap-allocated. False when empty.
    #[inline]
    pub fn uses_heap(&self) -> bool {
        self.dispatch.is_some_and(dispatch::reports_heap)
    }

    /// Returns true if the value is stored inline. False when empty.
    #[inline]
    pub fn uses_stack(&self) -> bool {
        self.dispatch.is_some_and(|dispatch| !dispatch::reports_heap(dispatch))
    }

    fn place<D>(&mut self, val: D)
    where
        T: Interface<D>,
    {
        if Placement::<D, N>::INLINE {
            debug_assert!(self.dispatch.is_none());
            // SAFETY: the buffer is unoccupied and `D` satisfies the placement rule.
            self.dispatch = Some(unsafe { Inline::store(self.buffer.as_mut_ptr(), val) });
        } else {
            self.place_heap(Box::new(val));
        }
    }

    fn place_heap<D>(&mut self, val: Box<D>)
    where
        T: Interface<D>,
    {
        debug_assert!(self.dispatch.is_none());
        // SAFETY: the buffer is unoccupied.
        self.dispatch = Some(unsafe { Heap::store(self.buffer.as_mut_ptr(), val) });
    }

    fn adopt(&mut self, boxed: Box<T>) {
        debug_assert!(self.dispatch.is_none());
        // SAFETY: the buffer is unoccupied.
        self.dispatch = Some(unsafe { Adopted::store::<N>(self.buffer.as_mut_ptr(), boxed) });
    }
}

#[cold]
#[track_caller]
fn empty_deref() -> ! {
    panic!("dereferenced an empty SmallPtr")
}

impl<T: ?Sized, const N: usize> ops::Deref for SmallPtr<T, N> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(val) => val,
            None => empty_deref(),
        }
    }
}

impl<T: ?Sized, const N: usize> ops::DerefMut for SmallPtr<T, N> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(val) => val,
            None => empty_deref(),
        }
    }
}

impl<T: ?Sized, const N: usize> ops::Drop for SmallPtr<T, N> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized, const N: usize> Default for SmallPtr<T, N> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized, const N: usize> From<Box<T>> for SmallPtr<T, N> {
    fn from(boxed: Box<T>) -> Self {
        Self::from_box(boxed)
    }
}

impl<T: ?Sized, const N: usize> From<Option<Box<T>>> for SmallPtr<T, N> {
    fn from(boxed: Option<Box<T>>) -> Self {
        boxed.map_or_else(Self::empty, Self::from_box)
    }
}

impl<T: ?Sized + fmt::Debug, const N: usize> fmt::Debug for SmallPtr<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some(val) => fmt::Debug::fmt(val, f),
            None => f.write_str("<empty>"),
        }
    }
}

impl<T: ?Sized, const N: usize> fmt::Pointer for SmallPtr<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.as_ptr() {
            Some(ptr) => fmt::Pointer::fmt(&ptr, f),
            None => fmt::Pointer::fmt(&ptr::null::<u8>(), f),
        }
    }
}

impl<T: ?Sized + PartialEq, const N: usize> PartialEq for SmallPtr<T, N> {
    #[inline]
    fn eq(&self, other: &SmallPtr<T, N>) -> bool {
        PartialEq::eq(&self.get(), &other.get())
    }
}

impl<T: ?Sized + Eq, const N: usize> Eq for SmallPtr<T, N> {}

impl<T: ?Sized + PartialOrd, const N: usize> PartialOrd for SmallPtr<T, N> {
    #[inline]
    fn partial_cmp(&self, other: &SmallPtr<T, N>) -> Option<Ordering> {
        PartialOrd::partial_cmp(&self.get(), &other.get())
    }
}

impl<T: ?Sized + Ord, const N: usize> Ord for SmallPtr<T, N> {
    #[inline]
    fn cmp(&self, other: &SmallPtr<T, N>) -> Ordering {
        Ord::cmp(&self.get(), &other.get())
    }
}

impl<T: ?Sized + Hash, const N: usize> Hash for SmallPtr<T, N> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.get().hash(state);
    }
}

// SAFETY: `Interface` requires that every value a `SmallPtr<T, _>` can hold is
// `Send`/`Sync` whenever `T` is.
unsafe impl<T: ?Sized + Send, const N: usize> Send for SmallPtr<T, N> {}
unsafe impl<T: ?Sized + Sync, const N: usize> Sync for SmallPtr<T, N> {}
