use core::any::Any;
use core::fmt;
use core::future::Future;

/// Binds a concrete type `D` to the interface `Self` a [`SmallPtr`] exposes.
///
/// `SmallPtr<T, N>` can hold a `D` only when `T: Interface<D>`, so storing a
/// type that does not satisfy the interface is rejected at compile time.
///
/// Implementations exist for:
///
/// - every sized `T` holding itself,
/// - `[E]` holding `[E; K]`,
/// - `dyn Any`, `dyn Any + Send`, `dyn Debug`, `dyn Display`,
///   `dyn Future<Output = O>` (optionally `+ Send`), and the `Fn`/`FnMut`
///   traits with zero or one argument.
///
/// For your own traits use the [`interface!`](crate::interface!) macro:
///
/// ```
/// use smallptr::SmallPtr;
///
/// trait Shape {
///     fn area(&self) -> f64;
/// }
///
/// struct Square(f64);
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.0 * self.0
///     }
/// }
///
/// smallptr::interface!(dyn Shape);
///
/// let shape: SmallPtr<dyn Shape, 16> = SmallPtr::new(Square(3.0));
/// assert_eq!(shape.area(), 9.0);
/// assert!(shape.uses_stack());
/// ```
///
/// [`SmallPtr`]: crate::SmallPtr
///
/// # Safety
///
/// `upcast` must return a pointer to the very object it was given: same
/// address, same provenance. An unsizing coercion (`value`) always qualifies.
///
/// If `Self` is `Send` or `Sync`, `D` must be as well.
pub unsafe trait Interface<D> {
    /// Views a pointer to the concrete value as a pointer to the interface.
    fn upcast(value: *mut D) -> *mut Self;
}

/// Implements [`Interface`] for a trait object over all of its implementors.
///
/// The bounds are written as they would appear after `dyn`, without a lifetime:
///
/// ```
/// trait Animal {
///     fn speak(&self) -> String;
/// }
///
/// smallptr::interface!(dyn Animal);
/// smallptr::interface!(dyn Animal + Send);
/// ```
///
/// Only traits local to the invoking crate can be bound this way; the common
/// std traits are already covered by [`Interface`].
#[macro_export]
macro_rules! interface {
    (dyn $($bound:tt)+) => {
        // SAFETY: the upcast is an unsizing coercion of the same pointer.
        unsafe impl<'__a, __D: $($bound)+ + '__a> $crate::Interface<__D> for dyn $($bound)+ + '__a {
            #[inline]
            fn upcast(value: *mut __D) -> *mut Self {
                value
            }
        }
    };
}

// SAFETY: identity.
unsafe impl<T> Interface<T> for T {
    #[inline]
    fn upcast(value: *mut T) -> *mut T {
        value
    }
}

// SAFETY: unsizing coercion.
unsafe impl<E, const K: usize> Interface<[E; K]> for [E] {
    #[inline]
    fn upcast(value: *mut [E; K]) -> *mut [E] {
        value
    }
}

// SAFETY: unsizing coercion.
unsafe impl<D: Any> Interface<D> for dyn Any {
    #[inline]
    fn upcast(value: *mut D) -> *mut Self {
        value
    }
}

// SAFETY: unsizing coercion.
unsafe impl<D: Any + Send> Interface<D> for dyn Any + Send {
    #[inline]
    fn upcast(value: *mut D) -> *mut Self {
        value
    }
}

macro_rules! std_interface {
    ($(<$($param:ident),*> $bound:path;)+) => {
        $(
            // SAFETY: unsizing coercion.
            unsafe impl<'a, $($param,)* D: $bound + 'a> Interface<D> for dyn $bound + 'a {
                #[inline]
                fn upcast(value: *mut D) -> *mut Self {
                    value
                }
            }
        )+
    };
}

std_interface! {
    <> fmt::Debug;
    <> fmt::Display;
    <R> Fn() -> R;
    <R> FnMut() -> R;
    <A, R> Fn(A) -> R;
    <A, R> FnMut(A) -> R;
    <O> Future<Output = O>;
}

// SAFETY: unsizing coercion.
unsafe impl<'a, O, D: Future<Output = O> + Send + 'a> Interface<D> for dyn Future<Output = O> + Send + 'a {
    #[inline]
    fn upcast(value: *mut D) -> *mut Self {
        value
    }
}
