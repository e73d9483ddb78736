//! Support for the [`small_ptr!`](crate::small_ptr!) and [`emplace!`](crate::emplace!)
//! macros. Not public API.
//!
//! The macros see the concrete type of the value they store, so they can ask
//! at compile time whether it is `Unpin`. Method resolution prefers the
//! by-reference receiver of [`ViaUnpin`] when its bound holds and falls back to
//! the auto-referenced [`ViaAddress`] otherwise.

use core::marker::PhantomData;

/// How a concrete type may be stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Movability {
    /// Safe to relocate between buffers; placement follows the size rule.
    Relocatable,
    /// May depend on its own address; always stored on the heap.
    AddressSensitive,
}

/// Zero-sized stand-in for a value of type `D`, only used to pick a method.
#[derive(Debug)]
pub struct Probe<D>(PhantomData<D>);

impl<D> Probe<D> {
    /// Takes the type from `val` without touching it.
    #[inline]
    pub fn of(_val: &D) -> Self {
        Probe(PhantomData)
    }
}

/// Chosen when `D: Unpin`.
pub trait ViaUnpin {
    /// Always [`Movability::Relocatable`].
    #[inline]
    fn movability(&self) -> Movability {
        Movability::Relocatable
    }
}

impl<D: Unpin> ViaUnpin for Probe<D> {}

/// Fallback for every other `D`.
pub trait ViaAddress {
    /// Always [`Movability::AddressSensitive`].
    #[inline]
    fn movability(&self) -> Movability {
        Movability::AddressSensitive
    }
}

impl<D> ViaAddress for &Probe<D> {}
