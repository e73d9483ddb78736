//! # SmallPtr: Inline Trait Objects
//!
//! [`SmallPtr`] is an owning pointer to a value used through an interface,
//! typically a trait object. Values that fit into its inline buffer are stored
//! there; larger values, and values that must not be moved, go to the heap.
//!
//! ## Core Concept
//!
//! A [`Box<dyn Trait>`](Box) always allocates and carries a vtable pointer
//! next to the data pointer. [`SmallPtr`] instead keeps a fixed-size buffer of
//! `N` bytes and a single function pointer. That function is chosen when a
//! value is stored, knows the concrete type, and performs every operation on
//! the value: producing a reference, relocating it, reporting where it lives,
//! and destroying it.
//!
//! ## Quick Start
//!
//! ```rust
//! use smallptr::SmallPtr;
//!
//! trait Animal {
//!     fn speak(&self) -> String;
//! }
//!
//! struct Dog;
//!
//! impl Animal for Dog {
//!     fn speak(&self) -> String {
//!         "woof".into()
//!     }
//! }
//!
//! struct Parrot {
//!     name: [u8; 1024],
//! }
//!
//! impl Animal for Parrot {
//!     fn speak(&self) -> String {
//!         String::from_utf8_lossy(&self.name).trim_end_matches('\0').to_string()
//!     }
//! }
//!
//! smallptr::interface!(dyn Animal);
//!
//! // Small values are stored inline
//! let mut pet: SmallPtr<dyn Animal, 24> = SmallPtr::new(Dog);
//! assert!(pet.uses_stack());
//! assert_eq!(pet.speak(), "woof");
//!
//! // Large values automatically use heap allocation
//! let mut name = [0u8; 1024];
//! name[..4].copy_from_slice(b"Lori");
//! pet.emplace(Parrot { name });
//! assert!(pet.uses_heap());
//! assert_eq!(pet.speak(), "Lori");
//! ```
//!
//! ## Placement
//!
//! A concrete type `D` is stored inline when `size_of::<D>() <= N` and its
//! alignment does not exceed that of a pointer. The decision is made per type
//! at compile time.
//!
//! Every Rust value can be moved by copying its bytes, so [`SmallPtr::new`]
//! only looks at the layout. Types that depend on their own address are not
//! [`Unpin`]; store those with [`small_ptr!`], [`emplace!`],
//! [`SmallPtr::new_pinned`] or [`SmallPtr::pin`], which keep them on the heap.
//!
//! ```rust
//! use smallptr::{small_ptr, SmallPtr};
//! use std::any::Any;
//! use std::marker::PhantomPinned;
//!
//! struct Elephant {
//!     _pinned: PhantomPinned,
//! }
//!
//! let pet: SmallPtr<dyn Any> = small_ptr!(Elephant { _pinned: PhantomPinned });
//! assert!(pet.uses_heap());
//! ```
//!
//! ## Interfaces
//!
//! `SmallPtr<T, N>` accepts a concrete `D` only if `T: Interface<D>`. This is
//! implemented for every sized type holding itself, for slices holding arrays,
//! for the common std trait objects, and, through [`interface!`], for trait
//! objects of your own traits.
//!
//! ## Ownership
//!
//! A `SmallPtr` is the single owner of its value and cannot be cloned. Moving
//! it (or calling [`SmallPtr::take`]) relocates an inline value to a new
//! address, while a heap value keeps its address and only the handle moves.
//!
//! ```rust
//! use smallptr::SmallPtr;
//!
//! let boxed: Box<dyn std::fmt::Debug> = Box::new(3u8);
//! let adopted: SmallPtr<dyn std::fmt::Debug> = SmallPtr::from_box(boxed);
//! assert!(adopted.uses_heap());
//! ```
//!
//! ## Feature Flags
//!
//! - **`std`** (enabled by default)
//!   - Links to the standard library
//!   - Disable for `#![no_std]` environments: `default-features = false`

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]
#![deny(missing_docs)]
#![deny(clippy::as_conversions)]

extern crate alloc;

mod buffer;
mod dispatch;
mod interface;
mod probe;
mod small_ptr;
mod storage;

pub use crate::interface::Interface;
pub use crate::small_ptr::SmallPtr;

/// Items the exported macros expand to. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use crate::probe::{Movability, Probe, ViaAddress, ViaUnpin};
}
