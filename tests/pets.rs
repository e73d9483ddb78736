use std::cell::Cell;
use std::marker::PhantomPinned;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use smallptr::{emplace, small_ptr, SmallPtr};

trait Animal {
    fn speak(&self) -> String;
}

smallptr::interface!(dyn Animal);

type Pet = SmallPtr<dyn Animal, 24>;

struct Dog {
    name: &'static str,
    drops: Rc<Cell<usize>>,
}

impl Dog {
    fn new(name: &'static str) -> (Dog, Rc<Cell<usize>>) {
        let drops = Rc::new(Cell::new(0));
        let dog = Dog {
            name,
            drops: Rc::clone(&drops),
        };
        (dog, drops)
    }
}

impl Animal for Dog {
    fn speak(&self) -> String {
        if self.name.is_empty() {
            "woof".to_string()
        } else {
            format!("woof, I am {}", self.name)
        }
    }
}

impl Drop for Dog {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

struct Cat;

impl Animal for Cat {
    fn speak(&self) -> String {
        "meow".to_string()
    }
}

struct Parrot {
    name: [u8; 1024],
    len: usize,
}

impl Parrot {
    fn new(name: &str) -> Parrot {
        let mut buf = [0u8; 1024];
        let len = name.len().min(buf.len());
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        Parrot { name: buf, len }
    }
}

impl Animal for Parrot {
    fn speak(&self) -> String {
        format!("{}!", String::from_utf8_lossy(&self.name[..self.len]))
    }
}

/// Small, but must not be moved once placed.
struct Elephant {
    height: u32,
    _pinned: PhantomPinned,
}

impl Elephant {
    fn new(height: u32) -> Elephant {
        Elephant {
            height,
            _pinned: PhantomPinned,
        }
    }
}

impl Animal for Elephant {
    fn speak(&self) -> String {
        format!("toot from {}cm up", self.height)
    }
}

fn addr(pet: &Pet) -> *const u8 {
    pet.as_ptr().map_or(std::ptr::null(), |ptr| ptr.cast::<u8>())
}

/// Whether the value lives inside the container's own bytes.
fn is_inside(pet: &Pet) -> bool {
    let start: *const Pet = pet;
    let start = start.cast::<u8>();
    let end = start.wrapping_add(mem::size_of::<Pet>());
    (start..end).contains(&addr(pet))
}

#[test]
fn construct() {
    let empty = Pet::empty();
    assert!(empty.is_empty());
    assert!(empty.get().is_none());

    let (dog, _) = Dog::new("");
    assert!(mem::size_of::<Dog>() <= 24);
    let dog = Pet::new(dog);
    assert!(!dog.is_empty());
    assert_eq!(dog.speak(), "woof");
    assert!(dog.uses_stack());
    assert!(!dog.uses_heap());

    let parrot = Pet::new_with(|| Parrot::new("Lori"));
    assert_eq!(parrot.speak(), "Lori!");
    assert!(parrot.uses_heap());
    assert!(!parrot.uses_stack());

    let elephant: Pet = small_ptr!(Elephant::new(300));
    assert!(mem::size_of::<Elephant>() <= 24);
    assert_eq!(elephant.speak(), "toot from 300cm up");
    assert!(elephant.uses_heap());
}

#[test]
fn emplace_destroys_previous_once() {
    let (dog, drops) = Dog::new("");
    let mut pet = Pet::new(dog);
    assert!(pet.uses_stack());
    assert_eq!(pet.speak(), "woof");

    pet.emplace(Parrot::new("Heinrich"));
    assert!(pet.uses_heap());
    assert_eq!(pet.speak(), "Heinrich!");
    assert_eq!(drops.get(), 1);

    drop(pet);
    assert_eq!(drops.get(), 1);
}

#[test]
fn emplace_macro_keeps_pinned_on_heap() {
    let mut pet = Pet::new(Cat);
    assert!(pet.uses_stack());

    emplace!(pet, Elephant::new(250));
    assert!(pet.uses_heap());

    emplace!(pet, Cat);
    assert!(pet.uses_stack());
}

#[test]
fn reset() {
    let (dog, drops) = Dog::new("Rex");
    let mut pet = Pet::new(dog);
    assert_eq!(pet.speak(), "woof, I am Rex");

    pet.reset();
    assert!(pet.is_empty());
    assert!(pet.get().is_none());
    assert_eq!(drops.get(), 1);

    // no-op on an empty container
    pet.reset();
    assert_eq!(drops.get(), 1);

    pet.reset_with(Box::new(Parrot::new("Valentine")));
    assert!(pet.uses_heap());
    assert_eq!(pet.speak(), "Valentine!");
}

#[test]
fn adopt_small_value_stays_on_heap() {
    assert!(mem::size_of::<Cat>() <= 24);
    let boxed: Box<dyn Animal> = Box::new(Cat);
    let before: *const dyn Animal = &*boxed;

    let pet = Pet::from_box(boxed);
    assert!(pet.uses_heap());
    assert_eq!(pet.speak(), "meow");
    assert_eq!(addr(&pet), before.cast::<u8>());
}

#[test]
fn reset_with_takes_ownership() {
    let (dog, drops) = Dog::new("Bob");
    let mut pet = Pet::new(Cat);
    assert!(pet.uses_stack());

    pet.reset_with(Box::new(dog));
    assert!(pet.uses_heap());
    assert_eq!(drops.get(), 0);

    pet.reset();
    assert_eq!(drops.get(), 1);
}

#[test]
fn size() {
    let small_pet = Pet::new(Parrot::new("Bjarne"));
    assert!(small_pet.uses_heap());
    assert_eq!(small_pet.speak(), "Bjarne!");

    const PARROT: usize = mem::size_of::<Parrot>();
    let large_pet: SmallPtr<dyn Animal, PARROT> = SmallPtr::new(Parrot::new("Alexandra"));
    assert!(large_pet.uses_stack());
    assert_eq!(large_pet.speak(), "Alexandra!");
}

#[test]
fn move_inline_relocates() {
    let mut pet = Pet::new(Cat);
    let before = addr(&pet);

    let thief = pet.take();
    assert_eq!(thief.speak(), "meow");
    assert_ne!(addr(&thief), before);

    assert!(pet.is_empty());
    assert!(pet.get().is_none());
    assert!(!pet.uses_stack());

    pet.emplace(Cat);
    assert_eq!(pet.speak(), "meow");
}

#[test]
fn move_heap_hands_over_pointer() {
    let mut pet = Pet::new(Parrot::new("Dominique"));
    let before = addr(&pet);

    let thief = pet.take();
    assert_eq!(thief.speak(), "Dominique!");
    assert_eq!(addr(&thief), before);
    assert!(pet.is_empty());

    let mut pet: Pet = small_ptr!(Elephant::new(200));
    let before = addr(&pet);
    let mut thief = Pet::empty();
    thief.move_from(&mut pet);
    assert_eq!(addr(&thief), before);
    assert!(pet.is_empty());

    pet.emplace(Parrot::new("George"));
    assert_eq!(pet.speak(), "George!");
}

#[test]
fn move_assign_destroys_destination() {
    let (dog, drops) = Dog::new("");
    let mut target = Pet::new(dog);
    let mut source = Pet::new(Cat);

    target.move_from(&mut source);
    assert_eq!(drops.get(), 1);
    assert_eq!(target.speak(), "meow");
    assert!(source.is_empty());

    let mut empty = Pet::empty();
    target.move_from(&mut empty);
    assert!(target.is_empty());
}

#[test]
fn swap() {
    let mut cat = Pet::new(Cat);
    let (dog, drops) = Dog::new("Bob");
    let mut dog = Pet::new(dog);
    let mut parrot = Pet::new(Parrot::new("Charly"));
    assert!(cat.uses_stack());
    assert!(dog.uses_stack());
    assert!(parrot.uses_heap());

    // stack / stack
    cat.swap(&mut dog);
    assert_eq!(dog.speak(), "meow");
    assert_eq!(cat.speak(), "woof, I am Bob");
    assert!(is_inside(&cat));
    assert!(is_inside(&dog));

    // stack / heap
    let parrot_addr = addr(&parrot);
    cat.swap(&mut parrot);
    assert_eq!(parrot.speak(), "woof, I am Bob");
    assert_eq!(cat.speak(), "Charly!");
    assert_eq!(addr(&cat), parrot_addr);
    assert!(parrot.uses_stack());
    assert!(is_inside(&parrot));

    // heap / heap
    let mut other = Pet::new(Parrot::new("Polly"));
    cat.swap(&mut other);
    assert_eq!(cat.speak(), "Polly!");
    assert_eq!(other.speak(), "Charly!");

    // occupied / empty
    dog.reset();
    other.swap(&mut dog);
    assert!(other.is_empty());
    assert_eq!(dog.speak(), "Charly!");

    assert_eq!(drops.get(), 0);
}

#[test]
fn emplace_with_panic_leaves_empty() {
    let (dog, drops) = Dog::new("");
    let mut pet = Pet::new(dog);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pet.emplace_with(|| -> Parrot { panic!("constructor failed") });
    }));
    assert!(result.is_err());
    assert!(pet.is_empty());
    assert_eq!(drops.get(), 1);

    drop(pet);
    assert_eq!(drops.get(), 1);
}

#[test]
fn try_emplace_with_error_leaves_empty() {
    let (dog, drops) = Dog::new("");
    let mut pet = Pet::new(dog);

    let result = pet.try_emplace_with(|| Err::<Cat, _>("no cats today"));
    assert_eq!(result, Err("no cats today"));
    assert!(pet.is_empty());
    assert_eq!(drops.get(), 1);

    pet.try_emplace_with(|| Ok::<_, &str>(Cat)).unwrap();
    assert_eq!(pet.speak(), "meow");
}

#[test]
fn end_to_end() {
    let (dog, drops) = Dog::new("");
    let mut pet: SmallPtr<dyn Animal, 24> = SmallPtr::new(dog);
    assert!(pet.uses_stack());
    assert_eq!(pet.speak(), "woof");

    pet.emplace(Parrot::new("Lori"));
    assert!(pet.uses_heap());
    assert_eq!(pet.speak(), "Lori!");
    assert_eq!(drops.get(), 1);

    let cat: Box<dyn Animal> = Box::new(Cat);
    let adopted: SmallPtr<dyn Animal, 24> = SmallPtr::from_box(cat);
    assert!(adopted.uses_heap());
    assert_eq!(adopted.speak(), "meow");
}
