//! Storage utilities.
//!
//! This module provides [BaseArena], the backing store of the linked
//! structures in the LIR. Values are addressed by typed pointers instead of
//! references, so blocks and instructions can point at each other freely.
//!
//! - [ArenaPtr]: The trait for the pointer in the arena.
//! - [ArenaDeref]: The trait for dereferencing the arena pointer.
//! - [ArenaAlloc]: The trait for allocating memory in the arena.
//!
//! Several arenas are usually combined into one container, and [impl_arena]
//! wires a newtype pointer to one field of that container.
//!
//! ```rust
//! use orzra::impl_arena;
//! use orzra::collections::storage::*;
//!
//! struct Foo { value: i32 }
//!
//! #[derive(Clone, Copy, PartialEq, Eq)]
//! struct FooPtr(BaseArenaPtr<Foo>);
//!
//! #[derive(Default)]
//! struct Container {
//!     foos: BaseArena<Foo>,
//! }
//!
//! impl_arena!(Container, Foo, FooPtr, foos);
//!
//! let mut container = Container::default();
//! let foo = container.alloc(Foo { value: 42 });
//! assert_eq!(foo.deref(&container).value, 42);
//!
//! foo.deref_mut(&mut container).value = 7;
//! assert_eq!(foo.deref(&container).value, 7);
//! ```

use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// Indicates that the type can be used to dereference an arena pointer.
pub trait ArenaDeref<T, Ptr>
where
    Ptr: ArenaPtr<T = T, A = Self>,
{
    /// Try to dereference a pointer, `None` if the pointer is dangling.
    fn try_deref(&self, ptr: Ptr) -> Option<&T>;

    /// Try to dereference a pointer mutably.
    fn try_deref_mut(&mut self, ptr: Ptr) -> Option<&mut T>;
}

/// Indicates that the type can be used to allocate values in the arena.
///
/// Values live as long as the arena, nothing is freed individually.
pub trait ArenaAlloc<T, Ptr>: ArenaDeref<T, Ptr>
where
    Ptr: ArenaPtr<T = T, A = Self>,
{
    /// Allocate a value with a closure accepting the pointer it will get.
    ///
    /// This is useful when the value needs to reference itself.
    fn alloc_with<F>(&mut self, f: F) -> Ptr
    where
        F: FnOnce(Ptr) -> T;

    /// Allocate a value in the arena.
    fn alloc(&mut self, val: T) -> Ptr { self.alloc_with(|_| val) }
}

/// The pointer-like trait that can be used to deref and get the value from the
/// corresponding [ArenaDeref] type.
pub trait ArenaPtr: Copy + Sized + Eq {
    /// The type of dereferenced value.
    type T;

    /// The type of the corresponding arena.
    type A: ArenaDeref<Self::T, Self>;

    fn try_deref(self, arena: &Self::A) -> Option<&Self::T>;

    fn try_deref_mut(self, arena: &mut Self::A) -> Option<&mut Self::T>;

    /// Dereference the pointer.
    ///
    /// # Panics
    ///
    /// Panics if the pointer does not belong to `arena`.
    fn deref(self, arena: &Self::A) -> &Self::T {
        self.try_deref(arena).expect("the arena pointer is invalid")
    }

    /// Dereference the pointer mutably.
    ///
    /// # Panics
    ///
    /// Panics if the pointer does not belong to `arena`.
    fn deref_mut(self, arena: &mut Self::A) -> &mut Self::T {
        self.try_deref_mut(arena)
            .expect("the arena pointer is invalid")
    }
}

/// [BaseArenaPtr] is a handle to an object in the [BaseArena].
pub struct BaseArenaPtr<T> {
    id: usize,
    _marker: PhantomData<T>,
}

impl<T> fmt::Debug for BaseArenaPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseArenaPtr({})", self.id)
    }
}

impl<T> PartialEq for BaseArenaPtr<T> {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl<T> Eq for BaseArenaPtr<T> {}

impl<T> Hash for BaseArenaPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state); }
}

#[allow(clippy::non_canonical_clone_impl)]
impl<T> Clone for BaseArenaPtr<T> {
    fn clone(&self) -> Self {
        // `T` need not be `Clone` for the handle to be copied.
        BaseArenaPtr {
            id: self.id,
            _marker: PhantomData,
        }
    }
}

impl<T> Copy for BaseArenaPtr<T> {}

impl<T> BaseArenaPtr<T> {
    fn new(id: usize) -> Self {
        BaseArenaPtr {
            id,
            _marker: PhantomData,
        }
    }

    /// The index of the object in the arena.
    ///
    /// Indices are dense and handed out in allocation order.
    pub fn id(self) -> usize { self.id }
}

impl<T> ArenaPtr for BaseArenaPtr<T> {
    type A = BaseArena<T>;
    type T = T;

    fn try_deref(self, arena: &BaseArena<T>) -> Option<&T> { arena.try_deref(self) }

    fn try_deref_mut(self, arena: &mut BaseArena<T>) -> Option<&mut T> { arena.try_deref_mut(self) }
}

/// An append-only arena backed by a vector.
pub struct BaseArena<T> {
    pool: Vec<T>,
}

impl<T> Default for BaseArena<T> {
    fn default() -> Self { BaseArena { pool: Vec::new() } }
}

impl<T> ArenaAlloc<T, BaseArenaPtr<T>> for BaseArena<T> {
    fn alloc_with<F>(&mut self, f: F) -> BaseArenaPtr<T>
    where
        F: FnOnce(BaseArenaPtr<T>) -> T,
    {
        let ptr = BaseArenaPtr::new(self.pool.len());
        let val = f(ptr);
        self.pool.push(val);
        ptr
    }
}

impl<T> ArenaDeref<T, BaseArenaPtr<T>> for BaseArena<T> {
    fn try_deref(&self, ptr: BaseArenaPtr<T>) -> Option<&T> { self.pool.get(ptr.id()) }

    fn try_deref_mut(&mut self, ptr: BaseArenaPtr<T>) -> Option<&mut T> {
        self.pool.get_mut(ptr.id())
    }
}

impl<T> BaseArena<T> {
    /// The number of allocated values.
    pub fn len(&self) -> usize { self.pool.len() }

    pub fn is_empty(&self) -> bool { self.pool.is_empty() }

    /// Iterate over the arena in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (BaseArenaPtr<T>, &T)> {
        self.pool
            .iter()
            .enumerate()
            .map(|(index, val)| (BaseArenaPtr::new(index), val))
    }
}

/// Implement the arena traits for a newtype pointer over one field of a
/// container.
#[macro_export]
macro_rules! impl_arena {
    ($arena:ty, $value:ty, $ptr:path, $field:ident) => {
        impl $crate::collections::storage::ArenaPtr for $ptr {
            type A = $arena;
            type T = $value;

            fn try_deref(self, arena: &Self::A) -> Option<&Self::T> {
                $crate::collections::storage::ArenaDeref::try_deref(arena, self)
            }

            fn try_deref_mut(self, arena: &mut Self::A) -> Option<&mut Self::T> {
                $crate::collections::storage::ArenaDeref::try_deref_mut(arena, self)
            }
        }

        impl $crate::collections::storage::ArenaAlloc<$value, $ptr> for $arena {
            fn alloc_with<F>(&mut self, f: F) -> $ptr
            where
                F: FnOnce($ptr) -> $value,
            {
                $ptr(self.$field.alloc_with(|ptr| f($ptr(ptr))))
            }
        }

        impl $crate::collections::storage::ArenaDeref<$value, $ptr> for $arena {
            fn try_deref(&self, ptr: $ptr) -> Option<&$value> { self.$field.try_deref(ptr.0) }

            fn try_deref_mut(&mut self, ptr: $ptr) -> Option<&mut $value> {
                self.$field.try_deref_mut(ptr.0)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        this: BaseArenaPtr<Node>,
        value: i32,
    }

    #[test]
    fn test_alloc_with_self_reference() {
        let mut arena = BaseArena::default();
        let a = arena.alloc_with(|this| Node { this, value: 1 });
        let b = arena.alloc_with(|this| Node { this, value: 2 });

        assert_ne!(a, b);
        assert_eq!(a.deref(&arena).this, a);
        assert_eq!(b.deref(&arena).value, 2);
        assert_eq!(arena.len(), 2);

        b.deref_mut(&mut arena).value = 5;
        assert_eq!(arena.iter().map(|(_, n)| n.value).collect::<Vec<_>>(), vec![1, 5]);
    }

    #[test]
    fn test_dangling_pointer() {
        let mut arena = BaseArena::default();
        let a = arena.alloc(Node {
            this: BaseArenaPtr::new(0),
            value: 3,
        });
        let other: BaseArena<Node> = BaseArena::default();
        assert!(other.try_deref(a).is_none());
        assert!(arena.try_deref(a).is_some());
    }
}
