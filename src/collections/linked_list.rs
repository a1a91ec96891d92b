//! # Arena-based Linked List
//!
//! Intrusive doubly linked lists whose links live inside arena values. A
//! container (e.g. a block) holds the head and tail, a node (e.g. an
//! instruction) holds its neighbours and its container.

use super::storage::ArenaPtr;

pub trait LinkedListContainerPtr<NodePtr>: ArenaPtr
where
    NodePtr: LinkedListNodePtr<A = Self::A, ContainerPtr = Self>,
{
    fn head(self, arena: &Self::A) -> Option<NodePtr>;

    fn tail(self, arena: &Self::A) -> Option<NodePtr>;

    fn set_head(self, arena: &mut Self::A, head: Option<NodePtr>);

    fn set_tail(self, arena: &mut Self::A, tail: Option<NodePtr>);

    fn push_front(self, arena: &mut Self::A, node: NodePtr) {
        assert!(
            node.container(arena).is_none(),
            "the node is already in another container"
        );
        match self.head(arena) {
            Some(head) => head.insert_before(arena, node),
            None => {
                self.set_head(arena, Some(node));
                self.set_tail(arena, Some(node));
                node.set_container(arena, Some(self));
            }
        }
    }

    fn push_back(self, arena: &mut Self::A, node: NodePtr) {
        assert!(
            node.container(arena).is_none(),
            "the node is already in another container"
        );
        match self.tail(arena) {
            Some(tail) => tail.insert_after(arena, node),
            None => {
                self.set_head(arena, Some(node));
                self.set_tail(arena, Some(node));
                node.set_container(arena, Some(self));
            }
        }
    }

    fn iter(self, arena: &Self::A) -> LinkedListIterator<NodePtr> {
        LinkedListIterator {
            arena,
            curr_front: self.head(arena),
            curr_back: self.tail(arena),
        }
    }
}

pub struct LinkedListIterator<'a, T: LinkedListNodePtr> {
    arena: &'a T::A,
    curr_front: Option<T>,
    curr_back: Option<T>,
}

impl<'a, T: LinkedListNodePtr> Iterator for LinkedListIterator<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let curr = self.curr_front?;
        if self.curr_back == Some(curr) {
            self.curr_front = None;
            self.curr_back = None;
        } else {
            self.curr_front = curr.next(self.arena);
        }
        Some(curr)
    }
}

impl<'a, T: LinkedListNodePtr> DoubleEndedIterator for LinkedListIterator<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let curr = self.curr_back?;
        if self.curr_front == Some(curr) {
            self.curr_front = None;
            self.curr_back = None;
        } else {
            self.curr_back = curr.prev(self.arena);
        }
        Some(curr)
    }
}

pub trait LinkedListNodePtr: ArenaPtr {
    type ContainerPtr: LinkedListContainerPtr<Self, A = Self::A>;

    fn next(self, arena: &Self::A) -> Option<Self>;

    fn prev(self, arena: &Self::A) -> Option<Self>;

    fn set_next(self, arena: &mut Self::A, next: Option<Self>);

    fn set_prev(self, arena: &mut Self::A, prev: Option<Self>);

    fn container(self, arena: &Self::A) -> Option<Self::ContainerPtr>;

    fn set_container(self, arena: &mut Self::A, container: Option<Self::ContainerPtr>);

    fn insert_after(self, arena: &mut Self::A, node: Self) {
        let container = self
            .container(arena)
            .expect("cannot insert after a node without container");
        assert!(
            node.container(arena).is_none(),
            "cannot insert a node that already belongs to a container"
        );

        if let Some(next) = self.next(arena) {
            next.set_prev(arena, Some(node));
            node.set_next(arena, Some(next));
        }
        node.set_prev(arena, Some(self));
        self.set_next(arena, Some(node));

        if container.tail(arena) == Some(self) {
            container.set_tail(arena, Some(node));
        }
        node.set_container(arena, Some(container));
    }

    fn insert_before(self, arena: &mut Self::A, node: Self) {
        let container = self
            .container(arena)
            .expect("cannot insert before a node without container");
        assert!(
            node.container(arena).is_none(),
            "cannot insert a node that already belongs to a container"
        );

        if let Some(prev) = self.prev(arena) {
            prev.set_next(arena, Some(node));
            node.set_prev(arena, Some(prev));
        }
        node.set_next(arena, Some(self));
        self.set_prev(arena, Some(node));

        if container.head(arena) == Some(self) {
            container.set_head(arena, Some(node));
        }
        node.set_container(arena, Some(container));
    }

    fn unlink(self, arena: &mut Self::A) {
        let prev = self.prev(arena);
        let next = self.next(arena);

        if let Some(prev) = prev {
            prev.set_next(arena, next);
        }
        if let Some(next) = next {
            next.set_prev(arena, prev);
        }
        if let Some(container) = self.container(arena) {
            if container.head(arena) == Some(self) {
                container.set_head(arena, next);
            }
            if container.tail(arena) == Some(self) {
                container.set_tail(arena, prev);
            }
        }

        self.set_prev(arena, None);
        self.set_next(arena, None);
        self.set_container(arena, None);
    }
}

#[cfg(test)]
mod tests {
    use super::{LinkedListContainerPtr, LinkedListNodePtr};
    use crate::{
        collections::storage::{ArenaAlloc, ArenaPtr, BaseArena, BaseArenaPtr},
        impl_arena,
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct NodePtr(BaseArenaPtr<Node>);

    struct Node {
        value: i32,
        next: Option<NodePtr>,
        prev: Option<NodePtr>,
        parent: Option<ListPtr>,
    }

    impl Node {
        fn new(value: i32) -> Self {
            Self {
                value,
                next: None,
                prev: None,
                parent: None,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct ListPtr(BaseArenaPtr<List>);

    #[derive(Default)]
    struct List {
        head: Option<NodePtr>,
        tail: Option<NodePtr>,
    }

    #[derive(Default)]
    struct Context {
        nodes: BaseArena<Node>,
        lists: BaseArena<List>,
    }

    impl_arena!(Context, Node, NodePtr, nodes);
    impl_arena!(Context, List, ListPtr, lists);

    impl LinkedListContainerPtr<NodePtr> for ListPtr {
        fn head(self, ctx: &Self::A) -> Option<NodePtr> { self.deref(ctx).head }

        fn tail(self, ctx: &Self::A) -> Option<NodePtr> { self.deref(ctx).tail }

        fn set_head(self, ctx: &mut Self::A, head: Option<NodePtr>) { self.deref_mut(ctx).head = head; }

        fn set_tail(self, ctx: &mut Self::A, tail: Option<NodePtr>) { self.deref_mut(ctx).tail = tail; }
    }

    impl LinkedListNodePtr for NodePtr {
        type ContainerPtr = ListPtr;

        fn next(self, ctx: &Self::A) -> Option<Self> { self.deref(ctx).next }

        fn prev(self, ctx: &Self::A) -> Option<Self> { self.deref(ctx).prev }

        fn set_next(self, ctx: &mut Self::A, next: Option<Self>) { self.deref_mut(ctx).next = next; }

        fn set_prev(self, ctx: &mut Self::A, prev: Option<Self>) { self.deref_mut(ctx).prev = prev; }

        fn container(self, ctx: &Self::A) -> Option<ListPtr> { self.deref(ctx).parent }

        fn set_container(self, ctx: &mut Self::A, container: Option<ListPtr>) {
            self.deref_mut(ctx).parent = container;
        }
    }

    fn values(list: ListPtr, ctx: &Context) -> Vec<i32> {
        list.iter(ctx).map(|n| n.deref(ctx).value).collect()
    }

    #[test]
    fn test_push_and_insert() {
        let mut ctx = Context::default();
        let list = ctx.alloc(List::default());

        let n1 = ctx.alloc(Node::new(1));
        let n2 = ctx.alloc(Node::new(2));
        let n3 = ctx.alloc(Node::new(3));
        let n4 = ctx.alloc(Node::new(4));

        list.push_back(&mut ctx, n2);
        list.push_front(&mut ctx, n1);
        n2.insert_after(&mut ctx, n4);
        n4.insert_before(&mut ctx, n3);

        assert_eq!(values(list, &ctx), vec![1, 2, 3, 4]);
        assert_eq!(list.head(&ctx), Some(n1));
        assert_eq!(list.tail(&ctx), Some(n4));
        assert_eq!(
            list.iter(&ctx).rev().map(|n| n.deref(&ctx).value).collect::<Vec<_>>(),
            vec![4, 3, 2, 1]
        );
    }

    #[test]
    fn test_unlink() {
        let mut ctx = Context::default();
        let list = ctx.alloc(List::default());

        let nodes = (0..3).map(|i| ctx.alloc(Node::new(i))).collect::<Vec<_>>();
        for &n in nodes.iter() {
            list.push_back(&mut ctx, n);
        }

        nodes[0].unlink(&mut ctx);
        assert_eq!(values(list, &ctx), vec![1, 2]);
        nodes[2].unlink(&mut ctx);
        assert_eq!(values(list, &ctx), vec![1]);
        assert_eq!(list.head(&ctx), list.tail(&ctx));
        assert!(nodes[0].container(&ctx).is_none());

        // an unlinked node can join the list again
        list.push_front(&mut ctx, nodes[2]);
        assert_eq!(values(list, &ctx), vec![2, 1]);
    }

    #[test]
    fn test_iter_meets_in_the_middle() {
        let mut ctx = Context::default();
        let list = ctx.alloc(List::default());
        for i in 0..4 {
            let n = ctx.alloc(Node::new(i));
            list.push_back(&mut ctx, n);
        }

        let mut iter = list.iter(&ctx);
        assert_eq!(iter.next().map(|n| n.deref(&ctx).value), Some(0));
        assert_eq!(iter.next_back().map(|n| n.deref(&ctx).value), Some(3));
        assert_eq!(iter.next().map(|n| n.deref(&ctx).value), Some(1));
        assert_eq!(iter.next_back().map(|n| n.deref(&ctx).value), Some(2));
        assert!(iter.next().is_none());
        assert!(iter.next_back().is_none());
    }
}
