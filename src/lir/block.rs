use super::{context::Lir, inst::Inst};
use crate::{
    collections::{
        linked_list::LinkedListContainerPtr,
        storage::{ArenaPtr, BaseArenaPtr},
    },
    impl_arena,
};

pub struct BlockData {
    /// Position in the block order of the LIR.
    index: usize,

    preds: Vec<Block>,
    succs: Vec<Block>,

    /// The innermost loop containing the block.
    loop_index: Option<usize>,

    head: Option<Inst>,
    tail: Option<Inst>,
}

impl BlockData {
    pub(super) fn new(index: usize) -> Self {
        Self {
            index,
            preds: Vec::new(),
            succs: Vec::new(),
            loop_index: None,
            head: None,
            tail: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block(BaseArenaPtr<BlockData>);

impl_arena!(Lir, BlockData, Block, blocks);

impl Block {
    pub fn index(self, lir: &Lir) -> usize { self.deref(lir).index }

    pub fn name(self, lir: &Lir) -> String { format!("bb{}", self.index(lir)) }

    pub fn preds(self, lir: &Lir) -> &[Block] { &self.deref(lir).preds }

    pub fn succs(self, lir: &Lir) -> &[Block] { &self.deref(lir).succs }

    pub fn loop_index(self, lir: &Lir) -> Option<usize> { self.deref(lir).loop_index }

    pub fn set_loop_index(self, lir: &mut Lir, loop_index: Option<usize>) {
        self.deref_mut(lir).loop_index = loop_index;
    }

    /// Add a control flow edge from `self` to `succ`.
    pub fn add_succ(self, lir: &mut Lir, succ: Block) {
        self.deref_mut(lir).succs.push(succ);
        succ.deref_mut(lir).preds.push(self);
    }

    /// The label, i.e. the first instruction.
    pub fn label(self, lir: &Lir) -> Option<Inst> { self.head(lir) }

    /// The instructions of the block, collected so the block can be modified
    /// while walking them.
    pub fn insts(self, lir: &Lir) -> Vec<Inst> { self.iter(lir).collect() }
}

impl LinkedListContainerPtr<Inst> for Block {
    fn head(self, lir: &Lir) -> Option<Inst> { self.deref(lir).head }

    fn tail(self, lir: &Lir) -> Option<Inst> { self.deref(lir).tail }

    fn set_head(self, lir: &mut Lir, head: Option<Inst>) { self.deref_mut(lir).head = head; }

    fn set_tail(self, lir: &mut Lir, tail: Option<Inst>) { self.deref_mut(lir).tail = tail; }
}
