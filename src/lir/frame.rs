use super::operand::{StackSlot, ValueKind};

/// The stack frame of one compilation unit.
///
/// Slots are only ever appended, so a slot handed out once stays valid and
/// distinct from every later one.
#[derive(Default)]
pub struct FrameMap {
    slots: Vec<ValueKind>,
}

impl FrameMap {
    pub fn new() -> Self { Self::default() }

    pub fn allocate_spill_slot(&mut self, kind: ValueKind) -> StackSlot {
        let slot = StackSlot::new(self.slots.len() as u32, kind);
        self.slots.push(kind);
        slot
    }

    pub fn num_slots(&self) -> usize { self.slots.len() }

    pub fn slots(&self) -> impl Iterator<Item = StackSlot> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, kind)| StackSlot::new(i as u32, *kind))
    }
}
