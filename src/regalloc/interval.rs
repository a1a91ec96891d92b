//! Live intervals.
//!
//! An interval records, for one operand, the instruction positions where it
//! is live (a sorted list of closed [LifeRange]s), the positions where it is
//! used together with how badly it needs a register there, and the result of
//! the allocation (a register and/or a spill slot).

use core::fmt;

use crate::lir::{Operand, PReg, StackSlot, ValueKind};

/// How badly an operand needs a register at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RegisterPriority {
    /// No special reason for a register.
    #[default]
    None,
    /// Live at the end of a loop.
    LiveAtLoopEnd,
    /// A register is preferred, but the stack is acceptable.
    ShouldHaveRegister,
    /// The position cannot read or write the stack.
    MustHaveRegister,
}

/// A closed range `[from, to]` of instruction positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LifeRange {
    pub from: u32,
    pub to: u32,
}

impl LifeRange {
    pub fn new(from: u32, to: u32) -> Self {
        debug_assert!(from <= to, "invalid range [{}, {}]", from, to);
        Self { from, to }
    }

    /// If two closed ranges share at least one position.
    pub fn overlaps(&self, other: &LifeRange) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    pub fn contains(&self, pos: u32) -> bool { self.from <= pos && pos <= self.to }
}

impl fmt::Display for LifeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsePosition {
    pub pos: u32,
    pub priority: RegisterPriority,
}

#[derive(Debug, Clone)]
pub struct Interval {
    operand: Operand,
    /// The operand number.
    number: usize,

    /// Sorted by `from`, pairwise disjoint.
    ranges: Vec<LifeRange>,
    /// Use positions in the order they were recorded, i.e. reverse program
    /// order.
    use_positions: Vec<UsePosition>,

    def_pos: Option<u32>,
    category: Option<usize>,
    kind: Option<ValueKind>,
    /// The priority of the last visit, i.e. of the earliest position.
    priority: RegisterPriority,

    location: Option<PReg>,
    slot: Option<StackSlot>,
}

impl Interval {
    pub fn new(operand: Operand, number: usize) -> Self {
        let kind = match operand {
            Operand::Var(var) => Some(var.kind()),
            _ => None,
        };
        Self {
            operand,
            number,
            ranges: Vec::new(),
            use_positions: Vec::new(),
            def_pos: None,
            category: None,
            kind,
            priority: RegisterPriority::None,
            location: None,
            slot: None,
        }
    }

    pub fn operand(&self) -> Operand { self.operand }

    pub fn number(&self) -> usize { self.number }

    pub fn ranges(&self) -> &[LifeRange] { &self.ranges }

    /// The range with the smallest start.
    pub fn first(&self) -> Option<LifeRange> { self.ranges.first().copied() }

    /// Add a range, merging it with every range it overlaps.
    pub fn add_range(&mut self, from: u32, to: u32) {
        let mut merged = LifeRange::new(from, to);

        let start = self.ranges.partition_point(|r| r.to < merged.from);
        let mut end = start;
        while end < self.ranges.len() && self.ranges[end].from <= merged.to {
            merged.from = merged.from.min(self.ranges[end].from);
            merged.to = merged.to.max(self.ranges[end].to);
            end += 1;
        }
        self.ranges.drain(start..end);
        self.ranges.insert(start, merged);
    }

    /// Add the single position range used around inserted spill moves.
    pub fn add_temp(&mut self, pos: u32) { self.add_range(pos, pos); }

    /// Shorten the first range so that it starts at the definition.
    ///
    /// Returns false if no range covers `def`, i.e. the value is dead.
    pub fn narrow_first_to_def(&mut self, def: u32) -> bool {
        match self.ranges.first_mut() {
            Some(first) if first.contains(def) => {
                first.from = def;
                true
            }
            _ => false,
        }
    }

    pub fn clear_ranges(&mut self) { self.ranges.clear(); }

    pub fn is_live_at(&self, pos: u32) -> bool { self.ranges.iter().any(|r| r.contains(pos)) }

    pub fn add_use(&mut self, pos: u32, priority: RegisterPriority) {
        self.use_positions.push(UsePosition { pos, priority });
    }

    pub fn use_positions(&self) -> &[UsePosition] { &self.use_positions }

    /// The priority recorded for an instruction, at its own position or the
    /// position right after it.
    pub fn find_use_priority(&self, id: u32) -> RegisterPriority {
        self.use_positions
            .iter()
            .find(|u| u.pos == id || u.pos == id + 1)
            .map(|u| u.priority)
            .unwrap_or_default()
    }

    /// The priority of the definition, `None` for a dead or undefined value.
    pub fn def_priority(&self) -> RegisterPriority {
        match self.def_pos {
            Some(def) => self
                .use_positions
                .iter()
                .find(|u| u.pos == def)
                .map(|u| u.priority)
                .unwrap_or_default(),
            None => RegisterPriority::None,
        }
    }

    pub fn def_pos(&self) -> Option<u32> { self.def_pos }

    pub fn set_def_pos(&mut self, def: u32) { self.def_pos = Some(def); }

    pub fn category(&self) -> Option<usize> { self.category }

    pub fn set_category(&mut self, category: usize) { self.category = Some(category); }

    pub fn kind(&self) -> Option<ValueKind> { self.kind }

    pub fn priority(&self) -> RegisterPriority { self.priority }

    pub fn set_priority(&mut self, priority: RegisterPriority) { self.priority = priority; }

    pub fn location(&self) -> Option<PReg> { self.location }

    pub fn set_location(&mut self, location: Option<PReg>) { self.location = location; }

    pub fn slot(&self) -> Option<StackSlot> { self.slot }

    pub fn set_slot(&mut self, slot: StackSlot) { self.slot = Some(slot); }

    pub fn is_spilled(&self) -> bool { self.slot.is_some() }

    /// Check whether `current`, a range of another interval, conflicts with
    /// this interval.
    ///
    /// After spilling, the ranges of an interval only cover the positions of
    /// its spill moves, so spilled ranges are compared by their start:
    ///
    /// - two spilled ranges conflict if they start together;
    /// - a spilled range of `self` conflicts with any range it starts inside
    ///   of, except at its very start;
    /// - a spilled `current` conflicts with a live range it starts strictly
    ///   inside of.
    ///
    /// Unspilled ranges conflict if they overlap.
    pub fn has_interference(&self, current: &LifeRange, current_spilled: bool) -> bool {
        let spilled = self.is_spilled();
        self.ranges.iter().any(|range| {
            if spilled && current_spilled && range.from == current.from {
                return true;
            }
            if spilled && current.from < range.from && range.from <= current.to {
                return true;
            }
            if current_spilled {
                range.from < current.from && current.from <= range.to
            } else {
                range.overlaps(current)
            }
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.operand)?;
        for range in self.ranges.iter() {
            write!(f, " {}", range)?;
        }
        if !self.use_positions.is_empty() {
            write!(f, " uses:")?;
            for u in self.use_positions.iter().rev() {
                write!(f, " {}:{:?}", u.pos, u.priority)?;
            }
        }
        if let Some(location) = self.location {
            write!(f, " -> {}", location)?;
        }
        if let Some(slot) = self.slot {
            write!(f, " spilled {}", slot)?;
        }
        Ok(())
    }
}

/// Intervals indexed by operand number.
#[derive(Debug, Default)]
pub struct Intervals {
    intervals: Vec<Option<Interval>>,
}

impl Intervals {
    pub fn new() -> Self { Self::default() }

    /// The interval of `number`, created on first request.
    pub fn get_or_insert(&mut self, operand: Operand, number: usize) -> &mut Interval {
        if self.intervals.len() <= number {
            let len = (number + 1).max(self.intervals.len() * 2);
            self.intervals.resize_with(len, || None);
        }
        self.intervals[number].get_or_insert_with(|| Interval::new(operand, number))
    }

    pub fn get(&self, number: usize) -> Option<&Interval> {
        self.intervals.get(number).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, number: usize) -> Option<&mut Interval> {
        self.intervals.get_mut(number).and_then(Option::as_mut)
    }

    /// The upper bound of operand numbers, not the number of intervals.
    pub fn capacity(&self) -> usize { self.intervals.len() }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> { self.intervals.iter().flatten() }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Interval> {
        self.intervals.iter_mut().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lir::VReg;

    fn interval(ranges: &[(u32, u32)]) -> Interval {
        let mut interval = Interval::new(Operand::Var(VReg::new(0, ValueKind::I32)), 0);
        for &(from, to) in ranges.iter().rev() {
            interval.add_range(from, to);
        }
        interval
    }

    fn assert_sorted_disjoint(interval: &Interval) {
        for pair in interval.ranges().windows(2) {
            assert!(pair[0].to < pair[1].from, "{}", interval);
        }
    }

    #[test]
    fn test_add_range_merges() {
        let mut interval = interval(&[]);
        interval.add_range(20, 30);
        interval.add_range(2, 6);
        interval.add_range(6, 10);
        assert_eq!(interval.ranges(), &[LifeRange::new(2, 10), LifeRange::new(20, 30)]);

        interval.add_range(12, 14);
        interval.add_range(40, 40);
        assert_sorted_disjoint(&interval);
        assert_eq!(interval.ranges().len(), 4);

        // swallows everything in between
        interval.add_range(8, 35);
        assert_eq!(interval.ranges(), &[LifeRange::new(2, 35), LifeRange::new(40, 40)]);
    }

    #[test]
    fn test_add_range_keeps_invariant() {
        let mut interval = interval(&[]);
        let ranges = [(50, 52), (0, 1), (30, 31), (31, 40), (10, 10), (9, 11), (60, 64), (2, 3)];
        for (from, to) in ranges {
            interval.add_range(from, to);
            assert_sorted_disjoint(&interval);
        }
        assert_eq!(interval.first(), Some(LifeRange::new(0, 1)));
        assert!(interval.is_live_at(35));
        assert!(!interval.is_live_at(45));
    }

    #[test]
    fn test_narrow_first_to_def() {
        let mut interval = interval(&[(0, 12), (20, 24)]);
        assert!(interval.narrow_first_to_def(4));
        assert_eq!(interval.first(), Some(LifeRange::new(4, 12)));
        assert!(!interval.narrow_first_to_def(14));
    }

    #[test]
    fn test_interference() {
        let live = interval(&[(2, 24), (26, 32)]);
        assert!(live.has_interference(&LifeRange::new(20, 22), false));

        let live = interval(&[(20, 22)]);
        assert!(live.has_interference(&LifeRange::new(2, 24), false));
        assert!(!live.has_interference(&LifeRange::new(26, 32), false));

        let live = interval(&[(32, 36)]);
        assert!(live.has_interference(&LifeRange::new(36, 36), false));
    }

    #[test]
    fn test_interference_spilled() {
        let mut spilled = interval(&[(32, 32)]);
        spilled.set_slot(StackSlot::new(0, ValueKind::I32));
        assert!(!spilled.has_interference(&LifeRange::new(30, 31), false));
        assert!(spilled.has_interference(&LifeRange::new(30, 33), false));
        // same spill position
        assert!(spilled.has_interference(&LifeRange::new(32, 32), true));
        assert!(!spilled.has_interference(&LifeRange::new(34, 34), true));

        // a reload at the definition of a live value does not conflict
        let live = interval(&[(10, 14)]);
        assert!(!live.has_interference(&LifeRange::new(10, 10), true));
        assert!(live.has_interference(&LifeRange::new(12, 12), true));
    }

    #[test]
    fn test_use_priorities() {
        let mut interval = interval(&[(2, 12)]);
        interval.add_use(12, RegisterPriority::MustHaveRegister);
        interval.add_use(9, RegisterPriority::ShouldHaveRegister);
        interval.add_use(2, RegisterPriority::MustHaveRegister);
        interval.set_def_pos(2);

        assert_eq!(interval.def_priority(), RegisterPriority::MustHaveRegister);
        assert_eq!(interval.find_use_priority(12), RegisterPriority::MustHaveRegister);
        assert_eq!(interval.find_use_priority(8), RegisterPriority::ShouldHaveRegister);
        assert_eq!(interval.find_use_priority(4), RegisterPriority::None);
        assert!(RegisterPriority::ShouldHaveRegister < RegisterPriority::MustHaveRegister);
    }

    #[test]
    fn test_intervals_grow() {
        let mut intervals = Intervals::new();
        let var = Operand::Var(VReg::new(7, ValueKind::I64));
        intervals.get_or_insert(var, 17).add_range(0, 4);
        assert!(intervals.capacity() >= 18);
        assert!(intervals.get(3).is_none());
        assert_eq!(intervals.get(17).map(|i| i.number()), Some(17));

        intervals.get_or_insert(var, 17).add_range(6, 8);
        assert_eq!(intervals.iter().count(), 1);
        assert_eq!(intervals.get(17).unwrap().ranges().len(), 2);
    }
}
