use orzra::{
    lir::{InsertPosition, InstData, Lir, LirMoveFactory, PReg, RegKind, RegisterConfig},
    regalloc::{move_resolver::MoveResolver, AllocatorConfig, GraphColoringAllocation},
};

mod common;

fn permutations(n: u8) -> Vec<Vec<u8>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for perm in permutations(n - 1) {
        for i in 0..n as usize {
            let mut next = perm.clone();
            next.insert(i, n - 1);
            result.push(next);
        }
    }
    result
}

/// The number of cycles longer than one.
fn count_cycles(perm: &[u8]) -> usize {
    let mut visited = vec![false; perm.len()];
    let mut cycles = 0;
    for start in 0..perm.len() {
        if visited[start] || perm[start] as usize == start {
            continue;
        }
        cycles += 1;
        let mut i = start;
        while !visited[i] {
            visited[i] = true;
            i = perm[i] as usize;
        }
    }
    cycles
}

#[test]
fn test_regalloc_resolver_permutations() {
    let regs = RegisterConfig::toy(4, 0);
    let r = |n: u8| PReg::new(n, RegKind::General);

    for perm in permutations(4) {
        let mut lir = Lir::new("permutation");
        let block = lir.add_block();
        let mut init = InstData::op("init");
        let mut ret = InstData::ret();
        for n in 0..4 {
            init = init.output(r(n));
            ret = ret.input(r(n));
        }
        lir.append(block, init);
        let ret = lir.append(block, ret);

        let mut resolver = MoveResolver::new();
        resolver.set_insert_position(InsertPosition::Before(ret));
        for (from, &to) in perm.iter().enumerate() {
            if from as u8 != to {
                resolver.add_mapping(r(from as u8).into(), r(to).into());
            }
        }
        resolver
            .resolve_and_append_moves(&mut lir, &LirMoveFactory)
            .unwrap();

        // `init` defines 100, 101, ... in register order
        let mut expected = vec![0; 4];
        for (from, &to) in perm.iter().enumerate() {
            expected[to as usize] = 100 + from as i64;
        }
        let trace = common::execute(&lir, &regs, &[]);
        assert_eq!(trace.last().unwrap().1, expected, "{:?}", perm);

        let cycles = count_cycles(&perm);
        let moved = perm
            .iter()
            .enumerate()
            .filter(|&(from, &to)| from as u8 != to)
            .count();
        assert_eq!(resolver.stats.cycle_breaking_slots, cycles, "{:?}", perm);
        assert_eq!(resolver.stats.moves, moved + cycles, "{:?}", perm);
        assert_eq!(lir.frame().num_slots(), cycles);
    }
}

#[test]
fn test_regalloc_resolver_equal_locations() {
    let regs = RegisterConfig::toy(2, 0);
    let mut lir = common::merge_same();
    let mut allocation = GraphColoringAllocation::new(AllocatorConfig::default());
    allocation
        .run_on_lir(&mut lir, &regs, &LirMoveFactory)
        .unwrap();
    println!("{}", lir.display());

    assert_eq!(allocation.phi_resolution_moves, 0);
    for &block in lir.blocks() {
        assert_eq!(common::count_moves(&lir, block), 0);
    }
}

#[test]
fn test_regalloc_resolver_swap() {
    let regs = RegisterConfig::toy(3, 2);
    let mut lir = common::swap_loop();
    let mut allocation = GraphColoringAllocation::new(AllocatorConfig::default());
    allocation
        .run_on_lir(&mut lir, &regs, &LirMoveFactory)
        .unwrap();
    println!("{}", lir.display());

    // the back edge swaps the two phis through one slot
    let body = lir.blocks()[2];
    assert_eq!(common::count_moves(&lir, body), 3);
    assert_eq!(allocation.cycle_breaking_slots, 1);
    assert_eq!(lir.frame().num_slots(), 1);
    // two moves on the entry edge, two on the back edge
    assert_eq!(allocation.phi_resolution_moves, 4);
}

#[test]
fn test_regalloc_resolver_constants() {
    let regs = RegisterConfig::toy(2, 2);
    let mut lir = common::diamond();
    let mut allocation = GraphColoringAllocation::new(AllocatorConfig::default());
    allocation
        .run_on_lir(&mut lir, &regs, &LirMoveFactory)
        .unwrap();
    println!("{}", lir.display());

    // one of the values is already in place on the first edge
    assert_eq!(allocation.phi_resolution_moves, 3);
    assert_eq!(allocation.stack_to_stack_moves, 0);
    let blocks = lir.blocks();
    assert_eq!(common::count_moves(&lir, blocks[1]), 1);
    assert_eq!(common::count_moves(&lir, blocks[2]), 2);
}
