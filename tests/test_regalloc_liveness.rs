use orzra::{
    lir::RegisterConfig,
    regalloc::{liveness_analysis::Liveness, AllocatorConfig},
};

mod common;

#[test]
fn test_regalloc_liveness() {
    let mut lir = common::swap_loop();
    let regs = RegisterConfig::toy(3, 2);

    let liveness = Liveness::compute(&mut lir, &regs, &AllocatorConfig::default()).unwrap();
    println!("{}", lir.display());

    let first = liveness.first_variable_number();
    assert_eq!(first, regs.num_registers());
    let (a, b, x, y, cond) = (first, first + 1, first + 2, first + 3, first + 4);

    let blocks = lir.blocks();
    let (entry, header, body, exit) = (blocks[0], blocks[1], blocks[2], blocks[3]);

    // the phis are defined by the label of the header
    assert!(liveness.live_in(&lir, header).not_any());
    assert!(liveness.live_out(&lir, entry).not_any());

    let out = liveness.live_out(&lir, header);
    assert!(out[x] && out[y]);
    assert!(!out[cond]);

    let body_in = liveness.live_in(&lir, body);
    assert!(body_in[x] && body_in[y]);
    assert!(liveness.live_out(&lir, body).not_any());

    let exit_in = liveness.live_in(&lir, exit);
    assert!(exit_in[x]);
    assert!(!exit_in[y]);

    for number in [a, b] {
        for &block in blocks {
            assert!(!liveness.live_in(&lir, block)[number]);
        }
    }

    assert!(liveness.is_interval_in_loop(x, 0));
    assert!(!liveness.is_interval_in_loop(a, 0));
}

#[test]
fn test_regalloc_liveness_numbering() {
    let mut lir = common::loop_pressure();
    let regs = RegisterConfig::toy(2, 0);

    let liveness = Liveness::compute(&mut lir, &regs, &AllocatorConfig::default()).unwrap();
    println!("{}", lir.display());

    let blocks = lir.blocks();
    assert_eq!(liveness.block_bounds(&lir, blocks[0]), (0, 6));
    assert_eq!(liveness.block_bounds(&lir, blocks[1]), (8, 12));
    assert_eq!(liveness.block_bounds(&lir, blocks[2]), (14, 18));
    assert_eq!(liveness.block_bounds(&lir, blocks[3]), (20, 22));
    assert_eq!(liveness.max_id(), 22);

    // v0 is defined before the loop and used in and after it
    let v0 = liveness.first_variable_number();
    for &block in &blocks[1..] {
        assert!(liveness.live_in(&lir, block)[v0]);
    }
}
