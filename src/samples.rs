//! Small LIR programs for the allocator executable and the tests.
//!
//! Every program is built from scratch on each call, ready to be allocated.

use crate::lir::{InstData, Lir, Operand, ValueKind};

/// Three values alive at the same time, the first one used twice later.
///
/// ```text
///  0  label
///  2  v0 = def
///  4  v1 = def
///  6  v2 = def
///  8  use v1, v2
/// 10  use v0
/// 12  use v0
/// 14  ret
/// ```
pub fn pressure() -> Lir {
    let mut lir = Lir::new("pressure");
    let b0 = lir.add_block();
    let v0 = lir.new_var(ValueKind::I32);
    let v1 = lir.new_var(ValueKind::I32);
    let v2 = lir.new_var(ValueKind::I32);

    lir.append(b0, InstData::op("def").output(v0));
    lir.append(b0, InstData::op("def").output(v1));
    lir.append(b0, InstData::op("def").output(v2));
    lir.append(b0, InstData::op("use").input(v1).input(v2));
    lir.append(b0, InstData::op("use").input(v0));
    lir.append(b0, InstData::op("use").input(v0));
    lir.append(b0, InstData::ret());
    lir
}

/// A loop swapping its two phi values in every iteration.
///
/// ```text
/// bb0:  0 label
///       2 a = def
///       4 b = def
///       6 jump bb1(a, b)
/// bb1:  8 label(x, y)
///      10 cond = cmp x, y
///      12 branch cond, bb2, bb3
/// bb2: 14 label
///      16 jump bb1(y, x)
/// bb3: 18 label
///      20 ret x
/// ```
pub fn swap_loop() -> Lir {
    let mut lir = Lir::new("swap");
    let entry = lir.add_block();
    let header = lir.add_block();
    let body = lir.add_block();
    let exit = lir.add_block();

    let a = lir.new_var(ValueKind::I64);
    let b = lir.new_var(ValueKind::I64);
    let x = lir.new_var(ValueKind::I64);
    let y = lir.new_var(ValueKind::I64);
    let cond = lir.new_var(ValueKind::I32);

    lir.append(entry, InstData::op("def").output(a));
    lir.append(entry, InstData::op("def").output(b));
    lir.jump(entry, header, &[a.into(), b.into()]);

    lir.set_phis(header, &[x, y]);
    lir.append(header, InstData::op("cmp").output(cond).input(x).input(y));
    lir.branch(header, cond, body, exit);

    lir.jump(body, header, &[y.into(), x.into()]);

    lir.append(exit, InstData::ret().input(x));

    header.set_loop_index(&mut lir, Some(0));
    body.set_loop_index(&mut lir, Some(0));
    lir
}

/// A loop carrying one phi, with a value defined before the loop and used
/// in and after it.
///
/// ```text
/// bb0:  0 label
///       2 v0 = def
///       4 v1 = def
///       6 jump bb1(v1)
/// bb1:  8 label(p)
///      10 c = cmp p
///      12 branch c, bb2, bb3
/// bb2: 14 label
///      16 n = add p, v0
///      18 jump bb1(n)
/// bb3: 20 label
///      22 ret v0, p
/// ```
pub fn loop_pressure() -> Lir {
    let mut lir = Lir::new("loop_pressure");
    let entry = lir.add_block();
    let header = lir.add_block();
    let body = lir.add_block();
    let exit = lir.add_block();

    let v0 = lir.new_var(ValueKind::I32);
    let v1 = lir.new_var(ValueKind::I32);
    let p = lir.new_var(ValueKind::I32);
    let c = lir.new_var(ValueKind::I32);
    let n = lir.new_var(ValueKind::I32);

    lir.append(entry, InstData::op("def").output(v0));
    lir.append(entry, InstData::op("def").output(v1));
    lir.jump(entry, header, &[v1.into()]);

    lir.set_phis(header, &[p]);
    lir.append(header, InstData::op("cmp").output(c).input(p));
    lir.branch(header, c, body, exit);

    lir.append(body, InstData::op("add").output(n).input(p).input(v0));
    lir.jump(body, header, &[n.into()]);

    lir.append(exit, InstData::ret().input(v0).input(p));

    header.set_loop_index(&mut lir, Some(0));
    body.set_loop_index(&mut lir, Some(0));
    lir
}

/// Two paths merging their own values into one phi.
pub fn merge_same() -> Lir {
    let mut lir = Lir::new("merge_same");
    let entry = lir.add_block();
    let left = lir.add_block();
    let right = lir.add_block();
    let merge = lir.add_block();

    let v0 = lir.new_var(ValueKind::I32);
    let v1 = lir.new_var(ValueKind::I32);
    let v2 = lir.new_var(ValueKind::I32);
    let p = lir.new_var(ValueKind::I32);

    lir.append(entry, InstData::op("def").output(v0));
    lir.branch(entry, v0, left, right);

    lir.append(left, InstData::op("def").output(v1));
    lir.jump(left, merge, &[v1.into()]);

    lir.append(right, InstData::op("def").output(v2));
    lir.jump(right, merge, &[v2.into()]);

    lir.set_phis(merge, &[p]);
    lir.append(merge, InstData::ret().input(p));
    lir
}

/// Two paths merging values and constants, with a float kept across a call.
pub fn diamond() -> Lir {
    let mut lir = Lir::new("diamond");
    let entry = lir.add_block();
    let then_block = lir.add_block();
    let else_block = lir.add_block();
    let merge = lir.add_block();

    let v0 = lir.new_var(ValueKind::I32);
    let v1 = lir.new_var(ValueKind::I32);
    let f0 = lir.new_var(ValueKind::F64);
    let p0 = lir.new_var(ValueKind::I32);
    let p1 = lir.new_var(ValueKind::I32);

    lir.append(entry, InstData::op("def").output(v0));
    lir.append(entry, InstData::op("fdef").output(f0));
    lir.branch(entry, v0, then_block, else_block);

    lir.append(then_block, InstData::op("def").output(v1));
    lir.append(then_block, InstData::call("f").input(v1).state(f0));
    lir.jump(then_block, merge, &[v1.into(), Operand::Imm(1)]);

    lir.jump(else_block, merge, &[v0.into(), Operand::Imm(2)]);

    lir.set_phis(merge, &[p0, p1]);
    lir.append(merge, InstData::op("fuse").input(f0));
    lir.append(merge, InstData::ret().input(p0).input(p1));
    lir
}
