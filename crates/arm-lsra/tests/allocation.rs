//! End-to-end allocation scenarios over small hand-built functions.

use arm_lsra::mir::{BinaryOp, FunctionBuilder, MachineUnit, Operand};
use arm_lsra::test_harness::*;
use arm_lsra::{Error, allocate};

#[test]
fn single_def_gets_first_register() {
    let mut unit = MachineUnit::new();
    let mut b = FunctionBuilder::new(&mut unit, "trivial");
    let v0 = b.vreg();
    b.mov(v0, Operand::Imm(7));
    let idx = b.finish();

    allocate(&mut unit).unwrap();

    let func = &unit.funcs()[idx];
    assert_eq!(render(func), vec![".L0:", "mov r4, #7"]);
    assert_eq!(
        func.saved_regs().iter().copied().collect::<Vec<_>>(),
        vec![4]
    );
}

#[test]
fn disjoint_intervals_share_a_register() {
    let mut unit = MachineUnit::new();
    let mut b = FunctionBuilder::new(&mut unit, "reuse");
    let v0 = b.vreg();
    let v1 = b.vreg();
    b.mov(v0, Operand::Imm(1));
    b.mov(Operand::PReg(0), v0);
    b.mov(v1, Operand::Imm(2));
    b.mov(Operand::PReg(0), v1);
    b.ret();
    let idx = b.finish();

    allocate(&mut unit).unwrap();

    let func = &unit.funcs()[idx];
    assert_eq!(
        render(func),
        vec![
            ".L0:",
            "mov r4, #1",
            "mov r0, r4",
            "mov r4, #2",
            "mov r0, r4",
            "bx lr",
        ]
    );
    assert_eq!(
        func.saved_regs().iter().copied().collect::<Vec<_>>(),
        vec![4]
    );
}

#[test]
fn seven_simultaneously_live_fill_the_register_file() {
    let mut unit = MachineUnit::new();
    let idx = defs_then_uses(&mut unit, 7, false);
    let before = inst_count(&unit.funcs()[idx]);

    allocate(&mut unit).unwrap();

    let func = &unit.funcs()[idx];
    assert!(!has_vregs(func));
    assert_eq!(inst_count(func), before, "no spill code expected");
    let saved: Vec<u8> = func.saved_regs().iter().copied().collect();
    assert_eq!(saved, vec![4, 5, 6, 7, 8, 9, 10]);
}

#[test]
fn value_live_through_intermediate_block() {
    // v0 defined in the entry block, used two blocks later; the block in
    // between must carry it in both live sets and the interval must span it
    let mut unit = MachineUnit::new();
    let mut b = FunctionBuilder::new(&mut unit, "crossing");
    let v0 = b.vreg();
    let mid = b.block();
    let exit = b.block();

    b.mov(v0, Operand::Imm(41));
    b.branch(None, mid);

    b.switch_to(mid);
    let v1 = b.vreg();
    b.mov(v1, Operand::Imm(1));
    b.mov(Operand::PReg(0), v1);
    b.branch(None, exit);

    b.switch_to(exit);
    let v2 = b.vreg();
    b.binary(BinaryOp::Add, v2, v0, v0);
    b.mov(Operand::PReg(0), v2);
    b.ret();
    let idx = b.finish();

    let func = &mut unit.funcs_mut()[idx];
    let intervals = arm_lsra::regalloc::interval::build(func).unwrap();

    let mid_block = func.blocks().nth(1).unwrap();
    assert!(func.block(mid_block).live_in.contains_key(&v0));
    assert!(func.block(mid_block).live_out.contains_key(&v0));

    let first_of_mid = func.insts(mid_block)[0];
    let iv = intervals
        .iter()
        .find(|iv| iv.value(func) == v0)
        .expect("v0 has an interval");
    assert!(
        iv.covers(func.inst(first_of_mid).no),
        "interval [{}, {}] must cover the intermediate block",
        iv.start,
        iv.end
    );

    allocate(&mut unit).unwrap();
    assert!(!has_vregs(&unit.funcs()[idx]));
}

#[test]
fn function_without_vregs_is_untouched() {
    let mut unit = MachineUnit::new();
    let mut b = FunctionBuilder::new(&mut unit, "physical");
    b.mov(Operand::PReg(0), Operand::Imm(1));
    b.mov(Operand::PReg(1), Operand::PReg(0));
    b.ret();
    let idx = b.finish();

    let before = render(&unit.funcs()[idx]);
    allocate(&mut unit).unwrap();
    let func = &unit.funcs()[idx];
    assert_eq!(render(func), before);
    assert!(func.saved_regs().is_empty());
}

#[test]
fn allocation_is_idempotent() {
    let mut unit = MachineUnit::new();
    let idx = defs_then_uses(&mut unit, 5, false);

    allocate(&mut unit).unwrap();
    let first = render(&unit.funcs()[idx]);
    allocate(&mut unit).unwrap();
    assert_eq!(render(&unit.funcs()[idx]), first);
}

#[test]
fn saved_regs_match_the_registers_in_use() {
    for n in 1..=7 {
        let mut unit = MachineUnit::new();
        let idx = defs_then_uses(&mut unit, n, false);
        allocate(&mut unit).unwrap();

        let func = &unit.funcs()[idx];
        let allocatable: Vec<u8> = pregs_mentioned(func)
            .into_iter()
            .filter(|r| arm_lsra::abi::ALLOCATABLE_REGS.contains(r))
            .collect();
        let saved: Vec<u8> = func.saved_regs().iter().copied().collect();
        assert_eq!(saved, allocatable);
    }
}

#[test]
fn use_before_def_surfaces_a_diagnostic() {
    let mut unit = MachineUnit::new();
    let mut b = FunctionBuilder::new(&mut unit, "broken");
    let ghost = b.vreg();
    b.mov(Operand::PReg(0), ghost);
    b.ret();
    b.finish();

    assert!(matches!(
        allocate(&mut unit),
        Err(Error::InvariantViolation { .. })
    ));
}
