//! Property-based tests for the allocator.
//!
//! Uses `proptest` to generate random straight-line programs and verify:
//! - Allocation never leaves a vreg operand behind
//! - Observable behavior (the r0 value sequence) is preserved
//! - Interval coverage and non-interference of the assignment
//! - Idempotence on already-allocated functions

use proptest::prelude::*;

use arm_lsra::abi::ALLOCATABLE_REGS;
use arm_lsra::mir::{BinaryOp, FunctionBuilder, MachineUnit, Operand};
use arm_lsra::regalloc::{assign, interval};
use arm_lsra::test_harness::*;
use arm_lsra::allocate;

/// One step of a generated program, indices resolved modulo the number of
/// vregs defined so far.
#[derive(Debug, Clone, Copy)]
enum Step {
    Def(i32),
    Bin(u8, usize, usize),
    Out(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<i32>().prop_map(Step::Def),
        (0u8..6, any::<usize>(), any::<usize>()).prop_map(|(op, a, b)| Step::Bin(op, a, b)),
        any::<usize>().prop_map(Step::Out),
    ]
}

fn binary_op(code: u8) -> BinaryOp {
    match code {
        0 => BinaryOp::Add,
        1 => BinaryOp::Sub,
        2 => BinaryOp::Mul,
        3 => BinaryOp::And,
        4 => BinaryOp::Orr,
        _ => BinaryOp::Eor,
    }
}

/// Materialize a step list as a single-block function; returns its index.
fn build_program(unit: &mut MachineUnit, steps: &[Step]) -> usize {
    let mut b = FunctionBuilder::new(unit, "generated");
    let mut vregs: Vec<Operand> = Vec::new();
    for step in steps {
        match *step {
            Step::Def(c) => {
                let v = b.vreg();
                b.mov(v, Operand::Imm(c));
                vregs.push(v);
            }
            Step::Bin(op, a, c) => {
                if vregs.is_empty() {
                    continue;
                }
                let lhs = vregs[a % vregs.len()];
                let rhs = vregs[c % vregs.len()];
                let dst = b.vreg();
                b.binary(binary_op(op), dst, lhs, rhs);
                vregs.push(dst);
            }
            Step::Out(a) => {
                if vregs.is_empty() {
                    continue;
                }
                b.mov(Operand::PReg(0), vregs[a % vregs.len()]);
            }
        }
    }
    b.ret();
    b.finish()
}

// =============================================================================
// Full allocation: rewriting, semantics, idempotence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every generated program allocates without error and ends up vreg-free.
    #[test]
    fn allocation_eliminates_all_vregs(steps in prop::collection::vec(step_strategy(), 1..60)) {
        let mut unit = MachineUnit::new();
        let idx = build_program(&mut unit, &steps);
        allocate(&mut unit).unwrap();
        prop_assert!(!has_vregs(&unit.funcs()[idx]));
    }

    /// The sequence of values reaching r0 is unchanged by allocation,
    /// spill code included.
    #[test]
    fn allocation_preserves_observables(steps in prop::collection::vec(step_strategy(), 1..60)) {
        let mut unit = MachineUnit::new();
        let idx = build_program(&mut unit, &steps);
        let before = eval_observables(&unit.funcs()[idx]);
        allocate(&mut unit).unwrap();
        prop_assert_eq!(eval_observables(&unit.funcs()[idx]), before);
    }

    /// Allocating an already-allocated function changes nothing.
    #[test]
    fn allocation_is_idempotent(steps in prop::collection::vec(step_strategy(), 1..40)) {
        let mut unit = MachineUnit::new();
        let idx = build_program(&mut unit, &steps);
        allocate(&mut unit).unwrap();
        let first = render(&unit.funcs()[idx]);
        allocate(&mut unit).unwrap();
        prop_assert_eq!(render(&unit.funcs()[idx]), first);
    }

    /// Only r0 (the observable channel), the frame pointer, and allocatable
    /// registers ever appear in a rewritten function, and every allocatable
    /// register in use is reported as saved.
    #[test]
    fn saved_regs_cover_the_assignment(steps in prop::collection::vec(step_strategy(), 1..40)) {
        let mut unit = MachineUnit::new();
        let idx = build_program(&mut unit, &steps);
        allocate(&mut unit).unwrap();
        let func = &unit.funcs()[idx];
        for r in pregs_mentioned(func) {
            prop_assert!(
                r == 0 || r == arm_lsra::abi::FRAME_POINTER || ALLOCATABLE_REGS.contains(&r)
            );
            if ALLOCATABLE_REGS.contains(&r) {
                prop_assert!(func.saved_regs().contains(&r));
            }
        }
        for &r in func.saved_regs() {
            prop_assert!(ALLOCATABLE_REGS.contains(&r));
        }
    }
}

// =============================================================================
// Interval-level invariants of a single scan
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every def and use of every interval lies inside `[start, end]`.
    #[test]
    fn intervals_cover_their_operands(steps in prop::collection::vec(step_strategy(), 1..60)) {
        let mut unit = MachineUnit::new();
        let idx = build_program(&mut unit, &steps);
        let func = &mut unit.funcs_mut()[idx];
        let intervals = interval::build(func).unwrap();
        for iv in &intervals {
            prop_assert!(iv.start <= iv.end);
            for r in iv.defs.iter().chain(&iv.uses) {
                let no = func.inst(r.inst).no;
                prop_assert!(iv.covers(no), "[{}, {}] misses {}", iv.start, iv.end, no);
            }
        }
    }

    /// Two intervals holding the same register never overlap.
    #[test]
    fn assigned_registers_do_not_interfere(steps in prop::collection::vec(step_strategy(), 1..60)) {
        let mut unit = MachineUnit::new();
        let idx = build_program(&mut unit, &steps);
        let func = &mut unit.funcs_mut()[idx];
        let mut intervals = interval::build(func).unwrap();
        assign::run(func, &mut intervals);

        let assigned: Vec<_> = intervals
            .iter()
            .filter(|iv| !iv.spill && iv.rreg.is_some())
            .collect();
        for (i, a) in assigned.iter().enumerate() {
            for b in &assigned[i + 1..] {
                if a.rreg == b.rreg {
                    prop_assert!(
                        a.end < b.start || b.end < a.start,
                        "overlap: [{}, {}] and [{}, {}] both in r{}",
                        a.start, a.end, b.start, b.end, a.rreg.unwrap_or(0)
                    );
                }
            }
        }
    }
}
