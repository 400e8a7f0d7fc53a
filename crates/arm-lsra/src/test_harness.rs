//! Test harness for arm-lsra unit and integration tests.
//!
//! Provides builders for the program shapes the test suite keeps needing,
//! inspection helpers over rewritten functions, and a small symbolic
//! interpreter used to check that allocation preserves semantics.

#![allow(clippy::must_use_candidate, clippy::missing_panics_doc)]

use std::collections::{BTreeMap, BTreeSet};

use crate::mir::{BinaryOp, Function, FunctionBuilder, InstKind, MachineUnit, Operand};

/// Render a function as its textual listing, one line per label or
/// instruction, without the `func` header.
pub fn render(func: &Function) -> Vec<String> {
    let mut lines = Vec::new();
    for b in func.blocks() {
        lines.push(format!(".L{}:", func.block(b).label));
        for &id in func.insts(b) {
            lines.push(func.inst(id).to_string());
        }
    }
    lines
}

/// Every physical register mentioned by any operand of the function.
pub fn pregs_mentioned(func: &Function) -> BTreeSet<u8> {
    let mut regs = BTreeSet::new();
    for id in func.inst_ids() {
        let inst = func.inst(id);
        for op in inst.defs().iter().chain(inst.uses()) {
            if let Operand::PReg(r) = op {
                regs.insert(*r);
            }
        }
    }
    regs
}

/// True when any operand still names a virtual register.
pub fn has_vregs(func: &Function) -> bool {
    func.inst_ids().any(|id| {
        let inst = func.inst(id);
        inst.defs()
            .iter()
            .chain(inst.uses())
            .any(Operand::is_vreg)
    })
}

/// Build a single-block function with `n` vregs defined in sequence and then
/// consumed one per instruction, so all `n` are live at once between the last
/// def and the first use. With `reverse_uses` the consumers run last-defined
/// first, which makes the earliest def the longest-lived interval. Returns
/// the function index in the unit.
pub fn defs_then_uses(unit: &mut MachineUnit, n: usize, reverse_uses: bool) -> usize {
    let mut b = FunctionBuilder::new(unit, "clique");
    let vregs: Vec<Operand> = (0..n).map(|_| b.vreg()).collect();
    for (i, &v) in vregs.iter().enumerate() {
        b.mov(v, Operand::Imm(i32::try_from(i).unwrap()));
    }
    let order: Vec<Operand> = if reverse_uses {
        vregs.iter().rev().copied().collect()
    } else {
        vregs.clone()
    };
    for &v in &order {
        b.mov(Operand::PReg(0), v);
    }
    b.ret();
    b.finish()
}

/// Symbolically execute a single-block function and return the sequence of
/// values written to r0, the observable channel of the test programs.
///
/// Works on both sides of allocation: registers (virtual or physical) live
/// in one environment, spill slots in a frame-offset keyed memory with the
/// frame pointer fixed at address zero. Unwritten locations read as zero.
pub fn eval_observables(func: &Function) -> Vec<i64> {
    let mut regs: BTreeMap<Operand, i64> = BTreeMap::new();
    let mut mem: BTreeMap<i64, i64> = BTreeMap::new();
    let mut observed = Vec::new();

    let eval = |regs: &BTreeMap<Operand, i64>, op: &Operand| -> i64 {
        match op {
            Operand::Imm(i) => i64::from(*i),
            Operand::Label(_) => 0,
            reg => regs.get(reg).copied().unwrap_or(0),
        }
    };

    for id in func.inst_ids() {
        let inst = func.inst(id);
        match (&inst.kind, inst.defs(), inst.uses()) {
            (InstKind::Mov, [dst], [src]) => {
                let value = eval(&regs, src);
                if *dst == Operand::PReg(0) {
                    observed.push(value);
                }
                regs.insert(*dst, value);
            }
            (InstKind::Binary(op), [dst], [lhs, rhs]) => {
                let (l, r) = (eval(&regs, lhs), eval(&regs, rhs));
                let value = apply_binary(*op, l, r);
                regs.insert(*dst, value);
            }
            (InstKind::Load, [dst], [Operand::Imm(i)]) => {
                regs.insert(*dst, i64::from(*i));
            }
            (InstKind::Load, [dst], [base]) => {
                let addr = eval(&regs, base);
                regs.insert(*dst, mem.get(&addr).copied().unwrap_or(0));
            }
            (InstKind::Load, [dst], [base, off]) => {
                let addr = eval(&regs, base) + eval(&regs, off);
                regs.insert(*dst, mem.get(&addr).copied().unwrap_or(0));
            }
            (InstKind::Store, [], [src, base, off]) => {
                let addr = eval(&regs, base) + eval(&regs, off);
                mem.insert(addr, eval(&regs, src));
            }
            (InstKind::Cmp | InstKind::Branch(_) | InstKind::Ret, ..) => {}
            other => panic!("interpreter cannot execute {other:?}"),
        }
    }
    observed
}

fn apply_binary(op: BinaryOp, l: i64, r: i64) -> i64 {
    match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                0
            } else {
                l.wrapping_div(r)
            }
        }
        BinaryOp::And => l & r,
        BinaryOp::Orr => l | r,
        BinaryOp::Eor => l ^ r,
        BinaryOp::Lsl => l.wrapping_shl(u32::try_from(r & 63).unwrap_or(0)),
        BinaryOp::Asr => l.wrapping_shr(u32::try_from(r & 63).unwrap_or(0)),
    }
}

/// Count the instructions of a function, spill code included.
pub fn inst_count(func: &Function) -> usize {
    func.inst_ids().count()
}
