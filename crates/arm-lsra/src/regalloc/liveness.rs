//! Backward live-variable analysis at block granularity.
//!
//! Computes, for every block, the vreg operand instances live on entry and
//! exit, grouped by operand value:
//!
//! ```text
//! live_in(B)  = use(B) ∪ (live_out(B) \ def(B))
//! live_out(B) = ⋃ { live_in(S) : S ∈ succ(B) }
//! ```
//!
//! `use(B)` holds the upward-exposed use instances of a block, `def(B)`
//! kills by operand value. The fixpoint results are stored on the blocks;
//! the returned [`Liveness`] additionally carries every use instance of the
//! function, which the du-chain sweep needs for its kill step.

use std::collections::BTreeSet;

use crate::mir::{Function, Operand, OperandRef, OperandSet, Slot};

pub struct Liveness {
    /// Every use-operand instance in the function, grouped by vreg value.
    pub all_uses: OperandSet,
}

pub fn analyze(func: &mut Function) -> Liveness {
    let nblocks = func.num_blocks();
    let mut exposed: Vec<OperandSet> = vec![OperandSet::new(); nblocks];
    let mut kill: Vec<BTreeSet<Operand>> = vec![BTreeSet::new(); nblocks];
    let mut all_uses = OperandSet::new();

    for (idx, b) in func.blocks().enumerate() {
        let mut defined: BTreeSet<Operand> = BTreeSet::new();
        for &id in func.insts(b) {
            let inst = func.inst(id);
            // uses read the pre-instruction state, so check them against
            // the defs seen so far before recording this instruction's defs
            for (i, op) in inst.uses().iter().enumerate() {
                if op.is_vreg() {
                    let r = OperandRef {
                        inst: id,
                        slot: Slot::Use(i),
                    };
                    all_uses.entry(*op).or_default().insert(r);
                    if !defined.contains(op) {
                        exposed[idx].entry(*op).or_default().insert(r);
                    }
                }
            }
            for op in inst.defs() {
                if op.is_vreg() {
                    defined.insert(*op);
                }
            }
        }
        kill[idx] = defined;
    }

    let mut live_in: Vec<OperandSet> = vec![OperandSet::new(); nblocks];
    let mut live_out: Vec<OperandSet> = vec![OperandSet::new(); nblocks];

    let mut rounds = 0usize;
    loop {
        let mut changed = false;
        for (idx, b) in func.blocks().enumerate().rev() {
            let mut out = OperandSet::new();
            for s in func.succs(b) {
                for (val, instances) in &live_in[s.0] {
                    out.entry(*val).or_default().extend(instances.iter().copied());
                }
            }

            let mut inn = exposed[idx].clone();
            for (val, instances) in &out {
                if !kill[idx].contains(val) {
                    inn.entry(*val).or_default().extend(instances.iter().copied());
                }
            }

            if out != live_out[idx] || inn != live_in[idx] {
                live_out[idx] = out;
                live_in[idx] = inn;
                changed = true;
            }
        }
        rounds += 1;
        if !changed {
            break;
        }
    }
    tracing::trace!(func = %func.name, rounds, "live-variable fixpoint");

    for (idx, b) in func.blocks().enumerate() {
        let block = func.block_mut(b);
        block.live_in = std::mem::take(&mut live_in[idx]);
        block.live_out = std::mem::take(&mut live_out[idx]);
    }

    Liveness { all_uses }
}
