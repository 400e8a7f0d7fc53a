//! Def–use chain construction.
//!
//! Numbers every instruction, then sweeps each block backward with a live
//! map from vreg value to the use instances reaching the current point.
//! A def records the reaching uses as its chain and kills every use of its
//! value; a use inserts itself. The result maps each def-operand instance
//! to the set of use-operand instances it reaches.

// Instruction counts fit comfortably in the i32 numbering space.
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::mir::{Function, OperandRef, Slot};

use super::liveness;

pub type DuChains = BTreeMap<OperandRef, BTreeSet<OperandRef>>;

pub fn build(func: &mut Function) -> Result<DuChains> {
    let live = liveness::analyze(func);

    // a value live into the entry block has a use no definition reaches
    if let Some(entry) = func.blocks().next()
        && let Some((val, _)) = func.block(entry).live_in.first_key_value()
    {
        return Err(Error::InvariantViolation {
            func: func.name.clone(),
            reason: format!("{val} is live into the function entry without a reaching definition"),
        });
    }

    number_insts(func);

    let mut chains = DuChains::new();
    for b in func.blocks() {
        let mut reaching = func.block(b).live_out.clone();
        for &id in func.insts(b).iter().rev() {
            let inst = func.inst(id);
            for (i, op) in inst.defs().iter().enumerate() {
                if !op.is_vreg() {
                    continue;
                }
                let d = OperandRef {
                    inst: id,
                    slot: Slot::Def(i),
                };
                let uses = reaching.get(op).cloned().unwrap_or_default();
                chains.entry(d).or_default().extend(uses);
                // this def kills every use of the value below it
                if let (Some(set), Some(killed)) = (reaching.get_mut(op), live.all_uses.get(op)) {
                    *set = set.difference(killed).copied().collect();
                }
            }
            for (i, op) in inst.uses().iter().enumerate() {
                if op.is_vreg() {
                    reaching.entry(*op).or_default().insert(OperandRef {
                        inst: id,
                        slot: Slot::Use(i),
                    });
                }
            }
        }
    }
    Ok(chains)
}

/// Assign linearization numbers: blocks in program order own ascending
/// ranges, and within a block numbers ascend in program order. Instructions
/// are visited in reverse and handed descending numbers from a running
/// counter, so the first instruction of the first block ends up with 1.
fn number_insts(func: &mut Function) {
    let mut counter = 0i32;
    for b in func.blocks() {
        let ids: Vec<_> = func.insts(b).to_vec();
        counter += ids.len() as i32;
        let mut no = counter;
        for &id in ids.iter().rev() {
            func.inst_mut(id).no = no;
            no -= 1;
        }
    }
}
