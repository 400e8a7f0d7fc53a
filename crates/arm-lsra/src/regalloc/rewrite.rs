//! Rewriting after the scan: on success physical register numbers are
//! written into the operands; spilled intervals get a frame slot and
//! explicit loads before every use and stores after every def, with an
//! extra literal load when the displacement exceeds the immediate range.

// Frame displacements are small negative offsets; the casts cannot wrap.
#![allow(clippy::cast_possible_wrap)]

use std::collections::BTreeSet;

use crate::abi::{FRAME_POINTER, MAX_LOAD_STORE_OFFSET, SPILL_SLOT_BYTES};
use crate::error::{Error, Result};
use crate::mir::{Function, Inst, Operand};

use super::interval::Interval;

/// Write every interval's register into its def and use operands and record
/// it for the prologue.
pub fn apply_assignment(func: &mut Function, intervals: &[Interval]) -> Result<()> {
    for iv in intervals {
        let Some(reg) = iv.rreg else {
            return Err(Error::InvariantViolation {
                func: func.name.clone(),
                reason: "interval reached rewrite without a register".into(),
            });
        };
        func.add_saved_reg(reg);
        for &d in &iv.defs {
            func.operand_mut(d).set_reg(reg);
        }
        for &u in &iv.uses {
            func.operand_mut(u).set_reg(reg);
        }
    }
    Ok(())
}

/// Lower every spilled interval to a frame slot.
///
/// Each use gets a load spliced in front of its instruction, each def a
/// store behind it. Displacements outside the immediate offset range are
/// first materialized into a synthetic vreg (`ldr t, =disp`), which the
/// load or store then consumes; those temporaries are recorded in
/// `synthetic` so a later round can tell them apart from user vregs.
pub fn emit_spill_code(
    func: &mut Function,
    intervals: &mut [Interval],
    labels: &mut u32,
    synthetic: &mut BTreeSet<u32>,
) -> Result<()> {
    for iv in intervals.iter_mut().filter(|iv| iv.spill) {
        iv.disp = -(func.alloc_stack(SPILL_SLOT_BYTES)? as i32);
        let off = Operand::Imm(iv.disp);
        let fp = Operand::PReg(FRAME_POINTER);
        let wide = iv.disp.abs() > MAX_LOAD_STORE_OFFSET;

        for &u in &iv.uses {
            let value = *func.operand(u);
            if wide {
                let temp = fresh_temp(labels, synthetic);
                func.insert_before(u.inst, Inst::load(temp, vec![off]));
                func.insert_before(u.inst, Inst::load(value, vec![fp, temp]));
            } else {
                func.insert_before(u.inst, Inst::load(value, vec![fp, off]));
            }
        }
        for &d in &iv.defs {
            let value = *func.operand(d);
            if wide {
                let temp = fresh_temp(labels, synthetic);
                let materializer = func.insert_after(d.inst, Inst::load(temp, vec![off]));
                func.insert_after(materializer, Inst::store(value, fp, temp));
            } else {
                func.insert_after(d.inst, Inst::store(value, fp, off));
            }
        }
    }
    Ok(())
}

fn fresh_temp(labels: &mut u32, synthetic: &mut BTreeSet<u32>) -> Operand {
    let id = *labels;
    *labels += 1;
    synthetic.insert(id);
    Operand::VReg(id)
}
