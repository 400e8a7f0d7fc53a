//! Linear-scan register allocation over a machine unit.
//!
//! Each function is processed independently by a fixed-point loop: build
//! live intervals, scan them against the register pool, and either write
//! the assignment back into the operands or lower the spilled intervals to
//! frame slots and start over. Spilling strictly shrinks the set of vregs
//! contending for registers, so the loop terminates.

pub mod assign;
pub mod duchain;
pub mod interval;
pub mod liveness;
pub mod rewrite;

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::mir::{Function, MachineUnit, Operand};

use interval::Interval;

/// Allocate registers for every function of the unit, mutating it in place.
///
/// A function either comes out fully rewritten (no vreg operands remain,
/// spill code inserted where needed) or, on error, untouched by the failing
/// round.
pub fn allocate(unit: &mut MachineUnit) -> Result<()> {
    let (funcs, labels) = unit.parts_mut();
    for func in funcs {
        allocate_function(func, labels)?;
    }
    Ok(())
}

fn allocate_function(func: &mut Function, labels: &mut u32) -> Result<()> {
    let mut synthetic: BTreeSet<u32> = BTreeSet::new();
    let mut round = 0usize;
    let mut bound = usize::MAX;

    loop {
        let mut intervals = interval::build(func)?;
        validate(func, &intervals)?;
        if round == 0 {
            // every spill round permanently demotes at least one vreg
            bound = 2 * intervals.len() + 4;
        }

        if assign::run(func, &mut intervals) {
            rewrite::apply_assignment(func, &intervals)?;
            tracing::debug!(
                func = %func.name,
                rounds = round + 1,
                intervals = intervals.len(),
                "register allocation complete"
            );
            return Ok(());
        }

        for iv in intervals.iter().filter(|iv| iv.spill) {
            if let Operand::VReg(v) = iv.value(func)
                && synthetic.contains(&v)
            {
                return Err(Error::SpillTempSpilled(v));
            }
        }

        let spilled = intervals.iter().filter(|iv| iv.spill).count();
        tracing::debug!(func = %func.name, round, spilled, "spill round");
        rewrite::emit_spill_code(func, &mut intervals, labels, &mut synthetic)?;

        round += 1;
        if round >= bound {
            return Err(Error::InvariantViolation {
                func: func.name.clone(),
                reason: format!("allocation did not converge after {round} spill rounds"),
            });
        }
    }
}

/// Reject malformed intervals before any operand is rewritten, so a failing
/// function is left unchanged by the round.
fn validate(func: &Function, intervals: &[Interval]) -> Result<()> {
    let fail = |reason: String| {
        Err(Error::InvariantViolation {
            func: func.name.clone(),
            reason,
        })
    };
    for iv in intervals {
        if iv.defs.is_empty() {
            return fail("interval without a defining operand".into());
        }
        for &r in iv.defs.iter().chain(&iv.uses) {
            if !func.operand(r).is_vreg() {
                return fail(format!("interval operand {} is not a vreg", func.operand(r)));
            }
            if func.inst(r.inst).no == 0 {
                return fail("unnumbered instruction reached".into());
            }
        }
        if iv.start > iv.end {
            return fail(format!("inverted interval [{}, {}]", iv.start, iv.end));
        }
    }
    Ok(())
}
