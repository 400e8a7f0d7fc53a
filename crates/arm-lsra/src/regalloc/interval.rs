//! Live-interval construction: seed one interval per du-chain entry, widen
//! across blocks using the live sets, coalesce intervals of the same vreg
//! that share uses, and sort by start point.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::mir::{Function, Operand, OperandRef};

use super::duchain;

/// A live interval: the numeric range over the instruction numbering during
/// which one vreg's value must be preserved, plus the operand instances it
/// covers and the outcome of the scan.
#[derive(Debug, Clone)]
pub struct Interval {
    pub start: i32,
    pub end: i32,
    /// Defining operand instances; never empty and all naming the same vreg.
    pub defs: BTreeSet<OperandRef>,
    /// Use operand instances reached by the defs; may be empty.
    pub uses: BTreeSet<OperandRef>,
    /// Set by the scan when this interval loses its register.
    pub spill: bool,
    /// FP-relative displacement; meaningful only once spilled.
    pub disp: i32,
    /// Physical register; assigned by the scan when not spilled.
    pub rreg: Option<u8>,
}

impl Interval {
    /// The vreg value every operand of this interval names.
    #[must_use]
    pub fn value(&self, func: &Function) -> Operand {
        let d = self.defs.first().expect("interval without defs");
        *func.operand(*d)
    }

    /// Whether `no` lies inside the closed range `[start, end]`.
    #[must_use]
    pub fn covers(&self, no: i32) -> bool {
        self.start <= no && no <= self.end
    }
}

/// Build the sorted live intervals for one allocator round.
pub fn build(func: &mut Function) -> Result<Vec<Interval>> {
    let chains = duchain::build(func)?;

    let mut intervals: Vec<Interval> = chains
        .iter()
        .map(|(d, uses)| {
            let start = func.inst(d.inst).no;
            let end = uses
                .iter()
                .map(|u| func.inst(u.inst).no)
                .max()
                .unwrap_or(start);
            Interval {
                start,
                end,
                defs: BTreeSet::from([*d]),
                uses: uses.clone(),
                spill: false,
                disp: 0,
                rreg: None,
            }
        })
        .collect();

    widen(func, &mut intervals);
    coalesce(func, &mut intervals);

    for iv in &mut intervals {
        if iv.start > iv.end {
            std::mem::swap(&mut iv.start, &mut iv.end);
        }
        debug_assert!(iv.start <= iv.end);
    }
    intervals.sort_by_key(|iv| iv.start);
    Ok(intervals)
}

/// Extend each interval over the blocks its value is live through, per the
/// live-in/live-out membership of the interval's own use instances.
fn widen(func: &Function, intervals: &mut [Interval]) {
    for iv in intervals.iter_mut() {
        if iv.uses.is_empty() {
            continue;
        }
        let value = iv.value(func);
        let (mut begin, mut end) = (iv.start, iv.end);
        for b in func.blocks() {
            let Some(&first) = func.insts(b).first() else {
                continue;
            };
            let first_no = func.inst(first).no;
            let block = func.block(b);
            let live_in = block
                .live_in
                .get(&value)
                .is_some_and(|s| iv.uses.iter().any(|u| s.contains(u)));
            let live_out = block
                .live_out
                .get(&value)
                .is_some_and(|s| iv.uses.iter().any(|u| s.contains(u)));

            if live_in && live_out {
                begin = begin.min(first_no);
                end = end.max(first_no);
            } else if !live_in && live_out {
                // live range enters the bottom of the block from a def here
                for &id in func.insts(b) {
                    let inst = func.inst(id);
                    if inst.defs().first() == Some(&value) {
                        begin = begin.min(inst.no);
                        break;
                    }
                }
                end = end.max(first_no);
            } else if live_in {
                begin = begin.min(first_no);
                let mut last = 0;
                for &u in &iv.uses {
                    let parent = func.inst(u.inst);
                    if parent.block() == b {
                        last = last.max(parent.no);
                    }
                }
                end = end.max(last);
            }
        }
        iv.start = begin;
        iv.end = end;
    }
}

/// Merge intervals of the same vreg whose use sets overlap, normalizing the
/// endpoint pair of each side before taking the union, until no pair merges.
fn coalesce(func: &Function, intervals: &mut Vec<Interval>) {
    let mut changed = true;
    while changed {
        changed = false;
        'scan: for i in 0..intervals.len() {
            for j in (i + 1)..intervals.len() {
                if intervals[i].value(func) != intervals[j].value(func)
                    || intervals[i].uses.is_disjoint(&intervals[j].uses)
                {
                    continue;
                }
                let other = intervals.remove(j);
                let iv = &mut intervals[i];
                iv.defs.extend(other.defs);
                iv.uses.extend(other.uses);
                let (a_min, a_max) = (iv.start.min(iv.end), iv.start.max(iv.end));
                let (b_min, b_max) = (other.start.min(other.end), other.start.max(other.end));
                iv.start = a_min.min(b_min);
                iv.end = a_max.max(b_max);
                changed = true;
                break 'scan;
            }
        }
    }
}
