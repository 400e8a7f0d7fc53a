//! The linear scan itself: walk the intervals in start order, expire the
//! finished ones back into the register pool, and when the pool runs dry
//! spill whichever of the contending intervals ends last.

use crate::abi::ALLOCATABLE_REGS;
use crate::mir::Function;

use super::interval::Interval;

/// One scan over the sorted intervals. Returns true when every interval
/// received a physical register, false when at least one was marked for
/// spilling.
pub fn run(func: &mut Function, intervals: &mut [Interval]) -> bool {
    let mut pool: Vec<u8> = ALLOCATABLE_REGS.to_vec();
    // indices into `intervals`, kept sorted by ascending end point
    let mut active: Vec<usize> = Vec::new();
    let mut success = true;

    for idx in 0..intervals.len() {
        expire_old(intervals, &mut active, &mut pool, idx);
        if pool.is_empty() {
            spill_at_interval(func, intervals, &mut active, idx);
            success = false;
        } else {
            intervals[idx].rreg = Some(pool.remove(0));
            active.push(idx);
            active.sort_by_key(|&a| intervals[a].end);
        }
    }
    success
}

/// Return the registers of every active interval that ends before `current`
/// starts. `active` is sorted by end, so only the head needs checking.
fn expire_old(intervals: &[Interval], active: &mut Vec<usize>, pool: &mut Vec<u8>, current: usize) {
    while let Some(&head) = active.first() {
        if intervals[head].end >= intervals[current].start {
            return;
        }
        if let Some(reg) = intervals[head].rreg {
            pool.push(reg);
            pool.sort_unstable();
        }
        active.remove(0);
    }
}

/// Heuristic spill: compare `current` with the active interval that ends
/// last. The one ending later loses; if that is the active one, `current`
/// inherits its register and takes its place.
fn spill_at_interval(
    func: &mut Function,
    intervals: &mut [Interval],
    active: &mut Vec<usize>,
    current: usize,
) {
    let Some(&last) = active.last() else {
        intervals[current].spill = true;
        return;
    };
    if intervals[last].end > intervals[current].end {
        intervals[last].spill = true;
        intervals[current].rreg = intervals[last].rreg;
        if let Some(reg) = intervals[current].rreg {
            func.add_saved_reg(reg);
        }
        let len = active.len();
        active[len - 1] = current;
        active.sort_by_key(|&a| intervals[a].end);
    } else {
        intervals[current].spill = true;
    }
}
