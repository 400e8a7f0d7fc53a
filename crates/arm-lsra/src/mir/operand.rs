use std::collections::{BTreeMap, BTreeSet};

use super::InstId;

/// Operand of a machine instruction.
///
/// Equality, ordering and hashing are by value (tag plus payload), never by
/// instance: two mentions of the same vreg compare equal no matter which
/// instruction they sit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operand {
    /// Virtual register from the unbounded pool.
    VReg(u32),
    /// Physical register.
    PReg(u8),
    /// Immediate value.
    Imm(i32),
    /// Branch target.
    Label(u32),
}

impl Operand {
    #[must_use]
    pub const fn is_vreg(&self) -> bool {
        matches!(self, Self::VReg(_))
    }

    #[must_use]
    pub const fn vreg(&self) -> Option<u32> {
        match self {
            Self::VReg(v) => Some(*v),
            _ => None,
        }
    }

    /// Rewrite this operand in place into a physical register.
    pub fn set_reg(&mut self, preg: u8) {
        *self = Self::PReg(preg);
    }
}

/// Which side of its instruction an operand slot sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Def(usize),
    Use(usize),
}

/// Handle to one operand *instance*: the owning instruction plus the slot
/// inside it.
///
/// The `inst` field doubles as the back-reference to the parent instruction;
/// it indexes the function's instruction arena and stays valid across block
/// splicing, so intervals can hold these handles while spill code is being
/// inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperandRef {
    pub inst: InstId,
    pub slot: Slot,
}

/// Operand instances grouped by operand value.
///
/// The map key is the value tuple, the payload the instance handles; instance
/// identity is never used as a key. Ordered containers keep every iteration
/// over these sets deterministic.
pub type OperandSet = BTreeMap<Operand, BTreeSet<OperandRef>>;
