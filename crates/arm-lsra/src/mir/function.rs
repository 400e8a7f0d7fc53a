use std::collections::BTreeSet;

use crate::abi;
use crate::error::{Error, Result};

use super::{Inst, Operand, OperandRef, OperandSet};

/// Index of an instruction in its function's arena.
///
/// Stable for the lifetime of the function: splicing new instructions into a
/// block never moves existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Placeholder for instructions not yet spliced into a block.
    pub(crate) const DETACHED: Self = Self(usize::MAX);
}

/// Basic block: an ordered run of instructions plus its successor edges and
/// the live sets the analysis stores on it.
#[derive(Debug, Default)]
pub struct Block {
    pub label: u32,
    insts: Vec<InstId>,
    succs: Vec<BlockId>,
    pub live_in: OperandSet,
    pub live_out: OperandSet,
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    arena: Vec<Inst>,
    blocks: Vec<Block>,
    stack_size: u32,
    saved_regs: BTreeSet<u8>,
}

impl Function {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arena: Vec::new(),
            blocks: Vec::new(),
            stack_size: 0,
            saved_regs: BTreeSet::new(),
        }
    }

    pub fn add_block(&mut self, label: u32) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block {
            label,
            ..Block::default()
        });
        id
    }

    pub fn add_succ(&mut self, from: BlockId, to: BlockId) {
        let succs = &mut self.blocks[from.0].succs;
        if !succs.contains(&to) {
            succs.push(to);
        }
    }

    /// Block ids in program order.
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = BlockId> + ExactSizeIterator + use<> {
        (0..self.blocks.len()).map(BlockId)
    }

    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    #[must_use]
    pub fn succs(&self, id: BlockId) -> &[BlockId] {
        &self.blocks[id.0].succs
    }

    /// Instruction ids of a block, in program order.
    #[must_use]
    pub fn insts(&self, id: BlockId) -> &[InstId] {
        &self.blocks[id.0].insts
    }

    /// Every instruction id of the function, blocks in order.
    pub fn inst_ids(&self) -> impl Iterator<Item = InstId> + '_ {
        self.blocks.iter().flat_map(|b| b.insts.iter().copied())
    }

    #[must_use]
    pub fn inst(&self, id: InstId) -> &Inst {
        &self.arena[id.0]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Inst {
        &mut self.arena[id.0]
    }

    #[must_use]
    pub fn operand(&self, r: OperandRef) -> &Operand {
        self.arena[r.inst.0].operand(r.slot)
    }

    pub fn operand_mut(&mut self, r: OperandRef) -> &mut Operand {
        self.arena[r.inst.0].operand_mut(r.slot)
    }

    pub fn push_inst(&mut self, block: BlockId, mut inst: Inst) -> InstId {
        inst.block = block;
        let id = InstId(self.arena.len());
        self.arena.push(inst);
        self.blocks[block.0].insts.push(id);
        id
    }

    /// Splice `inst` into the anchor's block immediately before it.
    pub fn insert_before(&mut self, anchor: InstId, inst: Inst) -> InstId {
        self.splice(anchor, 0, inst)
    }

    /// Splice `inst` into the anchor's block immediately after it.
    pub fn insert_after(&mut self, anchor: InstId, inst: Inst) -> InstId {
        self.splice(anchor, 1, inst)
    }

    fn splice(&mut self, anchor: InstId, offset: usize, mut inst: Inst) -> InstId {
        let block = self.arena[anchor.0].block;
        inst.block = block;
        let id = InstId(self.arena.len());
        self.arena.push(inst);
        let list = &mut self.blocks[block.0].insts;
        let pos = list
            .iter()
            .position(|&i| i == anchor)
            .expect("anchor instruction is not in its block");
        list.insert(pos + offset, id);
        id
    }

    /// Reserve `bytes` of frame space; returns the cumulative frame size,
    /// which callers negate to obtain the FP-relative displacement.
    pub fn alloc_stack(&mut self, bytes: u32) -> Result<u32> {
        let requested = self.stack_size + bytes;
        if requested > abi::MAX_FRAME_BYTES {
            return Err(Error::FrameBudgetExceeded {
                func: self.name.clone(),
                requested,
                budget: abi::MAX_FRAME_BYTES,
            });
        }
        self.stack_size = requested;
        Ok(requested)
    }

    #[must_use]
    pub fn stack_size(&self) -> u32 {
        self.stack_size
    }

    pub fn add_saved_reg(&mut self, preg: u8) {
        self.saved_regs.insert(preg);
    }

    /// Physical registers the prologue must preserve.
    #[must_use]
    pub fn saved_regs(&self) -> &BTreeSet<u8> {
        &self.saved_regs
    }
}

/// A machine translation unit: the functions plus the monotonic label
/// counter used to mint synthetic vregs and block labels.
///
/// Keeping the counter on the unit rather than in process-global state makes
/// separate units (and test runs) reproducible.
#[derive(Debug, Default)]
pub struct MachineUnit {
    funcs: Vec<Function>,
    next_label: u32,
}

impl MachineUnit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh label, shared between vreg ids and block labels.
    pub fn fresh_label(&mut self) -> u32 {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    /// Make sure future labels stay above ids already present, e.g. after
    /// loading a unit from its textual form.
    pub fn reserve_labels(&mut self, floor: u32) {
        self.next_label = self.next_label.max(floor);
    }

    pub fn add_func(&mut self, func: Function) -> usize {
        self.funcs.push(func);
        self.funcs.len() - 1
    }

    #[must_use]
    pub fn funcs(&self) -> &[Function] {
        &self.funcs
    }

    pub fn funcs_mut(&mut self) -> &mut [Function] {
        &mut self.funcs
    }

    /// Split borrow for the allocator: the functions and the label counter.
    pub(crate) fn parts_mut(&mut self) -> (&mut [Function], &mut u32) {
        (&mut self.funcs, &mut self.next_label)
    }
}
