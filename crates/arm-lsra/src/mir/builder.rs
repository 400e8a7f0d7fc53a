use super::{BinaryOp, BlockId, Cond, Function, Inst, InstId, MachineUnit, Operand};

/// Convenience layer for constructing functions instruction by instruction.
///
/// Vreg ids and block labels are minted from the unit's label counter, so
/// everything built through one unit stays collision-free. The builder
/// records successor edges as branches are emitted; fallthrough edges
/// between adjacent blocks are added with [`FunctionBuilder::edge`].
pub struct FunctionBuilder<'a> {
    unit: &'a mut MachineUnit,
    func: Function,
    cur: BlockId,
}

impl<'a> FunctionBuilder<'a> {
    /// Start a function with a fresh entry block.
    pub fn new(unit: &'a mut MachineUnit, name: &str) -> Self {
        let mut func = Function::new(name);
        let label = unit.fresh_label();
        let cur = func.add_block(label);
        Self { unit, func, cur }
    }

    pub fn vreg(&mut self) -> Operand {
        Operand::VReg(self.unit.fresh_label())
    }

    /// Append a new block (does not switch to it).
    pub fn block(&mut self) -> BlockId {
        let label = self.unit.fresh_label();
        self.func.add_block(label)
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.cur = block;
    }

    /// Record a fallthrough edge from the current block.
    pub fn edge(&mut self, to: BlockId) {
        self.func.add_succ(self.cur, to);
    }

    pub fn push(&mut self, inst: Inst) -> InstId {
        self.func.push_inst(self.cur, inst)
    }

    pub fn mov(&mut self, dst: Operand, src: Operand) -> InstId {
        self.push(Inst::mov(dst, src))
    }

    pub fn binary(&mut self, op: BinaryOp, dst: Operand, lhs: Operand, rhs: Operand) -> InstId {
        self.push(Inst::binary(op, dst, lhs, rhs))
    }

    pub fn load(&mut self, dst: Operand, addr: Vec<Operand>) -> InstId {
        self.push(Inst::load(dst, addr))
    }

    pub fn store(&mut self, src: Operand, base: Operand, off: Operand) -> InstId {
        self.push(Inst::store(src, base, off))
    }

    pub fn cmp(&mut self, lhs: Operand, rhs: Operand) -> InstId {
        self.push(Inst::cmp(lhs, rhs))
    }

    /// Emit a branch to `target` and record the successor edge.
    pub fn branch(&mut self, cond: Option<Cond>, target: BlockId) -> InstId {
        let label = self.func.block(target).label;
        self.func.add_succ(self.cur, target);
        self.push(Inst::branch(cond, Operand::Label(label)))
    }

    pub fn ret(&mut self) -> InstId {
        self.push(Inst::ret())
    }

    /// Hand the finished function to the unit; returns its index.
    pub fn finish(self) -> usize {
        self.unit.add_func(self.func)
    }
}
