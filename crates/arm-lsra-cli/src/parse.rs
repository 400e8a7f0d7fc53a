//! Loader for the textual machine-IR listing.
//!
//! The format is exactly what the library's `Display` impls print:
//!
//! ```text
//! func main {
//! .L0:
//!     mov v0, #7
//!     b .L1
//! .L1:
//!     mov r0, v0
//!     bx lr
//! }
//! ```
//!
//! `//` starts a line comment. Successor edges are reconstructed from
//! branch targets plus fallthrough into the next block for any block that
//! does not end in an unconditional branch or return.

use anyhow::{Context, Result, bail};
use arm_lsra::abi::FRAME_POINTER;
use arm_lsra::mir::{BinaryOp, BlockId, Cond, Function, Inst, InstKind, MachineUnit, Operand};

pub fn parse_unit(src: &str) -> Result<MachineUnit> {
    let mut unit = MachineUnit::new();
    let mut max_label = 0u32;

    let mut lines = src.lines().enumerate();
    while let Some((line_no, line)) = lines.next() {
        let line = strip_comment(line);
        if line.is_empty() {
            continue;
        }
        let Some(name) = line
            .strip_prefix("func ")
            .and_then(|rest| rest.strip_suffix('{'))
        else {
            bail!("line {}: expected `func <name> {{`", line_no + 1);
        };

        let mut body = Vec::new();
        let mut closed = false;
        for (inner_no, inner) in lines.by_ref() {
            let inner = strip_comment(inner);
            if inner == "}" {
                closed = true;
                break;
            }
            if !inner.is_empty() {
                body.push((inner_no + 1, inner.to_string()));
            }
        }
        if !closed {
            bail!("function `{}` is missing its closing `}}`", name.trim());
        }

        let func = parse_function(name.trim(), &body, &mut max_label)?;
        unit.add_func(func);
    }

    unit.reserve_labels(max_label + 1);
    Ok(unit)
}

fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or("").trim()
}

fn parse_function(name: &str, body: &[(usize, String)], max_label: &mut u32) -> Result<Function> {
    let mut func = Function::new(name);

    // first pass: create the blocks so branches can reference any label
    let mut labels: Vec<(u32, BlockId)> = Vec::new();
    for (line_no, line) in body {
        if let Some(label) = line.strip_prefix(".L").and_then(|l| l.strip_suffix(':')) {
            let label: u32 = label
                .parse()
                .with_context(|| format!("line {line_no}: bad block label"))?;
            if labels.iter().any(|&(l, _)| l == label) {
                bail!("line {line_no}: duplicate block label .L{label}");
            }
            *max_label = (*max_label).max(label);
            labels.push((label, func.add_block(label)));
        }
    }
    if labels.is_empty() {
        bail!("function `{name}` has no blocks");
    }

    let block_of = |label: u32| labels.iter().find(|&&(l, _)| l == label).map(|&(_, b)| b);

    // second pass: instructions, collecting branch targets for the edges
    let mut cur: Option<(usize, BlockId)> = None;
    let mut fallthrough_open: Vec<bool> = vec![true; labels.len()];
    for (line_no, line) in body {
        if line.strip_prefix(".L").and_then(|l| l.strip_suffix(':')).is_some() {
            let pos = cur.map_or(0, |(i, _)| i + 1);
            cur = Some((pos, labels[pos].1));
            continue;
        }
        let Some((pos, block)) = cur else {
            bail!("line {line_no}: instruction before the first block label");
        };
        let (inst, target) = parse_inst(line, max_label)
            .with_context(|| format!("line {line_no}: cannot parse `{line}`"))?;

        if matches!(inst.kind, InstKind::Branch(None) | InstKind::Ret) {
            fallthrough_open[pos] = false;
        }
        if let Some(target) = target {
            let Some(to) = block_of(target) else {
                bail!("line {line_no}: branch to unknown label .L{target}");
            };
            func.push_inst(block, inst);
            func.add_succ(block, to);
            continue;
        }
        func.push_inst(block, inst);
    }

    for (pos, &(_, block)) in labels.iter().enumerate() {
        if fallthrough_open[pos] && pos + 1 < labels.len() {
            func.add_succ(block, labels[pos + 1].1);
        }
    }
    Ok(func)
}

/// Parse one instruction line; returns the branch target label, if any.
fn parse_inst(line: &str, max_label: &mut u32) -> Result<(Inst, Option<u32>)> {
    let (mnemonic, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let ops = split_operands(rest);

    match mnemonic {
        "mov" => {
            let [d, s] = expect_operands::<2>(&ops)?;
            Ok((
                Inst::mov(parse_operand(d, max_label)?, parse_operand(s, max_label)?),
                None,
            ))
        }
        "add" => binary_inst(BinaryOp::Add, &ops, max_label),
        "sub" => binary_inst(BinaryOp::Sub, &ops, max_label),
        "mul" => binary_inst(BinaryOp::Mul, &ops, max_label),
        "sdiv" => binary_inst(BinaryOp::Div, &ops, max_label),
        "and" => binary_inst(BinaryOp::And, &ops, max_label),
        "orr" => binary_inst(BinaryOp::Orr, &ops, max_label),
        "eor" => binary_inst(BinaryOp::Eor, &ops, max_label),
        "lsl" => binary_inst(BinaryOp::Lsl, &ops, max_label),
        "asr" => binary_inst(BinaryOp::Asr, &ops, max_label),
        "cmp" => {
            let [l, r] = expect_operands::<2>(&ops)?;
            Ok((
                Inst::cmp(parse_operand(l, max_label)?, parse_operand(r, max_label)?),
                None,
            ))
        }
        "ldr" => {
            let [d, addr] = expect_operands::<2>(&ops)?;
            let dst = parse_operand(d, max_label)?;
            if let Some(imm) = addr.strip_prefix('=') {
                let value: i32 = imm.parse().context("bad literal operand")?;
                return Ok((Inst::load(dst, vec![Operand::Imm(value)]), None));
            }
            let inner = parse_address(addr, max_label)?;
            Ok((Inst::load(dst, inner), None))
        }
        "str" => {
            let [s, addr] = expect_operands::<2>(&ops)?;
            let src = parse_operand(s, max_label)?;
            let inner = parse_address(addr, max_label)?;
            let (base, off) = match inner.as_slice() {
                [base] => (*base, Operand::Imm(0)),
                [base, off] => (*base, *off),
                _ => bail!("store address must have one or two components"),
            };
            Ok((Inst::store(src, base, off), None))
        }
        "bx" => {
            if !(ops.len() == 1 && ops[0] == "lr") {
                bail!("only `bx lr` is supported");
            }
            Ok((Inst::ret(), None))
        }
        "b" | "beq" | "bne" | "blt" | "ble" | "bgt" | "bge" => {
            let [target] = expect_operands::<1>(&ops)?;
            let Some(label) = target.strip_prefix(".L") else {
                bail!("branch target must be a .L label");
            };
            let label: u32 = label.parse().context("bad branch label")?;
            *max_label = (*max_label).max(label);
            let cond = match mnemonic {
                "b" => None,
                "beq" => Some(Cond::Eq),
                "bne" => Some(Cond::Ne),
                "blt" => Some(Cond::Lt),
                "ble" => Some(Cond::Le),
                "bgt" => Some(Cond::Gt),
                _ => Some(Cond::Ge),
            };
            Ok((
                Inst::branch(cond, Operand::Label(label)),
                Some(label),
            ))
        }
        other => bail!("unknown mnemonic `{other}`"),
    }
}

fn binary_inst(op: BinaryOp, ops: &[String], max_label: &mut u32) -> Result<(Inst, Option<u32>)> {
    let [d, l, r] = expect_operands::<3>(ops)?;
    Ok((
        Inst::binary(
            op,
            parse_operand(d, max_label)?,
            parse_operand(l, max_label)?,
            parse_operand(r, max_label)?,
        ),
        None,
    ))
}

/// Split an operand list on top-level commas, leaving `[...]` groups intact.
fn split_operands(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

fn expect_operands<'a, const N: usize>(ops: &'a [String]) -> Result<[&'a str; N]> {
    if ops.len() != N {
        bail!("expected {N} operands, found {}", ops.len());
    }
    let mut arr = [""; N];
    for (slot, op) in arr.iter_mut().zip(ops) {
        *slot = op.as_str();
    }
    Ok(arr)
}

fn parse_address(addr: &str, max_label: &mut u32) -> Result<Vec<Operand>> {
    let Some(inner) = addr.strip_prefix('[').and_then(|a| a.strip_suffix(']')) else {
        bail!("expected a bracketed address, found `{addr}`");
    };
    inner
        .split(',')
        .map(|part| parse_operand(part.trim(), max_label))
        .collect()
}

fn parse_operand(tok: &str, max_label: &mut u32) -> Result<Operand> {
    if tok == "fp" {
        return Ok(Operand::PReg(FRAME_POINTER));
    }
    if let Some(imm) = tok.strip_prefix('#') {
        let value: i32 = imm.parse().with_context(|| format!("bad immediate `{tok}`"))?;
        return Ok(Operand::Imm(value));
    }
    if let Some(label) = tok.strip_prefix(".L") {
        let label: u32 = label.parse().with_context(|| format!("bad label `{tok}`"))?;
        *max_label = (*max_label).max(label);
        return Ok(Operand::Label(label));
    }
    if let Some(v) = tok.strip_prefix('v') {
        let id: u32 = v.parse().with_context(|| format!("bad vreg `{tok}`"))?;
        *max_label = (*max_label).max(id);
        return Ok(Operand::VReg(id));
    }
    if let Some(r) = tok.strip_prefix('r') {
        let id: u8 = r.parse().with_context(|| format!("bad register `{tok}`"))?;
        return Ok(Operand::PReg(id));
    }
    bail!("cannot parse operand `{tok}`")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_two_block_function() {
        let src = "\
func main {
.L0:
    mov v1, #7
    add v2, v1, #1
    b .L3
.L3:
    mov r0, v2
    bx lr
}
";
        let unit = parse_unit(src).unwrap();
        assert_eq!(unit.funcs().len(), 1);
        assert_eq!(format!("{}", unit.funcs()[0]), src);
    }

    #[test]
    fn conditional_branch_keeps_the_fallthrough_edge() {
        let src = "\
func f {
.L0:
    mov v1, #0
    cmp v1, #3
    beq .L2
.L1:
    mov r0, v1
.L2:
    bx lr
}
";
        let unit = parse_unit(src).unwrap();
        let func = &unit.funcs()[0];
        let entry = func.blocks().next().unwrap();
        // beq edge to .L2 plus fallthrough to .L1
        assert_eq!(func.succs(entry).len(), 2);
    }

    #[test]
    fn spill_forms_parse() {
        let src = "\
func f {
.L0:
    ldr v5, =-260
    ldr v1, [fp, v5]
    str v1, [fp, #-4]
    bx lr
}
";
        let unit = parse_unit(src).unwrap();
        assert_eq!(format!("{}", unit.funcs()[0]), src);
    }

    #[test]
    fn parsed_listing_allocates_end_to_end() {
        let src = "\
func main {
.L0:
    mov v1, #7
    add v2, v1, #1
    mov r0, v2
    bx lr
}
";
        let mut unit = parse_unit(src).unwrap();
        arm_lsra::allocate(&mut unit).unwrap();
        assert_eq!(
            format!("{}", unit.funcs()[0]),
            "\
func main {
.L0:
    mov r4, #7
    add r5, r4, #1
    mov r0, r5
    bx lr
}
"
        );
    }

    #[test]
    fn branch_to_unknown_label_is_rejected() {
        let src = "\
func f {
.L0:
    b .L9
}
";
        assert!(parse_unit(src).is_err());
    }
}
