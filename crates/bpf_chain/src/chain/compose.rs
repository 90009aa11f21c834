//! Program splicing.

use alloc::vec::Vec;

use log::{debug, trace};

use super::{ChainError, ChainType};
use crate::bytecode::{
    Instruction, JumpTest, Program, SockFilter, decode, encode, to_raw_instructions,
    to_sock_filters,
};

/// Extra capacity reserved for rewritten terminals.
const REWRITE_SLACK: usize = 10;

/// Combine two filters into one that accepts when `a <mode> b` holds.
///
/// `b` only runs when the verdict of `a` does not already decide the
/// outcome. Neither input is modified.
///
/// Every `ret a` in `a` gains a conditional jump in front of it. Jumps in
/// `a` that span such a `ret a` are not renumbered and land one instruction
/// short in the result.
///
/// # Errors
///
/// Returns [`ChainError::InvalidCombinator`] for [`ChainType::Undefined`].
pub fn combine(
    a: &[Instruction],
    b: &[Instruction],
    mode: ChainType,
) -> Result<Program, ChainError> {
    if !mode.is_defined() {
        debug!("combine: rejected combinator `{}`", mode);
        return Err(ChainError::InvalidCombinator(mode));
    }

    let boundary = a.len();
    let mut out = Vec::with_capacity(a.len() + b.len() + REWRITE_SLACK);

    for (i, insn) in a.iter().enumerate() {
        match *insn {
            Instruction::RetConstant { val } if continues(mode, val) => {
                let skip = boundary - i - 1;
                trace!("combine: ret #{} at {} -> jmp {}", val, i, skip);
                if skip > 0 {
                    out.push(Instruction::Jump { skip: skip as u32 });
                }
            }
            Instruction::RetA => {
                let cond = match mode {
                    ChainType::Or => JumpTest::Equal,
                    _ => JumpTest::NotEqual,
                };
                trace!("combine: ret a at {} guarded by {:?} #0", i, cond);
                out.push(Instruction::JumpIf {
                    cond,
                    val: 0,
                    skip_true: 1,
                    skip_false: 0,
                });
                out.push(Instruction::RetA);
            }
            _ => out.push(*insn),
        }
    }

    out.extend_from_slice(b);

    debug!(
        "combine: {} + {} instructions with `{}` -> {}",
        a.len(),
        b.len(),
        mode,
        out.len()
    );

    Ok(out)
}

/// Combine two filters held as `sock_filter` records.
///
/// Both inputs are decoded, combined with [`combine`] and encoded back.
///
/// # Errors
///
/// Propagates decode failures of either input, encode failures of the
/// result and [`ChainError::InvalidCombinator`].
pub fn combine_sock_filters(
    a: &[SockFilter],
    b: &[SockFilter],
    mode: ChainType,
) -> Result<Vec<SockFilter>, ChainError> {
    let a = decode(&to_raw_instructions(a))?;
    let b = decode(&to_raw_instructions(b))?;
    let combined = combine(&a, &b, mode)?;
    let raw = encode(&combined)?;
    Ok(to_sock_filters(&raw))
}

/// Whether a constant verdict of the first program leaves the outcome open.
#[inline]
const fn continues(mode: ChainType, verdict: u32) -> bool {
    match mode {
        ChainType::And => verdict > 0,
        ChainType::Or => verdict == 0,
        ChainType::Undefined => false,
    }
}
