//! The two-pass, priority-ordered options-section builder shared by the
//! IPv4, TCP and UDP protocols (§4.B, §4.C, §9).
//!
//! Each protocol module supplies its own fixed-size decoder/priority tables
//! and its own context type carrying whatever read-only packet fields its
//! decoders need (e.g. the TCP ACK flag, or the UDP options-area length).
//! This module supplies the generic traversal: immediate options are written
//! as they're encountered; delayed options reserve a zero-filled slot and are
//! pushed onto a priority-ordered work-list, materialized in a second pass
//! once every earlier slot (delayed or not) has real bytes in it.

pub mod ipv4;
pub mod tcp;
pub mod udp;

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Decoder contract (§4.B): given an optional destination slot, the bytes of
/// the options blob already materialized before that slot, the remaining
/// advisory space, the recipe and a cursor into it, plus protocol-specific
/// context, either estimate (dst = `None`) or materialize (dst = `Some`) one
/// option and return its byte count (0 = failure).
///
/// `dst`, when present, is a view over *at least* `len_left` bytes of
/// scratch space starting at the option's slot; the decoder must write no
/// more than the count it returns. `prior` is the options blob's bytes from
/// its start up to (not including) this slot — this is what the original
/// implementation's `ops_sec`/pointer-difference arithmetic expressed;
/// decoders that need to read already-written option bytes (e.g. the UDP
/// checksum-correction option folding the options-area checksum) use
/// `prior` and its length instead of pointer arithmetic.
pub type Decoder<Ctx> = fn(
    dst: Option<&mut [u8]>,
    prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    ctx: &Ctx,
) -> usize;

/// Shared fallback every protocol's dispatch table installs for byte values
/// with no assigned decoder. Always fails (returns 0); `build` compares a
/// failing decoder's address against this function to tell "the recipe
/// named a kind with no decoder" apart from "a real decoder refused for
/// lack of space" (§7), so the driver can report `UnknownOptionKind`
/// distinctly from `BudgetExceeded`.
pub fn unknown_decoder<Ctx>(
    _dst: Option<&mut [u8]>,
    _prior: &[u8],
    _len_left: usize,
    _recipe: &[u8],
    _cursor: &mut usize,
    _ctx: &Ctx,
) -> usize {
    0
}

/// Why [`build`] failed to produce an options blob (§7): either the recipe
/// named a byte with no assigned decoder, or a decoder refused because the
/// option (or the final alignment padding) would not fit in the remaining
/// budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    UnknownOptionKind,
    BudgetExceeded,
}

struct DelayedSlot {
    priority: u64,
    order: usize,
    start: usize,
    len: usize,
    recipe_cursor: usize,
}

/// Runs the shared two-pass algorithm described in §4.C.
///
/// `mask` selects how many bits of each recipe byte index the decoder table
/// (`0x7f` for IPv4, `0xff` for TCP/UDP, per §9's resolved open question).
/// `align` requests 4-byte padding of the final length (IPv4/TCP); UDP passes
/// `false`. Returns [`BuildError`] on any decoder failure or budget overflow,
/// which the driver turns into the matching recoverable [`PacketError`] and
/// passes the packet unchanged (§4.E).
///
/// [`PacketError`]: crate::error::PacketError
pub fn build<Ctx>(
    recipe: &[u8],
    space_remaining: usize,
    mask: u8,
    align: bool,
    decoders: &[Decoder<Ctx>],
    priorities: &[u64],
    ctx: &Ctx,
) -> Result<Vec<u8>, BuildError> {
    let unknown = unknown_decoder::<Ctx> as Decoder<Ctx>;
    let classify_failure = |decoder: Decoder<Ctx>| {
        if decoder == unknown {
            BuildError::UnknownOptionKind
        } else {
            BuildError::BudgetExceeded
        }
    };

    let mut buf = vec![0u8; space_remaining];
    let mut len = 0usize;
    let mut cursor = 0usize;
    let mut delayed: Vec<DelayedSlot> = Vec::new();
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();

    while cursor < recipe.len() {
        let kind = recipe[cursor];
        let idx = (kind & mask) as usize;
        let priority = *priorities.get(idx).ok_or(BuildError::BudgetExceeded)?;
        let decoder = *decoders.get(idx).ok_or(BuildError::BudgetExceeded)?;

        if priority == 0 {
            let len_left = space_remaining.checked_sub(len).ok_or(BuildError::BudgetExceeded)?;
            let (prior, rest) = buf.split_at_mut(len);
            let written = decoder(Some(&mut rest[..len_left]), prior, len_left, recipe, &mut cursor, ctx);
            if written == 0 {
                return Err(classify_failure(decoder));
            }
            len = len.checked_add(written).ok_or(BuildError::BudgetExceeded)?;
            if len > space_remaining {
                return Err(BuildError::BudgetExceeded);
            }
        } else {
            let len_left = space_remaining.checked_sub(len).ok_or(BuildError::BudgetExceeded)?;
            let saved_cursor = cursor;
            let estimate = decoder(None, &buf[..len], len_left, recipe, &mut cursor, ctx);
            if estimate == 0 {
                return Err(classify_failure(decoder));
            }
            let start = len;
            len = len.checked_add(estimate).ok_or(BuildError::BudgetExceeded)?;
            if len > space_remaining {
                return Err(BuildError::BudgetExceeded);
            }
            let order = delayed.len();
            heap.push(Reverse((priority, order)));
            delayed.push(DelayedSlot {
                priority,
                order,
                start,
                len: estimate,
                recipe_cursor: saved_cursor,
            });
        }
    }

    while let Some(Reverse((priority, order))) = heap.pop() {
        let slot_idx = delayed
            .iter()
            .position(|s| s.priority == priority && s.order == order)
            .ok_or(BuildError::BudgetExceeded)?;
        let start = delayed[slot_idx].start;
        let slot_len = delayed[slot_idx].len;
        let recipe_cursor = delayed[slot_idx].recipe_cursor;

        let mut local_cursor = 0usize;
        let recipe_tail = &recipe[recipe_cursor..];
        let decoder = *decoder_for(decoders, priorities, mask, recipe_tail).ok_or(BuildError::BudgetExceeded)?;

        let (prior, rest) = buf.split_at_mut(start);
        let written = decoder(
            Some(&mut rest[..slot_len]),
            prior,
            slot_len,
            recipe_tail,
            &mut local_cursor,
            ctx,
        );
        if written != slot_len {
            return Err(BuildError::BudgetExceeded);
        }
    }

    if align {
        let padded = (len + 3) & !3;
        if padded > space_remaining {
            return Err(BuildError::BudgetExceeded);
        }
        len = padded;
    }

    buf.truncate(len);
    Ok(buf)
}

fn decoder_for<'a, Ctx>(
    decoders: &'a [Decoder<Ctx>],
    priorities: &[u64],
    mask: u8,
    recipe_tail: &[u8],
) -> Option<&'a Decoder<Ctx>> {
    let kind = *recipe_tail.first()?;
    let idx = (kind & mask) as usize;
    let _ = priorities.get(idx)?;
    decoders.get(idx)
}
