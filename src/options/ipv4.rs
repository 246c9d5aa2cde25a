//! IPv4 option decoders and their priority/dispatch tables (§4.B).
//!
//! IPv4 option kinds mask off the high "copy" bit before table lookup
//! (§9): the low 7 bits select the decoder, so these tables have 128
//! entries. None of the decoders below are delayed (every priority is 0),
//! matching the original behavior this was distilled from.

use super::Decoder;

/// Read-only context a decoder may need beyond the recipe itself. IPv4's
/// decoders in this implementation are self-contained (the traceroute-style
/// timestamp option does not embed the sender's own address), but the field
/// is kept so a future single-timestamp variant (§4.B) has somewhere to read
/// the source address from without changing the decoder contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpContext {
    pub source: [u8; 4],
}

pub const MASK: u8 = 0x7f;
pub const TABLE_LEN: usize = 128;

fn decode_eool(
    dst: Option<&mut [u8]>,
    _prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &IpContext,
) -> usize {
    if len_left < 1 {
        return 0;
    }
    let kind = recipe[*cursor];
    *cursor += 1;
    if let Some(dst) = dst {
        dst[0] = kind;
    }
    1
}

fn decode_nop(
    dst: Option<&mut [u8]>,
    prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    ctx: &IpContext,
) -> usize {
    decode_eool(dst, prior, len_left, recipe, cursor, ctx)
}

/// Traceroute-style timestamp option (§4.B): kind, length=36, pointer=5,
/// flags=3, 32 zero bytes left for downstream routers to fill. Writes and
/// returns the full 36-byte option (4-byte header plus 32 zero-filled
/// timestamp slots).
fn decode_ts(
    dst: Option<&mut [u8]>,
    _prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &IpContext,
) -> usize {
    if len_left < 36 {
        return 0;
    }
    let kind = recipe[*cursor];
    *cursor += 1;
    if let Some(dst) = dst {
        dst[0] = kind;
        dst[1] = 36;
        dst[2] = 5;
        dst[3] = 0x03;
        for b in &mut dst[4..36] {
            *b = 0;
        }
    }
    36
}

/// Unassigned (0x5d) / experimental (0x5e) option: pads to the next 4-byte
/// boundary within the options blob (adding a full 4 bytes if already
/// aligned), filled with incrementing bytes after its 2-byte header.
fn decode_unknown(
    dst: Option<&mut [u8]>,
    prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &IpContext,
) -> usize {
    if len_left < 2 {
        return 0;
    }
    let offset_in_word = (prior.len() % 4) as u8;
    let mut option_len = 4 - offset_in_word;
    if option_len <= 2 && len_left >= 6 {
        option_len += 4;
    }
    let option_len = option_len as usize;
    if option_len > len_left {
        return 0;
    }

    let kind = recipe[*cursor];
    *cursor += 1;
    if let Some(dst) = dst {
        dst[0] = kind;
        dst[1] = option_len as u8;
        for (i, b) in dst[2..option_len].iter_mut().enumerate() {
            *b = i as u8;
        }
    }
    option_len
}

pub fn decoders() -> [Decoder<IpContext>; TABLE_LEN] {
    let mut table = [super::unknown_decoder::<IpContext> as Decoder<IpContext>; TABLE_LEN];
    table[0x00] = decode_eool;
    table[0x01] = decode_nop;
    table[0x44] = decode_ts;
    table[0x5d] = decode_unknown;
    table[0x5e] = decode_unknown;
    table
}

pub fn priorities() -> [u64; TABLE_LEN] {
    // every IPv4 option in this implementation is immediate
    [0u64; TABLE_LEN]
}
