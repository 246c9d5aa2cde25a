//! TCP option decoders and their priority/dispatch tables (§4.B).
//!
//! Unlike IPv4, TCP has no "copy" bit convention, so the full kind byte
//! indexes a 256-entry table (§9). None of these decoders are delayed.

extern crate byteorder;
use self::byteorder::{BigEndian, ByteOrder};

use super::Decoder;

/// Read-only context the TCP decoders need: whether the segment being
/// annotated has the ACK flag set, which the Timestamp option's value
/// depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpContext {
    pub ack: bool,
}

pub const MASK: u8 = 0xff;
pub const TABLE_LEN: usize = 256;

fn decode_eool(
    dst: Option<&mut [u8]>,
    _prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &TcpContext,
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
    ctx: &TcpContext,
) -> usize {
    decode_eool(dst, prior, len_left, recipe, cursor, ctx)
}

/// Echo / Echo-Reply (0x06 / 0x07, RFC 1072): 6 bytes, a placeholder 32-bit
/// value in the absence of any real echo state to carry.
fn decode_echo(
    dst: Option<&mut [u8]>,
    _prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &TcpContext,
) -> usize {
    if len_left < 6 {
        return 0;
    }
    let kind = recipe[*cursor];
    *cursor += 1;
    if let Some(dst) = dst {
        dst[0] = kind;
        dst[1] = 6;
        BigEndian::write_u32(&mut dst[2..6], 0x0102_0304);
    }
    6
}

/// Timestamp (0x08, RFC 7323): 10 bytes; TSval always carries the current
/// time (plus a 100ms bump when the segment's ACK flag is set); TSecr
/// echoes the current time only when ACK is set, otherwise 0.
fn decode_ts(
    dst: Option<&mut [u8]>,
    _prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    ctx: &TcpContext,
) -> usize {
    if len_left < 10 {
        return 0;
    }
    let kind = recipe[*cursor];
    *cursor += 1;
    if let Some(dst) = dst {
        let now = current_unix_seconds();
        let ts_val = if ctx.ack { now.wrapping_add(100) } else { now };
        let ts_ecr = if ctx.ack { now } else { 0 };

        dst[0] = kind;
        dst[1] = 10;
        BigEndian::write_u32(&mut dst[2..6], ts_val);
        BigEndian::write_u32(&mut dst[6..10], ts_ecr);
    }
    10
}

fn current_unix_seconds() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Reserved option (0x47): pads to the next 4-byte boundary within the
/// options blob (adding a full 4 bytes if already aligned), incrementing
/// payload bytes after its 2-byte header.
fn decode_reserved(
    dst: Option<&mut [u8]>,
    prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &TcpContext,
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

/// Experimental option (0xfe, RFC 4727-style): 4-8 bytes, embeds `0xdead` in
/// network order right after its 2-byte header, padded to the next 4-byte
/// boundary within `space_remaining` like [`decode_reserved`].
fn decode_experimental(
    dst: Option<&mut [u8]>,
    prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &TcpContext,
) -> usize {
    if len_left < 4 {
        return 0;
    }
    let offset_in_word = (prior.len() % 4) as u8;
    let option_len = (8 - offset_in_word).min(len_left as u8) as usize;
    if option_len < 4 {
        return 0;
    }

    let kind = recipe[*cursor];
    *cursor += 1;
    if let Some(dst) = dst {
        dst[0] = kind;
        dst[1] = option_len as u8;
        BigEndian::write_u16(&mut dst[2..4], 0xdead);
        for (i, b) in dst[4..option_len].iter_mut().enumerate() {
            *b = i as u8;
        }
    }
    option_len
}

pub fn decoders() -> [Decoder<TcpContext>; TABLE_LEN] {
    let mut table = [super::unknown_decoder::<TcpContext> as Decoder<TcpContext>; TABLE_LEN];
    table[0x00] = decode_eool;
    table[0x01] = decode_nop;
    table[0x06] = decode_echo;
    table[0x07] = decode_echo;
    table[0x08] = decode_ts;
    table[0x47] = decode_reserved;
    table[0xfe] = decode_experimental;
    table
}

pub fn priorities() -> [u64; TABLE_LEN] {
    // every TCP option in this implementation is immediate
    [0u64; TABLE_LEN]
}
