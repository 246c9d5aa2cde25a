//! UDP option decoders and their priority/dispatch tables (§4.B).
//!
//! UDP has no "copy" bit convention, so the full kind byte indexes a
//! 256-entry table (§9), same as TCP. Unlike IPv4/TCP, the UDP options
//! section carries one delayed option: Checksum-Correction, which must run
//! after every other option has been materialized so it can fold the whole
//! options area into a checksum.

extern crate byteorder;
use self::byteorder::{BigEndian, ByteOrder};

use super::Decoder;
use crate::checksum::ones_complement_sum;

/// Read-only context the UDP decoders need: the UDP header's own `length`
/// field (payload only, never updated to include options per §4.D), which
/// the Checksum-Correction option needs to determine whether the options
/// area starts on a 16-bit-aligned offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpContext {
    pub udp_len: u16,
}

pub const MASK: u8 = 0xff;
pub const TABLE_LEN: usize = 256;

/// Checksum-Correction's priority: higher than every immediate option (0),
/// so it is always the last delayed slot the builder materializes.
const CCO_PRIORITY: u64 = 999;

fn decode_eool(
    dst: Option<&mut [u8]>,
    _prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &UdpContext,
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
    ctx: &UdpContext,
) -> usize {
    decode_eool(dst, prior, len_left, recipe, cursor, ctx)
}

/// Timestamp (0x07): 10 bytes; TSval carries the current time, TSecr is
/// always 0 (there is no ACK-like concept at this layer to condition on).
fn decode_ts(
    dst: Option<&mut [u8]>,
    _prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &UdpContext,
) -> usize {
    if len_left < 10 {
        return 0;
    }
    let kind = recipe[*cursor];
    *cursor += 1;
    if let Some(dst) = dst {
        let now = current_unix_seconds();
        dst[0] = kind;
        dst[1] = 10;
        BigEndian::write_u32(&mut dst[2..6], now);
        BigEndian::write_u32(&mut dst[6..10], 0);
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

/// Checksum-Correction (0x4c, RFC-draft UDP transport options): 4 or 5
/// bytes depending on alignment. Delayed (priority 999) so every earlier
/// option, immediate or delayed, has real bytes in `prior` by the time this
/// runs.
///
/// The slot size is `4 + ((udp_len + prior.len()) & 1)`: if the option's own
/// start offset within the options area is 16-bit-misaligned, a leading NOP
/// is written to restore alignment before the kind/length/checksum fields.
/// `prior.len()` doubles as the checksum's initial accumulator (the
/// options-area length up to this slot, mirroring the original `udp_ops_len`
/// term). If the *options area itself* starts on an odd absolute offset
/// (`udp_len` odd), `prior`'s first byte cannot be paired with a real
/// predecessor byte, so it is added into the seed unshifted (as a lone
/// byte, not the high byte of a word) before the rest of `prior` is summed
/// as ordinary 16-bit words.
fn decode_cco(
    dst: Option<&mut [u8]>,
    prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    ctx: &UdpContext,
) -> usize {
    let parity = (ctx.udp_len as usize + prior.len()) & 1;
    let option_len = 4 + parity;
    if option_len > len_left {
        return 0;
    }

    match dst {
        None => {
            *cursor += 1;
            option_len
        }
        Some(dst) => {
            let kind = recipe[*cursor];
            *cursor += 1;

            let offset = if parity == 1 {
                dst[0] = 0x01;
                1
            } else {
                0
            };
            dst[offset] = kind;
            dst[offset + 1] = 4;

            let seed = prior.len() as u32;
            let csum = if ctx.udp_len % 2 == 1 && !prior.is_empty() {
                let seed = seed + u32::from(prior[0]);
                ones_complement_sum(seed, &prior[1..])
            } else {
                ones_complement_sum(seed, prior)
            };
            BigEndian::write_u16(&mut dst[offset + 2..offset + 4], csum);

            option_len
        }
    }
}

/// Unassigned (0x7d): pads to the next 4-byte boundary within the options
/// buffer (adding a full 4 bytes if already aligned), filled with
/// incrementing bytes after its 2-byte header.
fn decode_unassigned(
    dst: Option<&mut [u8]>,
    prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &UdpContext,
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

/// Experimental (0xfe): 4-8 bytes, embeds `0xdead` in network order right
/// after its 2-byte header, padded to the next 4-byte boundary like
/// [`decode_unassigned`].
fn decode_experimental(
    dst: Option<&mut [u8]>,
    prior: &[u8],
    len_left: usize,
    recipe: &[u8],
    cursor: &mut usize,
    _ctx: &UdpContext,
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

pub fn decoders() -> [Decoder<UdpContext>; TABLE_LEN] {
    let mut table = [super::unknown_decoder::<UdpContext> as Decoder<UdpContext>; TABLE_LEN];
    table[0x00] = decode_eool;
    table[0x01] = decode_nop;
    table[0x07] = decode_ts;
    table[0x4c] = decode_cco;
    table[0x7d] = decode_unassigned;
    table[0xfe] = decode_experimental;
    table
}

pub fn priorities() -> [u64; TABLE_LEN] {
    let mut table = [0u64; TABLE_LEN];
    table[0x4c] = CCO_PRIORITY;
    table
}
