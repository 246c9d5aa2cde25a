//! Per-protocol packet reassembly: splicing a freshly built options blob
//! into a fresh datagram buffer and fixing up length/offset fields (§4.D).
//!
//! None of these touch checksums; the driver recomputes those once
//! reassembly has settled the final byte layout (§4.E).

use crate::error::PacketError;
use crate::packet::{
    ipv4_header_len, ipv4_set_header_len, ipv4_set_total_len, ipv4_total_len, tcp_header_len,
    tcp_set_header_len, udp_len, IPV4_BASE_LEN, TCP_BASE_LEN, UDP_BASE_LEN,
};

const MAX_IHL_DWORDS: usize = 15;
const MAX_TOTAL_LEN: usize = 0xffff;

fn slice_checked(data: &[u8], start: usize, end: usize) -> Result<&[u8], PacketError> {
    if start > end || end > data.len() {
        return Err(PacketError::LengthMismatch);
    }
    Ok(&data[start..end])
}

/// Splices `blob` into the IPv4 options area. `overwrite=false` preserves
/// the original options ahead of it; either way the result's `ihl` is
/// rounded up by `blob.len() / 4` dwords (the builder guarantees `blob.len()`
/// is already a multiple of 4).
pub fn reassemble_ipv4(raw: &[u8], blob: &[u8], overwrite: bool) -> Result<Vec<u8>, PacketError> {
    if raw.len() < IPV4_BASE_LEN {
        return Err(PacketError::LengthMismatch);
    }
    let old_ihl = ipv4_header_len(raw);
    let rest = slice_checked(raw, old_ihl, raw.len())?;

    let mut out = Vec::with_capacity(MAX_TOTAL_LEN);
    out.extend_from_slice(&raw[0..IPV4_BASE_LEN]);
    if !overwrite {
        out.extend_from_slice(slice_checked(raw, IPV4_BASE_LEN, old_ihl)?);
    }
    out.extend_from_slice(blob);
    out.extend_from_slice(rest);

    let base = if overwrite { IPV4_BASE_LEN } else { old_ihl };
    let new_ihl = base + blob.len();
    if new_ihl > MAX_IHL_DWORDS * 4 || out.len() > MAX_TOTAL_LEN {
        return Err(PacketError::ReassemblySizeOverflow);
    }
    ipv4_set_header_len(&mut out, new_ihl);
    ipv4_set_total_len(&mut out, out.len() as u16);
    Ok(out)
}

/// Splices `blob` into the TCP options area; the IPv4 header and its
/// options are carried forward unchanged.
pub fn reassemble_tcp(raw: &[u8], blob: &[u8], overwrite: bool) -> Result<Vec<u8>, PacketError> {
    let ihl = ipv4_header_len(raw);
    if raw.len() < ihl + TCP_BASE_LEN {
        return Err(PacketError::LengthMismatch);
    }
    let tcp = &raw[ihl..];
    let old_doff = tcp_header_len(tcp);
    let rest = slice_checked(tcp, old_doff, tcp.len())?;

    let mut out = Vec::with_capacity(MAX_TOTAL_LEN);
    out.extend_from_slice(&raw[0..ihl]);
    out.extend_from_slice(&tcp[0..TCP_BASE_LEN]);
    if !overwrite {
        out.extend_from_slice(slice_checked(tcp, TCP_BASE_LEN, old_doff)?);
    }
    out.extend_from_slice(blob);
    out.extend_from_slice(rest);

    let base = if overwrite { TCP_BASE_LEN } else { old_doff };
    let new_doff = base + blob.len();
    if new_doff > MAX_IHL_DWORDS * 4 || out.len() > MAX_TOTAL_LEN {
        return Err(PacketError::ReassemblySizeOverflow);
    }
    tcp_set_header_len(&mut out[ihl..], new_doff);
    ipv4_set_total_len(&mut out, out.len() as u16);
    Ok(out)
}

/// The length of the trailing UDP options area already present on `raw`,
/// per §4.D: `tot_len - (ihl*4 + udp.len)`. Using `udp.len` alone would
/// over-count this region by the IPv4 options size whenever the IPv4
/// header itself carries options (§9).
pub fn existing_udp_options_len(raw: &[u8]) -> Result<usize, PacketError> {
    let ihl = ipv4_header_len(raw);
    if raw.len() < ihl + UDP_BASE_LEN {
        return Err(PacketError::LengthMismatch);
    }
    let payload_len = usize::from(udp_len(&raw[ihl..]));
    let tot_len = usize::from(ipv4_total_len(raw));
    tot_len
        .checked_sub(ihl + payload_len)
        .ok_or(PacketError::LengthMismatch)
}

/// Appends `blob` after the UDP payload (and, unless overwriting, any
/// pre-existing trailing options). The UDP header's own `len` field is left
/// untouched (it delimits the payload only, per §4.D); only `ip.tot_len`
/// changes.
pub fn reassemble_udp(raw: &[u8], blob: &[u8], overwrite: bool) -> Result<Vec<u8>, PacketError> {
    let ihl = ipv4_header_len(raw);
    if raw.len() < ihl + UDP_BASE_LEN {
        return Err(PacketError::LengthMismatch);
    }
    let udp = &raw[ihl..];
    let payload_len = usize::from(udp_len(udp));
    let payload = slice_checked(udp, UDP_BASE_LEN, payload_len)?;

    let existing_options_len = existing_udp_options_len(raw)?;
    let existing_options = slice_checked(udp, payload_len, payload_len + existing_options_len)?;

    let mut out = Vec::with_capacity(MAX_TOTAL_LEN);
    out.extend_from_slice(&raw[0..ihl]);
    out.extend_from_slice(&udp[0..UDP_BASE_LEN]);
    out.extend_from_slice(payload);
    if !overwrite {
        out.extend_from_slice(existing_options);
    }
    out.extend_from_slice(blob);

    if out.len() > MAX_TOTAL_LEN {
        return Err(PacketError::ReassemblySizeOverflow);
    }
    ipv4_set_total_len(&mut out, out.len() as u16);
    Ok(out)
}
