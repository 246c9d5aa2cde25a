//! One's-complement 16-bit checksum primitives shared by the IPv4, TCP and
//! UDP reassemblers.
//!
//! The accumulate-and-fold algorithm here mirrors the approach etherparse
//! uses for its header checksums (sum 16-bit big-endian words into a wide
//! accumulator, then fold the carries back in), generalized to accept an
//! arbitrary initial accumulator value so the UDP checksum-correction option
//! (§4.B) can seed the sum with the options-area length before folding in the
//! options bytes themselves.

extern crate byteorder;
use self::byteorder::{BigEndian, ByteOrder};

/// Accumulates `data` as a sequence of big-endian 16-bit words into `initial`
/// and folds the result down to a 16-bit one's-complement sum.
///
/// An odd trailing byte is treated as the high byte of a final word whose low
/// byte is zero, matching the standard Internet checksum convention.
pub fn ones_complement_sum(initial: u32, data: &[u8]) -> u16 {
    let mut sum: u64 = u64::from(initial);

    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += u64::from(BigEndian::read_u16(word));
    }
    if let [last] = *chunks.remainder() {
        sum += u64::from(last) << 8;
    }

    fold_to_u16(sum)
}

fn fold_to_u16(mut sum: u64) -> u16 {
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Builds the 32-bit pseudo-header sum shared by TCP and UDP checksums:
/// source + destination address, protocol number and the layer-4 length.
pub fn pseudo_header_sum(source: [u8; 4], destination: [u8; 4], protocol: u8, layer4_len: u16) -> u32 {
    u32::from(BigEndian::read_u16(&source[0..2]))
        + u32::from(BigEndian::read_u16(&source[2..4]))
        + u32::from(BigEndian::read_u16(&destination[0..2]))
        + u32::from(BigEndian::read_u16(&destination[2..4]))
        + u32::from(protocol)
        + u32::from(layer4_len)
}

/// Recomputes and writes the IPv4 header checksum (field at byte offset 10)
/// over the header (including options) in `ipv4_header`.
pub fn write_ipv4_header_checksum(ipv4_header: &mut [u8]) {
    ipv4_header[10] = 0;
    ipv4_header[11] = 0;
    let sum = ones_complement_sum(0, ipv4_header);
    BigEndian::write_u16(&mut ipv4_header[10..12], sum);
}

/// Recomputes and writes the TCP checksum (field at byte offset 16 of the TCP
/// segment) over the pseudo-header, TCP header (incl. options) and payload.
pub fn write_tcp_checksum(
    source: [u8; 4],
    destination: [u8; 4],
    tcp_segment: &mut [u8],
) {
    tcp_segment[16] = 0;
    tcp_segment[17] = 0;
    let pseudo = pseudo_header_sum(source, destination, 6, tcp_segment.len() as u16);
    let sum = ones_complement_sum(pseudo, tcp_segment);
    let sum = if sum == 0 { 0xffff } else { sum };
    BigEndian::write_u16(&mut tcp_segment[16..18], sum);
}

/// Recomputes and writes the UDP checksum (field at byte offset 6 of the UDP
/// datagram) over the pseudo-header, UDP header, payload and trailing options.
///
/// `udp_len` is the value carried in the UDP header's own `length` field
/// (payload only, per §4.D it is never updated to include options); the
/// pseudo-header length uses that same value, while `udp_datagram` passed in
/// may additionally contain the trailing options area to be summed over.
pub fn write_udp_checksum(
    source: [u8; 4],
    destination: [u8; 4],
    udp_len: u16,
    udp_datagram: &mut [u8],
) {
    udp_datagram[6] = 0;
    udp_datagram[7] = 0;
    let pseudo = pseudo_header_sum(source, destination, 17, udp_len);
    let sum = ones_complement_sum(pseudo, udp_datagram);
    let sum = if sum == 0 { 0xffff } else { sum };
    BigEndian::write_u16(&mut udp_datagram[6..8], sum);
}

/// Dispatches to the correct layer-4 checksum routine based on the IPv4
/// `protocol` field. Protocols this core does not recompute checksums for
/// (anything other than TCP/UDP) are a deliberate no-op, matching §4.A's
/// dispatch-table design so the driver need not special-case them.
pub fn write_layer4_checksum(protocol: u8, source: [u8; 4], destination: [u8; 4], layer4_len: u16, layer4: &mut [u8]) {
    match protocol {
        6 if layer4.len() >= 20 => write_tcp_checksum(source, destination, layer4),
        17 if layer4.len() >= 8 => write_udp_checksum(source, destination, layer4_len, layer4),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_of_complementary_words_folds_to_zero() {
        // 0x1234 + 0xedcb == 0xffff, one's-complement of that remains 0xffff
        // once the "invert the zero result" UDP/TCP convention is applied.
        let data = [0x12, 0x34, 0xed, 0xcb];
        let sum = ones_complement_sum(0, &data);
        assert_eq!(sum, 0xffff);
    }

    #[test]
    fn odd_trailing_byte_is_folded_as_high_byte() {
        let a = ones_complement_sum(0, &[0x00, 0x01]);
        let b = ones_complement_sum(0, &[0x00, 0x01, 0x00]);
        // appending a zero low byte to make the trailing byte a full word
        // must not change the result.
        assert_eq!(a, b);
    }

    #[test]
    fn initial_accumulator_is_honored() {
        let with_zero_initial = ones_complement_sum(0, &[0x00, 0x01]);
        let with_offset_initial = ones_complement_sum(1, &[0x00, 0x00]);
        assert_eq!(with_zero_initial, with_offset_initial);
    }

    #[test]
    fn ipv4_header_checksum_round_trips_to_zero() {
        // minimal 20-byte IPv4 header, version/ihl 0x45, rest arbitrary
        let mut header = [
            0x45, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0x02,
        ];
        write_ipv4_header_checksum(&mut header);
        let verify = ones_complement_sum(0, &header);
        assert_eq!(verify, 0);
    }
}
