//! Integration tests exercising the full driver flow (builder →
//! reassembler → checksum fix-up → verdict) against the literal end-to-end
//! scenarios in SPEC_FULL.md §8, using hand-built byte buffers rather than
//! a live kernel queue.

use ops_inject::checksum::ones_complement_sum;
use ops_inject::config::{Config, Protocol};
use ops_inject::driver::{process_packet, Verdict};
use ops_inject::recipe::Recipe;

fn recipe(bytes: &[u8]) -> Recipe {
    Recipe::from_bytes(bytes.to_vec())
}

fn minimal_ipv4(ihl_dwords: u8, protocol: u8, total_len: u16) -> Vec<u8> {
    let mut raw = vec![0u8; usize::from(total_len)];
    raw[0] = 0x40 | (ihl_dwords & 0x0f);
    raw[2..4].copy_from_slice(&total_len.to_be_bytes());
    raw[9] = protocol;
    raw
}

fn unwrap_modified(verdict: Verdict) -> Vec<u8> {
    match verdict {
        Verdict::AcceptModified(datagram) => datagram,
        other => panic!("expected AcceptModified, got {other:?}"),
    }
}

#[test]
fn scenario_1_ipv4_traceroute_timestamp() {
    let raw = minimal_ipv4(5, 17, 20);
    let config = Config { protocol: Protocol::Ipv4, queue: 0, redirect: None, overwrite: true };
    let datagram = unwrap_modified(process_packet(&config, &recipe(&[0x44]), &raw));

    assert_eq!(datagram.len(), 56);
    assert_eq!(datagram[0] & 0x0f, 14);
    assert_eq!(&datagram[20..24], &[0x44, 0x24, 0x05, 0x03]);
    assert!(datagram[24..56].iter().all(|&b| b == 0));
    assert_eq!(ones_complement_sum(0, &datagram[..56]), 0);
}

#[test]
fn scenario_2_tcp_nop_padding() {
    let mut raw = minimal_ipv4(5, 6, 40);
    // TCP base header starts at byte 20; doff=5 (no existing TCP options)
    raw[20 + 12] = 5 << 4;
    let config = Config { protocol: Protocol::Tcp, queue: 0, redirect: None, overwrite: true };
    let datagram = unwrap_modified(process_packet(&config, &recipe(&[0x01]), &raw));

    assert_eq!(datagram.len(), 44);
    assert_eq!(datagram[20 + 12] >> 4, 6);
    assert_eq!(&datagram[40..44], &[0x01, 0x00, 0x00, 0x00]);
    assert_eq!(ones_complement_sum(0, &datagram[..20]), 0);
}

#[test]
fn scenario_3_tcp_timestamp_on_ack() {
    let mut raw = minimal_ipv4(5, 6, 40);
    raw[20 + 12] = 5 << 4;
    raw[20 + 13] = 0x10; // ACK flag
    let config = Config { protocol: Protocol::Tcp, queue: 0, redirect: None, overwrite: true };
    let datagram = unwrap_modified(process_packet(&config, &recipe(&[0x08]), &raw));

    assert_eq!(datagram[20 + 12] >> 4, 8); // doff=8 (5 base + 3 option dwords)
    assert_eq!(&datagram[40..42], &[0x08, 0x0a]);
    assert_eq!(&datagram[50..52], &[0x00, 0x00]); // zero-padded gap, not NOP
}

#[test]
fn scenario_4_udp_checksum_correction_delayed_write() {
    let raw = minimal_ipv4(5, 17, 28);
    // UDP header at byte 20: source/dest ports 0, len=8, checksum=0
    let mut raw = raw;
    raw[20 + 4..20 + 6].copy_from_slice(&8u16.to_be_bytes());
    let config = Config { protocol: Protocol::Udp, queue: 0, redirect: None, overwrite: true };
    let datagram = unwrap_modified(process_packet(&config, &recipe(&[0x07, 0x4c]), &raw));

    // 10-byte timestamp + 4-byte correction (udp_len=8 + prior.len()=10 is even)
    assert_eq!(datagram.len(), 28 + 14);
    let options_area = &datagram[28..];
    assert_eq!(options_area.len(), 14);
    assert_eq!(&options_area[0..2], &[0x07, 10]);
    assert_eq!(&options_area[10..12], &[0x4c, 4]);
    // the correction value folds the 10 bytes of timestamp preceding it
    let expected = ones_complement_sum(10, &options_area[0..10]);
    assert_eq!(u16::from_be_bytes([options_area[12], options_area[13]]), expected);
}

#[test]
fn scenario_5_budget_overflow_passes_unchanged() {
    // ihl=12 (28 bytes of existing options), recipe needs 36 bytes
    let mut raw = minimal_ipv4(12, 17, 48);
    raw.resize(48, 0);
    let config = Config { protocol: Protocol::Ipv4, queue: 0, redirect: None, overwrite: false };
    let verdict = process_packet(&config, &recipe(&[0x44]), &raw);
    assert_eq!(verdict, Verdict::AcceptUnchanged);
}

#[test]
fn scenario_6_unknown_option_kind_passes_unchanged() {
    let raw = minimal_ipv4(5, 17, 20);
    let config = Config { protocol: Protocol::Ipv4, queue: 0, redirect: None, overwrite: true };
    let verdict = process_packet(&config, &recipe(&[0x23]), &raw);
    assert_eq!(verdict, Verdict::AcceptUnchanged);
}

#[test]
fn empty_recipe_is_an_identity_round_trip() {
    let raw = minimal_ipv4(5, 17, 20);
    let config = Config { protocol: Protocol::Ipv4, queue: 0, redirect: None, overwrite: false };
    let verdict = process_packet(&config, &recipe(&[]), &raw);
    assert_eq!(verdict, Verdict::AcceptUnchanged);
}

#[test]
fn redirect_queue_is_honored_on_success() {
    let raw = minimal_ipv4(5, 17, 20);
    let config = Config { protocol: Protocol::Ipv4, queue: 3, redirect: Some(9), overwrite: true };
    let verdict = process_packet(&config, &recipe(&[0x44]), &raw);
    match verdict {
        Verdict::Redirect { queue, payload } => {
            assert_eq!(queue, 9);
            assert_eq!(payload.len(), 56);
        }
        other => panic!("expected Redirect, got {other:?}"),
    }
}
