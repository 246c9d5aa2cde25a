//! The per-packet orchestration loop: builder → reassembler → checksum
//! fix-up → verdict (§4.E).

use tracing::{debug, trace, warn};

use crate::checksum::{write_ipv4_header_checksum, write_layer4_checksum};
use crate::config::{Config, Protocol};
use crate::error::PacketError;
use crate::options::{build, ipv4, tcp, udp, BuildError};
use crate::packet::{
    ipv4_destination, ipv4_header_len, ipv4_protocol, ipv4_source, ipv4_total_len, tcp_ack,
    tcp_header_len, udp_len, IPV4_BASE_LEN, TCP_BASE_LEN,
};
use crate::reassemble::{existing_udp_options_len, reassemble_ipv4, reassemble_tcp, reassemble_udp};
use crate::recipe::Recipe;

const MAX_IHL_DWORDS: usize = 15;
const MAX_TOTAL_LEN: usize = 0xffff;

/// What the driver decided to do with one packet, handed to the queue
/// bridge to post back to the kernel (§10.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    AcceptUnchanged,
    AcceptModified(Vec<u8>),
    Redirect { queue: u16, payload: Vec<u8> },
}

/// Runs one packet through the full pipeline described in §4.E. Never
/// fails outward: every recoverable error is logged and turned into
/// [`Verdict::AcceptUnchanged`].
pub fn process_packet(config: &Config, recipe: &Recipe, raw: &[u8]) -> Verdict {
    match build_modified_datagram(config, recipe, raw) {
        Ok(None) => {
            debug!(protocol = ?config.protocol, "empty recipe, passing packet unchanged");
            Verdict::AcceptUnchanged
        }
        Ok(Some(datagram)) => {
            trace!(protocol = ?config.protocol, bytes = datagram.len(), "accepting modified packet");
            match config.redirect {
                Some(queue) => Verdict::Redirect { queue, payload: datagram },
                None => Verdict::AcceptModified(datagram),
            }
        }
        Err(reason) => {
            warn!(protocol = ?config.protocol, %reason, "passing packet unchanged");
            Verdict::AcceptUnchanged
        }
    }
}

/// `Ok(None)` means the recipe produced an empty options blob (identity
/// pass-through); `Ok(Some(_))` is the fully reassembled, checksummed
/// replacement datagram.
fn build_modified_datagram(
    config: &Config,
    recipe: &Recipe,
    raw: &[u8],
) -> Result<Option<Vec<u8>>, PacketError> {
    if raw.len() < IPV4_BASE_LEN || raw.len() != usize::from(ipv4_total_len(raw)) {
        return Err(PacketError::LengthMismatch);
    }
    if !config.protocol.matches_ip_protocol(ipv4_protocol(raw)) {
        return Err(PacketError::ProtocolMismatch);
    }

    let blob = match config.protocol {
        Protocol::Ipv4 => {
            let old_ihl = ipv4_header_len(raw);
            let base_dwords = if config.overwrite { 5 } else { old_ihl / 4 };
            let space_remaining = 4 * MAX_IHL_DWORDS.saturating_sub(base_dwords);
            let ctx = ipv4::IpContext { source: ipv4_source(raw) };
            build(
                recipe.bytes(),
                space_remaining,
                ipv4::MASK,
                true,
                &ipv4::decoders(),
                &ipv4::priorities(),
                &ctx,
            )
        }
        Protocol::Tcp => {
            let tcp_segment = raw
                .get(ipv4_header_len(raw)..)
                .filter(|s| s.len() >= TCP_BASE_LEN)
                .ok_or(PacketError::LengthMismatch)?;
            let old_doff = tcp_header_len(tcp_segment);
            let base_dwords = if config.overwrite { 5 } else { old_doff / 4 };
            let space_remaining = 4 * MAX_IHL_DWORDS.saturating_sub(base_dwords);
            let ctx = tcp::TcpContext { ack: tcp_ack(tcp_segment) };
            build(
                recipe.bytes(),
                space_remaining,
                tcp::MASK,
                true,
                &tcp::decoders(),
                &tcp::priorities(),
                &ctx,
            )
        }
        Protocol::Udp => {
            let ihl = ipv4_header_len(raw);
            let udp_datagram = raw
                .get(ihl..)
                .filter(|s| s.len() >= crate::packet::UDP_BASE_LEN)
                .ok_or(PacketError::LengthMismatch)?;
            let payload_len = usize::from(udp_len(udp_datagram));
            let existing_options_len = existing_udp_options_len(raw)?;
            let carried_forward = if config.overwrite { 0 } else { existing_options_len };
            let base_len = ihl + payload_len + carried_forward;
            let space_remaining = MAX_TOTAL_LEN.saturating_sub(base_len);
            let ctx = udp::UdpContext { udp_len: udp_len(udp_datagram) };
            build(
                recipe.bytes(),
                space_remaining,
                udp::MASK,
                false,
                &udp::decoders(),
                &udp::priorities(),
                &ctx,
            )
        }
    };

    let blob = blob.map_err(|err| match err {
        BuildError::UnknownOptionKind => PacketError::UnknownOptionKind,
        BuildError::BudgetExceeded => PacketError::BudgetExceeded,
    })?;
    if blob.is_empty() {
        return Ok(None);
    }

    let mut datagram = match config.protocol {
        Protocol::Ipv4 => reassemble_ipv4(raw, &blob, config.overwrite)?,
        Protocol::Tcp => reassemble_tcp(raw, &blob, config.overwrite)?,
        Protocol::Udp => reassemble_udp(raw, &blob, config.overwrite)?,
    };

    fix_up_checksums(&mut datagram);
    Ok(Some(datagram))
}

fn fix_up_checksums(datagram: &mut [u8]) {
    let header_len = ipv4_header_len(datagram);
    let source = ipv4_source(datagram);
    let destination = ipv4_destination(datagram);
    let protocol = ipv4_protocol(datagram);
    let layer4_len = (datagram.len() - header_len) as u16;

    write_layer4_checksum(protocol, source, destination, layer4_len, &mut datagram[header_len..]);
    write_ipv4_header_checksum(&mut datagram[..header_len]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ones_complement_sum;
    use crate::config::Protocol;

    fn ipv4_only_datagram(protocol: u8, payload: &[u8]) -> Vec<u8> {
        let mut raw = vec![0u8; IPV4_BASE_LEN];
        raw[0] = 0x45;
        raw[9] = protocol;
        raw.extend_from_slice(payload);
        let total = raw.len() as u16;
        raw[2..4].copy_from_slice(&total.to_be_bytes());
        raw
    }

    #[test]
    fn ipv4_timestamp_scenario_produces_valid_checksummed_datagram() {
        let raw = ipv4_only_datagram(17, &[]);
        let config = Config { protocol: Protocol::Ipv4, queue: 0, redirect: None, overwrite: true };
        let recipe = Recipe::from_bytes(vec![0x44]);
        let verdict = process_packet(&config, &recipe, &raw);
        match verdict {
            Verdict::AcceptModified(datagram) => {
                assert_eq!(datagram.len(), 56);
                assert_eq!(ipv4_header_len(&datagram), 56);
                assert_eq!(ones_complement_sum(0, &datagram[..56]), 0);
            }
            other => panic!("expected AcceptModified, got {other:?}"),
        }
    }

    #[test]
    fn budget_overflow_passes_packet_unchanged_and_is_reported_distinctly() {
        let mut raw = ipv4_only_datagram(17, &[]);
        raw[0] = 0x4c; // ihl=12, 28 bytes of (fabricated) existing options
        raw.resize(IPV4_BASE_LEN + 28, 0);
        let total = raw.len() as u16;
        raw[2..4].copy_from_slice(&total.to_be_bytes());
        let config = Config { protocol: Protocol::Ipv4, queue: 0, redirect: None, overwrite: false };
        let recipe = Recipe::from_bytes(vec![0x44]);

        let verdict = process_packet(&config, &recipe, &raw);
        assert_eq!(verdict, Verdict::AcceptUnchanged);
        assert_eq!(
            build_modified_datagram(&config, &recipe, &raw).unwrap_err(),
            PacketError::BudgetExceeded
        );
    }

    #[test]
    fn unknown_option_kind_passes_packet_unchanged_and_is_reported_distinctly() {
        let raw = ipv4_only_datagram(17, &[]);
        let config = Config { protocol: Protocol::Ipv4, queue: 0, redirect: None, overwrite: true };
        let recipe = Recipe::from_bytes(vec![0x23]);

        let verdict = process_packet(&config, &recipe, &raw);
        assert_eq!(verdict, Verdict::AcceptUnchanged);
        assert_eq!(
            build_modified_datagram(&config, &recipe, &raw).unwrap_err(),
            PacketError::UnknownOptionKind
        );
    }

    #[test]
    fn protocol_mismatch_passes_packet_unchanged() {
        let raw = ipv4_only_datagram(6, &[]); // TCP, but config targets UDP
        let config = Config { protocol: Protocol::Udp, queue: 0, redirect: None, overwrite: true };
        let recipe = Recipe::from_bytes(vec![0x01]);
        let verdict = process_packet(&config, &recipe, &raw);
        assert_eq!(verdict, Verdict::AcceptUnchanged);
    }

    #[test]
    fn redirect_configured_yields_redirect_verdict() {
        let raw = ipv4_only_datagram(17, &[]);
        let config = Config { protocol: Protocol::Ipv4, queue: 0, redirect: Some(1), overwrite: true };
        let recipe = Recipe::from_bytes(vec![0x44]);
        let verdict = process_packet(&config, &recipe, &raw);
        assert!(matches!(verdict, Verdict::Redirect { queue: 1, .. }));
    }
}
