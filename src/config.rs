//! Immutable process-lifetime configuration (§3, §6).

/// Target protocol an annotator instance is bound to. Each protocol has its
/// own decoder table, builder and reassembler (§2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Ipv4,
    Tcp,
    Udp,
}

impl Protocol {
    /// The IPv4 `protocol` field value carried by datagrams of this kind,
    /// used by the driver's sanity check (§4.E). IPv4-targeted annotation
    /// matches any protocol number since it only touches the IP header.
    pub fn matches_ip_protocol(self, ip_protocol: u8) -> bool {
        match self {
            Protocol::Ipv4 => true,
            Protocol::Tcp => ip_protocol == 6,
            Protocol::Udp => ip_protocol == 17,
        }
    }
}

/// Small immutable record describing how every packet should be handled.
/// Built once from CLI arguments (§10.1) and never mutated afterward.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub protocol: Protocol,
    pub queue: u16,
    pub redirect: Option<u16>,
    pub overwrite: bool,
}
