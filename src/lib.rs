//! In-line IPv4/TCP/UDP packet-options annotator: synthesizes an options
//! section from a user-supplied recipe, splices it into a diverted
//! datagram, and fixes up length fields and checksums before posting a
//! verdict back to the kernel's packet-filtering queue.
//!
//! The core pipeline lives in [`options`] (per-protocol decoder tables and
//! the shared two-pass builder), [`reassemble`] (splicing a built blob into
//! a fresh datagram) and [`driver`] (per-packet orchestration). The
//! surrounding process is [`cli`], [`config`], [`recipe`] and [`queue`].

pub mod checksum;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod options;
pub mod packet;
pub mod queue;
pub mod reassemble;
pub mod recipe;
