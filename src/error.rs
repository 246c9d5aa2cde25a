use thiserror::Error;

/// Failures that abort the process before the driver loop starts.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("must run with effective root privileges to open an NFQUEUE handle")]
    NotRoot,

    #[error("failed to read recipe file {path}: {source}")]
    RecipeIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("recipe file {path} is empty")]
    EmptyRecipe { path: String },

    #[error("redirect queue {redirect} must differ from source queue {queue}")]
    RedirectEqualsSource { queue: u16, redirect: u16 },

    #[error("failed to open netfilter queue {queue}: {source}")]
    QueueOpen {
        queue: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

/// Failures that are local to a single packet and never abort the loop.
///
/// The driver treats every variant the same way (log and pass the packet
/// through unchanged) but keeps them distinct so log output names the actual
/// cause rather than a generic "failed".
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    #[error("payload length does not match ip.tot_len")]
    LengthMismatch,

    #[error("packet protocol does not match the configured target protocol")]
    ProtocolMismatch,

    #[error("recipe exceeds the protocol's option budget")]
    BudgetExceeded,

    #[error("recipe contains an unimplemented option kind")]
    UnknownOptionKind,

    #[error("reassembled datagram would exceed the 65535-byte total length limit")]
    ReassemblySizeOverflow,
}

/// Failures reading from or posting a verdict to the kernel queue. Logged and
/// retried per-packet unless the underlying socket itself has failed, in
/// which case the caller tears the loop down.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("failed to read from queue socket: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to post verdict: {0}")]
    Verdict(#[source] std::io::Error),

    #[error("blocking read interrupted by signal")]
    Interrupted,
}
