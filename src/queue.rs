//! The kernel packet-filtering queue, abstracted behind a trait so the
//! driver loop can be exercised without root or a live NFQUEUE binding
//! (§10.3).

use tracing::{debug, info};

use crate::driver::Verdict;
use crate::error::{QueueError, StartupError};

/// One raw datagram pulled off the queue, along with enough state to post
/// exactly one verdict back for it.
pub trait QueueBridge {
    /// Blocks until the next datagram is available.
    fn recv(&mut self) -> Result<Vec<u8>, QueueError>;

    /// Posts the verdict decided for the most recently received datagram.
    fn post_verdict(&mut self, verdict: Verdict) -> Result<(), QueueError>;
}

/// Production binding to the kernel's NFQUEUE facility via the `nfq` crate.
pub struct NfqBridge {
    queue: nfq::Queue,
    pending: Option<nfq::Message>,
}

impl NfqBridge {
    /// Checks for effective-root privilege, opens the queue handle and
    /// binds to `queue_num`. Both failures are startup errors (§6).
    pub fn open(queue_num: u16) -> Result<NfqBridge, StartupError> {
        if !is_effective_root() {
            return Err(StartupError::NotRoot);
        }

        let mut queue = nfq::Queue::open().map_err(|source| StartupError::QueueOpen {
            queue: queue_num,
            source,
        })?;
        queue
            .bind(queue_num)
            .map_err(|source| StartupError::QueueOpen { queue: queue_num, source })?;

        info!(queue = queue_num, "bound to netfilter queue");
        Ok(NfqBridge { queue, pending: None })
    }
}

impl QueueBridge for NfqBridge {
    fn recv(&mut self) -> Result<Vec<u8>, QueueError> {
        let msg = self.queue.recv().map_err(|source| {
            if source.kind() == std::io::ErrorKind::Interrupted {
                QueueError::Interrupted
            } else {
                QueueError::Read(source)
            }
        })?;
        let payload = msg.get_payload().to_vec();
        self.pending = Some(msg);
        Ok(payload)
    }

    fn post_verdict(&mut self, verdict: Verdict) -> Result<(), QueueError> {
        let mut msg = self.pending.take().expect("post_verdict called without a pending recv");
        match verdict {
            Verdict::AcceptUnchanged => {
                msg.set_verdict(nfq::Verdict::Accept);
            }
            Verdict::AcceptModified(payload) => {
                msg.set_payload(payload);
                msg.set_verdict(nfq::Verdict::Accept);
            }
            Verdict::Redirect { queue, payload } => {
                msg.set_payload(payload);
                // NF_QUEUE with the target queue number encoded in the
                // verdict's high 16 bits, per the kernel's NF_QUEUE_NR
                // convention (the original implementation's redirect path).
                msg.set_verdict(nfq::Verdict::Redirect(queue));
            }
        }
        self.queue.verdict(msg).map_err(QueueError::Verdict)
    }
}

#[cfg(unix)]
fn is_effective_root() -> bool {
    // SAFETY: geteuid takes no arguments and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_effective_root() -> bool {
    false
}

/// In-memory fake used by driver-loop tests: a fixed queue of inbound
/// payloads and a record of every verdict posted, with no kernel
/// involvement (§10.3, §10.5).
#[derive(Debug, Default)]
pub struct FakeQueueBridge {
    inbound: std::collections::VecDeque<Vec<u8>>,
    pub posted: Vec<Verdict>,
}

impl FakeQueueBridge {
    pub fn new(inbound: Vec<Vec<u8>>) -> FakeQueueBridge {
        FakeQueueBridge {
            inbound: inbound.into(),
            posted: Vec::new(),
        }
    }
}

impl QueueBridge for FakeQueueBridge {
    fn recv(&mut self) -> Result<Vec<u8>, QueueError> {
        self.inbound.pop_front().ok_or(QueueError::Interrupted)
    }

    fn post_verdict(&mut self, verdict: Verdict) -> Result<(), QueueError> {
        debug!(?verdict, "fake bridge recorded verdict");
        self.posted.push(verdict);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_bridge_replays_queued_payloads_in_order() {
        let mut bridge = FakeQueueBridge::new(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(bridge.recv().unwrap(), vec![1, 2, 3]);
        assert_eq!(bridge.recv().unwrap(), vec![4, 5, 6]);
        assert!(matches!(bridge.recv(), Err(QueueError::Interrupted)));
    }

    #[test]
    fn fake_bridge_records_posted_verdicts() {
        let mut bridge = FakeQueueBridge::new(vec![vec![0]]);
        bridge.post_verdict(Verdict::AcceptUnchanged).unwrap();
        assert_eq!(bridge.posted.len(), 1);
        assert_eq!(bridge.posted[0], Verdict::AcceptUnchanged);
    }
}
