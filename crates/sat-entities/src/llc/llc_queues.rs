/// Per request-class byte accounting for the LLC.
///
/// Traffic is modeled as byte counts only, packet boundaries are introduced
/// when a transmit opportunity drains the queue. Request class 0 carries
/// control-grade traffic, the higher classes user data.
pub struct LlcQueues {
    queued: Vec<u32>,
    max_queue_bytes: u32,
    dropped_bytes: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub struct EnqueueOutcome {
    pub accepted: u32,
    pub dropped: u32,
    /// The queue went from empty to non-empty.
    pub first: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DequeueOutcome {
    pub taken: u32,
    pub queued_left: u32,
    /// The queue drained to empty.
    pub emptied: bool,
}

impl LlcQueues {
    pub fn new(rc_count: usize, max_queue_bytes: u32) -> Self {
        Self {
            queued: vec![0; rc_count],
            max_queue_bytes,
            dropped_bytes: 0,
        }
    }

    pub fn rc_count(&self) -> usize {
        self.queued.len()
    }

    pub fn queued_bytes(&self, rc_index: usize) -> u32 {
        self.queued[rc_index]
    }

    pub fn total_queued(&self) -> u64 {
        self.queued.iter().map(|b| u64::from(*b)).sum()
    }

    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes
    }

    /// Adds bytes to a queue, clamped to the configured capacity.
    pub fn enqueue(&mut self, rc_index: usize, bytes: u32) -> EnqueueOutcome {
        let was_empty = self.queued[rc_index] == 0;
        let free = self.max_queue_bytes - self.queued[rc_index];
        let accepted = bytes.min(free);
        let dropped = bytes - accepted;
        self.queued[rc_index] += accepted;
        self.dropped_bytes += u64::from(dropped);
        EnqueueOutcome {
            accepted,
            dropped,
            first: was_empty && accepted > 0,
        }
    }

    /// Takes up to `bytes_max` bytes out of a queue.
    pub fn dequeue(&mut self, rc_index: usize, bytes_max: u32) -> DequeueOutcome {
        let was_nonempty = self.queued[rc_index] > 0;
        let taken = self.queued[rc_index].min(bytes_max);
        self.queued[rc_index] -= taken;
        DequeueOutcome {
            taken,
            queued_left: self.queued[rc_index],
            emptied: was_nonempty && self.queued[rc_index] == 0,
        }
    }
}
