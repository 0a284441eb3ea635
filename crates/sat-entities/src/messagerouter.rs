use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use sat_config::SharedConfig;
use sat_core::SimTime;
use sat_core::sat_entities::SatEntity;
use sat_saps::SapMsg;

use crate::SatEntityTrait;


#[derive(Default)]
pub enum MessagePrio {
    Immediate,
    #[default]
    Normal,
}

/// Handle to a scheduled event. Cancelling a handle whose event already
/// fired is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

struct ScheduledEvent {
    time: SimTime,
    seq: u64,
    handle: EventHandle,
    message: SapMsg,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    /// BinaryHeap is a max-heap, so the ordering is reversed to pop the
    /// earliest event first. Equal times fall back to insertion order.
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.cmp(&self.time).then_with(|| other.seq.cmp(&self.seq))
    }
}

struct EventScheduler {
    heap: BinaryHeap<ScheduledEvent>,
    cancelled: HashSet<EventHandle>,
    next_id: u64,
}

impl EventScheduler {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_id: 0,
        }
    }

    fn schedule(&mut self, time: SimTime, message: SapMsg) -> EventHandle {
        let id = self.next_id;
        self.next_id += 1;
        let handle = EventHandle(id);
        self.heap.push(ScheduledEvent {
            time,
            seq: id,
            handle,
            message,
        });
        handle
    }

    fn cancel(&mut self, handle: EventHandle) {
        self.cancelled.insert(handle);
    }

    /// Drops cancelled events from the top of the heap. Once the heap is
    /// empty, any remaining cancel marks are stale and can be forgotten.
    fn purge_cancelled(&mut self) {
        while let Some(ev) = self.heap.peek() {
            if self.cancelled.remove(&ev.handle) {
                tracing::trace!("dropping cancelled event {:?} scheduled for {}", ev.handle, ev.time);
                self.heap.pop();
            } else {
                break;
            }
        }
        if self.heap.is_empty() {
            self.cancelled.clear();
        }
    }

    fn next_fire_time(&mut self) -> Option<SimTime> {
        self.purge_cancelled();
        self.heap.peek().map(|ev| ev.time)
    }

    fn pop_fired(&mut self) -> Option<SapMsg> {
        self.purge_cancelled();
        self.heap.pop().map(|ev| ev.message)
    }
}

/// Message queue handed to every entity. Carries the simulated clock, the
/// queue of messages awaiting delivery within the current instant and the
/// timer wheel for future events.
pub struct MessageQueue {
    now: SimTime,
    messages: VecDeque<SapMsg>,
    scheduler: EventScheduler,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            messages: VecDeque::new(),
            scheduler: EventScheduler::new(),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn push_back(&mut self, message: SapMsg) {
        self.messages.push_back(message);
    }

    pub fn push_prio(&mut self, message: SapMsg, prio: MessagePrio) {
        match prio {
            MessagePrio::Immediate => {
                // Insert at the front for immediate processing
                self.messages.push_front(message);
            }
            MessagePrio::Normal => {
                // Insert at the back for normal processing
                self.messages.push_back(message);
            }
        }
    }

    pub fn pop_front(&mut self) -> Option<SapMsg> {
        self.messages.pop_front()
    }

    /// Schedules a message for delivery at a future instant. Panics when
    /// the instant lies in the past, the clock never runs backwards.
    pub fn schedule_at(&mut self, at: SimTime, message: SapMsg) -> EventHandle {
        assert!(
            at >= self.now,
            "schedule_at {} is in the past (now {})",
            at,
            self.now
        );
        self.scheduler.schedule(at, message)
    }

    pub fn cancel(&mut self, handle: EventHandle) {
        self.scheduler.cancel(handle);
    }

    pub fn next_fire_time(&mut self) -> Option<SimTime> {
        self.scheduler.next_fire_time()
    }

    pub fn pop_fired(&mut self) -> Option<SapMsg> {
        self.scheduler.pop_fired()
    }

    pub fn advance_to(&mut self, t: SimTime) {
        assert!(t >= self.now, "advance_to {} is before now {}", t, self.now);
        if t > self.now {
            tracing::trace!("--- advance to {} ---", t);
        }
        self.now = t;
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MessageRouter {
    /// While currently unused by the MessageRouter, this may change in the future
    /// As such, we provide the MessageRouter with a copy of the SharedConfig
    _config: SharedConfig,
    entities: HashMap<SatEntity, Box<dyn SatEntityTrait>>,
    msg_queue: MessageQueue,
    started: bool,
}

/// Entities are started in a fixed order so that bootstrap timers scheduled
/// for the same instant fire deterministically across runs.
const START_ORDER: [SatEntity; 5] = [
    SatEntity::Phy,
    SatEntity::Llc,
    SatEntity::Mac,
    SatEntity::Rm,
    SatEntity::Ncc,
];

impl MessageRouter {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            entities: HashMap::new(),
            msg_queue: MessageQueue::new(),
            _config: config,
            started: false,
        }
    }

    pub fn register_entity(&mut self, entity: Box<dyn SatEntityTrait>) {
        let comp_type = entity.entity();
        tracing::debug!("register_entity {:?}", comp_type);
        self.entities.insert(comp_type, entity);
    }

    /// Returns a mut ref to a component of the requested type
    pub fn get_entity(&mut self, comp: SatEntity) -> Option<&mut dyn SatEntityTrait> {
        self.entities.get_mut(&comp).map(|entity| entity.as_mut())
    }

    pub fn submit_message(&mut self, message: SapMsg) {
        tracing::debug!("submit_message {:?}: {:?} -> {:?}", message.get_sap(), message.get_source(), message.get_dest());
        self.msg_queue.push_back(message);
    }

    pub fn deliver_message(&mut self) {
        let message = self.msg_queue.pop_front();
        if let Some(message) = message {
            tracing::debug!("deliver_message: got {:?}: {:?} -> {:?}", message.get_sap(), message.get_source(), message.get_dest());
            self.deliver(message);
        }
    }

    fn deliver(&mut self, message: SapMsg) {
        let dest = message.get_dest();

        // Check if the destination entity registered and deliver if found
        if let Some(entity) = self.entities.get_mut(&dest) {
            entity.rx_prim(&mut self.msg_queue, message);
        } else {
            tracing::warn!("deliver: entity {:?} not found for {:?}: {:?} -> {:?}", dest, message.get_sap(), message.get_source(), message.get_dest());
        }
    }

    pub fn deliver_all_messages(&mut self) {
        while !self.msg_queue.messages.is_empty() {
            self.deliver_message();
        }
    }

    pub fn get_msgqueue_len(&self) -> usize {
        self.msg_queue.messages.len()
    }

    pub fn now(&self) -> SimTime {
        self.msg_queue.now()
    }

    fn start_entities(&mut self) {
        for ent in START_ORDER {
            if let Some(entity) = self.entities.get_mut(&ent) {
                tracing::trace!("start for entity {:?}", ent);
                entity.start(&mut self.msg_queue);
            }
        }
    }

    /// Runs the stack until the event heap drains, the optional `until`
    /// instant is reached or the optional run flag is cleared. Events
    /// scheduled at `until` or later are left pending, a later call picks
    /// them up again.
    pub fn run_stack(&mut self, until: Option<SimTime>, running: Option<Arc<AtomicBool>>) {
        if !self.started {
            self.start_entities();
            self.started = true;
        }

        loop {
            // Deliver messages until queue empty
            self.deliver_all_messages();

            if let Some(flag) = &running {
                if !flag.load(AtomicOrdering::SeqCst) {
                    tracing::info!("run_stack: stop requested at {}", self.msg_queue.now());
                    break;
                }
            }

            let Some(fire_time) = self.msg_queue.next_fire_time() else {
                if let Some(until) = until {
                    self.msg_queue.advance_to(until);
                }
                tracing::info!("run_stack: event heap drained at {}", self.msg_queue.now());
                break;
            };

            if let Some(until) = until {
                if fire_time >= until {
                    self.msg_queue.advance_to(until);
                    break;
                }
            }

            self.msg_queue.advance_to(fire_time);
            if let Some(message) = self.msg_queue.pop_fired() {
                self.deliver(message);
            }
        }
    }
}
