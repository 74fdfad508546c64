//! Bus arbiter implementation
//!
//! Ownership is first-come-first-served per bus. Callers in the main loop
//! use [`BusArbiter::acquire`], which spins until granted or until its
//! timeout expires and keeps its place in the waiter queue meanwhile.
//! Interrupt handlers must use [`BusArbiter::try_acquire`], which never
//! waits and never jumps the queue.
//!
//! A holder that keeps the bus past its bus's maximum hold time is
//! force-released the next time anyone asks for the bus, unless it is inside
//! a transaction: an in-flight lease is only reclaimed once the transaction
//! has returned. A hardware fault
//! reported during a transaction is delivered once to the next acquirer.

use core::cell::RefCell;

use airmon_hal::TickSource;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Deque;

use super::{BusId, ComponentId, BUS_COUNT};
use crate::config::ArbiterConfig;
use crate::error::BusError;
use crate::tick::{elapsed, Tick};

/// Maximum components queued on one bus
pub const MAX_WAITERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Lease {
    owner: ComponentId,
    acquired_at: Tick,
}

struct BusState {
    lease: Option<Lease>,
    in_flight: bool,
    fault_pending: bool,
    waiters: Deque<ComponentId, MAX_WAITERS>,
    force_releases: u32,
}

impl BusState {
    const fn new() -> Self {
        Self {
            lease: None,
            in_flight: false,
            fault_pending: false,
            waiters: Deque::new(),
            force_releases: 0,
        }
    }

    /// Drop a lease held past `max_hold`, returning the evicted owner
    ///
    /// Never evicts while a transaction is on the wire.
    fn reclaim_expired(&mut self, now: Tick, max_hold: Tick) -> Option<ComponentId> {
        let lease = self.lease?;
        if self.in_flight || elapsed(lease.acquired_at, now) < max_hold {
            return None;
        }
        self.lease = None;
        self.in_flight = false;
        self.force_releases = self.force_releases.wrapping_add(1);
        Some(lease.owner)
    }

    fn try_grant(&mut self, who: ComponentId, now: Tick) -> Result<(), BusError> {
        if self.lease.is_some() {
            return Err(BusError::Busy);
        }
        match self.waiters.front() {
            None => {}
            Some(&head) if head == who => {
                self.waiters.pop_front();
            }
            Some(_) => return Err(BusError::Busy),
        }
        if self.fault_pending {
            self.fault_pending = false;
            return Err(BusError::Fault);
        }
        self.lease = Some(Lease {
            owner: who,
            acquired_at: now,
        });
        Ok(())
    }

    fn enqueue(&mut self, who: ComponentId) {
        if !self.waiters.iter().any(|&w| w == who) {
            // A full queue leaves the caller spinning unqueued until a slot frees
            let _ = self.waiters.push_back(who);
        }
    }

    fn withdraw(&mut self, who: ComponentId) {
        for _ in 0..self.waiters.len() {
            if let Some(w) = self.waiters.pop_front() {
                if w != who {
                    let _ = self.waiters.push_back(w);
                }
            }
        }
    }

    fn release(&mut self, who: ComponentId) -> Result<(), BusError> {
        match self.lease {
            Some(lease) if lease.owner == who => {
                self.lease = None;
                self.in_flight = false;
                Ok(())
            }
            _ => Err(BusError::NotOwner),
        }
    }
}

/// Point-in-time view of one bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStatus {
    pub bus: BusId,
    pub holder: Option<ComponentId>,
    pub in_flight: bool,
    pub waiting: usize,
    pub fault_pending: bool,
    pub force_releases: u32,
}

/// Serializes access to the QSPI and I2C buses
///
/// Intended to live in a `static`; every method takes `&self` and performs
/// its state change inside a critical section.
pub struct BusArbiter {
    buses: [Mutex<CriticalSectionRawMutex, RefCell<BusState>>; BUS_COUNT],
    config: ArbiterConfig,
}

impl BusArbiter {
    pub const fn new(config: ArbiterConfig) -> Self {
        Self {
            buses: [
                Mutex::new(RefCell::new(BusState::new())),
                Mutex::new(RefCell::new(BusState::new())),
            ],
            config,
        }
    }

    fn with_state<R>(&self, bus: BusId, f: impl FnOnce(&mut BusState) -> R) -> R {
        self.buses[bus.index()].lock(|cell| f(&mut cell.borrow_mut()))
    }

    fn max_hold(&self, bus: BusId) -> Tick {
        self.config.max_hold[bus.index()]
    }

    /// Attempt one grant, evicting an expired holder first
    fn attempt(&self, bus: BusId, who: ComponentId, now: Tick, queue: bool) -> Result<(), BusError> {
        let max_hold = self.max_hold(bus);
        let (evicted, result) = self.with_state(bus, |state| {
            let evicted = state.reclaim_expired(now, max_hold);
            let result = state.try_grant(who, now);
            if queue && result == Err(BusError::Busy) {
                state.enqueue(who);
            }
            (evicted, result)
        });

        if let Some(_owner) = evicted {
            #[cfg(feature = "defmt")]
            defmt::warn!("{} held {} past its limit, force-released", _owner, bus);
        }

        result
    }

    /// Acquire `bus` without waiting
    ///
    /// Safe to call from interrupt context. Fails with `Busy` if the bus is
    /// held or other components are already queued for it.
    pub fn try_acquire<C>(
        &self,
        bus: BusId,
        who: ComponentId,
        clock: &C,
    ) -> Result<BusGuard<'_>, BusError>
    where
        C: TickSource + ?Sized,
    {
        self.attempt(bus, who, clock.now(), false)?;
        Ok(BusGuard::new(self, bus, who))
    }

    /// Acquire `bus`, waiting up to `timeout` ticks
    ///
    /// Main loop only: this spins on `clock` until granted. On timeout the
    /// caller leaves the waiter queue and gets `Busy`.
    pub fn acquire<C>(
        &self,
        bus: BusId,
        who: ComponentId,
        timeout: Tick,
        clock: &C,
    ) -> Result<BusGuard<'_>, BusError>
    where
        C: TickSource + ?Sized,
    {
        let start = clock.now();
        loop {
            let now = clock.now();
            match self.attempt(bus, who, now, true) {
                Ok(()) => return Ok(BusGuard::new(self, bus, who)),
                Err(BusError::Busy) if elapsed(start, now) < timeout => core::hint::spin_loop(),
                Err(e) => {
                    self.with_state(bus, |state| state.withdraw(who));
                    return Err(e);
                }
            }
        }
    }

    /// Release `bus` held by `who`
    ///
    /// A release by anyone other than the holder is a programming error: in
    /// strict mode it panics, otherwise it logs and returns `NotOwner`, leaving the
    /// bus untouched.
    pub fn release(&self, bus: BusId, who: ComponentId) -> Result<(), BusError> {
        let result = self.with_state(bus, |state| state.release(who));
        if result.is_err() {
            if self.config.strict_ownership {
                panic!("{:?} released {:?} without holding it", who, bus);
            }
            #[cfg(feature = "defmt")]
            defmt::error!("{} released {} without holding it", who, bus);
        }
        result
    }

    /// Release used by guards; a lease that was already force-released is not an error
    fn release_held(&self, bus: BusId, who: ComponentId) {
        let _ = self.with_state(bus, |state| state.release(who));
    }

    fn set_in_flight(&self, bus: BusId, who: ComponentId, in_flight: bool) {
        self.with_state(bus, |state| {
            if state.lease.map(|l| l.owner) == Some(who) {
                state.in_flight = in_flight;
            }
        });
    }

    fn mark_fault(&self, bus: BusId) {
        self.with_state(bus, |state| state.fault_pending = true);
    }

    /// Snapshot of `bus` state
    pub fn status(&self, bus: BusId) -> BusStatus {
        self.with_state(bus, |state| BusStatus {
            bus,
            holder: state.lease.map(|l| l.owner),
            in_flight: state.in_flight,
            waiting: state.waiters.len(),
            fault_pending: state.fault_pending,
            force_releases: state.force_releases,
        })
    }
}

impl Default for BusArbiter {
    fn default() -> Self {
        Self::new(ArbiterConfig::DEFAULT)
    }
}

/// Exclusive ownership of one bus
///
/// Dropping the guard releases the bus.
#[must_use = "the bus is released as soon as the guard is dropped"]
pub struct BusGuard<'a> {
    arbiter: &'a BusArbiter,
    bus: BusId,
    owner: ComponentId,
}

impl<'a> BusGuard<'a> {
    fn new(arbiter: &'a BusArbiter, bus: BusId, owner: ComponentId) -> Self {
        Self {
            arbiter,
            bus,
            owner,
        }
    }

    pub fn bus(&self) -> BusId {
        self.bus
    }

    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    /// Run one hardware transaction with the in-flight flag raised
    pub fn transaction<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        self.arbiter.set_in_flight(self.bus, self.owner, true);
        let result = f();
        self.arbiter.set_in_flight(self.bus, self.owner, false);
        result
    }

    /// Record a hardware-reported fault for the next acquirer
    pub fn report_fault(&self) {
        self.arbiter.mark_fault(self.bus);
    }

    /// Release explicitly, surfacing `NotOwner` if the lease was force-released
    pub fn release(self) -> Result<(), BusError> {
        let result = self.arbiter.release(self.bus, self.owner);
        core::mem::forget(self);
        result
    }
}

impl Drop for BusGuard<'_> {
    fn drop(&mut self) {
        self.arbiter.release_held(self.bus, self.owner);
    }
}
