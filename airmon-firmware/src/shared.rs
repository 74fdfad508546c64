//! Process-wide state shared with interrupt handlers

use core::cell::RefCell;
use core::convert::Infallible;

use airmon_core::config::ArbiterConfig;
use airmon_core::{BusArbiter, ReadingStore, TickCounter};
use airmon_hal::{Timer, UartRx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::Deque;
use portable_atomic::{AtomicU32, Ordering};

/// Bytes the UART receive interrupt can buffer ahead of the main loop
pub const RX_QUEUE_SIZE: usize = 128;

/// Everything interrupt handlers and the main loop both touch
pub struct Shared {
    pub ticks: TickCounter,
    /// Raised by the timer interrupt, cleared by the main loop
    pub tick_pending: Signal<CriticalSectionRawMutex, ()>,
    pub readings: ReadingStore,
    pub arbiter: BusArbiter,
    rx_queue: Mutex<CriticalSectionRawMutex, RefCell<Deque<u8, RX_QUEUE_SIZE>>>,
    rx_overflows: AtomicU32,
}

impl Shared {
    pub const fn new(arbiter: ArbiterConfig) -> Self {
        Self {
            ticks: TickCounter::new(),
            tick_pending: Signal::new(),
            readings: ReadingStore::new(),
            arbiter: BusArbiter::new(arbiter),
            rx_queue: Mutex::new(RefCell::new(Deque::new())),
            rx_overflows: AtomicU32::new(0),
        }
    }

    /// Timer interrupt body
    pub fn tick(&self) {
        self.ticks.advance();
        self.tick_pending.signal(());
    }

    /// UART receive interrupt body; never blocks
    pub fn push_rx(&self, byte: u8) {
        let accepted = self
            .rx_queue
            .lock(|queue| queue.borrow_mut().push_back(byte).is_ok());
        if !accepted {
            self.rx_overflows.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Move queued bytes into `buf`, returning how many were moved
    pub fn drain_rx(&self, buf: &mut [u8]) -> usize {
        self.rx_queue.lock(|queue| {
            let mut queue = queue.borrow_mut();
            let mut n = 0;
            for slot in buf.iter_mut() {
                match queue.pop_front() {
                    Some(byte) => {
                        *slot = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            n
        })
    }

    /// Bytes dropped because the receive queue was full
    pub fn rx_overflows(&self) -> u32 {
        self.rx_overflows.load(Ordering::Relaxed)
    }
}

/// The board's only instance
pub static SHARED: Shared = Shared::new(ArbiterConfig::DEFAULT);

/// Call from the periodic timer interrupt
pub fn on_timer_interrupt() {
    SHARED.tick();
}

/// Call from the host UART receive interrupt with each received byte
pub fn on_uart_rx_interrupt(byte: u8) {
    SHARED.push_rx(byte);
}

/// Start the hardware timer driving [`on_timer_interrupt`]
pub fn start_timebase<T: Timer>(timer: &mut T, period_ticks: u32) -> Result<(), T::Error> {
    timer.start_periodic(period_ticks, on_timer_interrupt)
}

/// Host link receive side, fed by the UART receive interrupt
pub struct QueuedUartRx<'a> {
    shared: &'a Shared,
}

impl<'a> QueuedUartRx<'a> {
    pub fn new(shared: &'a Shared) -> Self {
        Self { shared }
    }
}

impl UartRx for QueuedUartRx<'_> {
    type Error = Infallible;

    fn read_nonblocking(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        Ok(self.shared.drain_rx(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_advances_and_signals() {
        let shared = Shared::new(ArbiterConfig::DEFAULT);
        shared.tick();
        shared.tick();
        assert_eq!(shared.ticks.now(), 2);
        assert!(shared.tick_pending.try_take().is_some());
        assert!(shared.tick_pending.try_take().is_none());
    }

    #[test]
    fn test_rx_queue_overflow_is_counted() {
        let shared = Shared::new(ArbiterConfig::DEFAULT);
        for byte in 0..(RX_QUEUE_SIZE + 3) {
            shared.push_rx(byte as u8);
        }
        assert_eq!(shared.rx_overflows(), 3);

        let mut rx = QueuedUartRx::new(&shared);
        let mut buf = [0u8; 16];
        assert_eq!(rx.read_nonblocking(&mut buf), Ok(16));
        assert_eq!(buf[0], 0);
        assert_eq!(buf[15], 15);
    }

    #[test]
    fn test_drain_empty_queue() {
        let shared = Shared::new(ArbiterConfig::DEFAULT);
        let mut buf = [0u8; 4];
        assert_eq!(shared.drain_rx(&mut buf), 0);
    }
}
