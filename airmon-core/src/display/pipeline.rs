//! Redraw driver

use airmon_hal::TickSource;
use portable_atomic::{AtomicBool, Ordering};

use super::frame::{DisplayFrame, RegionId};
use crate::backoff::{FailureBackoff, Transition};
use crate::bus::{BusArbiter, BusId, ComponentId};
use crate::config::DisplayConfig;
use crate::error::RedrawError;
use crate::sampler::acquire_with_retry;
use crate::tick::Tick;
use crate::traits::{DisplayController, DisplayError, Region};

/// Result of one `on_tick` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RedrawOutcome {
    NotDue,
    /// Redraw completed, painting this many regions
    Drawn(usize),
    /// Redraw skipped; the frame is kept for the next attempt
    Skipped {
        error: RedrawError,
        transition: Transition,
    },
}

pub struct DisplayPipeline<D> {
    display: D,
    config: DisplayConfig,
    frame: DisplayFrame,
    backoff: FailureBackoff,
    initialized: bool,
    requested: AtomicBool,
}

impl<D: DisplayController> DisplayPipeline<D> {
    pub fn new(display: D, config: DisplayConfig) -> Self {
        Self {
            display,
            backoff: FailureBackoff::new(config.backoff),
            config,
            frame: DisplayFrame::new(),
            initialized: false,
            requested: AtomicBool::new(false),
        }
    }

    /// Upsert a region for the next redraw; last write per id wins
    pub fn enqueue_region(&self, id: RegionId, region: Region) -> Result<(), DisplayError> {
        self.frame.enqueue(id, region)
    }

    pub fn frame(&self) -> &DisplayFrame {
        &self.frame
    }

    /// Ask for a redraw on the next `on_tick`, regardless of cadence
    pub fn request_redraw(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn redraw_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Redraw if `tick` falls on the cadence or a redraw was requested
    pub fn on_tick<C>(&mut self, tick: Tick, arbiter: &BusArbiter, clock: &C) -> RedrawOutcome
    where
        C: TickSource + ?Sized,
    {
        let on_cadence = tick % self.effective_period() == 0;
        let requested = self.requested.swap(false, Ordering::AcqRel);
        if !on_cadence && !requested {
            return RedrawOutcome::NotDue;
        }

        match self.redraw(arbiter, clock) {
            Ok(drawn) => {
                let _transition = self.backoff.record_success();
                #[cfg(feature = "defmt")]
                if _transition == Transition::Recovered {
                    defmt::info!("display recovered");
                }
                RedrawOutcome::Drawn(drawn)
            }
            Err(error) => {
                let transition = self.backoff.record_failure();
                #[cfg(feature = "defmt")]
                if transition != Transition::Unchanged {
                    defmt::warn!(
                        "display degraded ({}), redraw every {} ticks",
                        error,
                        self.effective_period()
                    );
                }
                RedrawOutcome::Skipped { error, transition }
            }
        }
    }

    /// Paint every queued region, then clear them from the frame
    ///
    /// The controller init sequence runs on the first successful bus grant.
    /// On failure nothing is cleared, so the next call retries the same
    /// content.
    pub fn redraw<C>(&mut self, arbiter: &BusArbiter, clock: &C) -> Result<usize, RedrawError>
    where
        C: TickSource + ?Sized,
    {
        let queued = self.frame.snapshot();
        if queued.is_empty() && self.initialized {
            return Ok(0);
        }

        let guard = acquire_with_retry(
            arbiter,
            BusId::Qspi,
            ComponentId::Display,
            self.config.bus_timeout,
            self.config.max_attempts,
            clock,
        )?;

        let display = &mut self.display;
        let initialized = &mut self.initialized;
        let result: Result<(), DisplayError> = guard.transaction(|| {
            if !*initialized {
                display.init_sequence()?;
                *initialized = true;
            }
            for queued in &queued {
                display.write_region(&queued.region)?;
            }
            Ok(())
        });

        if let Err(e) = result {
            if e == DisplayError::Bus {
                guard.report_fault();
            }
            return Err(e.into());
        }
        drop(guard);

        self.frame.retire(&queued);
        Ok(queued.len())
    }

    /// Run the init sequence again on the next redraw
    pub fn reset_controller(&mut self) {
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_degraded(&self) -> bool {
        self.backoff.is_degraded()
    }

    /// Redraw cadence stretched by the current backoff
    pub fn effective_period(&self) -> Tick {
        self.backoff.period(self.config.redraw_period.max(1)).max(1)
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArbiterConfig;
    use crate::error::BusError;
    use crate::traits::{Rect, RegionContent, Rgb565};
    use core::cell::Cell;
    use heapless::Vec;

    struct SteppingClock(Cell<Tick>);

    impl TickSource for SteppingClock {
        fn now(&self) -> u32 {
            let t = self.0.get();
            self.0.set(t.wrapping_add(1));
            t
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        inits: u32,
        written: Vec<Region, 32>,
        fail_writes: bool,
    }

    impl DisplayController for RecordingDisplay {
        fn init_sequence(&mut self) -> Result<(), DisplayError> {
            self.inits += 1;
            Ok(())
        }

        fn write_region(&mut self, region: &Region) -> Result<(), DisplayError> {
            if self.fail_writes {
                return Err(DisplayError::Bus);
            }
            self.written.push(*region).map_err(|_| DisplayError::FrameFull)
        }
    }

    fn region(value: u32) -> Region {
        Region::new(
            Rect::new(0, 0, 40, 20),
            RegionContent::Number {
                value,
                fg: Rgb565::WHITE,
                bg: Rgb565::BLACK,
            },
        )
    }

    fn arbiter() -> BusArbiter {
        BusArbiter::new(ArbiterConfig {
            max_hold: [1_000, 1_000],
            strict_ownership: true,
        })
    }

    fn clock() -> SteppingClock {
        SteppingClock(Cell::new(0))
    }

    fn pipeline() -> DisplayPipeline<RecordingDisplay> {
        DisplayPipeline::new(RecordingDisplay::default(), DisplayConfig::DEFAULT)
    }

    #[test]
    fn test_redraw_paints_and_clears() {
        let arbiter = arbiter();
        let mut pipeline = pipeline();
        pipeline.enqueue_region(1, region(400)).unwrap();
        pipeline.enqueue_region(2, region(1953)).unwrap();

        assert_eq!(pipeline.redraw(&arbiter, &clock()), Ok(2));
        assert_eq!(pipeline.display().inits, 1);
        assert_eq!(&pipeline.display().written[..], &[region(400), region(1953)]);
        assert!(pipeline.frame().is_empty());
        assert_eq!(arbiter.status(BusId::Qspi).holder, None);
    }

    #[test]
    fn test_init_sequence_runs_once() {
        let arbiter = arbiter();
        let mut pipeline = pipeline();
        for value in 0..3 {
            pipeline.enqueue_region(1, region(value)).unwrap();
            pipeline.redraw(&arbiter, &clock()).unwrap();
        }
        assert_eq!(pipeline.display().inits, 1);
    }

    #[test]
    fn test_duplicate_enqueue_renders_the_same() {
        let arbiter = arbiter();

        let mut once = pipeline();
        once.enqueue_region(5, region(42)).unwrap();
        once.redraw(&arbiter, &clock()).unwrap();

        let mut twice = pipeline();
        twice.enqueue_region(5, region(42)).unwrap();
        twice.enqueue_region(5, region(42)).unwrap();
        twice.redraw(&arbiter, &clock()).unwrap();

        assert_eq!(once.display().written, twice.display().written);
    }

    #[test]
    fn test_busy_bus_keeps_frame() {
        let arbiter = arbiter();
        let c = clock();
        let mut pipeline = pipeline();
        pipeline.enqueue_region(1, region(7)).unwrap();

        let held = arbiter
            .try_acquire(BusId::Qspi, ComponentId::HostLink, &c)
            .unwrap();
        assert_eq!(
            pipeline.redraw(&arbiter, &c),
            Err(RedrawError::Bus(BusError::Busy))
        );
        assert_eq!(pipeline.frame().len(), 1);
        drop(held);

        assert_eq!(pipeline.redraw(&arbiter, &c), Ok(1));
        assert_eq!(&pipeline.display().written[..], &[region(7)]);
    }

    #[test]
    fn test_write_failure_keeps_frame_and_flags_fault() {
        let arbiter = arbiter();
        let mut pipeline = pipeline();
        pipeline.enqueue_region(1, region(7)).unwrap();
        pipeline.display_mut().fail_writes = true;

        assert_eq!(
            pipeline.redraw(&arbiter, &clock()),
            Err(RedrawError::Display(DisplayError::Bus))
        );
        assert_eq!(pipeline.frame().len(), 1);
        assert!(arbiter.status(BusId::Qspi).fault_pending);
    }

    #[test]
    fn test_redraw_not_blocked_by_i2c_holder() {
        let arbiter = arbiter();
        let c = clock();
        let _sampler = arbiter
            .try_acquire(BusId::I2c, ComponentId::Sampler, &c)
            .unwrap();

        let mut pipeline = pipeline();
        pipeline.enqueue_region(1, region(1)).unwrap();
        assert_eq!(pipeline.redraw(&arbiter, &c), Ok(1));
        assert_eq!(
            arbiter.status(BusId::I2c).holder,
            Some(ComponentId::Sampler)
        );
    }

    #[test]
    fn test_cadence_and_request() {
        let arbiter = arbiter();
        let mut pipeline = pipeline();
        pipeline.enqueue_region(1, region(1)).unwrap();

        assert_eq!(pipeline.on_tick(1, &arbiter, &clock()), RedrawOutcome::NotDue);
        pipeline.request_redraw();
        assert_eq!(pipeline.on_tick(2, &arbiter, &clock()), RedrawOutcome::Drawn(1));
        assert!(!pipeline.redraw_requested());
        assert_eq!(
            pipeline.on_tick(DisplayConfig::DEFAULT.redraw_period, &arbiter, &clock()),
            RedrawOutcome::Drawn(0)
        );
    }

    #[test]
    fn test_repeated_failures_slow_cadence() {
        let arbiter = arbiter();
        let mut pipeline = pipeline();
        pipeline.display_mut().fail_writes = true;
        let period = DisplayConfig::DEFAULT.redraw_period;

        for n in 1..=3 {
            pipeline.enqueue_region(1, region(n)).unwrap();
            // Consume the fault left by the previous failure
            let _ = arbiter.try_acquire(BusId::Qspi, ComponentId::HostLink, &clock());
            let outcome = pipeline.on_tick(period * n, &arbiter, &clock());
            assert!(matches!(outcome, RedrawOutcome::Skipped { .. }));
        }
        assert!(pipeline.is_degraded());
        assert_eq!(pipeline.effective_period(), period * 2);
    }
}
