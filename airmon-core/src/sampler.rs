//! Sensor sampling scheduler
//!
//! Runs one complete sensor transaction on every tick that is a multiple of
//! the effective sampling period and publishes the outcome. A failed sample
//! is still published, with `valid = false`, so consumers always see it.
//!
//! The timer interrupt only advances the tick counter; `on_tick` runs from the
//! main loop because it may wait for the I2C bus.

use airmon_hal::TickSource;

use crate::backoff::{FailureBackoff, Transition};
use crate::bus::{BusArbiter, BusId, ComponentId};
use crate::config::SamplerConfig;
use crate::error::{BusError, SampleError};
use crate::reading::{RawCounts, ReadingPublisher, SensorReading};
use crate::tick::Tick;
use crate::traits::{GasSensor, SensorError};

/// Result of one `on_tick` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleOutcome {
    /// Tick is not a sampling tick
    NotDue,
    /// A valid reading was published
    Valid {
        reading: SensorReading,
        transition: Transition,
    },
    /// An invalid reading was published
    Invalid {
        error: SampleError,
        transition: Transition,
    },
}

impl SampleOutcome {
    pub fn transition(&self) -> Transition {
        match self {
            SampleOutcome::NotDue => Transition::Unchanged,
            SampleOutcome::Valid { transition, .. } | SampleOutcome::Invalid { transition, .. } => {
                *transition
            }
        }
    }
}

pub struct Sampler<S> {
    sensor: S,
    config: SamplerConfig,
    base_period: Tick,
    backoff: FailureBackoff,
    initialized: bool,
}

impl<S: GasSensor> Sampler<S> {
    pub fn new(sensor: S, config: SamplerConfig) -> Self {
        Self {
            sensor,
            base_period: config.period.max(1),
            backoff: FailureBackoff::new(config.backoff),
            config,
            initialized: false,
        }
    }

    /// Sample if `tick` falls on the effective period
    pub fn on_tick<C>(
        &mut self,
        tick: Tick,
        arbiter: &BusArbiter,
        clock: &C,
        publisher: &mut ReadingPublisher<'_>,
    ) -> SampleOutcome
    where
        C: TickSource + ?Sized,
    {
        if tick % self.effective_period() != 0 {
            return SampleOutcome::NotDue;
        }

        match self.sample(tick, arbiter, clock) {
            Ok(reading) => {
                publisher.publish(reading);
                let transition = self.backoff.record_success();
                #[cfg(feature = "defmt")]
                if transition == Transition::Recovered {
                    defmt::info!("sampler recovered, period {}", self.base_period);
                }
                SampleOutcome::Valid {
                    reading,
                    transition,
                }
            }
            Err(error) => {
                publisher.publish(SensorReading::invalid(tick));
                let transition = self.backoff.record_failure();
                #[cfg(feature = "defmt")]
                if transition != Transition::Unchanged {
                    defmt::warn!(
                        "sampler degraded after {} failures ({}), period {}",
                        self.backoff.consecutive_failures(),
                        error,
                        self.effective_period()
                    );
                }
                SampleOutcome::Invalid { error, transition }
            }
        }
    }

    /// Account for a sampling tick the main loop could not service in time
    ///
    /// A due tick publishes an invalid reading and counts as a failure, so
    /// every sampling tick leaves a reading behind.
    pub fn on_missed(&mut self, tick: Tick, publisher: &mut ReadingPublisher<'_>) -> SampleOutcome {
        if tick % self.effective_period() != 0 {
            return SampleOutcome::NotDue;
        }
        publisher.publish(SensorReading::invalid(tick));
        SampleOutcome::Invalid {
            error: SampleError::Overrun,
            transition: self.backoff.record_failure(),
        }
    }

    fn sample<C>(
        &mut self,
        tick: Tick,
        arbiter: &BusArbiter,
        clock: &C,
    ) -> Result<SensorReading, SampleError>
    where
        C: TickSource + ?Sized,
    {
        let guard = acquire_with_retry(
            arbiter,
            BusId::I2c,
            ComponentId::Sampler,
            self.config.bus_timeout,
            self.config.max_attempts,
            clock,
        )?;

        let sensor = &mut self.sensor;
        let initialized = &mut self.initialized;
        let raw: Result<RawCounts, SensorError> = guard.transaction(|| {
            if !*initialized {
                sensor.init()?;
                *initialized = true;
            }
            sensor.measure()
        });

        let raw = match raw {
            Ok(raw) => raw,
            Err(SensorError::Bus) => {
                guard.report_fault();
                return Err(SampleError::Sensor(SensorError::Bus));
            }
            Err(e) => return Err(e.into()),
        };
        drop(guard);

        raw.convert(tick)
    }

    /// Change the base sampling period; backoff still applies on top
    pub fn set_period(&mut self, period: Tick) {
        self.base_period = period.max(1);
    }

    pub fn base_period(&self) -> Tick {
        self.base_period
    }

    /// Base period stretched by the current backoff
    pub fn effective_period(&self) -> Tick {
        self.backoff.period(self.base_period).max(1)
    }

    pub fn is_degraded(&self) -> bool {
        self.backoff.is_degraded()
    }

    pub fn consecutive_failures(&self) -> u8 {
        self.backoff.consecutive_failures()
    }

    /// Re-run the sensor's init command before the next measurement
    ///
    /// Call after the sensor supply has been power-cycled.
    pub fn reset_sensor(&mut self) {
        self.initialized = false;
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

/// Blocking acquire retried up to `attempts` times, doubling the timeout each time
///
/// Shared by the sampler and the display pipeline. Returns the last error
/// once every attempt has failed.
pub(crate) fn acquire_with_retry<'a, C>(
    arbiter: &'a BusArbiter,
    bus: BusId,
    who: ComponentId,
    timeout: Tick,
    attempts: u8,
    clock: &C,
) -> Result<crate::bus::BusGuard<'a>, BusError>
where
    C: TickSource + ?Sized,
{
    let mut last = BusError::Busy;
    for attempt in 0..attempts.max(1) {
        let limit = timeout.saturating_mul(1 << attempt.min(16));
        match arbiter.acquire(bus, who, limit, clock) {
            Ok(guard) => return Ok(guard),
            Err(e @ (BusError::Busy | BusError::Fault)) => last = e,
            Err(e) => return Err(e),
        }
    }
    Err(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArbiterConfig;
    use crate::reading::{RawCounts, ReadingStore};
    use core::cell::Cell;

    struct SteppingClock(Cell<Tick>);

    impl TickSource for SteppingClock {
        fn now(&self) -> u32 {
            let t = self.0.get();
            self.0.set(t.wrapping_add(1));
            t
        }
    }

    /// Sensor answering from a script, then repeating `fallback`
    struct ScriptedSensor {
        script: heapless::Deque<Result<RawCounts, SensorError>, 16>,
        fallback: Result<RawCounts, SensorError>,
        inits: u32,
        measures: u32,
    }

    impl ScriptedSensor {
        fn always(result: Result<RawCounts, SensorError>) -> Self {
            Self {
                script: heapless::Deque::new(),
                fallback: result,
                inits: 0,
                measures: 0,
            }
        }

        fn then(mut self, result: Result<RawCounts, SensorError>) -> Self {
            self.script.push_back(result).unwrap();
            self
        }
    }

    impl GasSensor for ScriptedSensor {
        fn init(&mut self) -> Result<(), SensorError> {
            self.inits += 1;
            Ok(())
        }

        fn measure(&mut self) -> Result<RawCounts, SensorError> {
            self.measures += 1;
            self.script.pop_front().unwrap_or(self.fallback)
        }
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

    #[test]
    fn test_reference_sample_at_tick_100() {
        let arbiter = arbiter();
        let store = ReadingStore::new();
        let mut publisher = store.take_publisher().unwrap();
        let mut sampler = Sampler::new(
            ScriptedSensor::always(Ok(RawCounts::new(400, 500))),
            SamplerConfig {
                period: 100,
                ..SamplerConfig::DEFAULT
            },
        );

        for tick in 1..100 {
            assert_eq!(
                sampler.on_tick(tick, &arbiter, &clock(), &mut publisher),
                SampleOutcome::NotDue
            );
        }
        let outcome = sampler.on_tick(100, &arbiter, &clock(), &mut publisher);
        assert!(matches!(outcome, SampleOutcome::Valid { .. }));

        let reading = store.latest();
        assert!(reading.valid);
        assert_eq!(reading.tick, 100);
        assert_eq!(reading.gas_ppm, 400);
        assert_eq!(reading.humidity_mg_m3, 500 * 1000 / 256);
        assert_eq!(sampler.sensor().inits, 1);
        assert_eq!(arbiter.status(BusId::I2c).holder, None);
    }

    #[test]
    fn test_missed_sampling_tick_publishes_invalid() {
        let store = ReadingStore::new();
        let mut publisher = store.take_publisher().unwrap();
        let mut sampler = Sampler::new(
            ScriptedSensor::always(Ok(RawCounts::new(400, 500))),
            SamplerConfig {
                period: 100,
                ..SamplerConfig::DEFAULT
            },
        );

        assert_eq!(sampler.on_missed(150, &mut publisher), SampleOutcome::NotDue);
        assert_eq!(store.sequence(), 0);

        let outcome = sampler.on_missed(200, &mut publisher);
        assert!(matches!(
            outcome,
            SampleOutcome::Invalid {
                error: SampleError::Overrun,
                transition: Transition::Unchanged,
            }
        ));
        let reading = store.latest();
        assert!(!reading.valid);
        assert_eq!(reading.tick, 200);
        assert_eq!(store.sequence(), 1);
        assert_eq!(sampler.consecutive_failures(), 1);
        assert_eq!(sampler.sensor().measures, 0);
    }

    #[test]
    fn test_init_runs_once_until_reset() {
        let arbiter = arbiter();
        let store = ReadingStore::new();
        let mut publisher = store.take_publisher().unwrap();
        let mut sampler = Sampler::new(
            ScriptedSensor::always(Ok(RawCounts::new(1, 1))),
            SamplerConfig {
                period: 10,
                ..SamplerConfig::DEFAULT
            },
        );
        for tick in [10, 20, 30] {
            sampler.on_tick(tick, &arbiter, &clock(), &mut publisher);
        }
        assert_eq!(sampler.sensor().inits, 1);
        sampler.reset_sensor();
        sampler.on_tick(40, &arbiter, &clock(), &mut publisher);
        assert_eq!(sampler.sensor().inits, 2);
    }

    #[test]
    fn test_busy_bus_publishes_invalid_reading() {
        let arbiter = arbiter();
        let store = ReadingStore::new();
        let mut publisher = store.take_publisher().unwrap();
        let mut sampler = Sampler::new(
            ScriptedSensor::always(Ok(RawCounts::new(400, 500))),
            SamplerConfig::DEFAULT,
        );

        let c = clock();
        let _host = arbiter
            .try_acquire(BusId::I2c, ComponentId::HostLink, &c)
            .unwrap();
        let outcome = sampler.on_tick(100, &arbiter, &c, &mut publisher);
        assert_eq!(
            outcome,
            SampleOutcome::Invalid {
                error: SampleError::Bus(BusError::Busy),
                transition: Transition::Unchanged,
            }
        );
        let reading = store.latest();
        assert!(!reading.valid);
        assert_eq!(reading.tick, 100);
        assert_eq!(sampler.sensor().measures, 0);
    }

    #[test]
    fn test_backoff_doubles_then_resets_on_success() {
        let arbiter = arbiter();
        let store = ReadingStore::new();
        let mut publisher = store.take_publisher().unwrap();
        let sensor = ScriptedSensor::always(Ok(RawCounts::new(400, 500)))
            .then(Err(SensorError::Crc))
            .then(Err(SensorError::Crc))
            .then(Err(SensorError::Crc));
        let mut sampler = Sampler::new(sensor, SamplerConfig::DEFAULT);

        sampler.on_tick(100, &arbiter, &clock(), &mut publisher);
        sampler.on_tick(200, &arbiter, &clock(), &mut publisher);
        assert_eq!(sampler.effective_period(), 100);
        let third = sampler.on_tick(300, &arbiter, &clock(), &mut publisher);
        assert_eq!(third.transition(), Transition::Degraded);
        assert_eq!(sampler.effective_period(), 200);
        assert!(sampler.is_degraded());

        // 500 is no longer a sampling tick
        assert_eq!(
            sampler.on_tick(500, &arbiter, &clock(), &mut publisher),
            SampleOutcome::NotDue
        );
        let recovered = sampler.on_tick(600, &arbiter, &clock(), &mut publisher);
        assert_eq!(recovered.transition(), Transition::Recovered);
        assert_eq!(sampler.effective_period(), 100);
        assert!(store.latest().valid);
    }

    #[test]
    fn test_nack_marks_bus_fault_for_next_acquirer() {
        let arbiter = arbiter();
        let store = ReadingStore::new();
        let mut publisher = store.take_publisher().unwrap();
        let sensor = ScriptedSensor::always(Ok(RawCounts::new(400, 500))).then(Err(SensorError::Bus));
        let mut sampler = Sampler::new(sensor, SamplerConfig::DEFAULT);

        let first = sampler.on_tick(100, &arbiter, &clock(), &mut publisher);
        assert!(matches!(
            first,
            SampleOutcome::Invalid {
                error: SampleError::Sensor(SensorError::Bus),
                ..
            }
        ));
        assert!(arbiter.status(BusId::I2c).fault_pending);

        // The fault is consumed by the first attempt; the retry succeeds
        let second = sampler.on_tick(200, &arbiter, &clock(), &mut publisher);
        assert!(matches!(second, SampleOutcome::Valid { .. }));
        assert!(!arbiter.status(BusId::I2c).fault_pending);
    }

    #[test]
    fn test_malformed_counts_are_invalid() {
        let arbiter = arbiter();
        let store = ReadingStore::new();
        let mut publisher = store.take_publisher().unwrap();
        let mut sampler = Sampler::new(
            ScriptedSensor::always(Ok(RawCounts::new(u16::MAX, 0))),
            SamplerConfig::DEFAULT,
        );
        let outcome = sampler.on_tick(100, &arbiter, &clock(), &mut publisher);
        assert!(matches!(
            outcome,
            SampleOutcome::Invalid {
                error: SampleError::Malformed,
                ..
            }
        ));
    }

    #[test]
    fn test_set_period_changes_cadence() {
        let arbiter = arbiter();
        let store = ReadingStore::new();
        let mut publisher = store.take_publisher().unwrap();
        let mut sampler = Sampler::new(
            ScriptedSensor::always(Ok(RawCounts::new(1, 1))),
            SamplerConfig::DEFAULT,
        );
        sampler.set_period(25);
        assert!(matches!(
            sampler.on_tick(50, &arbiter, &clock(), &mut publisher),
            SampleOutcome::Valid { .. }
        ));
        assert_eq!(
            sampler.on_tick(60, &arbiter, &clock(), &mut publisher),
            SampleOutcome::NotDue
        );
    }

    #[test]
    fn test_retry_timeout_doubles() {
        struct Recording(Cell<u32>);
        impl TickSource for Recording {
            fn now(&self) -> u32 {
                let t = self.0.get();
                self.0.set(t + 1);
                t
            }
        }

        let arbiter = arbiter();
        let clock = Recording(Cell::new(0));
        let _held = arbiter
            .try_acquire(BusId::I2c, ComponentId::HostLink, &clock)
            .unwrap();
        let start = clock.0.get();
        let result = acquire_with_retry(
            &arbiter,
            BusId::I2c,
            ComponentId::Sampler,
            2,
            3,
            &clock,
        );
        assert_eq!(result.err(), Some(BusError::Busy));
        // 2 + 4 + 8 ticks of waiting, plus one clock read per attempt start
        // and one final read per attempt
        let consumed = clock.0.get() - start;
        assert!(consumed >= 14, "waited only {} ticks", consumed);
    }
}
