//! Cooperative main loop

use core::fmt::Write as _;

use airmon_core::config::HalConfig;
use airmon_core::display::layout;
use airmon_core::tick::elapsed;
use airmon_core::{
    DisplayPipeline, DispatchContext, HostLink, RedrawOutcome, ReadingPublisher, ReadingStore,
    SampleError, SampleOutcome, Sampler, SensorReading, Tick, Transition,
};
use airmon_hal::{Delay, OutputPin, PwmChannel, UartWriter};
use airmon_protocol::StatusReport;

use crate::board::{Board, BoardParts};
use crate::shared::{QueuedUartRx, Shared};

/// Most ticks run in full by one `poll`
pub const MAX_CATCH_UP_TICKS: Tick = 8;

/// How long the sensor supply stays off during a power cycle (ms)
pub const SENSOR_POWER_OFF_MS: u32 = 20;

/// Startup failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartupError {
    /// The reading store already has a publisher
    PublisherTaken,
}

pub struct App<'a, B: Board> {
    shared: &'a Shared,
    sampler: Sampler<B::Sensor>,
    display: DisplayPipeline<B::Display>,
    link: HostLink<QueuedUartRx<'a>, B::HostTx>,
    publisher: ReadingPublisher<'a>,
    console: B::Console,
    backlight: B::Backlight,
    sensor_power: B::SensorPower,
    delay: B::Delay,
    last_tick: Tick,
    seen_sequence: u32,
    host_feedback_lit: bool,
    power_cycles: u32,
}

impl<'a, B: Board> App<'a, B> {
    pub fn new(
        shared: &'a Shared,
        parts: BoardParts<B>,
        config: HalConfig,
    ) -> Result<Self, StartupError> {
        let publisher = shared
            .readings
            .take_publisher()
            .ok_or(StartupError::PublisherTaken)?;

        let BoardParts {
            sensor,
            display,
            host_tx,
            console,
            mut backlight,
            mut sensor_power,
            delay,
        } = parts;

        sensor_power.set_high();
        backlight.set_percent(config.display.backlight_percent);

        let display = DisplayPipeline::new(display, config.display);
        if layout::compose_background(display.frame()).is_err() {
            warn!("background region rejected");
        }

        let mut app = Self {
            shared,
            sampler: Sampler::new(sensor, config.sampler),
            display,
            link: HostLink::new(QueuedUartRx::new(shared), host_tx, config.link),
            publisher,
            console,
            backlight,
            sensor_power,
            delay,
            last_tick: shared.ticks.now(),
            seen_sequence: shared.readings.sequence(),
            host_feedback_lit: false,
            power_cycles: 0,
        };
        app.banner();
        Ok(app)
    }

    fn banner(&mut self) {
        info!("airmon {} starting", env!("CARGO_PKG_VERSION"));
        let mut console = UartWriter::new(&mut self.console);
        // The console is best-effort; a stalled UART must not stop startup
        let _ = write!(
            console,
            "airmon {} on {}\r\nsampling every {} ticks\r\n",
            env!("CARGO_PKG_VERSION"),
            B::NAME,
            self.sampler.base_period()
        );
    }

    /// One pass of the main loop
    ///
    /// Processes every tick since the last pass, then services the host
    /// link. After a stall only the last [`MAX_CATCH_UP_TICKS`] ticks are
    /// run in full; sampling ticks before that publish invalid readings.
    pub fn poll(&mut self) {
        let _ = self.shared.tick_pending.try_take();
        let now = self.shared.ticks.now();
        let behind = elapsed(self.last_tick, now);
        if behind > MAX_CATCH_UP_TICKS {
            debug!("skipping {} ticks", behind - MAX_CATCH_UP_TICKS);
            self.skip_to(now.wrapping_sub(MAX_CATCH_UP_TICKS));
        }
        while self.last_tick != now {
            self.last_tick = self.last_tick.wrapping_add(1);
            self.on_tick(self.last_tick);
        }

        let mut ctx = Services {
            sampler: &mut self.sampler,
            display: &self.display,
            readings: &self.shared.readings,
            host_feedback_lit: &mut self.host_feedback_lit,
        };
        self.link.service(&mut ctx, &self.shared.ticks);
    }

    /// Jump to `resume`, marking every sampling tick on the way as missed
    fn skip_to(&mut self, resume: Tick) {
        loop {
            let period = self.sampler.effective_period();
            let due = self
                .last_tick
                .wrapping_add(period - self.last_tick % period);
            if elapsed(self.last_tick, due) > elapsed(self.last_tick, resume) {
                break;
            }
            self.last_tick = due;
            let outcome = self.sampler.on_missed(due, &mut self.publisher);
            self.after_sample(outcome);
        }
        self.last_tick = resume;
    }

    fn on_tick(&mut self, tick: Tick) {
        let outcome = self.sampler.on_tick(
            tick,
            &self.shared.arbiter,
            &self.shared.ticks,
            &mut self.publisher,
        );
        self.after_sample(outcome);

        let redraw = self
            .display
            .on_tick(tick, &self.shared.arbiter, &self.shared.ticks);
        if let RedrawOutcome::Drawn(n) = redraw {
            if n > 0 {
                trace!("redrew {} regions", n);
            }
        }
    }

    fn after_sample(&mut self, outcome: SampleOutcome) {
        // Overruns stretch the cadence but never power-cycle the sensor
        let sensor_failed = !matches!(
            outcome,
            SampleOutcome::Invalid {
                error: SampleError::Overrun,
                ..
            }
        );
        if sensor_failed
            && matches!(
                outcome.transition(),
                Transition::Degraded | Transition::Escalated
            )
        {
            self.power_cycle_sensor();
        }

        let sequence = self.shared.readings.sequence();
        if sequence != self.seen_sequence {
            self.seen_sequence = sequence;
            let reading = self.shared.readings.latest();
            if layout::compose_reading(self.display.frame(), &reading, self.sampler.is_degraded())
                .is_err()
            {
                warn!("display frame full, reading not queued");
            }
        }
    }

    /// Cut and restore the sensor supply; the sensor is re-initialized on the next sample
    fn power_cycle_sensor(&mut self) {
        warn!("power-cycling sensor");
        self.sensor_power.set_low();
        self.delay.delay_ms(SENSOR_POWER_OFF_MS);
        self.sensor_power.set_high();
        self.sampler.reset_sensor();
        self.power_cycles = self.power_cycles.wrapping_add(1);
    }

    /// Loop forever, calling `idle` between passes (e.g. wait-for-interrupt)
    pub fn run(&mut self, mut idle: impl FnMut()) -> ! {
        loop {
            self.poll();
            if !self.shared.tick_pending.signaled() && !self.link.has_pending() {
                idle();
            }
        }
    }

    pub fn sampler(&self) -> &Sampler<B::Sensor> {
        &self.sampler
    }

    pub fn display(&self) -> &DisplayPipeline<B::Display> {
        &self.display
    }

    pub fn link(&self) -> &HostLink<QueuedUartRx<'a>, B::HostTx> {
        &self.link
    }

    pub fn console(&self) -> &B::Console {
        &self.console
    }

    pub fn backlight(&self) -> &B::Backlight {
        &self.backlight
    }

    pub fn sensor_power(&self) -> &B::SensorPower {
        &self.sensor_power
    }

    pub fn power_cycles(&self) -> u32 {
        self.power_cycles
    }
}

/// Components reachable from host commands
struct Services<'s, S, D> {
    sampler: &'s mut Sampler<S>,
    display: &'s DisplayPipeline<D>,
    readings: &'s ReadingStore,
    host_feedback_lit: &'s mut bool,
}

impl<S, D> DispatchContext for Services<'_, S, D>
where
    S: airmon_core::GasSensor,
    D: airmon_core::DisplayController,
{
    fn latest_reading(&self) -> SensorReading {
        self.readings.latest()
    }

    fn set_sampling_period(&mut self, ticks: Tick) {
        info!("sampling period set to {} ticks", ticks);
        self.sampler.set_period(ticks);
    }

    fn request_redraw(&mut self) {
        *self.host_feedback_lit = !*self.host_feedback_lit;
        if layout::compose_host_feedback(self.display.frame(), *self.host_feedback_lit).is_err() {
            warn!("display frame full, host feedback not queued");
        }
        self.display.request_redraw();
    }

    fn status(&self) -> StatusReport {
        StatusReport {
            sampler_degraded: self.sampler.is_degraded(),
            display_degraded: self.display.is_degraded(),
            sampling_period: self.sampler.effective_period(),
            consecutive_failures: self.sampler.consecutive_failures(),
            ..StatusReport::default()
        }
    }
}
