//! PWM output abstractions
//!
//! Used for the display backlight.

/// Single PWM output channel
pub trait PwmChannel {
    /// Set the raw duty value (0 ..= `max_duty()`)
    fn set_duty(&mut self, duty: u16);

    /// Duty value corresponding to 100%
    fn max_duty(&self) -> u16;

    /// Set the duty cycle as a percentage, clamped to 100
    fn set_percent(&mut self, percent: u8) {
        let percent = percent.min(100) as u32;
        let duty = self.max_duty() as u32 * percent / 100;
        self.set_duty(duty as u16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Channel {
        duty: u16,
    }

    impl PwmChannel for Channel {
        fn set_duty(&mut self, duty: u16) {
            self.duty = duty;
        }

        fn max_duty(&self) -> u16 {
            1000
        }
    }

    #[test]
    fn test_set_percent_scales_and_clamps() {
        let mut ch = Channel { duty: 0 };
        ch.set_percent(80);
        assert_eq!(ch.duty, 800);
        ch.set_percent(250);
        assert_eq!(ch.duty, 1000);
    }
}
