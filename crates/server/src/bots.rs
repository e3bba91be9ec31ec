//! Bot participants.

use crate::maps::PlayerReference;
use crate::session::{Client, ColorRamp};

/// Ramp range used for generated colors.
pub const COLOR_RAMP_RANGE: u8 = 10;

/// Source of cosmetic randomness.
pub trait RandomSource: Send {
    /// A uniformly distributed byte in `[min, max)`.
    fn next_byte(&mut self, min: u8, max: u8) -> u8;
}

impl<R: rand::Rng + Send> RandomSource for R {
    fn next_byte(&mut self, min: u8, max: u8) -> u8 {
        if min >= max {
            return min;
        }
        self.random_range(min..max)
    }
}

/// Pick a random player color. Luminance stays above 50 so the color is
/// never close to black.
pub fn random_color(random: &mut dyn RandomSource) -> ColorRamp {
    let hue = random.next_byte(0, 255);
    let saturation = random.next_byte(0, 255);
    let luminance = random.next_byte(51, 255);
    ColorRamp::new(hue, saturation, luminance, COLOR_RAMP_RANGE)
}

/// Build a bot client of type `bot_type` sitting in the slot of `reference`.
pub fn build_bot(
    index: u32,
    bot_type: &str,
    reference: &PlayerReference,
    random: &mut dyn RandomSource,
) -> Client {
    let mut bot = Client::new(index, bot_type, random_color(random));
    bot.bot = Some(bot_type.to_string());
    bot.slot = Some(reference.name.clone());
    bot.sync_to_reference(reference);
    bot
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Always returns the lowest allowed value.
    struct Floor;

    impl RandomSource for Floor {
        fn next_byte(&mut self, min: u8, _max: u8) -> u8 {
            min
        }
    }

    #[test]
    fn test_color_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let color = random_color(&mut rng);
            assert!(color.hue < 255);
            assert!(color.saturation < 255);
            assert!((51..255).contains(&color.luminance));
            assert_eq!(color.range, COLOR_RAMP_RANGE);
        }
    }

    #[test]
    fn test_floor_luminance() {
        let color = random_color(&mut Floor);
        assert_eq!(color, ColorRamp::new(0, 0, 51, 10));
    }

    #[test]
    fn test_build_bot() {
        let reference = PlayerReference {
            lock_color: true,
            color: ColorRamp::new(1, 1, 1, 0),
            ..PlayerReference::open("Multi1")
        };
        let bot = build_bot(4, "Hard AI", &reference, &mut Floor);

        assert_eq!(bot.index, 4);
        assert_eq!(bot.name, "Hard AI");
        assert_eq!(bot.bot.as_deref(), Some("Hard AI"));
        assert_eq!(bot.slot.as_deref(), Some("Multi1"));
        assert_eq!(bot.country, "random");
        assert_eq!((bot.team, bot.spawn_point), (0, 0));
        assert_eq!(bot.color, ColorRamp::new(1, 1, 1, 0));
        assert!(!bot.is_ready());
    }
}
