//! Pacing for the simulated typing of replies
//!
//! The whole reply is already in memory; this only decides how long to wait
//! before revealing each character. The base delay shrinks as the reply gets
//! longer (down to a floor), pauses stretch after punctuation, whitespace and
//! common filler characters, and every delay is jittered by up to 20%.

use crate::config::ChatConfig;

use rand::Rng;
use std::time::Duration;

const PUNCTUATION_FACTOR: f64 = 3.0;
const WHITESPACE_FACTOR: f64 = 1.5;
const FILLER_FACTOR: f64 = 1.2;
const JITTER: f64 = 0.2;

const CJK_PUNCTUATION: &str = "，。！？；：、…—（）《》「」“”‘’";
const FILLER_CHARS: &str = "的了是在和就也都着吗呢吧啊";

/// Delay model derived from the chat configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TypingProfile {
    base_delay_ms: f64,
    length_scale: f64,
    min_factor: f64,
}

impl From<&ChatConfig> for TypingProfile {
    fn from(config: &ChatConfig) -> Self {
        Self {
            base_delay_ms: config.typing_base_delay_ms as f64,
            length_scale: config.typing_length_scale as f64,
            min_factor: config.typing_min_factor,
        }
    }
}

/// Extra pause applied after `c`
pub fn char_factor(c: char) -> f64 {
    if c.is_ascii_punctuation() || CJK_PUNCTUATION.contains(c) {
        PUNCTUATION_FACTOR
    } else if c.is_whitespace() {
        WHITESPACE_FACTOR
    } else if FILLER_CHARS.contains(c) {
        FILLER_FACTOR
    } else {
        1.0
    }
}

impl TypingProfile {
    /// Per-character delay in milliseconds before multipliers and jitter
    pub fn base_delay_ms(&self, total_chars: usize) -> f64 {
        let scale = self.length_scale / (self.length_scale + total_chars as f64);
        self.base_delay_ms * scale.max(self.min_factor)
    }

    /// Delay for one character; `jitter` is a multiplier in `0.8..=1.2`
    pub fn delay_for(&self, c: char, total_chars: usize, jitter: f64) -> Duration {
        let ms = self.base_delay_ms(total_chars) * char_factor(c) * jitter;
        Duration::from_secs_f64(ms.max(0.0) / 1000.0)
    }

    /// Delays for every character of `text`, in order
    pub fn schedule<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Vec<Duration> {
        let total = text.chars().count();
        text.chars()
            .map(|c| {
                let jitter = rng.random_range((1.0 - JITTER)..=(1.0 + JITTER));
                self.delay_for(c, total, jitter)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn profile() -> TypingProfile {
        TypingProfile::from(&ChatConfig::default())
    }

    #[test]
    fn test_char_factor() {
        assert_eq!(char_factor('a'), 1.0);
        assert_eq!(char_factor('.'), PUNCTUATION_FACTOR);
        assert_eq!(char_factor('。'), PUNCTUATION_FACTOR);
        assert_eq!(char_factor(' '), WHITESPACE_FACTOR);
        assert_eq!(char_factor('的'), FILLER_FACTOR);
        assert_eq!(char_factor('好'), 1.0);
    }

    #[test]
    fn test_longer_replies_type_faster() {
        let p = profile();
        assert!(p.base_delay_ms(10) > p.base_delay_ms(100));
        assert!(p.base_delay_ms(100) > p.base_delay_ms(1000));
    }

    #[test]
    fn test_base_delay_has_floor() {
        let p = profile();
        let floor = 50.0 * 0.2;
        assert!((p.base_delay_ms(1_000_000) - floor).abs() < 1e-9);
    }

    #[test]
    fn test_delay_for_applies_factor_and_jitter() {
        let p = profile();
        let plain = p.delay_for('a', 0, 1.0);
        assert_eq!(plain, Duration::from_millis(50));
        assert_eq!(p.delay_for('!', 0, 1.0), Duration::from_millis(150));
        assert_eq!(p.delay_for('a', 0, 1.2), Duration::from_millis(60));
    }

    #[test]
    fn test_schedule_stays_within_jitter_bounds() {
        let p = profile();
        let mut rng = StdRng::seed_from_u64(42);
        let text = "Hello, 世界";
        let delays = p.schedule(text, &mut rng);
        assert_eq!(delays.len(), text.chars().count());

        let total = text.chars().count();
        for (c, delay) in text.chars().zip(&delays) {
            let nominal = p.base_delay_ms(total) * char_factor(c);
            let ms = delay.as_secs_f64() * 1000.0;
            assert!(ms >= nominal * 0.8 - 1e-6 && ms <= nominal * 1.2 + 1e-6);
        }
    }
}
