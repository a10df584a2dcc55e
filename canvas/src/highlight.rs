use structures::Rgba;

/// Which bytes the luminance weights apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrayMix {
    /// The viewer's historical reading: the second byte is weighted as blue
    /// (0.11) and the third as green (0.59). Matches existing renders bit
    /// for bit.
    #[default]
    Legacy,
    /// 0.3 red, 0.59 green, 0.11 blue in channel order.
    Standard,
}

/// Gray level of a color, truncated like a store into a byte array.
pub fn gray_level(color: Rgba, mix: GrayMix) -> u8 {
    let [r, second, third, _] = color.map(f64::from);
    let (green, blue) = match mix {
        GrayMix::Legacy => (third, second),
        GrayMix::Standard => (second, third),
    };

    (r * 0.3 + green * 0.59 + blue * 0.11) as u8
}

/// De-emphasis of every player except an optional target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Highlight {
    target: Option<u32>,
    mix: GrayMix,
}

impl Highlight {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn target(player_index: u32) -> Self {
        Self {
            target: Some(player_index),
            mix: GrayMix::default(),
        }
    }

    pub fn with_mix(mut self, mix: GrayMix) -> Self {
        self.mix = mix;
        self
    }

    pub fn target_player(&self) -> Option<u32> {
        self.target
    }

    /// The color to paint for a placement by `player_index`. Without a
    /// target, or for the target's own pixels, that is the placed color;
    /// everyone else turns gray. Alpha is kept.
    pub fn decide_color(&self, player_index: u32, color: Rgba) -> Rgba {
        match self.target {
            Some(target) if target != player_index => {
                let gray = gray_level(color, self.mix);
                [gray, gray, gray, color[3]]
            }
            _ => color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_target_keeps_colors() {
        assert_eq!(
            Highlight::none().decide_color(5, [200, 100, 50, 255]),
            [200, 100, 50, 255]
        );
    }

    #[test]
    fn target_keeps_its_own_colors() {
        assert_eq!(
            Highlight::target(2).decide_color(2, [200, 100, 50, 255]),
            [200, 100, 50, 255]
        );
    }

    #[test]
    fn others_turn_gray_with_legacy_channel_order() {
        // 200 * 0.3 + 50 * 0.59 + 100 * 0.11 = 100.5
        assert_eq!(
            Highlight::target(2).decide_color(3, [200, 100, 50, 255]),
            [100, 100, 100, 255]
        );
    }

    #[test]
    fn standard_mix_weights_channels_in_order() {
        // 200 * 0.3 + 100 * 0.59 + 50 * 0.11 = 124.5
        let highlight = Highlight::target(2).with_mix(GrayMix::Standard);
        assert_eq!(highlight.decide_color(3, [200, 100, 50, 128]), [124, 124, 124, 128]);
    }

    #[test]
    fn extremes_stay_in_range() {
        assert!(gray_level([255, 255, 255, 255], GrayMix::Legacy) >= 254);
        assert_eq!(gray_level([0, 0, 0, 0], GrayMix::Standard), 0);
    }
}
