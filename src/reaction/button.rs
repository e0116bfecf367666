/// Decorative reaction buttons
///
/// A reaction is drawn as one of ten button sprites dropped somewhere along
/// the edge of the photo. Offsets are relative to the photo's frame.
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const BUTTON_VARIANTS: u8 = 10;
pub const MIN_BUTTON_SIZE: f64 = 25.0;
pub const MAX_BUTTON_SIZE: f64 = 45.0;
/// How far a button may sit inside or outside the photo edge
pub const EDGE_STRADDLE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl ButtonSide {
    const ALL: [ButtonSide; 4] = [
        ButtonSide::Top,
        ButtonSide::Right,
        ButtonSide::Bottom,
        ButtonSide::Left,
    ];
}

/// Visual of one reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonStyle {
    /// Sprite number, 1 to 10
    pub variant: u8,
    /// Edge length in px (buttons are square)
    pub size: f64,
    pub left: f64,
    pub top: f64,
    /// Degrees
    pub rotation: f64,
}

impl ButtonStyle {
    /// Random button on a random edge of a `photo_width` x `photo_height`
    /// photo framed with `padding` on each side.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        photo_width: f64,
        photo_height: f64,
        padding: f64,
    ) -> Self {
        let variant = rng.gen_range(1..=BUTTON_VARIANTS);
        let size = rng.gen_range(MIN_BUTTON_SIZE..=MAX_BUTTON_SIZE);
        let side = ButtonSide::ALL[rng.gen_range(0..ButtonSide::ALL.len())];

        let along_x = padding + rng.gen::<f64>() * (photo_width - size).max(0.0);
        let along_y = padding + rng.gen::<f64>() * (photo_height - size).max(0.0);
        let straddle = -EDGE_STRADDLE + rng.gen::<f64>() * EDGE_STRADDLE * 2.0;

        let (left, top) = match side {
            ButtonSide::Top => (along_x, straddle),
            ButtonSide::Right => (padding + photo_width + straddle, along_y),
            ButtonSide::Bottom => (along_x, padding + photo_height + straddle),
            ButtonSide::Left => (straddle, along_y),
        };

        let rotation = rng.gen_range(0.0..360.0);

        Self {
            variant,
            size,
            left,
            top,
            rotation,
        }
    }

    /// Asset name of the sprite, e.g. `button3.png`
    pub fn sprite_name(&self) -> String {
        format!("button{}.png", self.variant)
    }

    /// Convert to JSON string for catalog storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from catalog)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_buttons_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let (w, h, pad) = (260.0, 180.0, 13.0);
        for _ in 0..500 {
            let b = ButtonStyle::random(&mut rng, w, h, pad);
            assert!((1..=10).contains(&b.variant));
            assert!(b.size >= 25.0 && b.size <= 45.0);
            assert!(b.rotation >= 0.0 && b.rotation < 360.0);

            let on_top = b.top.abs() <= 5.0;
            let on_left = b.left.abs() <= 5.0;
            let on_right = (b.left - (pad + w)).abs() <= 5.0;
            let on_bottom = (b.top - (pad + h)).abs() <= 5.0;
            assert!(on_top || on_left || on_right || on_bottom, "{:?}", b);
        }
    }

    #[test]
    fn test_every_variant_is_drawn() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 10];
        for _ in 0..400 {
            let b = ButtonStyle::random(&mut rng, 130.0, 200.0, 6.5);
            seen[(b.variant - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_sprite_name() {
        let b = ButtonStyle {
            variant: 7,
            size: 30.0,
            left: 0.0,
            top: 0.0,
            rotation: 0.0,
        };
        assert_eq!(b.sprite_name(), "button7.png");
        assert_eq!(ButtonStyle::from_json(&b.to_json().unwrap()).unwrap(), b);
    }
}
