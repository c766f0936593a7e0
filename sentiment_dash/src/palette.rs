use egui::Color32;

pub const HYPE: Color32 = Color32::from_rgb(0x00, 0x7b, 0xff);
pub const FEAR: Color32 = Color32::from_rgb(0xff, 0x9f, 0x1c);
pub const ANGER: Color32 = Color32::from_rgb(0xd6, 0x30, 0x31);
pub const NOISE: Color32 = Color32::from_rgb(0x63, 0x6e, 0x72);
pub const VOL_FILL: Color32 = Color32::from_rgb(0xe9, 0xec, 0xef);
pub const UNKNOWN_SENTIMENT: Color32 = Color32::from_rgb(0xde, 0xe2, 0xe6);

pub const WICK: Color32 = Color32::from_rgb(0xad, 0xb5, 0xbd);
pub const CONTEXT_LINE: Color32 = Color32::from_rgb(0xce, 0xd4, 0xda);
pub const AXIS_MUTED: Color32 = Color32::from_rgb(0x6c, 0x75, 0x7d);
pub const TREND_UP: Color32 = Color32::from_rgb(0x2e, 0xcc, 0x71);
pub const TREND_DOWN: Color32 = Color32::from_rgb(0xff, 0x76, 0x75);

/// Stops of the fear legend bar.
pub const LEGEND_STOPS: [(f32, Color32); 3] = [
    (0.0, Color32::from_rgb(0xfe, 0xe5, 0xd9)),
    (0.5, Color32::from_rgb(0xfb, 0x6a, 0x4a)),
    (1.0, Color32::from_rgb(0xcb, 0x18, 0x1d)),
];

pub const FEAR_DOMAIN: (f64, f64) = (0.45, 0.75);

/// Nine-class sequential "Reds" scheme.
const REDS: [[u8; 3]; 9] = [
    [0xff, 0xf5, 0xf0],
    [0xfe, 0xe0, 0xd2],
    [0xfc, 0xbb, 0xa1],
    [0xfc, 0x92, 0x72],
    [0xfb, 0x6a, 0x4a],
    [0xef, 0x3b, 0x2c],
    [0xcb, 0x18, 0x1d],
    [0xa5, 0x0f, 0x15],
    [0x67, 0x00, 0x0d],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Hype,
    Fear,
    Anger,
    Noise,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Hype,
        Sentiment::Fear,
        Sentiment::Anger,
        Sentiment::Noise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Hype => "Hype",
            Sentiment::Fear => "Fear",
            Sentiment::Anger => "Anger",
            Sentiment::Noise => "Noise",
        }
    }

    pub fn color(&self) -> Color32 {
        match self {
            Sentiment::Hype => HYPE,
            Sentiment::Fear => FEAR,
            Sentiment::Anger => ANGER,
            Sentiment::Noise => NOISE,
        }
    }

    /// Case-insensitive label lookup (`fEAR` resolves to `Fear`).
    pub fn from_label(label: &str) -> Option<Self> {
        let key = capitalize(label);
        Self::ALL.into_iter().find(|s| s.as_str() == key)
    }
}

/// First char upper-cased, the rest lower-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Badge color for a free-text sentiment label.
pub fn sentiment_color(label: &str) -> Color32 {
    Sentiment::from_label(label)
        .map(|s| s.color())
        .unwrap_or(UNKNOWN_SENTIMENT)
}

/// Candle body fill for a fear ratio. The ratio is mapped linearly over
/// [`FEAR_DOMAIN`] and clamped, so values past either end take the end color.
pub fn fear_color(fear_ratio: f64) -> Color32 {
    let (d0, d1) = FEAR_DOMAIN;
    let t = (fear_ratio - d0) / (d1 - d0);
    interpolate_reds(if t.is_nan() { 0.0 } else { t })
}

/// Uniform cubic B-spline through the scheme colors, per channel.
pub fn interpolate_reds(t: f64) -> Color32 {
    let n = REDS.len() - 1;
    let (t, i) = if t <= 0.0 {
        (0.0, 0)
    } else if t >= 1.0 {
        (1.0, n - 1)
    } else {
        (t, (t * n as f64).floor() as usize)
    };
    let local = (t - i as f64 / n as f64) * n as f64;

    let mut rgb = [0u8; 3];
    for (ch, out) in rgb.iter_mut().enumerate() {
        let v1 = REDS[i][ch] as f64;
        let v2 = REDS[i + 1][ch] as f64;
        let v0 = if i > 0 { REDS[i - 1][ch] as f64 } else { 2.0 * v1 - v2 };
        let v3 = if i < n - 1 { REDS[i + 2][ch] as f64 } else { 2.0 * v2 - v1 };
        *out = basis(local, v0, v1, v2, v3).round().clamp(0.0, 255.0) as u8;
    }
    Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

fn basis(t1: f64, v0: f64, v1: f64, v2: f64, v3: f64) -> f64 {
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}

/// Linear blend over `LEGEND_STOPS`, used by the legend bar.
pub fn legend_color(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    for w in LEGEND_STOPS.windows(2) {
        let (a_t, a) = w[0];
        let (b_t, b) = w[1];
        if t <= b_t {
            let f = if b_t > a_t { (t - a_t) / (b_t - a_t) } else { 0.0 };
            return lerp_color(a, b, f);
        }
    }
    LEGEND_STOPS[LEGEND_STOPS.len() - 1].1
}

fn lerp_color(a: Color32, b: Color32, f: f32) -> Color32 {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * f).round() as u8;
    Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_case_insensitively() {
        assert_eq!(Sentiment::from_label("hype"), Some(Sentiment::Hype));
        assert_eq!(Sentiment::from_label("FEAR"), Some(Sentiment::Fear));
        assert_eq!(Sentiment::from_label("aNGER"), Some(Sentiment::Anger));
        assert_eq!(Sentiment::from_label("bullish"), None);
        assert_eq!(sentiment_color("nOiSe"), NOISE);
        assert_eq!(sentiment_color(""), UNKNOWN_SENTIMENT);
        assert_eq!(sentiment_color("greed"), UNKNOWN_SENTIMENT);
    }

    #[test]
    fn fear_color_clamps_at_domain_bounds() {
        let low = fear_color(0.45);
        let high = fear_color(0.75);
        assert_eq!(low, Color32::from_rgb(0xff, 0xf5, 0xf0));
        assert_eq!(high, Color32::from_rgb(0x67, 0x00, 0x0d));
        assert_eq!(fear_color(0.0), low);
        assert_eq!(fear_color(0.30), low);
        assert_eq!(fear_color(0.95), high);
        assert_eq!(fear_color(1.0), high);
    }

    #[test]
    fn fear_color_darkens_with_ratio() {
        let a = fear_color(0.50);
        let b = fear_color(0.60);
        let c = fear_color(0.70);
        assert!(a.g() > b.g() && b.g() > c.g());
        assert_ne!(a, fear_color(0.45));
    }

    #[test]
    fn legend_hits_its_stops() {
        assert_eq!(legend_color(0.0), LEGEND_STOPS[0].1);
        assert_eq!(legend_color(0.5), LEGEND_STOPS[1].1);
        assert_eq!(legend_color(1.0), LEGEND_STOPS[2].1);
    }
}
