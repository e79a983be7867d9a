/// Reverse-diverging palette for the correlation domain [-1,1]: negative
/// values run through blue tones, positive through red tones. Buckets 16
/// and 17 share a color.
pub const DIVERGING_PALETTE: [&str; 20] = [
    "#0B3568", "#1E4371", "#32527A", "#456183", "#59708C",
    "#6C7F96", "#808E9F", "#939DA8", "#A7ACB1", "#BBBBBB",
    "#BBAAAA", "#B2979A", "#A9858B", "#A1737B", "#98606C",
    "#904E5C", "#873C4D", "#873C4D", "#7F293D", "#6E051F",
];

/// Number of quantization buckets shared by the color and size scales.
pub const BUCKETS: usize = 20;

/// Quantizes the correlation domain into equal-width color buckets.
///
/// Domain bounds land in the outermost buckets; out-of-domain values clamp
/// to them as well.
#[derive(Debug, Clone)]
pub struct ColorScale {
    domain: (f64, f64),
    colors: Vec<String>,
}

impl ColorScale {
    /// The default 20-bucket diverging scale over [-1,1].
    pub fn diverging() -> Self {
        Self::with_colors(DIVERGING_PALETTE.iter().map(|c| c.to_string()).collect())
    }

    /// A scale over [-1,1] with an injected color range.
    pub fn with_colors(colors: Vec<String>) -> Self {
        ColorScale {
            domain: (-1.0, 1.0),
            colors,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.colors.len()
    }

    /// Bucket index for a value. Non-finite input clamps to the first bucket.
    pub fn bucket(&self, v: f64) -> usize {
        let n = self.colors.len();
        let t = (v - self.domain.0) / (self.domain.1 - self.domain.0);
        let i = (t * n as f64).floor();
        if i.is_nan() {
            return 0;
        }
        (i.max(0.0) as usize).min(n - 1)
    }

    pub fn color(&self, v: f64) -> &str {
        &self.colors[self.bucket(v)]
    }

    pub fn color_at(&self, bucket: usize) -> &str {
        &self.colors[bucket.min(self.colors.len() - 1)]
    }

    /// Lower domain bound of a bucket, usable as a representative value.
    pub fn value_at(&self, bucket: usize) -> f64 {
        let n = self.colors.len() as f64;
        let width = (self.domain.1 - self.domain.0) / n;
        self.domain.0 + bucket as f64 * width
    }

    /// Colors at the domain extremes, used to tint the two overlap sets.
    pub fn extremes(&self) -> (&str, &str) {
        (self.color(self.domain.0), self.color(self.domain.1))
    }
}

/// Quantizes the correlation domain into circle radii. The radius range is
/// V-shaped: strongest correlations (near the domain bounds) get the largest
/// radius, weakest (near zero) the smallest.
#[derive(Debug, Clone)]
pub struct SizeScale {
    domain: (f64, f64),
    radii: Vec<f64>,
    highlight: f64,
}

impl SizeScale {
    /// Builds the radius quantizer from a band width. The base radius is
    /// 80% of the half band; bucket k scales it by 1.0, 0.9, ... 0.1 down
    /// to the middle and back up to 1.0.
    pub fn from_band(band_width: f64) -> Self {
        let rb = band_width / 2.0 * 0.8;
        let half = BUCKETS / 2;
        let mut radii = Vec::with_capacity(BUCKETS);
        for i in 0..BUCKETS {
            let steps = if i < half { half - i } else { i + 1 - half };
            radii.push(rb * steps as f64 / half as f64);
        }
        SizeScale {
            domain: (-1.0, 1.0),
            radii,
            highlight: rb,
        }
    }

    /// Radius for a value. Non-finite input clamps to the first bucket.
    pub fn radius(&self, v: f64) -> f64 {
        let n = self.radii.len();
        let t = (v - self.domain.0) / (self.domain.1 - self.domain.0);
        let i = (t * n as f64).floor();
        let idx = if i.is_nan() {
            0
        } else {
            (i.max(0.0) as usize).min(n - 1)
        };
        self.radii[idx]
    }

    /// Constant hover-emphasis radius, independent of value.
    pub fn highlight(&self) -> f64 {
        self.highlight
    }
}

/// Evenly spaced ordinal bands with integer step and a centered remainder,
/// so band edges sit on whole pixels.
#[derive(Debug, Clone)]
pub struct BandScale {
    offset: f64,
    step: f64,
}

impl BandScale {
    pub fn new(len: usize, extent: f64) -> Self {
        if len == 0 {
            return BandScale {
                offset: 0.0,
                step: 0.0,
            };
        }
        let step = (extent / len as f64).floor();
        let error = extent - step * len as f64;
        BandScale {
            offset: (error / 2.0).round(),
            step,
        }
    }

    /// Left edge of band `i`.
    pub fn position(&self, i: usize) -> f64 {
        self.offset + self.step * i as f64
    }

    /// Center of band `i`.
    pub fn center(&self, i: usize) -> f64 {
        self.position(i) + self.step / 2.0
    }

    pub fn band_width(&self) -> f64 {
        self.step
    }
}

/// Linear scale mapping a numeric domain onto a pixel range, with d3-style
/// tick generation. The domain may be descending (used by y axes).
#[derive(Debug, Clone, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        LinearScale { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn scale(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Roughly `count` ticks at 1/2/5 x 10^k steps, ascending, covering the
    /// domain interior.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = sorted(self.domain);
        if lo == hi {
            return vec![lo];
        }
        let step = tick_step(lo, hi, count);
        if step <= 0.0 {
            return vec![lo];
        }
        let i0 = (lo / step).ceil() as i64;
        let i1 = (hi / step).floor() as i64;
        (i0..=i1).map(|i| i as f64 * step).collect()
    }

    /// Decimal places needed to print ticks at `count` without loss.
    pub fn tick_decimals(&self, count: usize) -> usize {
        let (lo, hi) = sorted(self.domain);
        if lo == hi {
            return 0;
        }
        let step = tick_step(lo, hi, count);
        if step >= 1.0 || step <= 0.0 {
            0
        } else {
            (-step.log10().floor()) as usize
        }
    }
}

fn sorted((a, b): (f64, f64)) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Tick interval selection: power of ten scaled by 1, 2 or 5.
fn tick_step(lo: f64, hi: f64, count: usize) -> f64 {
    let count = count.max(1) as f64;
    let step0 = (hi - lo) / count;
    if step0 <= 0.0 {
        return 0.0;
    }
    let mut step = 10f64.powf(step0.log10().floor());
    let error = step0 / step;
    if error >= 50f64.sqrt() {
        step *= 10.0;
    } else if error >= 10f64.sqrt() {
        step *= 5.0;
    } else if error >= 2f64.sqrt() {
        step *= 2.0;
    }
    step
}
