//! Continuous scales mapping data values to pixels and back.
//!
//! A degenerate domain maps everything to the middle of the range, and a
//! degenerate range inverts to the middle of the domain.

use chrono::NaiveDate;

use crate::data::{date_to_ms, ms_to_date, DAY_MS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f32, f32),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    pub fn set_domain(&mut self, domain: (f64, f64)) {
        self.domain = domain;
    }

    pub fn set_range(&mut self, range: (f32, f32)) {
        self.range = range;
    }

    pub fn apply(&self, v: f64) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        let t = if span != 0.0 { (v - d0) / span } else { 0.5 };
        r0 + (r1 - r0) * t as f32
    }

    pub fn invert(&self, px: f32) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = r1 - r0;
        let t = if span != 0.0 { ((px - r0) / span) as f64 } else { 0.5 };
        d0 + (d1 - d0) * t
    }

    /// Round-number ticks inside the domain, roughly `count` of them.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = ordered(self.domain);
        if !lo.is_finite() || !hi.is_finite() || count == 0 {
            return Vec::new();
        }
        if lo == hi {
            return vec![lo];
        }
        let step = nice_step((hi - lo) / count as f64);
        let first = (lo / step).ceil() as i64;
        let last = (hi / step).floor() as i64;
        (first..=last).map(|i| i as f64 * step).collect()
    }
}

/// Linear scale over day timestamps (ms, UTC).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    inner: LinearScale,
}

const DAY_STEPS: [i64; 10] = [1, 2, 3, 7, 14, 30, 61, 91, 182, 365];

impl TimeScale {
    pub fn new(domain_ms: (f64, f64), range: (f32, f32)) -> Self {
        Self {
            inner: LinearScale::new(domain_ms, range),
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.inner.domain()
    }

    pub fn range(&self) -> (f32, f32) {
        self.inner.range()
    }

    pub fn set_domain(&mut self, domain_ms: (f64, f64)) {
        self.inner.set_domain(domain_ms);
    }

    pub fn set_range(&mut self, range: (f32, f32)) {
        self.inner.set_range(range);
    }

    pub fn apply(&self, ms: f64) -> f32 {
        self.inner.apply(ms)
    }

    pub fn apply_date(&self, date: NaiveDate) -> f32 {
        self.inner.apply(date_to_ms(date))
    }

    pub fn invert(&self, px: f32) -> f64 {
        self.inner.invert(px)
    }

    /// Tick timestamps on whole-day boundaries, at most about `count`.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = ordered(self.domain());
        if !lo.is_finite() || !hi.is_finite() || count == 0 {
            return Vec::new();
        }
        let span_days = (hi - lo) / DAY_MS;
        let step = DAY_STEPS
            .iter()
            .copied()
            .find(|s| span_days / *s as f64 <= count as f64)
            .unwrap_or(DAY_STEPS[DAY_STEPS.len() - 1]);
        let step_ms = step as f64 * DAY_MS;
        let first = (lo / step_ms).ceil() as i64;
        let last = (hi / step_ms).floor() as i64;
        (first..=last).map(|i| i as f64 * step_ms).collect()
    }

    pub fn format_tick(ms: f64, fmt: &str) -> String {
        ms_to_date(ms)
            .map(|d| d.format(fmt).to_string())
            .unwrap_or_default()
    }
}

fn ordered((a, b): (f64, f64)) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// 1, 2, 5 or 10 times a power of ten, nearest to `raw` in log space.
fn nice_step(raw: f64) -> f64 {
    let power = raw.log10().floor();
    let base = 10f64.powf(power);
    let error = raw / base;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * base
}
