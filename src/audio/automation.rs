//! Scheduled parameter changes, evaluated per sample on the render thread.
//!
//! Works like a Web Audio `AudioParam`. A point either jumps to a value at its
//! time, or is the end of a linear ramp that starts at the previous point.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Point {
    Set { at: f64, value: f32 },
    Ramp { at: f64, value: f32 },
}

impl Point {
    fn at(&self) -> f64 {
        match *self {
            Point::Set { at, .. } | Point::Ramp { at, .. } => at,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            Point::Set { value, .. } | Point::Ramp { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Automation {
    default: f32,
    points: Vec<Point>,
}

impl Automation {
    pub fn new(default: f32) -> Self {
        Self { default, points: Vec::new() }
    }

    /// Constant value from `at` onwards.
    pub fn constant(value: f32, at: f64) -> Self {
        let mut a = Self::new(value);
        a.set_value_at(value, at);
        a
    }

    fn insert(&mut self, point: Point) {
        // Equal times keep insertion order.
        let idx = self.points.partition_point(|p| p.at() <= point.at());
        self.points.insert(idx, point);
    }

    pub fn set_value_at(&mut self, value: f32, at: f64) -> &mut Self {
        self.insert(Point::Set { at, value });
        self
    }

    pub fn linear_ramp_to(&mut self, value: f32, at: f64) -> &mut Self {
        self.insert(Point::Ramp { at, value });
        self
    }

    /// Drops every point at or after `at`.
    pub fn cancel_from(&mut self, at: f64) {
        self.points.retain(|p| p.at() < at);
    }

    /// Freezes the value the param has at `at` and drops everything later.
    pub fn cancel_and_hold(&mut self, at: f64) {
        let held = self.value_at(at);
        self.cancel_from(at);
        self.set_value_at(held, at);
    }

    pub fn value_at(&self, t: f64) -> f32 {
        let mut prev_at = 0.0;
        let mut prev_value = self.default;

        for point in &self.points {
            if point.at() <= t {
                prev_at = point.at();
                prev_value = point.value();
                continue;
            }
            return match *point {
                Point::Set { .. } => prev_value,
                Point::Ramp { at, value } => {
                    let span = at - prev_at;
                    if span <= 0.0 {
                        value
                    } else {
                        let frac = ((t - prev_at) / span) as f32;
                        prev_value + (value - prev_value) * frac
                    }
                }
            };
        }

        prev_value
    }
}
