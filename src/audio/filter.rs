use std::f64::consts::PI;

/// Second-order low-pass (RBJ cookbook), direct form I.
#[derive(Debug, Clone)]
pub struct LowPass {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl LowPass {
    pub fn new(cutoff_hz: f64, sample_rate: u32) -> Self {
        let nyquist = sample_rate as f64 / 2.0;
        let f0 = cutoff_hz.clamp(1.0, nyquist * 0.99);
        let q = std::f64::consts::FRAC_1_SQRT_2;

        let w0 = 2.0 * PI * f0 / sample_rate as f64;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;

        Self {
            b0: (((1.0 - cos_w0) / 2.0) / a0) as f32,
            b1: ((1.0 - cos_w0) / a0) as f32,
            b2: (((1.0 - cos_w0) / 2.0) / a0) as f32,
            a1: ((-2.0 * cos_w0) / a0) as f32,
            a2: ((1.0 - alpha) / a0) as f32,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}
