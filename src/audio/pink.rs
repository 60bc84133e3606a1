use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Paul Kellet's refined pink-noise filter (the Voss-McCartney
/// approximation). Equal energy per octave from white input.
#[derive(Debug, Clone, Default)]
pub struct PinkFilter {
    b: [f32; 7],
}

impl PinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, w: f32) -> f32 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + w * 0.0555179;
        b[1] = 0.99332 * b[1] + w * 0.0750759;
        b[2] = 0.96900 * b[2] + w * 0.1538520;
        b[3] = 0.86650 * b[3] + w * 0.3104856;
        b[4] = 0.55000 * b[4] + w * 0.5329522;
        b[5] = -0.7616 * b[5] - w * 0.0168980;
        let out = (b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + w * 0.5362) * 0.08;
        b[6] = w * 0.115926;
        out
    }
}

/// Uniform white noise in [-1, 1) shaped by `PinkFilter`.
#[derive(Debug, Clone)]
pub struct PinkNoise {
    rng: SmallRng,
    filter: PinkFilter,
}

impl PinkNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            filter: PinkFilter::new(),
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let w: f32 = self.rng.gen_range(-1.0..1.0);
        self.filter.process(w)
    }
}
