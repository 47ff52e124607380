use std::collections::HashMap;

/// Named fractal fields, addressed by the name they were created with.
pub trait NoiseService {
    fn create_fractal(&mut self, name: &str, width: u32, height: u32, frequency: f32);
    /// Height in `[0, 1]`; `0.0` for unknown names or out-of-range tiles.
    fn height(&self, name: &str, x: u32, y: u32) -> f32;
    /// Height below which `percentile`% of the field lies.
    fn height_at_percentile(&self, name: &str, percentile: f32) -> f32;
}

#[derive(Debug, Clone)]
struct FractalField {
    width: u32,
    height: u32,
    values: Vec<f32>,
    sorted: Vec<f32>,
}

/// fBm over hashed value noise, seeded per map.
#[derive(Debug, Clone)]
pub struct ValueNoise {
    seed: u64,
    fields: HashMap<String, FractalField>,
}

impl ValueNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            fields: HashMap::new(),
        }
    }
}

impl NoiseService for ValueNoise {
    fn create_fractal(&mut self, name: &str, width: u32, height: u32, frequency: f32) {
        let salt = crate::rng::fnv1a_64(name.as_bytes()) as u32;
        let field_seed = mix_seed(0x9E37_0001, self.seed, salt);
        let freq = frequency.max(0.01);
        let mut values = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let nx = x as f32 / width.max(1) as f32;
                let ny = y as f32 / height.max(1) as f32;
                values.push(fbm_noise(nx * freq, ny * freq, 5, 2.0, 0.5, field_seed));
            }
        }
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        self.fields.insert(
            name.to_string(),
            FractalField {
                width,
                height,
                values,
                sorted,
            },
        );
    }

    fn height(&self, name: &str, x: u32, y: u32) -> f32 {
        match self.fields.get(name) {
            Some(field) if x < field.width && y < field.height => {
                field.values[(y * field.width + x) as usize]
            }
            _ => 0.0,
        }
    }

    fn height_at_percentile(&self, name: &str, percentile: f32) -> f32 {
        self.fields
            .get(name)
            .map(|field| quantile(&field.sorted, percentile / 100.0))
            .unwrap_or(0.0)
    }
}

fn quantile(sorted: &[f32], q: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f32 * q.clamp(0.0, 1.0)).round() as usize;
    sorted[idx]
}

fn fbm_noise(x: f32, y: f32, octaves: u32, lacunarity: f32, gain: f32, seed: u32) -> f32 {
    let mut frequency = 1.0;
    let mut amplitude = 1.0;
    let mut sum = 0.0;
    let mut normaliser = 0.0;
    for octave in 0..octaves {
        sum += value_noise(x * frequency, y * frequency, seed.wrapping_add(octave)) * amplitude;
        normaliser += amplitude;
        frequency *= lacunarity;
        amplitude *= gain;
    }
    (sum / normaliser).clamp(0.0, 1.0)
}

fn value_noise(x: f32, y: f32, seed: u32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let tx = smooth_step(x - x0 as f32);
    let ty = smooth_step(y - y0 as f32);

    let top = lerp(hash2(x0, y0, seed), hash2(x0 + 1, y0, seed), tx);
    let bottom = lerp(hash2(x0, y0 + 1, seed), hash2(x0 + 1, y0 + 1, seed), tx);
    lerp(top, bottom, ty)
}

fn smooth_step(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn hash2(x: i32, y: i32, seed: u32) -> f32 {
    let mut n = (x as u32).wrapping_mul(0x6C8E_9CF5) ^ (y as u32).wrapping_mul(0xB529_7A4D) ^ seed;
    n ^= n >> 13;
    n = n.wrapping_mul(0x1B56_C4E9);
    n ^= n >> 11;
    ((n >> 8) & 0xFFFF) as f32 / 65535.0
}

fn mix_seed(base: u32, seed: u64, salt: u32) -> u32 {
    base ^ (seed as u32).rotate_left(7) ^ ((seed >> 32) as u32).rotate_left(11) ^ salt
}
