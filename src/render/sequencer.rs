use gl::types::*;

const DEPTH_BITS: u32 = 24;
const DEPTH_MASK: u64 = (1 << DEPTH_BITS) - 1;

/// The sort key of one drawable.
///
/// Opaque drawables go first, grouped by program, then by texture, then front to back.
/// Translucent drawables follow back to front, and only then by program and texture.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawOrder {
    pub translucent: bool,
    pub program: GLuint,
    pub texture: GLuint,
    /// Eye space distance from the camera, normalized into `0..1` of the clip range.
    pub depth: f32,
}

impl DrawOrder {
    /// Normalizes an eye space depth into the clip range `[near, far]`.
    pub fn normalize(depth: f32, near: f32, far: f32) -> f32 {
        if far <= near {
            return 0.0;
        }

        ((depth - near) / (far - near)).max(0.0).min(1.0)
    }

    fn quantized_depth(&self) -> u64 {
        (f64::from(self.depth.max(0.0).min(1.0)) * DEPTH_MASK as f64) as u64
    }
}

impl From<DrawOrder> for u64 {
    fn from(v: DrawOrder) -> u64 {
        let program = u64::from(v.program & 0xFFFF);
        let texture = u64::from(v.texture & 0xFFFF);
        let depth = v.quantized_depth();

        if v.translucent {
            (1 << 63) | ((!depth & DEPTH_MASK) << 32) | (program << 16) | texture
        } else {
            (program << 47) | (texture << 31) | (depth << 7)
        }
    }
}

/// Yields drawables in rendering order.
#[derive(Debug, Default)]
pub struct Sequencer {
    items: Vec<(u64, usize)>,
}

impl Sequencer {
    pub fn new() -> Self {
        Sequencer::default()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn push(&mut self, order: DrawOrder, item: usize) {
        self.items.push((order.into(), item));
    }

    /// Sorts the pushed items. Items with equal keys keep the order they were pushed in.
    pub fn sort(&mut self) {
        self.items.sort_by_key(|v| v.0);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = usize> + 'a {
        self.items.iter().map(|v| v.1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn order(translucent: bool, program: GLuint, texture: GLuint, depth: f32) -> DrawOrder {
        DrawOrder {
            translucent,
            program,
            texture,
            depth,
        }
    }

    fn sequence(orders: &[DrawOrder]) -> Vec<usize> {
        let mut seq = Sequencer::new();
        for (i, v) in orders.iter().enumerate() {
            seq.push(*v, i);
        }

        seq.sort();
        seq.iter().collect()
    }

    #[test]
    fn opaque_first() {
        let v = sequence(&[
            order(true, 1, 0, 0.2),
            order(false, 1, 0, 0.9),
            order(true, 1, 0, 0.8),
            order(false, 1, 0, 0.1),
        ]);

        assert_eq!(v, vec![3, 1, 2, 0]);
    }

    #[test]
    fn grouping() {
        let v = sequence(&[
            order(false, 2, 1, 0.1),
            order(false, 1, 2, 0.5),
            order(false, 1, 1, 0.9),
            order(false, 2, 1, 0.0),
        ]);

        assert_eq!(v, vec![2, 1, 3, 0]);
    }

    #[test]
    fn stable() {
        let v = sequence(&[order(false, 1, 1, 0.5), order(false, 1, 1, 0.5)]);
        assert_eq!(v, vec![0, 1]);
    }

    #[test]
    fn normalize() {
        assert_ulps_eq!(DrawOrder::normalize(5.5, 1.0, 10.0), 0.5);
        assert_ulps_eq!(DrawOrder::normalize(-3.0, 1.0, 10.0), 0.0);
        assert_ulps_eq!(DrawOrder::normalize(30.0, 1.0, 10.0), 1.0);
        assert_ulps_eq!(DrawOrder::normalize(3.0, 1.0, 1.0), 0.0);
    }
}
