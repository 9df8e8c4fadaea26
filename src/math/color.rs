/// A RGBA `Color`. Each color component is a floating point value with a range from 0 to 1.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    pub const fn white() -> Self {
        Color::new(1.0, 1.0, 1.0, 1.0)
    }

    pub const fn black() -> Self {
        Color::new(0.0, 0.0, 0.0, 1.0)
    }

    pub const fn gray() -> Self {
        Color::new(0.5, 0.5, 0.5, 1.0)
    }

    pub const fn magenta() -> Self {
        Color::new(1.0, 0.0, 1.0, 1.0)
    }

    pub const fn transparent() -> Self {
        Color::new(0.0, 0.0, 0.0, 0.0)
    }

    /// The GL default ambient reflection of materials.
    pub const fn default_ambient() -> Self {
        Color::new(0.2, 0.2, 0.2, 1.0)
    }

    /// The GL default diffuse reflection of materials.
    pub const fn default_diffuse() -> Self {
        Color::new(0.8, 0.8, 0.8, 1.0)
    }

    /// Clip to [0.0, 1.0] range.
    pub fn clip(&self) -> Self {
        let f = |v: f32| v.max(0.0).min(1.0);
        Color::new(f(self.r), f(self.g), f(self.b), f(self.a))
    }

    /// Returns a copy with the alpha channel replaced.
    pub fn with_alpha(&self, a: f32) -> Self {
        Color::new(self.r, self.g, self.b, a)
    }

    pub fn rgb(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn rgba(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Encodes a node identity into an opaque color. The low byte lands in red, so up to
    /// 2^24 - 1 identities are distinguishable. Zero is reserved for the background.
    pub fn from_pick_id(id: u32) -> Self {
        let bytes = [
            (id & 0xFF) as u8,
            ((id >> 8) & 0xFF) as u8,
            ((id >> 16) & 0xFF) as u8,
            0xFF,
        ];

        bytes.into()
    }

    /// Decodes the identity from pixel read back from a pick framebuffer. Alpha is ignored.
    pub fn pick_id_of(pixel: [u8; 4]) -> u32 {
        u32::from(pixel[0]) | (u32::from(pixel[1]) << 8) | (u32::from(pixel[2]) << 16)
    }
}

impl Into<[u8; 4]> for Color {
    fn into(self) -> [u8; 4] {
        let v = self.clip();
        let f = |c: f32| (c * 255.0).round() as u8;
        [f(v.r), f(v.g), f(v.b), f(v.a)]
    }
}

impl From<[u8; 4]> for Color {
    fn from(v: [u8; 4]) -> Self {
        let max = 255.0;
        Color::new(
            f32::from(v[0]) / max,
            f32::from(v[1]) / max,
            f32::from(v[2]) / max,
            f32::from(v[3]) / max,
        )
    }
}

impl From<[f32; 4]> for Color {
    fn from(v: [f32; 4]) -> Self {
        Color::new(v[0], v[1], v[2], v[3])
    }
}

impl Into<cgmath::Vector4<f32>> for Color {
    fn into(self) -> cgmath::Vector4<f32> {
        cgmath::Vector4::new(self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes() {
        let bytes: [u8; 4] = Color::new(1.0, 0.5, 0.0, 2.0).into();
        assert_eq!(bytes, [255, 128, 0, 255]);

        let color: Color = [0, 255, 0, 255].into();
        assert_eq!(color, Color::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn pick_ids() {
        for &id in &[1u32, 2, 255, 256, 0x12_3456, 0xFF_FFFF] {
            let bytes: [u8; 4] = Color::from_pick_id(id).into();
            assert_eq!(Color::pick_id_of(bytes), id);
        }

        let bytes: [u8; 4] = Color::from_pick_id(0x0201).into();
        assert_eq!(bytes, [0x01, 0x02, 0x00, 0xFF]);
        assert_eq!(Color::pick_id_of([0, 0, 0, 0]), 0);
    }
}
