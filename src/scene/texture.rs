use gl::types::*;

use crate::driver::consts as c;
use crate::driver::types::TextureTarget;
use crate::errors::*;
use crate::math::Color;

/// How texels are sampled between texel centers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

impl From<TextureFilter> for GLenum {
    fn from(filter: TextureFilter) -> Self {
        match filter {
            TextureFilter::Nearest => c::NEAREST,
            TextureFilter::Linear => c::LINEAR,
        }
    }
}

/// How coordinates outside of `0..1` are wrapped.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureWrap {
    Repeat,
    Clamp,
}

impl From<TextureWrap> for GLenum {
    fn from(wrap: TextureWrap) -> Self {
        match wrap {
            TextureWrap::Repeat => c::REPEAT,
            TextureWrap::Clamp => c::CLAMP_TO_EDGE,
        }
    }
}

/// RGBA8 pixels of a 2D texture, or of the six faces of a cube map. Rows are stored bottom
/// row first.
#[derive(Debug, Clone)]
pub struct Texture {
    name: String,
    target: TextureTarget,
    width: u32,
    height: u32,
    faces: Vec<Vec<u8>>,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
}

impl Texture {
    pub fn new_2d<T: Into<String>>(name: T, width: u32, height: u32, pixels: Vec<u8>) -> Result<Texture> {
        let name = name.into();
        check_face(&name, width, height, &pixels)?;

        Ok(Texture {
            name,
            target: TextureTarget::Texture2D,
            width,
            height,
            faces: vec![pixels],
            filter: TextureFilter::Linear,
            wrap: TextureWrap::Repeat,
        })
    }

    /// Creates a cube map from its faces, in the order +X, -X, +Y, -Y, +Z, -Z.
    pub fn cube<T: Into<String>>(name: T, size: u32, faces: Vec<Vec<u8>>) -> Result<Texture> {
        let name = name.into();
        if faces.len() != 6 {
            return Err(Error::InvalidSettings(format!(
                "Cube map '{}' needs 6 faces, found {}.",
                name,
                faces.len()
            )));
        }

        for v in &faces {
            check_face(&name, size, size, v)?;
        }

        Ok(Texture {
            name,
            target: TextureTarget::CubeMap,
            width: size,
            height: size,
            faces,
            filter: TextureFilter::Linear,
            wrap: TextureWrap::Clamp,
        })
    }

    /// A 1x1 texture of one color.
    pub fn solid<T: Into<String>>(name: T, color: Color) -> Texture {
        let rgba: [u8; 4] = color.into();
        Texture {
            name: name.into(),
            target: TextureTarget::Texture2D,
            width: 1,
            height: 1,
            faces: vec![rgba.to_vec()],
            filter: TextureFilter::Nearest,
            wrap: TextureWrap::Repeat,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn target(&self) -> TextureTarget {
        self.target
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The GL image targets and pixels of every face.
    pub fn images(&self) -> impl Iterator<Item = (GLenum, &[u8])> {
        let target = self.target;
        self.faces.iter().enumerate().map(move |(i, v)| {
            let image = match target {
                TextureTarget::Texture2D => c::TEXTURE_2D,
                TextureTarget::CubeMap => c::TEXTURE_CUBE_MAP_POSITIVE_X + i as GLenum,
            };

            (image, &v[..])
        })
    }

    /// The texel at `(x, y)` of the first face.
    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let i = ((y * self.width + x) * 4) as usize;
        let v = &self.faces[0][i..i + 4];
        Some([v[0], v[1], v[2], v[3]])
    }
}

fn check_face(name: &str, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidSettings(format!("Texture '{}' is empty.", name)));
    }

    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(Error::InvalidSettings(format!(
            "Texture '{}' expects {} bytes of RGBA8 pixels, found {}.",
            name,
            expected,
            pixels.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic() {
        let texture = Texture::solid("magenta", Color::magenta());
        assert_eq!(texture.dimensions(), (1, 1));
        assert_eq!(texture.texel(0, 0), Some([255, 0, 255, 255]));
        assert_eq!(texture.texel(1, 0), None);

        let images: Vec<_> = texture.images().map(|v| v.0).collect();
        assert_eq!(images, vec![c::TEXTURE_2D]);

        assert!(Texture::new_2d("bad", 2, 2, vec![0; 15]).is_err());
        assert!(Texture::new_2d("empty", 0, 2, vec![]).is_err());
    }

    #[test]
    fn cube() {
        let faces = (0..6).map(|i| vec![i as u8; 16]).collect();
        let texture = Texture::cube("sky", 2, faces).unwrap();
        assert_eq!(texture.target(), TextureTarget::CubeMap);

        let images: Vec<_> = texture.images().map(|v| v.0).collect();
        assert_eq!(images[0], c::TEXTURE_CUBE_MAP_POSITIVE_X);
        assert_eq!(images[5], c::TEXTURE_CUBE_MAP_POSITIVE_X + 5);
        assert!(Texture::cube("few", 2, vec![vec![0; 16]]).is_err());
    }
}
