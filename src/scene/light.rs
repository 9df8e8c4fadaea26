use cgmath::{InnerSpace, Vector3, Vector4};

use crate::driver::types::FogMode;
use crate::math::Color;

/// A light source, in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Is this light enabled.
    pub enabled: bool,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    /// The homogeneous location of the light. A `w` of zero makes a directional light,
    /// shining from `xyz` towards the origin.
    pub position: Vector4<f32>,
    pub spot_direction: Vector3<f32>,
    pub spot_exponent: f32,
    /// The half angle of the spot cone, in degrees. 180 turns the spot off.
    pub spot_cutoff: f32,
    /// Constant, linear and quadratic attenuation coefficients.
    pub attenuation: [f32; 3],
}

impl Default for Light {
    fn default() -> Self {
        Light {
            enabled: true,
            ambient: Color::black(),
            diffuse: Color::white(),
            specular: Color::white(),
            position: Vector4::new(0.0, 0.0, 1.0, 0.0),
            spot_direction: Vector3::new(0.0, 0.0, -1.0),
            spot_exponent: 0.0,
            spot_cutoff: 180.0,
            attenuation: [1.0, 0.0, 0.0],
        }
    }
}

impl Light {
    /// Creates a directional light shining along `direction`.
    pub fn directional(direction: Vector3<f32>) -> Self {
        let d = -direction.normalize();
        Light {
            position: d.extend(0.0),
            ..Default::default()
        }
    }

    /// Creates an omni light located at `position`.
    pub fn point(position: Vector3<f32>) -> Self {
        Light {
            position: position.extend(1.0),
            ..Default::default()
        }
    }

    /// Creates a spot light at `position` that lights a cone of `cutoff` degrees around
    /// `direction`.
    pub fn spot(position: Vector3<f32>, direction: Vector3<f32>, cutoff: f32) -> Self {
        Light {
            position: position.extend(1.0),
            spot_direction: direction.normalize(),
            spot_cutoff: cutoff.max(0.0).min(90.0),
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }

    #[inline]
    pub fn is_spot(&self) -> bool {
        !self.is_directional() && self.spot_cutoff < 180.0
    }
}

/// Fog blended over everything the scene draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub color: Color,
    pub mode: FogMode,
    pub density: f32,
    pub start: f32,
    pub end: f32,
}

impl Default for Fog {
    fn default() -> Self {
        Fog {
            color: Color::gray(),
            mode: FogMode::Exp2,
            density: 1.0,
            start: 0.0,
            end: 1.0,
        }
    }
}

impl Fog {
    /// The visibility, between 0 and 1, of a fragment `distance` units from the eye.
    pub fn visibility(&self, distance: f32) -> f32 {
        let v = match self.mode {
            FogMode::Linear => (self.end - distance) / (self.end - self.start).max(::std::f32::EPSILON),
            FogMode::Exp => (-self.density * distance).exp(),
            FogMode::Exp2 => (-(self.density * distance).powi(2)).exp(),
        };

        v.max(0.0).min(1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds() {
        let light = Light::directional(Vector3::new(0.0, -2.0, 0.0));
        assert!(light.is_directional());
        assert_eq!(light.position, Vector4::new(0.0, 1.0, 0.0, 0.0));

        let light = Light::spot(Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, -3.0, 0.0), 120.0);
        assert!(light.is_spot());
        assert_eq!(light.spot_cutoff, 90.0);
        assert!(!Light::point(Vector3::new(1.0, 0.0, 0.0)).is_spot());
    }

    #[test]
    fn visibility() {
        let fog = Fog {
            mode: FogMode::Linear,
            start: 10.0,
            end: 20.0,
            ..Default::default()
        };

        assert_eq!(fog.visibility(5.0), 1.0);
        assert_ulps_eq!(fog.visibility(15.0), 0.5);
        assert_eq!(fog.visibility(25.0), 0.0);

        let fog = Fog {
            mode: FogMode::Exp,
            density: 0.5,
            ..Default::default()
        };
        assert_ulps_eq!(fog.visibility(2.0), (-1.0f32).exp());
    }
}
