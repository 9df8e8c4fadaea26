//! A device through which the scene is viewed.

use cgmath::{Angle, EuclideanSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, Zero};

use crate::math::matrix as mat;
use crate::math::Color;

/// The projection used when primitives are taken into the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Orthographic projection with the half vertical size of the view volume as payload.
    Orthographic(f32),
    /// Perspective projection with the vertical field of view as payload.
    Perspective(Rad<f32>),
}

/// A `Camera` looks down its local negative z-axis, with y up.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    projection: Projection,
    clip: cgmath::Vector2<f32>,
    viewport: [i32; 4],
    view: Matrix4<f32>,
    location: Point3<f32>,
    /// The color the viewport is cleared with before the camera draws. `None` keeps whatever
    /// is in the framebuffer.
    pub clear_color: Option<Color>,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::perspective(cgmath::Deg(60.0), [0, 0, 1, 1], 0.1, 1000.0)
    }
}

impl Camera {
    /// Creates a camera with perspective projection.
    pub fn perspective<T>(fovy: T, viewport: [i32; 4], near: f32, far: f32) -> Camera
    where
        T: Into<Rad<f32>>,
    {
        let camera = Camera {
            projection: Projection::Perspective(fovy.into()),
            clip: cgmath::Vector2::new(near, far),
            viewport,
            view: Matrix4::identity(),
            location: Point3::origin(),
            clear_color: Some(Color::black()),
        };

        camera.validate();
        camera
    }

    /// Creates a camera with orthographic projection, whose view volume is `height` units
    /// tall.
    pub fn orthographic(height: f32, viewport: [i32; 4], near: f32, far: f32) -> Camera {
        let camera = Camera {
            projection: Projection::Orthographic(height * 0.5),
            clip: cgmath::Vector2::new(near, far),
            viewport,
            view: Matrix4::identity(),
            location: Point3::origin(),
            clear_color: Some(Color::black()),
        };

        camera.validate();
        camera
    }

    #[inline]
    pub fn projection_kind(&self) -> Projection {
        self.projection
    }

    /// Gets the aspect ratio (width divided by height) of the viewport.
    #[inline]
    pub fn aspect(&self) -> f32 {
        self.viewport[2].max(1) as f32 / self.viewport[3].max(1) as f32
    }

    #[inline]
    pub fn near(&self) -> f32 {
        self.clip.x
    }

    #[inline]
    pub fn far(&self) -> f32 {
        self.clip.y
    }

    pub fn set_clip_plane(&mut self, near: f32, far: f32) {
        self.clip = cgmath::Vector2::new(near.min(far), far.max(near));
        self.validate();
    }

    /// The viewport as `[x, y, width, height]`, in pixels.
    #[inline]
    pub fn viewport(&self) -> [i32; 4] {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: [i32; 4]) {
        self.viewport = viewport;
    }

    /// Places the camera at `eye`, looking at `center`.
    pub fn look_at<T: Into<Point3<f32>>>(&mut self, eye: T, center: T, up: Vector3<f32>) {
        let eye = eye.into();
        self.view = Matrix4::look_at(eye, center.into(), up);
        self.location = eye;
    }

    /// Sets the view matrix directly, e.g. from the inverse of a node's world transform.
    pub fn set_view(&mut self, view: Matrix4<f32>) {
        self.location = match mat::invert(&view) {
            Some(inv) => Point3::from_vec(inv.w.truncate()),
            None => Point3::origin(),
        };
        self.view = view;
    }

    /// Gets the matrix from world space to eye space.
    #[inline]
    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    /// Gets the location of the camera in world space.
    #[inline]
    pub fn location(&self) -> Point3<f32> {
        self.location
    }

    /// The extent of the near clipping plane as `[left, right, bottom, top]`.
    pub fn frustum(&self) -> [f32; 4] {
        let top = match self.projection {
            Projection::Orthographic(half) => half,
            Projection::Perspective(fovy) => self.clip.x * Rad::tan(fovy / 2.0),
        };

        let right = top * self.aspect();
        [-right, right, -top, top]
    }

    /// Gets the projection matrix.
    pub fn projection(&self) -> Matrix4<f32> {
        let [l, r, b, t] = self.frustum();
        let (n, f) = (self.clip.x, self.clip.y);

        match self.projection {
            Projection::Orthographic(_) => cgmath::ortho(l, r, b, t, n, f),
            Projection::Perspective(_) => cgmath::frustum(l, r, b, t, n, f),
        }
    }

    /// Whether `p` in world space lies inside the view volume.
    pub fn contains(&self, p: Point3<f32>) -> bool {
        let clip = self.projection() * self.view * homogeneous(p);
        if clip.w <= 0.0 {
            return false;
        }

        let v = clip.truncate() / clip.w;
        v.x.abs() <= 1.0 && v.y.abs() <= 1.0 && v.z.abs() <= 1.0
    }

    /// The eye space depth of `p`, positive in front of the camera.
    pub fn depth_of(&self, p: Point3<f32>) -> f32 {
        -(self.view * homogeneous(p)).z
    }

    fn validate(&self) {
        if let Projection::Perspective(fovy) = self.projection {
            assert!(
                fovy > Rad::zero(),
                "The vertical field of view cannot be below zero, found: {:?}",
                fovy
            );

            assert!(
                fovy < Rad::turn_div_2(),
                "The vertical field of view cannot be greater than a half turn, found: {:?}",
                fovy
            );

            assert!(
                self.clip.x > 0.0,
                "The near clipping plane must be in front of the camera, found: {:?}",
                self.clip.x
            );
        }

        assert!(
            self.clip.x < self.clip.y,
            "The far clipping plane must lie beyond the near one, found: {:?}",
            self.clip
        );
    }
}

#[inline]
fn homogeneous(p: Point3<f32>) -> cgmath::Vector4<f32> {
    cgmath::Vector4::new(p.x, p.y, p.z, 1.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::{Deg, Vector4};

    #[test]
    fn frustum() {
        let camera = Camera::perspective(Deg(90.0), [0, 0, 200, 100], 1.0, 10.0);
        let [l, r, b, t] = camera.frustum();
        assert_relative_eq!(t, 1.0, epsilon = 1e-5);
        assert_relative_eq!(b, -1.0, epsilon = 1e-5);
        assert_relative_eq!(r, 2.0, epsilon = 1e-5);
        assert_relative_eq!(l, -2.0, epsilon = 1e-5);
        assert_ulps_eq!(camera.aspect(), 2.0);

        let camera = Camera::orthographic(4.0, [0, 0, 100, 100], 0.0, 10.0);
        assert_eq!(camera.frustum(), [-2.0, 2.0, -2.0, 2.0]);
    }

    #[test]
    fn projection() {
        let mut camera = Camera::perspective(Deg(60.0), [0, 0, 64, 64], 1.0, 100.0);
        camera.look_at(Point3::new(0.0, 0.0, 5.0), Point3::new(0.0, 0.0, 0.0), Vector3::unit_y());

        let p = camera.projection() * camera.view() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.x / p.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.y / p.w, 0.0, epsilon = 1e-5);
        assert!(camera.contains(Point3::new(0.0, 0.0, 0.0)));
        assert!(!camera.contains(Point3::new(0.0, 0.0, 10.0)));
        assert_relative_eq!(camera.depth_of(Point3::new(0.0, 0.0, -1.0)), 6.0, epsilon = 1e-5);
    }

    #[test]
    fn location() {
        let mut camera = Camera::default();
        camera.look_at(Point3::new(1.0, 2.0, 3.0), Point3::new(0.0, 0.0, 0.0), Vector3::unit_y());
        let view = camera.view();

        let mut other = Camera::default();
        other.set_view(view);
        assert_relative_eq!(other.location(), Point3::new(1.0, 2.0, 3.0), epsilon = 1e-5);
    }

    #[test]
    #[should_panic]
    fn invalid_fov() {
        Camera::perspective(Deg(190.0), [0, 0, 1, 1], 0.1, 1.0);
    }
}
