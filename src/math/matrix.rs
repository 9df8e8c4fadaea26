//! Matrix helpers that cgmath does not provide in the shape the renderer needs.
//!
//! All matrices are column-major, `m[column][row]`.

use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};

const ORTHONORMAL_EPSILON: f32 = 1e-5;

/// Returns true if `m` is affine and its upper-left 3x3 block is a pure rotation, so that
/// the transpose of that block is its inverse.
pub fn is_orthonormal(m: &Matrix4<f32>) -> bool {
    let near = |a: f32, b: f32| (a - b).abs() <= ORTHONORMAL_EPSILON;

    if !(near(m.x.w, 0.0) && near(m.y.w, 0.0) && near(m.z.w, 0.0) && near(m.w.w, 1.0)) {
        return false;
    }

    let cols = [m.x.truncate(), m.y.truncate(), m.z.truncate()];
    for i in 0..3 {
        if !near(dot3(cols[i], cols[i]), 1.0) {
            return false;
        }

        for j in (i + 1)..3 {
            if !near(dot3(cols[i], cols[j]), 0.0) {
                return false;
            }
        }
    }

    true
}

#[inline]
fn dot3(a: Vector3<f32>, b: Vector3<f32>) -> f32 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

/// Inverts a rigid transform (rotation plus translation).
pub fn invert_rigid(m: &Matrix4<f32>) -> Matrix4<f32> {
    let r = upper_left(m).transpose();
    let t = -(r * m.w.truncate());

    Matrix4::from_cols(
        r.x.extend(0.0),
        r.y.extend(0.0),
        r.z.extend(0.0),
        t.extend(1.0),
    )
}

/// Inverts a general 4x4 matrix with Gauss-Jordan elimination and partial pivoting.
/// Returns `None` for singular matrices.
pub fn invert_gauss_jordan(m: &Matrix4<f32>) -> Option<Matrix4<f32>> {
    // Row-major working copies, [row][col].
    let mut a = [[0f32; 4]; 4];
    let mut inv = [[0f32; 4]; 4];
    let mut magnitude = 0f32;
    for r in 0..4 {
        for c in 0..4 {
            a[r][c] = m[c][r];
            magnitude = magnitude.max(a[r][c].abs());
        }
        inv[r][r] = 1.0;
    }

    if magnitude == 0.0 {
        return None;
    }

    // Pivots are compared against the scale of the matrix itself.
    let tolerance = magnitude * ::std::f32::EPSILON;

    for col in 0..4 {
        let mut pivot = col;
        for r in (col + 1)..4 {
            if a[r][col].abs() > a[pivot][col].abs() {
                pivot = r;
            }
        }

        if a[pivot][col].abs() <= tolerance {
            return None;
        }

        a.swap(col, pivot);
        inv.swap(col, pivot);

        let scale = 1.0 / a[col][col];
        for c in 0..4 {
            a[col][c] *= scale;
            inv[col][c] *= scale;
        }

        for r in 0..4 {
            if r == col {
                continue;
            }

            let factor = a[r][col];
            if factor != 0.0 {
                for c in 0..4 {
                    a[r][c] -= factor * a[col][c];
                    inv[r][c] -= factor * inv[col][c];
                }
            }
        }
    }

    let col = |c: usize| Vector4::new(inv[0][c], inv[1][c], inv[2][c], inv[3][c]);
    Some(Matrix4::from_cols(col(0), col(1), col(2), col(3)))
}

/// Inverts `m`, taking the transpose shortcut for rigid transforms.
pub fn invert(m: &Matrix4<f32>) -> Option<Matrix4<f32>> {
    if is_orthonormal(m) {
        Some(invert_rigid(m))
    } else {
        invert_gauss_jordan(m)
    }
}

/// The transpose of the inverse, used to transform normals.
pub fn inverse_transpose(m: &Matrix4<f32>) -> Option<Matrix4<f32>> {
    invert(m).map(|v| v.transpose())
}

/// The linear part of an affine transform.
pub fn upper_left(m: &Matrix4<f32>) -> Matrix3<f32> {
    Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate())
}

/// Embeds a linear transform into an affine one.
pub fn extend(m: &Matrix3<f32>) -> Matrix4<f32> {
    Matrix4::from_cols(
        m.x.extend(0.0),
        m.y.extend(0.0),
        m.z.extend(0.0),
        Vector4::new(0.0, 0.0, 0.0, 1.0),
    )
}

/// Flattens a matrix into the column-major layout GL consumes.
pub fn to_array(m: &Matrix4<f32>) -> [f32; 16] {
    let a: &[f32; 16] = m.as_ref();
    *a
}

pub fn from_array(v: &[f32; 16]) -> Matrix4<f32> {
    let col = |c: usize| Vector4::new(v[c * 4], v[c * 4 + 1], v[c * 4 + 2], v[c * 4 + 3]);
    Matrix4::from_cols(col(0), col(1), col(2), col(3))
}

/// Returns the rotation that maps a right-handed Z-up basis into the right-handed Y-up
/// basis used by the engine. Decoders of Z-up assets apply it to their root transforms.
pub fn z_up_to_y_up() -> Matrix4<f32> {
    Matrix4::from_cols(
        Vector4::new(1.0, 0.0, 0.0, 0.0),
        Vector4::new(0.0, 0.0, -1.0, 0.0),
        Vector4::new(0.0, 1.0, 0.0, 0.0),
        Vector4::new(0.0, 0.0, 0.0, 1.0),
    )
}

/// Converts a Z-up transform into the engine convention.
pub fn convert_z_up(m: &Matrix4<f32>) -> Matrix4<f32> {
    let basis = z_up_to_y_up();
    let back = basis.transpose();
    basis * m * back
}

/// Shortcut of `SquareMatrix::identity` with a concrete scalar.
#[inline]
pub fn identity() -> Matrix4<f32> {
    Matrix4::identity()
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::{Deg, Point3, Transform};

    fn close(a: &Matrix4<f32>, b: &Matrix4<f32>) -> bool {
        to_array(a)
            .iter()
            .zip(to_array(b).iter())
            .all(|(x, y)| (x - y).abs() <= 1e-5)
    }

    #[test]
    fn orthonormal() {
        let rot = Matrix4::from_angle_y(Deg(37.0)) * Matrix4::from_angle_x(Deg(-12.0));
        let m = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)) * rot;
        assert!(is_orthonormal(&m));
        assert!(!is_orthonormal(&(m * Matrix4::from_scale(2.0))));

        let p = cgmath::perspective(Deg(60.0), 1.5, 0.1, 100.0);
        assert!(!is_orthonormal(&p));
    }

    #[test]
    fn rigid_matches_general() {
        let m = Matrix4::from_translation(Vector3::new(-4.0, 0.5, 9.0))
            * Matrix4::from_angle_z(Deg(71.0));
        let fast = invert_rigid(&m);
        let slow = invert_gauss_jordan(&m).unwrap();
        assert!(close(&fast, &slow));
        assert!(close(&(m * fast), &identity()));
    }

    #[test]
    fn gauss_jordan() {
        let m = cgmath::perspective(Deg(45.0), 1.0, 1.0, 50.0)
            * Matrix4::from_nonuniform_scale(2.0, 3.0, 0.5);
        let inv = invert_gauss_jordan(&m).unwrap();
        assert!(close(&(m * inv), &identity()));

        let expected = m.invert().unwrap();
        assert!(close(&inv, &expected));
    }

    #[test]
    fn small_entries() {
        let m = Matrix4::from_translation(Vector3::new(2.0, -1.0, 3.0)) * 1e-8;
        let inv = invert_gauss_jordan(&m).unwrap();
        assert_relative_eq!(inv * m, Matrix4::identity(), epsilon = 1e-4);

        assert!(invert_gauss_jordan(&(Matrix4::from_nonuniform_scale(1e-4, 0.0, 1e-4))).is_none());
        assert!(invert_gauss_jordan(&Matrix4::from_scale(0.0)).is_none());
    }

    #[test]
    fn singular() {
        let m = Matrix4::from_nonuniform_scale(1.0, 0.0, 1.0);
        assert!(invert_gauss_jordan(&m).is_none());
        assert!(invert(&m).is_none());
    }

    #[test]
    fn z_up() {
        let up = Point3::new(0.0, 0.0, 1.0);
        let converted = z_up_to_y_up().transform_point(up);
        assert!((converted.y - 1.0).abs() < 1e-6);
        assert!(converted.z.abs() < 1e-6);
        assert!(is_orthonormal(&z_up_to_y_up()));
    }
}
