//! Voxel-to-world transforms and the header fields derived from them.
use nalgebra::{Matrix4, Vector3};

/// A homogeneous 4x4 voxel-to-world transform.
pub type Affine4 = Matrix4<f32>;

/// Interpret 16 row-major values as an affine.
///
/// The last row must be `[0, 0, 0, 1]` (within `1e-6`) for the values to
/// describe an affine transform.
pub fn affine_from_row_major(values: &[f32]) -> Option<Affine4> {
    if values.len() != 16 {
        return None;
    }
    let affine = Affine4::from_row_slice(values);
    let last = [affine[(3, 0)], affine[(3, 1)], affine[(3, 2)], affine[(3, 3)] - 1.];
    if last.iter().all(|v| v.abs() <= 1e-6) {
        Some(affine)
    } else {
        None
    }
}

/// Voxel spacing implied by the affine: the norm of each of the first three
/// columns.
pub fn zooms(affine: &Affine4) -> Vector3<f32> {
    Vector3::new(
        affine.fixed_view::<3, 1>(0, 0).norm(),
        affine.fixed_view::<3, 1>(0, 1).norm(),
        affine.fixed_view::<3, 1>(0, 2).norm(),
    )
}

/// The three `srow_*` rows of a NIfTI-1 sform.
pub fn srows(affine: &Affine4) -> [[f32; 4]; 3] {
    let mut rows = [[0.; 4]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = affine[(r, c)];
        }
    }
    rows
}

/// Rebuild an affine from the three `srow_*` rows of a header.
pub fn from_srows(x: &[f32; 4], y: &[f32; 4], z: &[f32; 4]) -> Affine4 {
    #[rustfmt::skip]
    let affine = Affine4::new(
        x[0], x[1], x[2], x[3],
        y[0], y[1], y[2], y[3],
        z[0], z[1], z[2], z[3],
        0.0,  0.0,  0.0,  1.0,
    );
    affine
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    #[rustfmt::skip]
    fn row_major_values() {
        let values = [
            2.0, 0.0, 0.0, -10.0,
            0.0, 3.0, 0.0, -20.0,
            0.0, 0.0, 4.0, -30.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        let affine = affine_from_row_major(&values).unwrap();
        assert_eq!(affine[(0, 3)], -10.0);
        assert_eq!(affine[(2, 2)], 4.0);
        assert_eq!(srows(&affine)[1], [0.0, 3.0, 0.0, -20.0]);

        let mut bad = values;
        bad[15] = 0.5;
        assert!(affine_from_row_major(&bad).is_none());
        assert!(affine_from_row_major(&values[..12]).is_none());
    }

    #[test]
    #[rustfmt::skip]
    fn zooms_of_rotated_affine() {
        let affine = Affine4::new(
            0.0, -2.0, 0.0, 5.0,
            1.5,  0.0, 0.0, 6.0,
            0.0,  0.0, 3.0, 7.0,
            0.0,  0.0, 0.0, 1.0,
        );
        assert_abs_diff_eq!(zooms(&affine), Vector3::new(1.5, 2.0, 3.0), epsilon = 1e-6);
        let rows = srows(&affine);
        assert_eq!(from_srows(&rows[0], &rows[1], &rows[2]), affine);
    }

    #[test]
    fn identity_has_unit_zooms() {
        assert_eq!(zooms(&Affine4::identity()), Vector3::new(1.0, 1.0, 1.0));
    }
}
