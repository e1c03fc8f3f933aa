// src/environment/rotation.rs

//! # Euler Angle Rotation
//!
//! Direction-cosine matrix for the ZYX (yaw, pitch, roll) Euler sequence.
//! Multiplying a navigation-frame vector by the matrix expresses it in the
//! body frame, which is how the accelerometer and magnetometer models rotate
//! gravity and the reference field.

use nalgebra::{Matrix3, Scalar};
use num_traits::Float;

/// Builds the navigation-to-body rotation matrix from roll `phi`, pitch
/// `theta` and yaw `psi`, all in radians.
///
/// ```text
/// [ cθcψ            cθsψ            -sθ  ]
/// [ sφsθcψ - cφsψ   sφsθsψ + cφcψ   sφcθ ]
/// [ cφsθcψ + sφsψ   cφsθsψ - sφcψ   cφcθ ]
/// ```
pub fn rotation_nb<T: Float + Scalar>(phi: T, theta: T, psi: T) -> Matrix3<T> {
    let (sf, cf) = phi.sin_cos();
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = psi.sin_cos();

    Matrix3::new(
        ct * cp,
        ct * sp,
        -st,
        sf * st * cp - cf * sp,
        sf * st * sp + cf * cp,
        sf * ct,
        cf * st * cp + sf * sp,
        cf * st * sp - sf * cp,
        cf * ct,
    )
}
