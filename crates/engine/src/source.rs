//! Primary particle source sampling.
//!
//! Both sources sit in a cylindrical chamber of radius [`CHAMBER_RADIUS_CM`].
//! Positions are in cm; directions are unit vectors.

use arbuckle_types::SourceType;
use rand::Rng;
use std::f64::consts::PI;

/// Inner radius of the drift chamber, in cm.
pub const CHAMBER_RADIUS_CM: f64 = 0.149;

/// Height of the plated source above the end cap, in cm.
const PLATED_Z_CM: f64 = 0.01;

/// Half-angle of the plated source's emission cone.
const PLATED_CONE: f64 = 0.45 * PI;

/// Collimator aperture along x, in cm.
const COLLIMATED_X_CM: (f64, f64) = (-0.05, 0.05);

/// Collimator aperture along z, in cm.
const COLLIMATED_Z_CM: (f64, f64) = (0.001, 0.15);

/// Half-angle of the collimated source's emission cone.
const COLLIMATED_CONE: f64 = PI * 0.125;

/// Start point and direction of one primary track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackOrigin {
    pub position: [f64; 3],
    pub direction: [f64; 3],
}

impl TrackOrigin {
    /// Point at distance `s` along the track.
    pub fn point_at(&self, s: f64) -> [f64; 3] {
        [
            self.position[0] + s * self.direction[0],
            self.position[1] + s * self.direction[1],
            self.position[2] + s * self.direction[2],
        ]
    }
}

/// Draw a track origin for `source`.
pub fn sample_origin(source: SourceType, rng: &mut impl Rng) -> TrackOrigin {
    match source {
        SourceType::Plated => {
            // Uniform over the disc, then a direction inside a cone about +z.
            let rho = CHAMBER_RADIUS_CM * rng.gen::<f64>().sqrt();
            let angle = 2.0 * PI * rng.gen::<f64>();
            let phi = PLATED_CONE * rng.gen::<f64>();
            let theta = 2.0 * PI * rng.gen::<f64>();

            TrackOrigin {
                position: [rho * angle.cos(), rho * angle.sin(), PLATED_Z_CM],
                direction: [phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos()],
            }
        }
        SourceType::Collimated => {
            // Uniform over the aperture, projected onto the +y wall, then a
            // direction inside a cone about -y.
            let (x_min, x_max) = COLLIMATED_X_CM;
            let (z_min, z_max) = COLLIMATED_Z_CM;
            let x = x_min + (x_max - x_min) * rng.gen::<f64>();
            let z = z_min + (z_max - z_min) * rng.gen::<f64>();
            let y = CHAMBER_RADIUS_CM * (x / CHAMBER_RADIUS_CM).acos().sin();

            let phi = COLLIMATED_CONE * rng.gen::<f64>();
            let alpha = 2.0 * PI * rng.gen::<f64>();

            TrackOrigin {
                position: [x, y, z],
                direction: [phi.sin() * alpha.cos(), -phi.cos(), phi.sin() * alpha.sin()],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn norm(v: [f64; 3]) -> f64 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn test_plated_origin_on_disc() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..1000 {
            let origin = sample_origin(SourceType::Plated, &mut rng);
            let [x, y, z] = origin.position;
            assert!((x * x + y * y).sqrt() <= CHAMBER_RADIUS_CM + 1e-12);
            assert_eq!(z, PLATED_Z_CM);
            assert!((norm(origin.direction) - 1.0).abs() < 1e-9);
            // Inside the cone about +z.
            assert!(origin.direction[2] >= PLATED_CONE.cos() - 1e-12);
        }
    }

    #[test]
    fn test_collimated_origin_on_wall() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..1000 {
            let origin = sample_origin(SourceType::Collimated, &mut rng);
            let [x, y, z] = origin.position;
            assert!((-0.05..=0.05).contains(&x));
            assert!((0.001..=0.15).contains(&z));
            assert!(y > 0.0);
            assert!(((x * x + y * y).sqrt() - CHAMBER_RADIUS_CM).abs() < 1e-9);
            assert!((norm(origin.direction) - 1.0).abs() < 1e-9);
            assert!(-origin.direction[1] >= COLLIMATED_CONE.cos() - 1e-12);
        }
    }

    #[test]
    fn test_point_at() {
        let origin = TrackOrigin {
            position: [0.0, 0.0, 1.0],
            direction: [0.0, 0.0, -1.0],
        };
        assert_eq!(origin.point_at(0.25), [0.0, 0.0, 0.75]);
    }
}
