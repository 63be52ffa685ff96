use kd_tree::KdPoint;
use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XYZ {
    coords: [f64; 3],
}

impl XYZ {
    #[must_use]
    pub fn from(coords: [f64; 3]) -> Self {
        Self { coords }
    }

    pub fn x(&self) -> f64 {
        self.coords[0]
    }
    pub fn y(&self) -> f64 {
        self.coords[1]
    }
    pub fn z(&self) -> f64 {
        self.coords[2]
    }

    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (Vector3::from(self.coords) - Vector3::from(other.coords)).norm()
    }
}

impl KdPoint for XYZ {
    type Scalar = f64;
    type Dim = typenum::U3;
    fn at(&self, i: usize) -> f64 {
        self.coords[i]
    }
}

/// Strict neighbor test: a point exactly at `cutoff` is not a neighbor.
#[inline]
#[must_use]
pub fn check_cutoff(a: &XYZ, b: &XYZ, cutoff: f64) -> bool {
    a.distance(b) < cutoff
}
