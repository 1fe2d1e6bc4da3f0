//! Lambert conformal conic projection onto the KMA forecast grid.
//!
//! The village forecast feed is addressed by integer grid cell (`nx`, `ny`)
//! rather than by coordinate. The grid is a secant cone with two standard
//! parallels, 5 km cells, and a fixed origin cell at 38°N 126°E.

use serde::{Deserialize, Serialize};
use std::{f64::consts::PI, fmt, sync::LazyLock};

const DEG_TO_RAD: f64 = PI / 180.0;

/// Earth radius used by the provider (km).
pub const EARTH_RADIUS_KM: f64 = 6371.00877;
/// Grid spacing (km).
pub const GRID_SPACING_KM: f64 = 5.0;
/// First standard parallel (degrees).
pub const STANDARD_PARALLEL_1: f64 = 30.0;
/// Second standard parallel (degrees).
pub const STANDARD_PARALLEL_2: f64 = 60.0;
/// Reference longitude (degrees).
pub const ORIGIN_LONGITUDE: f64 = 126.0;
/// Reference latitude (degrees).
pub const ORIGIN_LATITUDE: f64 = 38.0;
/// Grid X index of the reference point.
pub const ORIGIN_X: f64 = 43.0;
/// Grid Y index of the reference point.
pub const ORIGIN_Y: f64 = 136.0;

static KMA_GRID: LazyLock<LambertGrid> = LazyLock::new(|| {
    LambertGrid::new(
        EARTH_RADIUS_KM,
        GRID_SPACING_KM,
        STANDARD_PARALLEL_1,
        STANDARD_PARALLEL_2,
        ORIGIN_LATITUDE,
        ORIGIN_LONGITUDE,
        ORIGIN_X,
        ORIGIN_Y,
    )
});

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Project onto the KMA forecast grid.
    pub fn grid(&self) -> GridCell {
        project(*self)
    }
}

/// A cell of the provider grid, `nx`/`ny` in the feed's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nx={} ny={}", self.x, self.y)
    }
}

/// Projection parameters with the derived cone constants.
#[derive(Debug, Clone)]
pub struct LambertGrid {
    /// Earth radius in grid units.
    re: f64,
    /// Reference longitude in radians.
    olon: f64,
    origin_x: f64,
    origin_y: f64,
    /// Cone constant.
    sn: f64,
    /// Scale factor.
    sf: f64,
    /// Radius at the reference latitude.
    ro: f64,
}

impl LambertGrid {
    /// Build a grid from provider constants, all angles in degrees.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        earth_radius_km: f64,
        spacing_km: f64,
        slat1_deg: f64,
        slat2_deg: f64,
        olat_deg: f64,
        olon_deg: f64,
        origin_x: f64,
        origin_y: f64,
    ) -> Self {
        let re = earth_radius_km / spacing_km;
        let slat1 = slat1_deg * DEG_TO_RAD;
        let slat2 = slat2_deg * DEG_TO_RAD;
        let olat = olat_deg * DEG_TO_RAD;
        let olon = olon_deg * DEG_TO_RAD;

        let tan_ratio = (PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan();
        let sn = (slat1.cos() / slat2.cos()).ln() / tan_ratio.ln();
        let sf = (PI * 0.25 + slat1 * 0.5).tan().powf(sn) * slat1.cos() / sn;
        let ro = re * sf / (PI * 0.25 + olat * 0.5).tan().powf(sn);

        Self { re, olon, origin_x, origin_y, sn, sf, ro }
    }

    /// The shared KMA grid; constants are derived once per process.
    pub fn kma() -> &'static LambertGrid {
        &KMA_GRID
    }

    /// Project a coordinate to its grid cell, rounding half up.
    pub fn project(&self, coordinate: Coordinate) -> GridCell {
        let lat = coordinate.latitude * DEG_TO_RAD;
        let ra = self.re * self.sf / (PI * 0.25 + lat * 0.5).tan().powf(self.sn);

        let mut theta = coordinate.longitude * DEG_TO_RAD - self.olon;
        if theta > PI {
            theta -= 2.0 * PI;
        }
        if theta < -PI {
            theta += 2.0 * PI;
        }
        theta *= self.sn;

        let x = (ra * theta.sin() + self.origin_x + 0.5).floor();
        let y = (self.ro - ra * theta.cos() + self.origin_y + 0.5).floor();

        GridCell { x: x as i32, y: y as i32 }
    }
}

/// Project a coordinate onto the KMA forecast grid.
pub fn project(coordinate: Coordinate) -> GridCell {
    LambertGrid::kma().project(coordinate)
}
