//! Calibrated sensor positions on the board scans.

use crate::error::{PipelineError, Result};
use crate::records::types::Sensor;

/// A sensor's rectangle as fractions of the scan's width (x) and height (y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropFractions {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
}

const fn frac(x1: f64, x2: f64, y1: f64, y2: f64) -> CropFractions {
    CropFractions { x1, x2, y1, y2 }
}

/// The four board layouts in use.
pub const KNOWN_PATTERNS: [i64; 4] = [1, 4, 7, 10];

/// Per pattern, the rectangles for U1..U4 in that order. Measured from the
/// edited scans; the small drift between patterns is scanner alignment.
static CROP_TABLE: [(i64, [CropFractions; 4]); 4] = [
    (
        1,
        [
            frac(0.1012, 0.3067, 0.576, 0.6601),
            frac(0.1377, 0.2395, 0.09905, 0.2684),
            frac(0.7647, 0.8325, 0.07259, 0.3275),
            frac(0.7736, 0.8254, 0.434, 0.7743),
        ],
    ),
    (
        4,
        [
            frac(0.09917, 0.3052, 0.5761, 0.6606),
            frac(0.1369, 0.2389, 0.09948, 0.2688),
            frac(0.7653, 0.8328, 0.07529, 0.3299),
            frac(0.773, 0.8243, 0.4364, 0.7764),
        ],
    ),
    (
        7,
        [
            frac(0.1011, 0.3066, 0.5776, 0.6608),
            frac(0.137, 0.2387, 0.1002, 0.2691),
            frac(0.7646, 0.8324, 0.07282, 0.3275),
            frac(0.7737, 0.8255, 0.4342, 0.7739),
        ],
    ),
    (
        10,
        [
            frac(0.09913, 0.3055, 0.5753, 0.6594),
            frac(0.1367, 0.2384, 0.0993, 0.2683),
            frac(0.7644, 0.8324, 0.07448, 0.3286),
            frac(0.7727, 0.8243, 0.4351, 0.7745),
        ],
    ),
];

fn sensor_slot(sensor: Sensor) -> usize {
    match sensor {
        Sensor::U1 => 0,
        Sensor::U2 => 1,
        Sensor::U3 => 2,
        Sensor::U4 => 3,
    }
}

/// Looks up the calibrated rectangle for `(pattern, sensor)`.
///
/// # Errors
///
/// [`PipelineError::Geometry`] for a null pattern or one outside
/// [`KNOWN_PATTERNS`]. There is no fallback rectangle.
pub fn crop_fractions(pattern: Option<i64>, sensor: Sensor) -> Result<CropFractions> {
    let geometry_error = || PipelineError::Geometry { pattern, sensor };
    let pattern_id = pattern.ok_or_else(geometry_error)?;

    CROP_TABLE
        .iter()
        .find(|(p, _)| *p == pattern_id)
        .map(|(_, rects)| rects[sensor_slot(sensor)])
        .ok_or_else(geometry_error)
}
