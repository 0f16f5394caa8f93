//! 16-point compass sectors used to discretize wind direction.

use std::fmt;

/// A 16-point compass sector, 22.5 degrees wide.
///
/// Sector `N` covers `[0.0, 22.5)` degrees, `NNE` covers `[22.5, 45.0)` and
/// so on around the compass. Directions outside `[0, 360)` are wrapped
/// before binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sector {
    N,
    Nne,
    Ne,
    Ene,
    E,
    Ese,
    Se,
    Sse,
    S,
    Ssw,
    Sw,
    Wsw,
    W,
    Wnw,
    Nw,
    Nnw,
}

/// Width of one sector in degrees.
pub const SECTOR_WIDTH_DEG: f64 = 360.0 / Sector::COUNT as f64;

impl Sector {
    /// Number of sectors on the compass.
    pub const COUNT: usize = 16;

    /// All sectors in compass order, starting at north.
    pub const ALL: [Sector; Sector::COUNT] = [
        Sector::N,
        Sector::Nne,
        Sector::Ne,
        Sector::Ene,
        Sector::E,
        Sector::Ese,
        Sector::Se,
        Sector::Sse,
        Sector::S,
        Sector::Ssw,
        Sector::Sw,
        Sector::Wsw,
        Sector::W,
        Sector::Wnw,
        Sector::Nw,
        Sector::Nnw,
    ];

    /// Bins a direction in degrees into its sector.
    ///
    /// Returns `None` for non-finite input.
    pub fn from_degrees(degrees: f64) -> Option<Sector> {
        if !degrees.is_finite() {
            return None;
        }
        let wrapped = degrees.rem_euclid(360.0);
        let index = (wrapped / SECTOR_WIDTH_DEG) as usize;
        // 359.999... / 22.5 can round up to 16.0 exactly.
        Some(Sector::ALL[index.min(Sector::COUNT - 1)])
    }

    /// Zero-based index in compass order (`N` = 0, `NNW` = 15).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The lower edge of the sector in degrees.
    pub fn start_degrees(&self) -> f64 {
        self.index() as f64 * SECTOR_WIDTH_DEG
    }

    /// Compass abbreviation, e.g. `"NNE"`.
    pub fn label(&self) -> &'static str {
        match self {
            Sector::N => "N",
            Sector::Nne => "NNE",
            Sector::Ne => "NE",
            Sector::Ene => "ENE",
            Sector::E => "E",
            Sector::Ese => "ESE",
            Sector::Se => "SE",
            Sector::Sse => "SSE",
            Sector::S => "S",
            Sector::Ssw => "SSW",
            Sector::Sw => "SW",
            Sector::Wsw => "WSW",
            Sector::W => "W",
            Sector::Wnw => "WNW",
            Sector::Nw => "NW",
            Sector::Nnw => "NNW",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_cardinal_directions() {
        assert_eq!(Sector::from_degrees(0.0), Some(Sector::N));
        assert_eq!(Sector::from_degrees(90.0), Some(Sector::E));
        assert_eq!(Sector::from_degrees(180.0), Some(Sector::S));
        assert_eq!(Sector::from_degrees(270.0), Some(Sector::W));
    }

    #[test]
    fn sector_edges_are_half_open() {
        assert_eq!(Sector::from_degrees(22.4), Some(Sector::N));
        assert_eq!(Sector::from_degrees(22.5), Some(Sector::Nne));
        assert_eq!(Sector::from_degrees(359.9), Some(Sector::Nnw));
    }

    #[test]
    fn wraps_out_of_range_directions() {
        assert_eq!(Sector::from_degrees(360.0), Some(Sector::N));
        assert_eq!(Sector::from_degrees(370.0), Some(Sector::N));
        assert_eq!(Sector::from_degrees(-10.0), Some(Sector::Nnw));
    }

    #[test]
    fn rejects_non_finite_directions() {
        assert_eq!(Sector::from_degrees(f64::NAN), None);
        assert_eq!(Sector::from_degrees(f64::INFINITY), None);
    }

    #[test]
    fn index_round_trips_through_all() {
        for (i, sector) in Sector::ALL.iter().enumerate() {
            assert_eq!(sector.index(), i);
            assert_eq!(
                Sector::from_degrees(sector.start_degrees()),
                Some(*sector)
            );
        }
    }
}
