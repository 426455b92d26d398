use crate::data::{Astrometry, Photometry};
use crate::error::DataError;

use serde::{Deserialize, Serialize};

/// All observations of a single microlensing event
///
/// Photometric bands and astrometric sets are kept in insertion order, the order defines the
/// 1-based indices used in fit parameter names like `mag_src1`, `b_sff2`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EventData {
    pub target: String,
    /// Right ascension and declination of the event in decimal degrees
    pub coordinates: Option<(f64, f64)>,
    pub photometry: Vec<Photometry>,
    pub astrometry: Vec<Astrometry>,
}

impl EventData {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_coordinates(mut self, ra_deg: f64, dec_deg: f64) -> Self {
        self.coordinates = Some((ra_deg, dec_deg));
        self
    }

    pub fn with_photometry(mut self, photometry: Photometry) -> Self {
        self.photometry.push(photometry);
        self
    }

    pub fn with_astrometry(mut self, astrometry: Astrometry) -> Self {
        self.astrometry.push(astrometry);
        self
    }

    #[inline]
    pub fn n_phot_sets(&self) -> usize {
        self.photometry.len()
    }

    #[inline]
    pub fn n_ast_sets(&self) -> usize {
        self.astrometry.len()
    }

    pub fn phot(&self, index: usize) -> Result<&Photometry, DataError> {
        self.photometry.get(index).ok_or(DataError::MissingSet {
            kind: "photometry",
            index: index + 1,
        })
    }

    pub fn ast(&self, index: usize) -> Result<&Astrometry, DataError> {
        self.astrometry.get(index).ok_or(DataError::MissingSet {
            kind: "astrometry",
            index: index + 1,
        })
    }

    /// Index of the photometric band sharing the name of every astrometric set
    ///
    /// Astrometry-only events map every set to itself. When both kinds of data are present,
    /// each astrometric set must have a photometric counterpart: band-dependent astrometric
    /// quantities are taken from that band.
    pub fn ast_to_phot_map(&self) -> Result<Vec<usize>, DataError> {
        if self.photometry.is_empty() {
            return Ok((0..self.astrometry.len()).collect());
        }
        self.astrometry
            .iter()
            .map(|ast| {
                self.photometry
                    .iter()
                    .position(|phot| phot.name == ast.name)
                    .ok_or_else(|| DataError::UnmatchedAstrometry(ast.name.clone()))
            })
            .collect()
    }

    pub fn n_phot_points(&self) -> usize {
        self.photometry.iter().map(Photometry::len).sum()
    }

    /// Number of astrometric measurements, each epoch gives two of them
    pub fn n_ast_points(&self) -> usize {
        2 * self.astrometry.iter().map(Astrometry::len).sum::<usize>()
    }

    pub fn n_data_points(&self) -> usize {
        self.n_phot_points() + self.n_ast_points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phot(name: &str) -> Photometry {
        Photometry::new(name, vec![0.0, 1.0], vec![19.0, 19.0], vec![0.01, 0.01]).unwrap()
    }

    fn ast(name: &str) -> Astrometry {
        Astrometry::new(
            name,
            vec![0.0, 1.0, 2.0],
            vec![0.0; 3],
            vec![0.0; 3],
            vec![1e-4; 3],
            vec![1e-4; 3],
        )
        .unwrap()
    }

    #[test]
    fn astrometry_maps_to_photometry_by_name() {
        let data = EventData::new("ob110022")
            .with_photometry(phot("I"))
            .with_photometry(phot("Kp"))
            .with_astrometry(ast("Kp"));
        assert_eq!(data.ast_to_phot_map().unwrap(), vec![1]);
        assert_eq!(data.n_phot_points(), 4);
        assert_eq!(data.n_ast_points(), 6);
        assert_eq!(data.n_data_points(), 10);
    }

    #[test]
    fn unmatched_astrometry() {
        let data = EventData::new("ob110022")
            .with_photometry(phot("I"))
            .with_astrometry(ast("Kp"));
        assert_eq!(
            data.ast_to_phot_map(),
            Err(DataError::UnmatchedAstrometry("Kp".into()))
        );
    }

    #[test]
    fn astrometry_only() {
        let data = EventData::new("ob110022")
            .with_astrometry(ast("Kp"))
            .with_astrometry(ast("H"));
        assert_eq!(data.ast_to_phot_map().unwrap(), vec![0, 1]);
        assert!(data.phot(0).is_err());
    }
}
