//! Band-name pattern selection over a fixed band vocabulary.
//!
//! Patterns are full-match regular expressions, so `B[2-4,8]` selects
//! B2, B3, B4 and B8 but not B11 or B8A.

use crate::core::indices::SpectralIndex;
use crate::types::{ChangeError, ChangeResult};
use regex::Regex;

/// Sentinel-2 MSI band names in archive order
pub const SENTINEL2_BANDS: [&str; 12] = [
    "B1", "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B8A", "B9", "B11", "B12",
];

/// Every band name a composite can be selected from: raw bands then indices
pub fn known_band_vocabulary() -> Vec<&'static str> {
    SENTINEL2_BANDS
        .iter()
        .copied()
        .chain(SpectralIndex::ALL.iter().map(|i| i.name()))
        .collect()
}

/// One compiled band-name pattern
#[derive(Debug, Clone)]
pub struct BandPattern {
    source: String,
    regex: Regex,
}

impl BandPattern {
    pub fn parse(pattern: &str) -> ChangeResult<Self> {
        if pattern.trim().is_empty() {
            return Err(ChangeError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "empty pattern".to_string(),
            });
        }
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            ChangeError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, band: &str) -> bool {
        self.regex.is_match(band)
    }
}

/// Ordered list of patterns resolved against a vocabulary
#[derive(Debug, Clone)]
pub struct BandSelector {
    patterns: Vec<BandPattern>,
}

impl BandSelector {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> ChangeResult<Self> {
        if patterns.is_empty() {
            return Err(ChangeError::Configuration(
                "band selection needs at least one pattern".to_string(),
            ));
        }
        let patterns = patterns
            .iter()
            .map(|p| BandPattern::parse(p.as_ref()))
            .collect::<ChangeResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[BandPattern] {
        &self.patterns
    }

    /// Expand the patterns into concrete band names.
    ///
    /// Patterns are taken in order and each contributes its matches in
    /// vocabulary order; a name already selected is not repeated. A pattern
    /// that matches nothing is rejected.
    pub fn resolve<S: AsRef<str>>(&self, vocabulary: &[S]) -> ChangeResult<Vec<String>> {
        let mut selected: Vec<String> = Vec::new();
        for pattern in &self.patterns {
            let mut matched = false;
            for name in vocabulary.iter().map(|n| n.as_ref()) {
                if pattern.matches(name) {
                    matched = true;
                    if !selected.iter().any(|s| s == name) {
                        selected.push(name.to_string());
                    }
                }
            }
            if !matched {
                return Err(ChangeError::InvalidPattern {
                    pattern: pattern.as_str().to_string(),
                    reason: "matches no known band".to_string(),
                });
            }
        }
        log::debug!("Resolved band selection {:?} -> {:?}",
                    self.patterns.iter().map(|p| p.as_str()).collect::<Vec<_>>(), selected);
        Ok(selected)
    }

    /// Resolve against `known_band_vocabulary()`
    pub fn resolve_known(&self) -> ChangeResult<Vec<String>> {
        self.resolve(&known_band_vocabulary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_class_selects_four_bands() {
        let selector = BandSelector::new(&["B[2-4,8]", "NDVI", "NDWI"]).unwrap();
        let bands = selector.resolve_known().unwrap();
        assert_eq!(bands, vec!["B2", "B3", "B4", "B8", "NDVI", "NDWI"]);
    }

    #[test]
    fn test_full_match_excludes_longer_names() {
        let pattern = BandPattern::parse("B1").unwrap();
        assert!(pattern.matches("B1"));
        assert!(!pattern.matches("B11"));
        assert!(!pattern.matches("B12"));
    }

    #[test]
    fn test_raw_band_pattern_follows_vocabulary_order() {
        let selector = BandSelector::new(&["B[0-9]+A?"]).unwrap();
        assert_eq!(selector.resolve_known().unwrap(), SENTINEL2_BANDS.to_vec());
    }

    #[test]
    fn test_bare_prefix_wildcard_reaches_index_names() {
        // BNRI and BSI share the B prefix with the raw bands
        let selector = BandSelector::new(&["B.*"]).unwrap();
        let bands = selector.resolve_known().unwrap();
        assert_eq!(&bands[..12], &SENTINEL2_BANDS[..]);
        assert_eq!(&bands[12..], &["BNRI", "BSI"]);
    }

    #[test]
    fn test_overlapping_patterns_do_not_duplicate() {
        let selector = BandSelector::new(&["NDVI", "ND.*"]).unwrap();
        let bands = selector.resolve_known().unwrap();
        assert_eq!(bands[0], "NDVI");
        assert_eq!(bands.iter().filter(|b| *b == "NDVI").count(), 1);
    }

    #[test]
    fn test_malformed_and_unknown_patterns_are_rejected() {
        assert!(matches!(
            BandPattern::parse("B[2-4"),
            Err(ChangeError::InvalidPattern { .. })
        ));
        let selector = BandSelector::new(&["SAVI"]).unwrap();
        let err = selector.resolve_known().unwrap_err();
        assert!(err.is_configuration_error());
        assert!(BandSelector::new::<&str>(&[]).is_err());
    }
}
