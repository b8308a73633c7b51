//! Configuration types for the wind correction pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default spatial correlation coefficient for the pulsation pipeline.
pub const DEFAULT_PULSATION_CORRELATION: f64 = 0.85;

/// Default spatial correlation coefficient for the peak pipeline.
pub const DEFAULT_PEAK_CORRELATION: f64 = 1.0;

/// Terrain roughness parameters used by the exposure and correction formulas.
///
/// `alfa` is the profile exponent, `k10` the exposure factor at 10 m and
/// `dzeta10` the turbulence intensity at 10 m.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaParameters {
    pub alfa: f64,
    pub k10: f64,
    pub dzeta10: f64,
}

/// Terrain exposure category.
///
/// A is open terrain (coasts, steppe), B is suburban or forested terrain,
/// C is dense urban terrain with buildings above 25 m.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainCategory {
    A,
    B,
    C,
}

impl TerrainCategory {
    /// Roughness parameter triple for this category.
    pub fn parameters(self) -> AreaParameters {
        match self {
            TerrainCategory::A => AreaParameters {
                alfa: 0.15,
                k10: 1.00,
                dzeta10: 0.76,
            },
            TerrainCategory::B => AreaParameters {
                alfa: 0.20,
                k10: 0.65,
                dzeta10: 1.06,
            },
            TerrainCategory::C => AreaParameters {
                alfa: 0.25,
                k10: 0.40,
                dzeta10: 1.78,
            },
        }
    }
}

/// Wind region with a preset basic wind pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindRegion {
    Ia,
    I,
    II,
    III,
    IV,
    V,
    VI,
    VII,
}

impl WindRegion {
    /// Basic wind pressure for the region, in Pa.
    pub fn pressure(self) -> f64 {
        match self {
            WindRegion::Ia => 170.0,
            WindRegion::I => 230.0,
            WindRegion::II => 300.0,
            WindRegion::III => 380.0,
            WindRegion::IV => 480.0,
            WindRegion::V => 600.0,
            WindRegion::VI => 730.0,
            WindRegion::VII => 850.0,
        }
    }
}

/// Main pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Terrain exposure category for the run
    #[serde(default = "default_terrain")]
    pub terrain: TerrainCategory,

    /// Wind region supplying the basic pressure
    #[serde(default = "default_wind_region")]
    pub wind_region: WindRegion,

    /// Spatial correlation coefficient for pulsation runs
    #[serde(default = "default_pulsation_correlation")]
    pub pulsation_correlation: f64,

    /// Spatial correlation coefficient for peak runs
    #[serde(default = "default_peak_correlation")]
    pub peak_correlation: f64,
}

fn default_terrain() -> TerrainCategory {
    TerrainCategory::A
}

fn default_wind_region() -> WindRegion {
    WindRegion::I
}

fn default_pulsation_correlation() -> f64 {
    DEFAULT_PULSATION_CORRELATION
}

fn default_peak_correlation() -> f64 {
    DEFAULT_PEAK_CORRELATION
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            terrain: default_terrain(),
            wind_region: default_wind_region(),
            pulsation_correlation: default_pulsation_correlation(),
            peak_correlation: default_peak_correlation(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.terrain, TerrainCategory::A);
        assert_eq!(config.wind_region, WindRegion::I);
        assert_eq!(config.pulsation_correlation, 0.85);
        assert_eq!(config.peak_correlation, 1.0);
    }

    #[test]
    fn test_terrain_parameters() {
        let a = TerrainCategory::A.parameters();
        assert_eq!((a.alfa, a.k10, a.dzeta10), (0.15, 1.00, 0.76));

        let b = TerrainCategory::B.parameters();
        assert_eq!((b.alfa, b.k10, b.dzeta10), (0.20, 0.65, 1.06));

        let c = TerrainCategory::C.parameters();
        assert_eq!((c.alfa, c.k10, c.dzeta10), (0.25, 0.40, 1.78));
    }

    #[test]
    fn test_region_pressures() {
        assert_eq!(WindRegion::Ia.pressure(), 170.0);
        assert_eq!(WindRegion::I.pressure(), 230.0);
        assert_eq!(WindRegion::VII.pressure(), 850.0);
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pipeline.yaml");

        let mut config = PipelineConfig::default();
        config.terrain = TerrainCategory::C;
        config.wind_region = WindRegion::IV;
        config.to_yaml(&path).unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded.terrain, TerrainCategory::C);
        assert_eq!(loaded.wind_region, WindRegion::IV);
        assert_eq!(loaded.pulsation_correlation, 0.85);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("partial.yaml");
        std::fs::write(&path, "terrain: B\n").unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded.terrain, TerrainCategory::B);
        assert_eq!(loaded.wind_region, WindRegion::I);
        assert_eq!(loaded.peak_correlation, 1.0);
    }
}
