//! JSON 配置
//!
//! 测角仪、探测器和实验几何可以从配置文件构造，例如：
//!
//! ```json
//! {
//!   "sample_circles": ["z-", "x+"],
//!   "detector_circles": ["x+", "z-"],
//!   "primary_beam": [0, 1, 0],
//!   "wavelength": 1.5406,
//!   "linear_detector": {
//!     "direction": "z+", "center_channel": 640, "channels": 1280,
//!     "channels_per_degree": 100, "nav": 2
//!   }
//! }
//! ```

use crate::axis::Circle;
use crate::detector::{AreaDetector, LinearDetector, PixelAxis, PixelPitch};
use crate::error::{ConfigError, ConversionError};
use crate::experiment::{Gid, GidId10b, Hxrd, Radiation, ScatteringGeometry};
use crate::math::Vector3;
use crate::qconversion::QConversion;
use crate::rotation::CircleChain;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearDetectorConfig {
    pub direction: Circle,
    pub center_channel: f64,
    pub channels: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels_per_degree: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<[usize; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav: Option<usize>,
}

impl LinearDetectorConfig {
    pub fn build(&self) -> Result<LinearDetector, ConfigError> {
        let pitch =
            PixelPitch::resolve(self.distance, self.pixel_width, self.channels_per_degree)?;
        let axis = PixelAxis::new(self.direction, self.center_channel, self.channels, pitch)?;
        let mut det = LinearDetector::from_axis(axis);
        if let Some(roi) = self.roi {
            det = det.with_roi(roi)?;
        }
        if let Some(nav) = self.nav {
            det = det.with_nav(nav)?;
        }
        Ok(det)
    }
}

/// 面阵探测器；两个方向共用一个距离
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDetectorConfig {
    pub directions: [Circle; 2],
    pub center_channels: [f64; 2],
    pub channels: [usize; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_width: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels_per_degree: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<[usize; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav: Option<[usize; 2]>,
}

impl AreaDetectorConfig {
    pub fn build(&self) -> Result<AreaDetector, ConfigError> {
        let axis = |i: usize| -> Result<PixelAxis, ConversionError> {
            let pitch = PixelPitch::resolve(
                self.distance,
                self.pixel_width.map(|w| w[i]),
                self.channels_per_degree.map(|c| c[i]),
            )?;
            PixelAxis::new(
                self.directions[i],
                self.center_channels[i],
                self.channels[i],
                pitch,
            )
        };
        let mut det = AreaDetector::from_axes([axis(0)?, axis(1)?])?;
        if let Some(roi) = self.roi {
            det = det.with_roi(roi)?;
        }
        if let Some(nav) = self.nav {
            det = det.with_nav(nav)?;
        }
        Ok(det)
    }
}

/// 通用测角仪配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoniometerConfig {
    pub sample_circles: Vec<Circle>,
    pub detector_circles: Vec<Circle>,
    pub primary_beam: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wavelength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear_detector: Option<LinearDetectorConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_detector: Option<AreaDetectorConfig>,
}

impl GoniometerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 构造并初始化转换引擎
    pub fn build(&self) -> Result<QConversion, ConfigError> {
        let mut engine = QConversion::from_chains(
            CircleChain::new(self.sample_circles.clone()),
            CircleChain::new(self.detector_circles.clone()),
            Vector3::from(self.primary_beam),
        )?;
        if let Some(wl) = self.wavelength {
            engine.set_wavelength(wl)?;
        }
        if let Some(linear) = &self.linear_detector {
            engine.init_linear(linear.build()?)?;
        }
        if let Some(area) = &self.area_detector {
            engine.init_area(area.build()?)?;
        }
        tracing::info!(
            "Goniometer configured: sample {} / detector {}",
            engine.sample_circles(),
            engine.detector_circles()
        );
        Ok(engine)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentKind {
    Hxrd,
    Gid,
    #[serde(rename = "gid_id10b")]
    GidId10b,
}

/// 实验几何配置
///
/// 同时给出能量和波长时以能量为准。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub kind: ExperimentKind,
    pub inplane_direction: [f64; 3],
    pub surface_normal: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wavelength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<ScatteringGeometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear_detector: Option<LinearDetectorConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_detector: Option<AreaDetectorConfig>,
}

/// 按配置构造的实验
#[derive(Debug, Clone, PartialEq)]
pub enum ConfiguredExperiment {
    Hxrd(Hxrd),
    Gid(Gid),
    GidId10b(GidId10b),
}

impl ExperimentConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn radiation(&self) -> Radiation {
        match (self.energy, self.wavelength) {
            (Some(en), _) => Radiation::Energy(en),
            (None, Some(wl)) => Radiation::Wavelength(wl),
            (None, None) => Radiation::default(),
        }
    }

    pub fn build(&self) -> Result<ConfiguredExperiment, ConfigError> {
        let idir = Vector3::from(self.inplane_direction);
        let ndir = Vector3::from(self.surface_normal);
        let radiation = self.radiation();

        let mut experiment = match self.kind {
            ExperimentKind::Hxrd => {
                let hxrd = Hxrd::new(idir, ndir, radiation)?;
                ConfiguredExperiment::Hxrd(hxrd.with_geometry(self.geometry.unwrap_or_default()))
            }
            ExperimentKind::Gid => ConfiguredExperiment::Gid(Gid::new(idir, ndir, radiation)?),
            ExperimentKind::GidId10b => {
                ConfiguredExperiment::GidId10b(GidId10b::new(idir, ndir, radiation)?)
            }
        };
        if self.kind != ExperimentKind::Hxrd && self.geometry.is_some() {
            tracing::warn!("Scattering geometry is ignored for GID experiments");
        }

        let exp = match &mut experiment {
            ConfiguredExperiment::Hxrd(h) => &mut **h,
            ConfiguredExperiment::Gid(g) => &mut **g,
            ConfiguredExperiment::GidId10b(g) => &mut **g,
        };
        if let Some(linear) = &self.linear_detector {
            exp.init_linear(linear.build()?)?;
        }
        if let Some(area) = &self.area_detector {
            exp.init_area(area.build()?)?;
        }
        Ok(experiment)
    }
}
