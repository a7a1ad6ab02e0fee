//! 角度到倒易空间的通用转换引擎
//!
//! 引擎由样品圆、探测器圆和主光束方向配置，提供三种探测器模式：
//! - 点探测器: [`QConversion::point`]
//! - 线阵探测器: [`QConversion::linear`]（需先 [`QConversion::init_linear`]）
//! - 面阵探测器: [`QConversion::area`]（需先 [`QConversion::init_area`]）
//!
//! 对每个测角仪位置，样品矩阵 `Ms = R_s1·…·R_sn`，探测器矩阵 `Md = R_d1·…·R_dm`，
//! 像素出射方向 `r̂`（点探测器即主光束方向 `r̂_i`）：
//!
//! ```text
//! Q = k · Msᵀ · (Md · r̂ − r̂_i),   k = 2π/λ
//! ```
//!
//! 所有角度为零时 `Q = 0`。批量计算按测角仪位置并行。

use crate::angles::{AngleBatch, AngleValues, ConversionOptions};
use crate::detector::{AreaDetector, LinearDetector};
use crate::error::{ConversionError, Result};
use crate::math::{unit_or_err, Matrix3, Vector3};
use crate::rotation::CircleChain;
use nalgebra::Unit;
use rayon::prelude::*;
use std::f64::consts::PI;

/// 默认波长：Cu Kα1（Å）
pub const DEFAULT_WAVELENGTH: f64 = 1.5406;

/// 线阵探测器转换选项
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearOptions {
    pub conversion: ConversionOptions,
    /// 覆盖初始化时的 ROI `[lo, hi)`
    pub roi: Option<[usize; 2]>,
    /// 覆盖初始化时的平均因子
    pub nav: Option<usize>,
}

/// 面阵探测器转换选项
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AreaOptions {
    pub conversion: ConversionOptions,
    /// 覆盖初始化时的 ROI `[dir1_lo, dir1_hi, dir2_lo, dir2_hi]`
    pub roi: Option<[usize; 4]>,
    /// 覆盖初始化时的平均因子
    pub nav: Option<[usize; 2]>,
}

/// 转换结果
///
/// 共 `points × pixels` 个向量；每个测角仪位置的像素连续存放，
/// 面阵探测器时方向1变化最快。
#[derive(Debug, Clone, PartialEq)]
pub struct QPositions {
    vectors: Vec<Vector3>,
    points: usize,
    grid: (usize, usize),
}

impl QPositions {
    /// 测角仪位置数 N
    pub fn points(&self) -> usize {
        self.points
    }

    /// 每个位置的像素网格 (方向1, 方向2)；点探测器为 (1, 1)
    pub fn grid(&self) -> (usize, usize) {
        self.grid
    }

    pub fn pixels_per_point(&self) -> usize {
        self.grid.0 * self.grid.1
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn as_slice(&self) -> &[Vector3] {
        &self.vectors
    }

    pub fn into_vec(self) -> Vec<Vector3> {
        self.vectors
    }

    /// 第 `point` 个位置、第 `pixel` 个像素
    pub fn at(&self, point: usize, pixel: usize) -> Option<&Vector3> {
        if point >= self.points || pixel >= self.pixels_per_point() {
            return None;
        }
        self.vectors.get(point * self.pixels_per_point() + pixel)
    }

    pub fn qx(&self) -> Vec<f64> {
        self.vectors.iter().map(|q| q.x).collect()
    }

    pub fn qy(&self) -> Vec<f64> {
        self.vectors.iter().map(|q| q.y).collect()
    }

    pub fn qz(&self) -> Vec<f64> {
        self.vectors.iter().map(|q| q.z).collect()
    }
}

/// 测角仪 → 倒易空间转换器
#[derive(Debug, Clone, PartialEq)]
pub struct QConversion {
    sample: CircleChain,
    detector: CircleChain,
    /// 用户给出的主光束方向（长度无关）
    primary_beam: Vector3,
    beam_unit: Unit<Vector3>,
    wavelength: f64,
    linear: Option<LinearDetector>,
    area: Option<AreaDetector>,
}

impl QConversion {
    /// 配置样品圆、探测器圆和主光束方向，波长取默认值
    pub fn new<S: AsRef<str>>(
        sample_axes: &[S],
        detector_axes: &[S],
        primary_beam: Vector3,
    ) -> Result<Self> {
        let sample = CircleChain::parse(sample_axes)?;
        let detector = CircleChain::parse(detector_axes)?;
        Self::from_chains(sample, detector, primary_beam)
    }

    /// 由已解析的圆序列构造
    pub fn from_chains(
        sample: CircleChain,
        detector: CircleChain,
        primary_beam: Vector3,
    ) -> Result<Self> {
        let beam_unit = unit_or_err(&primary_beam, "primary beam direction")?;
        Ok(Self {
            sample,
            detector,
            primary_beam,
            beam_unit,
            wavelength: DEFAULT_WAVELENGTH,
            linear: None,
            area: None,
        })
    }

    pub fn with_wavelength(mut self, wavelength: f64) -> Result<Self> {
        self.set_wavelength(wavelength)?;
        Ok(self)
    }

    pub fn sample_circles(&self) -> &CircleChain {
        &self.sample
    }

    pub fn detector_circles(&self) -> &CircleChain {
        &self.detector
    }

    /// 更换样品圆；任何描述符非法时保持原配置
    pub fn set_sample_circles<S: AsRef<str>>(&mut self, axes: &[S]) -> Result<()> {
        self.sample = CircleChain::parse(axes)?;
        tracing::debug!("sample circles set to {}", self.sample);
        Ok(())
    }

    /// 更换探测器圆；任何描述符非法时保持原配置
    pub fn set_detector_circles<S: AsRef<str>>(&mut self, axes: &[S]) -> Result<()> {
        self.detector = CircleChain::parse(axes)?;
        tracing::debug!("detector circles set to {}", self.detector);
        Ok(())
    }

    pub fn primary_beam(&self) -> &Vector3 {
        &self.primary_beam
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn set_wavelength(&mut self, wavelength: f64) -> Result<()> {
        self.wavelength = check_wavelength(wavelength)?;
        Ok(())
    }

    pub fn linear_detector(&self) -> Option<&LinearDetector> {
        self.linear.as_ref()
    }

    pub fn area_detector(&self) -> Option<&AreaDetector> {
        self.area.as_ref()
    }

    /// 初始化（或替换）线阵探测器几何
    pub fn init_linear(&mut self, detector: LinearDetector) -> Result<()> {
        detector.validate(&self.beam_unit)?;
        tracing::info!(
            "Linear detector initialized: {} channels along {}, cch {}",
            detector.axis.channels,
            detector.axis.direction,
            detector.axis.center_channel
        );
        self.linear = Some(detector);
        Ok(())
    }

    /// 初始化（或替换）面阵探测器几何
    pub fn init_area(&mut self, detector: AreaDetector) -> Result<()> {
        detector.validate(&self.beam_unit)?;
        tracing::info!(
            "Area detector initialized: {}x{} pixels along {}/{}",
            detector.axes[0].channels,
            detector.axes[1].channels,
            detector.axes[0].direction,
            detector.axes[1].direction
        );
        self.area = Some(detector);
        Ok(())
    }

    /// 点探测器转换，探测器位于零角度时的主光束方向
    pub fn point(
        &self,
        sample: &[AngleValues],
        detector: &[AngleValues],
        options: &ConversionOptions,
    ) -> Result<QPositions> {
        let (batch, k) = self.prepare(sample, detector, options)?;
        tracing::debug!("point conversion of {} positions", batch.points);

        let ri = self.beam_unit.into_inner();
        let vectors = (0..batch.points)
            .into_par_iter()
            .map(|i| {
                let (ms_t, md) = self.matrices(&batch, i);
                ms_t * (md * ri - ri) * k
            })
            .collect();

        Ok(QPositions {
            vectors,
            points: batch.points,
            grid: (1, 1),
        })
    }

    /// 线阵探测器转换
    pub fn linear(
        &self,
        sample: &[AngleValues],
        detector: &[AngleValues],
        options: &LinearOptions,
    ) -> Result<QPositions> {
        let det = self
            .linear
            .as_ref()
            .ok_or(ConversionError::NotInitialized("linear"))?;
        let roi = options.roi.unwrap_or(det.roi);
        let nav = options.nav.unwrap_or(det.nav);

        let (batch, k) = self.prepare(sample, detector, &options.conversion)?;
        let pixels = det.pixel_directions(&self.beam_unit, roi, nav)?;
        tracing::debug!(
            "linear conversion of {} positions x {} channels",
            batch.points,
            pixels.len()
        );

        let grid = (pixels.len(), 1);
        Ok(self.convert_pixels(&batch, k, &pixels, grid))
    }

    /// 面阵探测器转换
    pub fn area(
        &self,
        sample: &[AngleValues],
        detector: &[AngleValues],
        options: &AreaOptions,
    ) -> Result<QPositions> {
        let det = self
            .area
            .as_ref()
            .ok_or(ConversionError::NotInitialized("area"))?;
        let roi = options.roi.unwrap_or(det.roi);
        let nav = options.nav.unwrap_or(det.nav);

        let (batch, k) = self.prepare(sample, detector, &options.conversion)?;
        let grid = det.grid_shape(roi, nav)?;
        let pixels = det.pixel_directions(&self.beam_unit, roi, nav)?;
        tracing::debug!(
            "area conversion of {} positions x {}x{} pixels",
            batch.points,
            grid.0,
            grid.1
        );

        Ok(self.convert_pixels(&batch, k, &pixels, grid))
    }

    /// 校验输入并计算波矢长度
    fn prepare(
        &self,
        sample: &[AngleValues],
        detector: &[AngleValues],
        options: &ConversionOptions,
    ) -> Result<(AngleBatch, f64)> {
        let wavelength = match options.wavelength {
            Some(wl) => check_wavelength(wl)?,
            None => self.wavelength,
        };
        let batch = AngleBatch::prepare(
            sample,
            detector,
            self.sample.len(),
            self.detector.len(),
            options,
        )?;
        Ok((batch, 2.0 * PI / wavelength))
    }

    /// 第 i 个位置的 (Msᵀ, Md)
    fn matrices(&self, batch: &AngleBatch, i: usize) -> (Matrix3, Matrix3) {
        let ms = self
            .sample
            .compose_unchecked(batch.sample_row(i, self.sample.len()));
        let md = self
            .detector
            .compose_unchecked(batch.detector_row(i, self.detector.len()));
        (ms.transpose(), md)
    }

    fn convert_pixels(
        &self,
        batch: &AngleBatch,
        k: f64,
        pixels: &[Vector3],
        grid: (usize, usize),
    ) -> QPositions {
        let ri = self.beam_unit.into_inner();
        let per_point = pixels.len();
        let mut vectors = vec![Vector3::zeros(); batch.points * per_point];

        vectors
            .par_chunks_mut(per_point.max(1))
            .enumerate()
            .for_each(|(i, chunk)| {
                let (ms_t, md) = self.matrices(batch, i);
                for (q, rd) in chunk.iter_mut().zip(pixels) {
                    *q = ms_t * (md * rd - ri) * k;
                }
            });

        QPositions {
            vectors,
            points: batch.points,
            grid,
        }
    }
}

fn check_wavelength(wavelength: f64) -> Result<f64> {
    if wavelength.is_finite() && wavelength > 0.0 {
        Ok(wavelength)
    } else {
        Err(ConversionError::InvalidInput(format!(
            "wavelength must be positive, got {}",
            wavelength
        )))
    }
}

impl std::fmt::Display for QConversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "QConversion geometry")?;
        writeln!(f, "---------------------------")?;
        writeln!(f, "sample geometry({}): {}", self.sample.len(), self.sample)?;
        writeln!(
            f,
            "detector geometry({}): {}",
            self.detector.len(),
            self.detector
        )?;
        writeln!(
            f,
            "primary beam direction: ({:5.2} {:5.2} {:5.2})",
            self.primary_beam.x, self.primary_beam.y, self.primary_beam.z
        )?;
        writeln!(f, "wavelength: {:.4} (Angstrom)", self.wavelength)?;
        if let Some(linear) = &self.linear {
            writeln!(f)?;
            writeln!(f, " linear detector initialized:")?;
            writeln!(f, "{}", linear)?;
        }
        if let Some(area) = &self.area {
            writeln!(f)?;
            writeln!(f, " area detector initialized:")?;
            writeln!(f, "{}", area)?;
        }
        Ok(())
    }
}
