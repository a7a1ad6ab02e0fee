//! 探测器像素几何
//!
//! 对线阵和面阵探测器，计算每个像素相对于零通道方向（主光束方向）的偏转角：
//! - 角像素间距 `2·atan(像素宽度 / (2·距离))`，或由每度通道数换算
//! - 平均因子 Nav：间距乘以 Nav，中心通道除以 Nav
//! - 感兴趣区域 (ROI)：下界向上取整，像素数 `ceil((hi - lo) / Nav)`
//!
//! 偏转是绕 `主光束 × 安装方向` 轴的旋转，面阵探测器先施加方向1的偏转再施加方向2的偏转。

use crate::axis::Circle;
use crate::error::{ConversionError, Result};
use crate::math::{axis_angle, Vector3, EPSILON};
use nalgebra::Unit;

/// 角像素间距的来源
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelPitch {
    /// 中心通道到旋转中心的距离与像素宽度（同一长度单位）
    Geometry { distance: f64, pixel_width: f64 },
    /// 每度通道数（只有绝对值有意义）
    ChannelsPerDegree(f64),
}

impl PixelPitch {
    /// 距离+像素宽度 与 每度通道数 必须恰好给出其中一组
    pub fn resolve(
        distance: Option<f64>,
        pixel_width: Option<f64>,
        channels_per_degree: Option<f64>,
    ) -> Result<Self> {
        match (distance, pixel_width, channels_per_degree) {
            (Some(d), Some(w), None) => Self::geometry(d, w),
            (None, None, Some(c)) => Self::channels_per_degree(c),
            (_, _, Some(_)) => Err(ConversionError::AmbiguousPixelPitch),
            (Some(_), None, None) => Err(ConversionError::MissingMandatoryParameter(
                "pixel_width".to_string(),
            )),
            (None, Some(_), None) => Err(ConversionError::MissingMandatoryParameter(
                "distance".to_string(),
            )),
            (None, None, None) => Err(ConversionError::MissingMandatoryParameter(
                "distance and pixel_width, or channels_per_degree".to_string(),
            )),
        }
    }

    pub fn geometry(distance: f64, pixel_width: f64) -> Result<Self> {
        if !(distance.is_finite() && distance > 0.0) {
            return Err(ConversionError::InvalidInput(format!(
                "detector distance must be positive, got {}",
                distance
            )));
        }
        if !(pixel_width.is_finite() && pixel_width > 0.0) {
            return Err(ConversionError::InvalidInput(format!(
                "pixel width must be positive, got {}",
                pixel_width
            )));
        }
        Ok(PixelPitch::Geometry {
            distance,
            pixel_width,
        })
    }

    pub fn channels_per_degree(value: f64) -> Result<Self> {
        if !(value.is_finite() && value != 0.0) {
            return Err(ConversionError::InvalidInput(format!(
                "channels per degree must be non-zero, got {}",
                value
            )));
        }
        Ok(PixelPitch::ChannelsPerDegree(value))
    }

    /// 等效距离；由每度通道数给出时取 1
    pub fn distance(&self) -> f64 {
        match *self {
            PixelPitch::Geometry { distance, .. } => distance,
            PixelPitch::ChannelsPerDegree(_) => 1.0,
        }
    }

    /// 等效像素宽度（与 `distance()` 同单位）
    pub fn pixel_width(&self) -> f64 {
        match *self {
            PixelPitch::Geometry { pixel_width, .. } => pixel_width,
            PixelPitch::ChannelsPerDegree(c) => 2.0 / c.abs() * 0.5f64.to_radians().tan(),
        }
    }

    /// 相邻像素间的夹角（弧度）
    pub fn angular_pitch(&self) -> f64 {
        2.0 * (self.pixel_width() / (2.0 * self.distance())).atan()
    }

    /// 每度通道数
    pub fn channels_per_degree_value(&self) -> f64 {
        2.0 * self.distance() / self.pixel_width() * 0.5f64.to_radians().tan()
    }
}

/// 探测器的一个像素方向
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelAxis {
    /// 像素排列方向（零探测器角度时），例如 `z+`
    pub direction: Circle,
    /// 中心通道：零探测器角度时位于主光束方向
    pub center_channel: f64,
    /// 通道总数
    pub channels: usize,
    pub pitch: PixelPitch,
}

impl PixelAxis {
    pub fn new(
        direction: Circle,
        center_channel: f64,
        channels: usize,
        pitch: PixelPitch,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(ConversionError::InvalidInput(
                "detector must have at least one channel".to_string(),
            ));
        }
        if !center_channel.is_finite() {
            return Err(ConversionError::InvalidInput(format!(
                "center channel must be finite, got {}",
                center_channel
            )));
        }
        Ok(Self {
            direction,
            center_channel,
            channels,
            pitch,
        })
    }

    /// 偏转旋转轴：主光束 × 安装方向
    pub fn offset_axis(&self, beam: &Unit<Vector3>) -> Result<Unit<Vector3>> {
        let axis = beam.cross(&self.direction.unit_vector());
        if axis.norm() < EPSILON {
            return Err(ConversionError::InvalidDetectorDirection(format!(
                "{} is parallel to the primary beam",
                self.direction
            )));
        }
        Ok(Unit::new_normalize(axis))
    }

    fn check_range(&self, lo: usize, hi: usize, nav: usize) -> Result<()> {
        if nav == 0 {
            return Err(ConversionError::InvalidInput(
                "channel averaging factor must be at least 1".to_string(),
            ));
        }
        if lo >= hi || hi > self.channels {
            return Err(ConversionError::InvalidInput(format!(
                "region of interest [{}, {}) invalid for {} channels",
                lo, hi, self.channels
            )));
        }
        Ok(())
    }

    /// 平均后的像素数 `ceil((hi - lo) / nav)`
    pub fn pixel_count(&self, lo: usize, hi: usize, nav: usize) -> Result<usize> {
        self.check_range(lo, hi, nav)?;
        Ok((hi - lo).div_ceil(nav))
    }

    /// ROI 内（平均后）每个像素的偏转角（弧度）
    pub fn offsets(&self, lo: usize, hi: usize, nav: usize) -> Result<Vec<f64>> {
        let count = self.pixel_count(lo, hi, nav)?;
        let first = lo.div_ceil(nav);
        let cch = self.center_channel / nav as f64;
        let pitch = self.pitch.angular_pitch() * nav as f64;
        Ok((first..first + count)
            .map(|j| (j as f64 - cch) * pitch)
            .collect())
    }

    fn summary_line(&self) -> String {
        format!(
            "distance to center of rotation/pixel width: {:10.4}/{:10.4}",
            self.pitch.distance(),
            self.pitch.pixel_width()
        )
    }
}

/// 线阵探测器
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDetector {
    pub axis: PixelAxis,
    /// 默认感兴趣区域 `[lo, hi)`
    pub roi: [usize; 2],
    /// 默认通道平均因子
    pub nav: usize,
}

impl LinearDetector {
    pub fn new(
        direction: &str,
        center_channel: f64,
        channels: usize,
        pitch: PixelPitch,
    ) -> Result<Self> {
        let axis = PixelAxis::new(Circle::parse(direction)?, center_channel, channels, pitch)?;
        Ok(Self::from_axis(axis))
    }

    /// 默认 ROI 为整个探测器，不做平均
    pub fn from_axis(axis: PixelAxis) -> Self {
        Self {
            roi: [0, axis.channels],
            nav: 1,
            axis,
        }
    }

    pub fn with_roi(mut self, roi: [usize; 2]) -> Result<Self> {
        self.axis.check_range(roi[0], roi[1], self.nav)?;
        self.roi = roi;
        Ok(self)
    }

    pub fn with_nav(mut self, nav: usize) -> Result<Self> {
        self.axis.check_range(self.roi[0], self.roi[1], nav)?;
        self.nav = nav;
        Ok(self)
    }

    /// 检查安装方向相对主光束是否可用
    pub fn validate(&self, beam: &Unit<Vector3>) -> Result<()> {
        self.axis.offset_axis(beam).map(|_| ())
    }

    /// 每个像素的出射方向（单位向量），零探测器角度时
    pub fn pixel_directions(
        &self,
        beam: &Unit<Vector3>,
        roi: [usize; 2],
        nav: usize,
    ) -> Result<Vec<Vector3>> {
        let rot_axis = self.axis.offset_axis(beam)?;
        let offsets = self.axis.offsets(roi[0], roi[1], nav)?;
        Ok(offsets
            .into_iter()
            .map(|a| axis_angle(&rot_axis, a) * beam.into_inner())
            .collect())
    }
}

impl std::fmt::Display for LinearDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "linear detector mount direction: {}", self.axis.direction)?;
        writeln!(
            f,
            "number of channels/center channel: {}/{}",
            self.axis.channels, self.axis.center_channel
        )?;
        writeln!(f, "{}", self.axis.summary_line())?;
        writeln!(
            f,
            "corresponds to channel per degree: {:8.2}",
            self.axis.pitch.channels_per_degree_value()
        )?;
        write!(f, "roi: [{}, {}), Nav: {}", self.roi[0], self.roi[1], self.nav)
    }
}

/// 面阵探测器
#[derive(Debug, Clone, PartialEq)]
pub struct AreaDetector {
    /// 两个正交的像素方向
    pub axes: [PixelAxis; 2],
    /// 默认感兴趣区域 `[dir1_lo, dir1_hi, dir2_lo, dir2_hi]`
    pub roi: [usize; 4],
    /// 默认通道平均因子（每个方向）
    pub nav: [usize; 2],
}

impl AreaDetector {
    pub fn new(
        directions: [&str; 2],
        center_channels: [f64; 2],
        channels: [usize; 2],
        pitch: [PixelPitch; 2],
    ) -> Result<Self> {
        let axis1 = PixelAxis::new(
            Circle::parse(directions[0])?,
            center_channels[0],
            channels[0],
            pitch[0],
        )?;
        let axis2 = PixelAxis::new(
            Circle::parse(directions[1])?,
            center_channels[1],
            channels[1],
            pitch[1],
        )?;
        Self::from_axes([axis1, axis2])
    }

    /// 两个方向不能沿同一坐标轴
    pub fn from_axes(axes: [PixelAxis; 2]) -> Result<Self> {
        let [axis1, axis2] = axes;
        if axis1.direction.axis == axis2.direction.axis {
            return Err(ConversionError::InvalidDetectorDirection(format!(
                "pixel directions {} and {} are parallel",
                axis1.direction, axis2.direction
            )));
        }
        Ok(Self {
            roi: [0, axis1.channels, 0, axis2.channels],
            nav: [1, 1],
            axes,
        })
    }

    pub fn with_roi(mut self, roi: [usize; 4]) -> Result<Self> {
        self.check(roi, self.nav)?;
        self.roi = roi;
        Ok(self)
    }

    pub fn with_nav(mut self, nav: [usize; 2]) -> Result<Self> {
        self.check(self.roi, nav)?;
        self.nav = nav;
        Ok(self)
    }

    fn check(&self, roi: [usize; 4], nav: [usize; 2]) -> Result<()> {
        self.axes[0].check_range(roi[0], roi[1], nav[0])?;
        self.axes[1].check_range(roi[2], roi[3], nav[1])
    }

    pub fn validate(&self, beam: &Unit<Vector3>) -> Result<()> {
        self.axes[0].offset_axis(beam)?;
        self.axes[1].offset_axis(beam)?;
        Ok(())
    }

    /// 平均后两个方向的像素数
    pub fn grid_shape(&self, roi: [usize; 4], nav: [usize; 2]) -> Result<(usize, usize)> {
        Ok((
            self.axes[0].pixel_count(roi[0], roi[1], nav[0])?,
            self.axes[1].pixel_count(roi[2], roi[3], nav[1])?,
        ))
    }

    /// 每个像素的出射方向，方向1变化最快
    pub fn pixel_directions(
        &self,
        beam: &Unit<Vector3>,
        roi: [usize; 4],
        nav: [usize; 2],
    ) -> Result<Vec<Vector3>> {
        let axis1 = self.axes[0].offset_axis(beam)?;
        let axis2 = self.axes[1].offset_axis(beam)?;
        let offsets1 = self.axes[0].offsets(roi[0], roi[1], nav[0])?;
        let offsets2 = self.axes[1].offsets(roi[2], roi[3], nav[1])?;

        let mut dirs = Vec::with_capacity(offsets1.len() * offsets2.len());
        for &a2 in &offsets2 {
            let r2 = axis_angle(&axis2, a2);
            for &a1 in &offsets1 {
                dirs.push(r2 * axis_angle(&axis1, a1) * beam.into_inner());
            }
        }
        Ok(dirs)
    }
}

impl std::fmt::Display for AreaDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a1, a2] = &self.axes;
        writeln!(
            f,
            "area detector mount directions: {}/{}",
            a1.direction, a2.direction
        )?;
        writeln!(
            f,
            "number of channels/center channels: ({},{}) / ({},{})",
            a1.channels, a2.channels, a1.center_channel, a2.center_channel
        )?;
        writeln!(f, "direction 1 {}", a1.summary_line())?;
        writeln!(f, "direction 2 {}", a2.summary_line())?;
        writeln!(
            f,
            "corresponds to channel per degree: ({:8.2},{:8.2})",
            a1.pitch.channels_per_degree_value(),
            a2.pitch.channels_per_degree_value()
        )?;
        write!(
            f,
            "roi: [{}, {}, {}, {}], Nav: [{}, {}]",
            self.roi[0], self.roi[1], self.roi[2], self.roi[3], self.nav[0], self.nav[1]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn beam() -> Unit<Vector3> {
        Vector3::y_axis()
    }

    #[test]
    fn test_pitch_from_geometry() {
        let p = PixelPitch::geometry(500.0, 0.05).unwrap();
        let expected = 2.0 * (0.05f64 / 1000.0).atan();
        assert_abs_diff_eq!(p.angular_pitch(), expected, epsilon = 1e-15);
    }

    #[test]
    fn test_pitch_from_channels_per_degree() {
        let p = PixelPitch::channels_per_degree(-100.0).unwrap();
        assert_abs_diff_eq!(p.channels_per_degree_value(), 100.0, epsilon = 1e-9);
        // 1 通道/度 时间距正好是 1 度
        let one = PixelPitch::channels_per_degree(1.0).unwrap();
        assert_abs_diff_eq!(one.angular_pitch(), 1f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_resolve_requires_exactly_one_source() {
        assert!(PixelPitch::resolve(Some(1.0), Some(0.1), None).is_ok());
        assert!(PixelPitch::resolve(None, None, Some(50.0)).is_ok());
        assert_eq!(
            PixelPitch::resolve(Some(1.0), Some(0.1), Some(50.0)),
            Err(ConversionError::AmbiguousPixelPitch)
        );
        assert!(matches!(
            PixelPitch::resolve(None, None, None),
            Err(ConversionError::MissingMandatoryParameter(_))
        ));
        assert!(matches!(
            PixelPitch::resolve(Some(1.0), None, None),
            Err(ConversionError::MissingMandatoryParameter(_))
        ));
        assert!(matches!(
            PixelPitch::resolve(Some(-1.0), Some(0.1), None),
            Err(ConversionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_offsets_center_is_zero() {
        let axis = PixelAxis::new(
            Circle::parse("z+").unwrap(),
            5.0,
            11,
            PixelPitch::channels_per_degree(1.0).unwrap(),
        )
        .unwrap();
        let off = axis.offsets(0, 11, 1).unwrap();
        assert_eq!(off.len(), 11);
        assert_abs_diff_eq!(off[5], 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(off[0], -5f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_averaging_pixel_count() {
        let axis = PixelAxis::new(
            Circle::parse("z+").unwrap(),
            500.0,
            1000,
            PixelPitch::channels_per_degree(100.0).unwrap(),
        )
        .unwrap();
        for (lo, hi, nav) in [(0, 1000, 3), (480, 520, 2), (1, 4, 2), (7, 8, 4), (0, 999, 7)] {
            let off = axis.offsets(lo, hi, nav).unwrap();
            assert_eq!(off.len(), (hi - lo).div_ceil(nav), "roi [{lo},{hi}) nav {nav}");
        }
    }

    #[test]
    fn test_averaging_rescales_pitch_and_center() {
        let axis = PixelAxis::new(
            Circle::parse("x-").unwrap(),
            10.0,
            20,
            PixelPitch::channels_per_degree(1.0).unwrap(),
        )
        .unwrap();
        let off = axis.offsets(0, 20, 2).unwrap();
        assert_eq!(off.len(), 10);
        assert_abs_diff_eq!(off[5], 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(off[6], 2f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_roi() {
        let pitch = PixelPitch::channels_per_degree(1.0).unwrap();
        let det = LinearDetector::new("z+", 5.0, 10, pitch).unwrap();
        assert!(det.clone().with_roi([5, 5]).is_err());
        assert!(det.clone().with_roi([0, 11]).is_err());
        assert!(det.clone().with_nav(0).is_err());
        assert!(det.with_roi([2, 8]).is_ok());
    }

    #[test]
    fn test_direction_along_beam_rejected() {
        let pitch = PixelPitch::channels_per_degree(1.0).unwrap();
        let det = LinearDetector::new("y-", 5.0, 10, pitch).unwrap();
        assert!(matches!(
            det.validate(&beam()),
            Err(ConversionError::InvalidDetectorDirection(_))
        ));
    }

    #[test]
    fn test_linear_pixel_directions_tilt_towards_mount_direction() {
        let pitch = PixelPitch::channels_per_degree(1.0).unwrap();
        let det = LinearDetector::new("z+", 1.0, 3, pitch).unwrap();
        let dirs = det.pixel_directions(&beam(), [0, 3], 1).unwrap();
        assert_abs_diff_eq!(dirs[1], Vector3::y(), epsilon = 1e-15);
        let a = 1f64.to_radians();
        assert_abs_diff_eq!(dirs[2], Vector3::new(0.0, a.cos(), a.sin()), epsilon = 1e-12);
        assert_abs_diff_eq!(dirs[0], Vector3::new(0.0, a.cos(), -a.sin()), epsilon = 1e-12);
    }

    #[test]
    fn test_area_grid_and_ordering() {
        let pitch = PixelPitch::channels_per_degree(1.0).unwrap();
        let det = AreaDetector::new(["z+", "x+"], [1.0, 0.0], [3, 2], [pitch, pitch]).unwrap();
        let dirs = det.pixel_directions(&beam(), [0, 3, 0, 2], [1, 1]).unwrap();
        assert_eq!(dirs.len(), 6);
        // 方向1变化最快：第二个元素只沿 z 偏转
        assert_abs_diff_eq!(dirs[0].x, 0.0, epsilon = 1e-15);
        assert!(dirs[0].z < 0.0 && dirs[2].z > 0.0);
        assert_abs_diff_eq!(dirs[1], Vector3::y(), epsilon = 1e-15);
        // 第二行沿 x 偏转 1 度
        assert!(dirs[4].x > 0.0);
        assert_abs_diff_eq!(dirs[4].z, 0.0, epsilon = 1e-15);
        let big = AreaDetector::new(["z+", "x+"], [500.0, 500.0], [1000, 1000], [pitch, pitch])
            .unwrap();
        assert_eq!(big.grid_shape([480, 520, 480, 520], [2, 2]), Ok((20, 20)));
    }

    #[test]
    fn test_pixel_count_rejects_bad_range() {
        let pitch = PixelPitch::channels_per_degree(1.0).unwrap();
        let det = AreaDetector::new(["z+", "x+"], [2.0, 2.0], [5, 5], [pitch, pitch]).unwrap();
        // 倒置的 ROI、零平均因子和越界 ROI 都返回错误而不是溢出或除零
        for (roi, nav) in [
            ([5, 3, 0, 1], [1, 1]),
            ([0, 4, 0, 4], [0, 1]),
            ([0, 4, 0, 4], [1, 0]),
            ([0, 6, 0, 4], [1, 1]),
        ] {
            assert!(
                matches!(det.grid_shape(roi, nav), Err(ConversionError::InvalidInput(_))),
                "roi {roi:?} nav {nav:?}"
            );
        }
        let axis = &det.axes[0];
        assert!(axis.pixel_count(0, 4, 0).is_err());
        assert!(axis.pixel_count(3, 1, 1).is_err());
        assert_eq!(axis.pixel_count(1, 4, 2), Ok(2));
    }

    #[test]
    fn test_area_parallel_directions_rejected() {
        let pitch = PixelPitch::channels_per_degree(1.0).unwrap();
        assert!(AreaDetector::new(["z+", "z-"], [0.0, 0.0], [3, 3], [pitch, pitch]).is_err());
    }
}
