//! 实验几何：样品取向、X 射线能量以及 HXRD/GID 的逆向角度计算
//!
//! 样品取向由面内参考方向 `idir`（零角度时指向主光束方向）和表面法线 `ndir` 给出，
//! 派生坐标系的三个基向量为 `(ndir × idir, idir, ndir)`。

use crate::angles::{AngleValues, ConversionOptions};
use crate::detector::{AreaDetector, LinearDetector};
use crate::error::{ConversionError, Result};
use crate::math::{unit_or_err, vec_angle, CoordinateTransform, Vector3, EPSILON};
use crate::qconversion::{QConversion, QPositions, DEFAULT_WAVELENGTH};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// 元电荷 (C)
const E_CHARGE: f64 = 1.60219e-19;
/// 普朗克常数 (J·s)
const H_PLANCK: f64 = 6.62602e-34;
/// 光速 (m/s)
const C_LIGHT: f64 = 2.997925e8;

/// GID 几何中 Qz 的容差
pub const GID_QZ_TOLERANCE: f64 = 0.001;

/// 波长 (Å) → 光子能量 (eV)
pub fn wavelength_to_energy(wavelength: f64) -> f64 {
    C_LIGHT * H_PLANCK / (wavelength * 1e-10) / E_CHARGE
}

/// 光子能量 (eV) → 波长 (Å)
pub fn energy_to_wavelength(energy: f64) -> f64 {
    C_LIGHT * H_PLANCK / (energy * E_CHARGE) / 1e-10
}

/// X 射线的指定方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Radiation {
    /// 波长 (Å)
    Wavelength(f64),
    /// 光子能量 (eV)
    Energy(f64),
}

impl Default for Radiation {
    fn default() -> Self {
        Radiation::Wavelength(DEFAULT_WAVELENGTH)
    }
}

impl Radiation {
    /// 对应的波长 (Å)
    pub fn wavelength(&self) -> Result<f64> {
        match *self {
            Radiation::Wavelength(wl) => positive(wl, "wavelength"),
            Radiation::Energy(en) => positive(en, "energy").map(energy_to_wavelength),
        }
    }
}

fn positive(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConversionError::InvalidInput(format!(
            "{} must be positive, got {}",
            what, value
        )))
    }
}

/// 散射几何
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatteringGeometry {
    /// 高入射角、低出射角
    #[default]
    HiLo,
    /// 低入射角、高出射角
    LoHi,
}

impl FromStr for ScatteringGeometry {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hi_lo" => Ok(ScatteringGeometry::HiLo),
            "lo_hi" => Ok(ScatteringGeometry::LoHi),
            other => Err(ConversionError::InvalidGeometryMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for ScatteringGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScatteringGeometry::HiLo => write!(f, "hi_lo"),
            ScatteringGeometry::LoHi => write!(f, "lo_hi"),
        }
    }
}

/// 逆向角度计算选项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QToAngleOptions {
    /// 先把 Q 变换到样品坐标系
    pub transform: bool,
    /// 返回角度制
    pub degrees: bool,
    /// 覆盖实验默认的散射几何（仅本次调用）
    pub geometry: Option<ScatteringGeometry>,
}

impl Default for QToAngleOptions {
    fn default() -> Self {
        Self {
            transform: true,
            degrees: true,
            geometry: None,
        }
    }
}

impl QToAngleOptions {
    pub fn without_transform(mut self) -> Self {
        self.transform = false;
        self
    }

    pub fn radians(mut self) -> Self {
        self.degrees = false;
        self
    }

    pub fn with_geometry(mut self, geometry: ScatteringGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

/// 通用实验描述
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    idir: Vector3,
    ndir: Vector3,
    transform: CoordinateTransform,
    wavelength: f64,
    energy: f64,
    k0: f64,
    engine: QConversion,
}

impl Experiment {
    /// 由样品取向、X 射线和测角仪构造
    ///
    /// 两个方向线性相关时报错；不垂直时把 `idir` 投影到表面内（保持方位角）并给出警告。
    pub fn new(
        idir: Vector3,
        ndir: Vector3,
        radiation: Radiation,
        engine: QConversion,
    ) -> Result<Self> {
        let wavelength = radiation.wavelength()?;
        let (idir, transform) = orient(idir, ndir)?;
        let mut experiment = Self {
            idir,
            ndir,
            transform,
            wavelength,
            energy: wavelength_to_energy(wavelength),
            k0: 2.0 * PI / wavelength,
            engine,
        };
        experiment.engine.set_wavelength(wavelength)?;
        Ok(experiment)
    }

    pub fn inplane_direction(&self) -> &Vector3 {
        &self.idir
    }

    pub fn normal_direction(&self) -> &Vector3 {
        &self.ndir
    }

    /// 更换面内参考方向；失败时保持原状态
    pub fn set_inplane_direction(&mut self, idir: Vector3) -> Result<()> {
        let (idir, transform) = orient(idir, self.ndir)?;
        self.idir = idir;
        self.transform = transform;
        Ok(())
    }

    /// 更换表面法线；失败时保持原状态
    pub fn set_normal_direction(&mut self, ndir: Vector3) -> Result<()> {
        let (idir, transform) = orient(self.idir, ndir)?;
        self.idir = idir;
        self.ndir = ndir;
        self.transform = transform;
        Ok(())
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// 波矢长度 `2π/λ`
    pub fn k0(&self) -> f64 {
        self.k0
    }

    pub fn set_wavelength(&mut self, wavelength: f64) -> Result<()> {
        self.apply_wavelength(positive(wavelength, "wavelength")?)
    }

    pub fn set_energy(&mut self, energy: f64) -> Result<()> {
        self.apply_wavelength(energy_to_wavelength(positive(energy, "energy")?))
    }

    fn apply_wavelength(&mut self, wavelength: f64) -> Result<()> {
        self.engine.set_wavelength(wavelength)?;
        self.wavelength = wavelength;
        self.energy = wavelength_to_energy(wavelength);
        self.k0 = 2.0 * PI / wavelength;
        tracing::debug!(
            "Experiment radiation set to {:.4} A ({:.1} eV)",
            self.wavelength,
            self.energy
        );
        Ok(())
    }

    pub fn coordinate_transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// 把实验室坐标系中的向量变换到样品坐标系
    pub fn transform(&self, v: &Vector3) -> Vector3 {
        self.transform.apply(v)
    }

    /// Q 与表面法线的夹角
    pub fn tilt_angle(&self, q: &Vector3, degrees: bool) -> f64 {
        vec_angle(&self.ndir, q, degrees)
    }

    /// 点探测器角度 → Q（实验室坐标系）
    pub fn angle_to_q(
        &self,
        sample: &[AngleValues],
        detector: &[AngleValues],
        options: &ConversionOptions,
    ) -> Result<QPositions> {
        self.engine.point(sample, detector, options)
    }

    pub fn engine(&self) -> &QConversion {
        &self.engine
    }

    pub fn init_linear(&mut self, detector: LinearDetector) -> Result<()> {
        self.engine.init_linear(detector)
    }

    pub fn init_area(&mut self, detector: AreaDetector) -> Result<()> {
        self.engine.init_area(detector)
    }
}

/// 校验取向并构造坐标变换，返回（可能被投影的）面内方向
fn orient(idir: Vector3, ndir: Vector3) -> Result<(Vector3, CoordinateTransform)> {
    let i = unit_or_err(&idir, "inplane direction")?.into_inner();
    let n = unit_or_err(&ndir, "surface normal")?.into_inner();
    if i.cross(&n).norm() < EPSILON {
        return Err(ConversionError::LinearlyDependentDirections);
    }

    let idir = if i.dot(&n).abs() > EPSILON {
        let projected = n.cross(&i).cross(&n).normalize();
        tracing::warn!(
            "Inplane direction is not perpendicular to the surface normal, using ({:.3} {:.3} {:.3}) with the same azimuth",
            projected.x,
            projected.y,
            projected.z
        );
        projected
    } else {
        idir
    };

    let transform = CoordinateTransform::new(ndir.cross(&idir), idir, ndir)?;
    Ok((idir, transform))
}

impl std::fmt::Display for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "inplane azimuth: ({:.6} {:.6} {:.6})",
            self.idir.x, self.idir.y, self.idir.z
        )?;
        writeln!(
            f,
            "surface normal: ({:.6} {:.6} {:.6})",
            self.ndir.x, self.ndir.y, self.ndir.z
        )?;
        writeln!(f, "energy: {:.6} (eV)", self.energy)?;
        writeln!(f, "wavelength: {:.6} (Angstrom)", self.wavelength)?;
        write!(f, "{}", self.engine)
    }
}

/// 共面高角衍射（一个样品圆 ω，一个探测器圆 2θ）
#[derive(Debug, Clone, PartialEq)]
pub struct Hxrd {
    experiment: Experiment,
    geometry: ScatteringGeometry,
}

impl Hxrd {
    pub fn new(idir: Vector3, ndir: Vector3, radiation: Radiation) -> Result<Self> {
        let engine = QConversion::new(&["x+"], &["x+"], Vector3::y())?;
        Ok(Self {
            experiment: Experiment::new(idir, ndir, radiation, engine)?,
            geometry: ScatteringGeometry::default(),
        })
    }

    pub fn with_geometry(mut self, geometry: ScatteringGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn geometry(&self) -> ScatteringGeometry {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: ScatteringGeometry) {
        self.geometry = geometry;
    }

    /// Q → `[δ, ω, 2θ]`
    ///
    /// δ 是 Q 偏离散射面的方位角。ω 有两个候选公式，两者都有定义时取第一个；
    /// 再按散射几何把 ω 关于 2θ/2 反射到正确的一侧。
    /// `|Q| > 2k₀` 或 `Q = 0` 时结果为 NaN。
    pub fn q_to_angle(&self, q: &Vector3, options: &QToAngleOptions) -> [f64; 3] {
        let geometry = options.geometry.unwrap_or(self.geometry);
        let q = if options.transform {
            self.experiment.transform(q)
        } else {
            *q
        };

        let qa = q.norm();
        let tth = 2.0 * (qa / 2.0 / self.experiment.k0).asin();

        let mut delta = (q.x / q.y).atan();
        if delta.is_nan() {
            delta = 0.0;
        }

        let om1 = (q.y / qa / delta.cos()).asin() + 0.5 * tth;
        let om2 = (q.x / qa / delta.sin()).asin() + 0.5 * tth;
        let mut om = if om1.is_nan() { om2 } else { om1 };

        match geometry {
            ScatteringGeometry::HiLo if om < tth / 2.0 => om = tth - om,
            ScatteringGeometry::LoHi if om > tth / 2.0 => om = tth - om,
            _ => {}
        }

        if options.degrees {
            [delta.to_degrees(), om.to_degrees(), tth.to_degrees()]
        } else {
            [delta, om, tth]
        }
    }

    /// 双圆衍射仪的解析公式：(ω, 2θ, δ) → Q（样品坐标系）
    pub fn coplanar_q(&self, om: f64, tth: f64, delta: f64, degrees: bool) -> Vector3 {
        let (om, tth, delta) = if degrees {
            (om.to_radians(), tth.to_radians(), delta.to_radians())
        } else {
            (om, tth, delta)
        };
        let q = 2.0 * self.experiment.k0 * (0.5 * tth).sin();
        let inplane = q * (om - 0.5 * tth).sin();
        Vector3::new(
            inplane * delta.sin(),
            inplane * delta.cos(),
            q * (om - 0.5 * tth).cos(),
        )
    }
}

impl Deref for Hxrd {
    type Target = Experiment;

    fn deref(&self) -> &Experiment {
        &self.experiment
    }
}

impl DerefMut for Hxrd {
    fn deref_mut(&mut self) -> &mut Experiment {
        &mut self.experiment
    }
}

impl std::fmt::Display for Hxrd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "HXRD geometry: {}", self.geometry)?;
        write!(f, "{}", self.experiment)
    }
}

/// 掠入射衍射（样品 `z-`,`x+`；探测器 `x+`,`z-`）
#[derive(Debug, Clone, PartialEq)]
pub struct Gid {
    experiment: Experiment,
}

impl Gid {
    pub fn new(idir: Vector3, ndir: Vector3, radiation: Radiation) -> Result<Self> {
        let engine = QConversion::new(&["z-", "x+"], &["x+", "z-"], Vector3::y())?;
        Ok(Self {
            experiment: Experiment::new(idir, ndir, radiation, engine)?,
        })
    }

    /// Q → `[ω, 2θ]`
    ///
    /// Q 必须位于样品表面内（`|Qz| < 0.001`），否则返回 `UnreachableReflection`。
    /// `options.geometry` 在此几何下不起作用。
    pub fn q_to_angle(&self, q: &Vector3, options: &QToAngleOptions) -> Result<[f64; 2]> {
        let q = if options.transform {
            self.experiment.transform(q)
        } else {
            *q
        };

        if q.z.abs() >= GID_QZ_TOLERANCE {
            return Err(ConversionError::UnreachableReflection { qz: q.z });
        }

        let aref = q.x.atan2(q.y);
        let tth = 2.0 * (q.norm() / 2.0 / self.experiment.k0).asin();
        let om = FRAC_PI_2 + aref + tth / 2.0;

        Ok(if options.degrees {
            [om.to_degrees(), tth.to_degrees()]
        } else {
            [om, tth]
        })
    }
}

impl Deref for Gid {
    type Target = Experiment;

    fn deref(&self) -> &Experiment {
        &self.experiment
    }
}

impl DerefMut for Gid {
    fn deref_mut(&mut self) -> &mut Experiment {
        &mut self.experiment
    }
}

impl std::fmt::Display for Gid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "GID geometry")?;
        write!(f, "{}", self.experiment)
    }
}

/// ID10B 光束线的掠入射四圆衍射仪（样品 `x+`,`z-`；探测器 `x+`,`z-`）
///
/// 只提供正向转换。
#[derive(Debug, Clone, PartialEq)]
pub struct GidId10b {
    experiment: Experiment,
}

impl GidId10b {
    pub fn new(idir: Vector3, ndir: Vector3, radiation: Radiation) -> Result<Self> {
        let engine = QConversion::new(&["x+", "z-"], &["x+", "z-"], Vector3::y())?;
        Ok(Self {
            experiment: Experiment::new(idir, ndir, radiation, engine)?,
        })
    }
}

impl Deref for GidId10b {
    type Target = Experiment;

    fn deref(&self) -> &Experiment {
        &self.experiment
    }
}

impl DerefMut for GidId10b {
    fn deref_mut(&mut self) -> &mut Experiment {
        &mut self.experiment
    }
}

impl std::fmt::Display for GidId10b {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "GID (ID10B) geometry")?;
        write!(f, "{}", self.experiment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn hxrd() -> Hxrd {
        Hxrd::new(Vector3::y(), Vector3::z(), Radiation::default()).unwrap()
    }

    #[test]
    fn test_energy_wavelength_relation() {
        let en = wavelength_to_energy(1.5406);
        assert_relative_eq!(en, 8047.8, max_relative = 1e-4);
        assert_relative_eq!(energy_to_wavelength(en), 1.5406, max_relative = 1e-12);

        let mut exp = hxrd();
        exp.set_energy(10000.0).unwrap();
        assert_relative_eq!(exp.wavelength(), energy_to_wavelength(10000.0));
        assert_relative_eq!(exp.engine().wavelength(), exp.wavelength());
        assert_relative_eq!(exp.k0(), 2.0 * PI / exp.wavelength());
        assert!(exp.set_wavelength(0.0).is_err());
    }

    #[test]
    fn test_energy_radiation() {
        let exp = Hxrd::new(Vector3::y(), Vector3::z(), Radiation::Energy(12398.0)).unwrap();
        assert_relative_eq!(exp.energy(), 12398.0, max_relative = 1e-12);
        assert!(Hxrd::new(Vector3::y(), Vector3::z(), Radiation::Energy(-1.0)).is_err());
    }

    #[test]
    fn test_parallel_directions_rejected() {
        let res = Hxrd::new(Vector3::z(), Vector3::new(0.0, 0.0, -2.0), Radiation::default());
        assert_eq!(res.unwrap_err(), ConversionError::LinearlyDependentDirections);
    }

    #[test]
    fn test_non_perpendicular_inplane_is_projected() {
        let exp = Hxrd::new(
            Vector3::new(0.0, 1.0, 1.0),
            Vector3::z(),
            Radiation::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(*exp.inplane_direction(), Vector3::y(), epsilon = 1e-12);

        // 负的点积同样投影
        let exp = Hxrd::new(
            Vector3::new(1.0, 0.0, -1.0),
            Vector3::z(),
            Radiation::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(*exp.inplane_direction(), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_transform_rows() {
        let exp = Hxrd::new(Vector3::x(), Vector3::z(), Radiation::default()).unwrap();
        // v1 = z × x = y
        let v = exp.transform(&Vector3::new(1.0, 2.0, 3.0));
        assert_abs_diff_eq!(v, Vector3::new(2.0, 1.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_failed_reorientation_keeps_state() {
        let mut exp = hxrd();
        assert!(exp.set_normal_direction(Vector3::y()).is_err());
        assert_eq!(*exp.normal_direction(), Vector3::z());
        exp.set_inplane_direction(Vector3::x()).unwrap();
        assert_abs_diff_eq!(
            exp.transform(&Vector3::x()),
            Vector3::new(0.0, 1.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_tilt_angle() {
        let exp = hxrd();
        assert_abs_diff_eq!(
            exp.tilt_angle(&Vector3::new(0.0, 1.0, 1.0), true),
            45.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_geometry_mode_parsing() {
        assert_eq!("hi_lo".parse::<ScatteringGeometry>(), Ok(ScatteringGeometry::HiLo));
        assert_eq!("lo_hi".parse::<ScatteringGeometry>(), Ok(ScatteringGeometry::LoHi));
        assert!(matches!(
            "high_low".parse::<ScatteringGeometry>(),
            Err(ConversionError::InvalidGeometryMode(_))
        ));
        let g: ScatteringGeometry = serde_json::from_str("\"lo_hi\"").unwrap();
        assert_eq!(g, ScatteringGeometry::LoHi);
    }

    #[test]
    fn test_hxrd_round_trip_grid() {
        for geometry in [ScatteringGeometry::HiLo, ScatteringGeometry::LoHi] {
            let exp = hxrd().with_geometry(geometry);
            for om in (1u32..90).step_by(7).map(f64::from) {
                for tth in (1u32..90).step_by(11).map(f64::from) {
                    let q = exp
                        .angle_to_q(
                            &[AngleValues::from(om)],
                            &[AngleValues::from(tth)],
                            &ConversionOptions::default(),
                        )
                        .unwrap();
                    let [delta, om_back, tth_back] =
                        exp.q_to_angle(&q.as_slice()[0], &QToAngleOptions::default());

                    let expected_om = match geometry {
                        ScatteringGeometry::HiLo => om.max(tth - om),
                        ScatteringGeometry::LoHi => om.min(tth - om),
                    };
                    assert_abs_diff_eq!(delta, 0.0, epsilon = 1e-9);
                    assert_abs_diff_eq!(tth_back, tth, epsilon = 1e-9);
                    assert_abs_diff_eq!(om_back, expected_om, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_coplanar_q_with_delta_round_trip() {
        let exp = hxrd();
        let q = exp.coplanar_q(40.0, 50.0, 30.0, true);
        let [delta, om, tth] = exp.q_to_angle(&q, &QToAngleOptions::default().without_transform());
        assert_abs_diff_eq!(delta, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(om, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tth, 50.0, epsilon = 1e-9);

        let rad = exp.q_to_angle(
            &q,
            &QToAngleOptions::default().without_transform().radians(),
        );
        assert_abs_diff_eq!(rad[1], 40f64.to_radians(), epsilon = 1e-9);
    }

    #[test]
    fn test_geometry_override_is_per_call() {
        let exp = hxrd();
        let q = exp.coplanar_q(30.0, 40.0, 0.0, true);
        let lo_hi = QToAngleOptions::default().with_geometry(ScatteringGeometry::LoHi);
        assert_abs_diff_eq!(exp.q_to_angle(&q, &lo_hi)[1], 10.0, epsilon = 1e-9);
        assert_eq!(exp.geometry(), ScatteringGeometry::HiLo);
        assert_abs_diff_eq!(
            exp.q_to_angle(&q, &QToAngleOptions::default())[1],
            30.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_hxrd_unreachable_gives_nan() {
        let exp = hxrd();
        let too_long = Vector3::new(0.0, 0.0, 3.0 * exp.k0());
        let angles = exp.q_to_angle(&too_long, &QToAngleOptions::default());
        assert!(angles[2].is_nan());
    }

    #[test]
    fn test_gid_inplane_tolerance() {
        let exp = Gid::new(Vector3::y(), Vector3::z(), Radiation::default()).unwrap();
        let opts = QToAngleOptions::default();
        assert!(exp.q_to_angle(&Vector3::new(0.5, 2.0, 0.000999), &opts).is_ok());
        assert!(exp.q_to_angle(&Vector3::new(0.5, 2.0, -0.000999), &opts).is_ok());
        for qz in [0.001, -0.001, 0.5] {
            assert!(matches!(
                exp.q_to_angle(&Vector3::new(0.5, 2.0, qz), &opts),
                Err(ConversionError::UnreachableReflection { .. })
            ));
        }
    }

    #[test]
    fn test_gid_angles() {
        let exp = Gid::new(Vector3::y(), Vector3::z(), Radiation::default()).unwrap();
        let q = Vector3::new(0.0, 2.0, 0.0);
        let [om, tth] = exp
            .q_to_angle(&q, &QToAngleOptions::default().without_transform().radians())
            .unwrap();
        let expected_tth = 2.0 * (1.0 / exp.k0()).asin();
        assert_abs_diff_eq!(tth, expected_tth, epsilon = 1e-12);
        assert_abs_diff_eq!(om, FRAC_PI_2 + expected_tth / 2.0, epsilon = 1e-12);
        assert_eq!(exp.engine().sample_circles().to_string(), "z-x+");
        assert_eq!(exp.engine().detector_circles().to_string(), "x+z-");
    }

    #[test]
    fn test_gid_azimuth_quadrants() {
        let exp = Gid::new(Vector3::y(), Vector3::z(), Radiation::default()).unwrap();
        let opts = QToAngleOptions::default().without_transform().radians();
        // 所有 Q 长度相同 (√3)，只有方位角不同
        let half = 1.5f64.sqrt();
        let tth = 2.0 * (3f64.sqrt() / 2.0 / exp.k0()).asin();
        for (qx, qy, aref) in [
            (half, half, PI / 4.0),
            (half, -half, 3.0 * PI / 4.0),
            (-half, -half, -3.0 * PI / 4.0),
            (-half, half, -PI / 4.0),
            (3f64.sqrt(), 0.0, FRAC_PI_2),
        ] {
            let [om, tth_back] = exp.q_to_angle(&Vector3::new(qx, qy, 0.0), &opts).unwrap();
            assert_abs_diff_eq!(tth_back, tth, epsilon = 1e-12);
            assert_abs_diff_eq!(om, FRAC_PI_2 + aref + tth / 2.0, epsilon = 1e-12);
        }

        let [om_deg, _] = exp
            .q_to_angle(
                &Vector3::new(half, -half, 0.0),
                &QToAngleOptions::default().without_transform(),
            )
            .unwrap();
        assert_abs_diff_eq!(om_deg, 90.0 + 135.0 + tth.to_degrees() / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gid_id10b_layout() {
        let exp = GidId10b::new(Vector3::y(), Vector3::z(), Radiation::Wavelength(1.0)).unwrap();
        assert_eq!(exp.engine().sample_circles().to_string(), "x+z-");
        assert_eq!(exp.engine().detector_circles().to_string(), "x+z-");
        assert_relative_eq!(exp.engine().wavelength(), 1.0);
        let zero = AngleValues::from(0.0);
        let q = exp
            .angle_to_q(
                &[zero.clone(), zero.clone()],
                &[zero.clone(), zero],
                &ConversionOptions::default(),
            )
            .unwrap();
        assert_abs_diff_eq!(q.as_slice()[0], Vector3::zeros(), epsilon = 1e-14);
        assert!(exp.to_string().starts_with("GID (ID10B) geometry"));
    }

    #[test]
    fn test_gid_uses_transformed_qz() {
        // 表面法线沿 y：实验室 y 分量变成 Qz
        let exp = Gid::new(Vector3::z(), Vector3::y(), Radiation::default()).unwrap();
        let q = Vector3::new(0.3, 1.0, 2.0);
        assert!(exp.q_to_angle(&q, &QToAngleOptions::default()).is_err());
        assert!(exp
            .q_to_angle(&q, &QToAngleOptions::default().without_transform())
            .is_err());
        let inplane = Vector3::new(0.3, 0.0, 2.0);
        assert!(exp.q_to_angle(&inplane, &QToAngleOptions::default()).is_ok());
    }

    #[test]
    fn test_summary() {
        let s = hxrd().to_string();
        assert!(s.starts_with("HXRD geometry: hi_lo"));
        assert!(s.contains("surface normal: (0.000000 0.000000 1.000000)"));
        assert!(s.contains("wavelength: 1.540600 (Angstrom)"));
        assert!(s.contains("sample geometry(1): x+"));
    }
}
