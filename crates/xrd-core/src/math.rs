//! 数学基础类型与坐标变换

use crate::error::{ConversionError, Result};
use nalgebra::{Rotation3, Unit};

pub type Vector3 = nalgebra::Vector3<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// 方向判断容差（平行、正交）
pub const EPSILON: f64 = 1e-7;

/// 绕任意单位轴旋转的矩阵（右手定则）
pub fn axis_angle(axis: &Unit<Vector3>, angle: f64) -> Matrix3 {
    Rotation3::from_axis_angle(axis, angle).into_inner()
}

/// 两个向量之间的夹角
pub fn vec_angle(a: &Vector3, b: &Vector3, degrees: bool) -> f64 {
    let cos = (a.dot(b) / (a.norm() * b.norm())).clamp(-1.0, 1.0);
    let angle = cos.acos();
    if degrees {
        angle.to_degrees()
    } else {
        angle
    }
}

/// 检查向量的每个分量都是有限值且长度非零，返回单位向量
pub fn unit_or_err(v: &Vector3, what: &str) -> Result<Unit<Vector3>> {
    if !v.iter().all(|c| c.is_finite()) {
        return Err(ConversionError::InvalidInput(format!(
            "{} contains non-finite components",
            what
        )));
    }
    Unit::try_new(*v, f64::EPSILON)
        .ok_or_else(|| ConversionError::InvalidInput(format!("{} has zero length", what)))
}

/// 坐标变换
///
/// 矩阵的行是新坐标系的三个基向量（已归一化），
/// 对向量 `v` 的变换为 `M·v`。
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateTransform {
    matrix: Matrix3,
    inverse: Option<Matrix3>,
}

impl CoordinateTransform {
    /// 由三个新基向量构造
    pub fn new(v1: Vector3, v2: Vector3, v3: Vector3) -> Result<Self> {
        let e1 = unit_or_err(&v1, "base vector 1")?;
        let e2 = unit_or_err(&v2, "base vector 2")?;
        let e3 = unit_or_err(&v3, "base vector 3")?;
        let matrix = Matrix3::from_rows(&[
            e1.into_inner().transpose(),
            e2.into_inner().transpose(),
            e3.into_inner().transpose(),
        ]);
        Ok(Self::from_matrix(matrix))
    }

    /// 由任意矩阵构造；奇异矩阵没有逆变换
    pub fn from_matrix(matrix: Matrix3) -> Self {
        Self {
            matrix,
            inverse: matrix.try_inverse(),
        }
    }

    pub fn matrix(&self) -> &Matrix3 {
        &self.matrix
    }

    /// 变换一个向量
    pub fn apply(&self, v: &Vector3) -> Vector3 {
        self.matrix * v
    }

    /// 逆变换
    pub fn apply_inverse(&self, v: &Vector3) -> Option<Vector3> {
        self.inverse.map(|m| m * v)
    }

    /// 变换二阶张量：`b_ij = m_ik m_jl p_kl`
    pub fn apply_tensor2(&self, p: &Matrix3) -> Matrix3 {
        self.matrix * p * self.matrix.transpose()
    }
}

impl std::fmt::Display for CoordinateTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Transformation matrix:")?;
        for row in self.matrix.row_iter() {
            writeln!(f, "{:.6} {:.6} {:.6}", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}
