//! 旋转合成
//!
//! 按照测角仪摇篮由外到内的嵌套顺序合成旋转矩阵：
//! 列表中的第一个圆是最外层，`R = R₁·R₂·…·Rₙ`。

use crate::axis::Circle;
use crate::error::{ConversionError, Result};
use crate::math::Matrix3;

/// 有序的测角仪圆序列
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CircleChain {
    circles: Vec<Circle>,
}

impl CircleChain {
    pub fn new(circles: Vec<Circle>) -> Self {
        Self { circles }
    }

    /// 从描述符字符串解析
    pub fn parse<S: AsRef<str>>(descriptors: &[S]) -> Result<Self> {
        Ok(Self::new(Circle::parse_list(descriptors)?))
    }

    pub fn len(&self) -> usize {
        self.circles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }

    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    /// 合成一组角度（弧度）对应的旋转矩阵
    pub fn compose(&self, angles: &[f64]) -> Result<Matrix3> {
        if angles.len() != self.circles.len() {
            return Err(ConversionError::MismatchedArgumentCount {
                group: "circle",
                expected: self.circles.len(),
                got: angles.len(),
            });
        }
        Ok(self.compose_unchecked(angles))
    }

    /// 调用方已保证长度一致
    pub(crate) fn compose_unchecked(&self, angles: &[f64]) -> Matrix3 {
        self.circles
            .iter()
            .zip(angles)
            .fold(Matrix3::identity(), |acc, (circle, &angle)| {
                acc * circle.rotation(angle)
            })
    }

    /// 批量合成
    ///
    /// `columns[j]` 是第 j 个圆的 N 个角度，返回 N 个矩阵。
    pub fn compose_batch(&self, columns: &[Vec<f64>]) -> Result<Vec<Matrix3>> {
        if columns.len() != self.circles.len() {
            return Err(ConversionError::MismatchedArgumentCount {
                group: "circle",
                expected: self.circles.len(),
                got: columns.len(),
            });
        }
        let n = columns.first().map_or(1, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != n) {
            return Err(ConversionError::MismatchedBatchLength {
                expected: n,
                got: bad.len(),
            });
        }

        let mut row = vec![0.0; self.circles.len()];
        Ok((0..n)
            .map(|i| {
                for (slot, column) in row.iter_mut().zip(columns) {
                    *slot = column[i];
                }
                self.compose_unchecked(&row)
            })
            .collect())
    }
}

impl std::fmt::Display for CircleChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in &self.circles {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
