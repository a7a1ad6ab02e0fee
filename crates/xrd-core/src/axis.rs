//! 测角仪圆描述符解析
//!
//! 每个圆用两个字符描述：
//! - 旋转轴: `x`、`y` 或 `z`（实验室坐标系）
//! - 旋转方向: `+`（右手定则）或 `-`
//!
//! 例如 `"x+"`、`"z-"`。同样的语法也用于描述探测器像素的排列方向。

use crate::error::{ConversionError, Result};
use crate::math::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 实验室坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'x' => Some(Axis::X),
            'y' => Some(Axis::Y),
            'z' => Some(Axis::Z),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }

    /// 坐标轴的单位向量
    pub fn unit_vector(self) -> Vector3 {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

/// 旋转方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    Positive,
    Negative,
}

impl Sense {
    pub fn sign(self) -> f64 {
        match self {
            Sense::Positive => 1.0,
            Sense::Negative => -1.0,
        }
    }
}

/// 一个测角仪圆（或探测器方向）
///
/// 解析后不可变，非法输入在构造时立即报错。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Circle {
    pub axis: Axis,
    pub sense: Sense,
}

impl Circle {
    pub const fn new(axis: Axis, sense: Sense) -> Self {
        Self { axis, sense }
    }

    /// 解析描述符字符串
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let mut chars = trimmed.chars();
        let (Some(a), Some(s), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(ConversionError::InvalidAxisSyntax(input.to_string()));
        };

        let axis =
            Axis::from_char(a).ok_or_else(|| ConversionError::InvalidAxisSyntax(input.to_string()))?;
        let sense = match s {
            '+' => Sense::Positive,
            '-' => Sense::Negative,
            _ => return Err(ConversionError::InvalidAxisSyntax(input.to_string())),
        };

        Ok(Self { axis, sense })
    }

    /// 解析一组描述符，任何一个非法即整体失败
    pub fn parse_list<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Self>> {
        inputs.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    /// 给定角度（弧度）的旋转矩阵
    pub fn rotation(&self, angle: f64) -> Matrix3 {
        let (s, c) = (self.sense.sign() * angle).sin_cos();
        match self.axis {
            Axis::X => Matrix3::new(
                1.0, 0.0, 0.0, //
                0.0, c, -s, //
                0.0, s, c,
            ),
            Axis::Y => Matrix3::new(
                c, 0.0, s, //
                0.0, 1.0, 0.0, //
                -s, 0.0, c,
            ),
            Axis::Z => Matrix3::new(
                c, -s, 0.0, //
                s, c, 0.0, //
                0.0, 0.0, 1.0,
            ),
        }
    }

    /// 带符号的方向向量（用于探测器安装方向）
    pub fn unit_vector(&self) -> Vector3 {
        self.axis.unit_vector() * self.sense.sign()
    }
}

impl FromStr for Circle {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Circle {
    type Error = ConversionError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Circle> for String {
    fn from(c: Circle) -> Self {
        c.to_string()
    }
}

impl std::fmt::Display for Circle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = match self.sense {
            Sense::Positive => '+',
            Sense::Negative => '-',
        };
        write!(f, "{}{}", self.axis.as_char(), sign)
    }
}
