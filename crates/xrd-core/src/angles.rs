//! 角度输入与批处理
//!
//! 每个圆的角度可以是标量或序列：
//! - 所有序列必须等长 (N)
//! - 标量被广播到 N
//! - 对齐偏移 `delta` 在使用前减去
//! - 角度制输入在合成旋转之前只转换一次弧度

use crate::error::{ConversionError, Result};

/// 单个圆的角度值
#[derive(Debug, Clone, PartialEq)]
pub enum AngleValues {
    Scalar(f64),
    Array(Vec<f64>),
}

impl AngleValues {
    fn batch_len(&self) -> Option<usize> {
        match self {
            AngleValues::Scalar(_) => None,
            AngleValues::Array(v) => Some(v.len()),
        }
    }

    fn value(&self, i: usize) -> f64 {
        match self {
            AngleValues::Scalar(v) => *v,
            AngleValues::Array(v) => v[i],
        }
    }
}

impl From<f64> for AngleValues {
    fn from(v: f64) -> Self {
        AngleValues::Scalar(v)
    }
}

impl From<Vec<f64>> for AngleValues {
    fn from(v: Vec<f64>) -> Self {
        AngleValues::Array(v)
    }
}

impl From<&[f64]> for AngleValues {
    fn from(v: &[f64]) -> Self {
        AngleValues::Array(v.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for AngleValues {
    fn from(v: [f64; N]) -> Self {
        AngleValues::Array(v.to_vec())
    }
}

/// 转换选项
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    /// 每个圆的对齐偏移（样品圆在前），实际使用的角度为 `angle - delta`
    pub delta: Option<Vec<f64>>,
    /// 覆盖引擎配置的波长（Å）
    pub wavelength: Option<f64>,
    /// 输入是否为角度制
    pub degrees: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            delta: None,
            wavelength: None,
            degrees: true,
        }
    }
}

impl ConversionOptions {
    pub fn with_delta(mut self, delta: Vec<f64>) -> Self {
        self.delta = Some(delta);
        self
    }

    pub fn with_wavelength(mut self, wavelength: f64) -> Self {
        self.wavelength = Some(wavelength);
        self
    }

    pub fn radians(mut self) -> Self {
        self.degrees = false;
        self
    }
}

/// 整理好的一批角度（弧度），按测角仪位置逐行存放
#[derive(Debug, Clone, PartialEq)]
pub struct AngleBatch {
    /// 测角仪位置数 N
    pub points: usize,
    /// 样品圆角度，`points × n_sample` 行优先
    pub sample: Vec<f64>,
    /// 探测器圆角度，`points × n_detector` 行优先
    pub detector: Vec<f64>,
}

impl AngleBatch {
    /// 校验并整理输入角度
    pub fn prepare(
        sample: &[AngleValues],
        detector: &[AngleValues],
        n_sample: usize,
        n_detector: usize,
        options: &ConversionOptions,
    ) -> Result<Self> {
        if sample.len() != n_sample {
            return Err(ConversionError::MismatchedArgumentCount {
                group: "sample",
                expected: n_sample,
                got: sample.len(),
            });
        }
        if detector.len() != n_detector {
            return Err(ConversionError::MismatchedArgumentCount {
                group: "detector",
                expected: n_detector,
                got: detector.len(),
            });
        }

        let n_circles = n_sample + n_detector;
        let delta = match &options.delta {
            Some(d) if d.len() != n_circles => {
                return Err(ConversionError::MismatchedDeltaLength {
                    expected: n_circles,
                    got: d.len(),
                })
            }
            Some(d) => d.clone(),
            None => vec![0.0; n_circles],
        };

        let all: Vec<&AngleValues> = sample.iter().chain(detector).collect();
        let points = Self::common_length(&all)?;

        let scale = if options.degrees {
            std::f64::consts::PI / 180.0
        } else {
            1.0
        };
        let gather = |values: &[&AngleValues], deltas: &[f64]| -> Result<Vec<f64>> {
            let mut out = Vec::with_capacity(points * values.len());
            for i in 0..points {
                for (v, d) in values.iter().zip(deltas) {
                    let angle = v.value(i) - d;
                    if !angle.is_finite() {
                        return Err(ConversionError::InvalidInput(format!(
                            "non-finite angle at position {}",
                            i
                        )));
                    }
                    out.push(angle * scale);
                }
            }
            Ok(out)
        };

        Ok(Self {
            points,
            sample: gather(&all[..n_sample], &delta[..n_sample])?,
            detector: gather(&all[n_sample..], &delta[n_sample..])?,
        })
    }

    /// 所有序列的公共长度；全为标量时为 1
    fn common_length(values: &[&AngleValues]) -> Result<usize> {
        let mut len: Option<usize> = None;
        for n in values.iter().filter_map(|v| v.batch_len()) {
            if n == 0 {
                return Err(ConversionError::InvalidInput(
                    "empty angle sequence".to_string(),
                ));
            }
            match len {
                None => len = Some(n),
                Some(expected) if expected != n => {
                    return Err(ConversionError::MismatchedBatchLength { expected, got: n })
                }
                _ => {}
            }
        }
        Ok(len.unwrap_or(1))
    }

    /// 第 i 个测角仪位置的样品圆角度
    pub fn sample_row(&self, i: usize, n_sample: usize) -> &[f64] {
        &self.sample[i * n_sample..(i + 1) * n_sample]
    }

    /// 第 i 个测角仪位置的探测器圆角度
    pub fn detector_row(&self, i: usize, n_detector: usize) -> &[f64] {
        &self.detector[i * n_detector..(i + 1) * n_detector]
    }
}
