//! XRD 核心转换引擎
//!
//! 把测角仪角度（样品圆 + 探测器圆）转换为倒易空间坐标 Q，
//! 并为共面高角衍射 (HXRD) 和掠入射衍射 (GID) 提供逆向角度计算。
//!
//! # 架构设计
//!
//! 自底向上分为几层：
//! - `axis`: 圆描述符 `"x+"`、`"z-"` 的解析和旋转矩阵
//! - `rotation`: 按嵌套顺序合成多个圆的旋转
//! - `detector`: 线阵/面阵探测器的像素几何（ROI、通道平均）
//! - `qconversion`: 点/线阵/面阵三种模式的批量转换
//! - `experiment`: 样品取向、X 射线能量、HXRD/GID 逆向计算
//! - `config`: JSON 配置
//!
//! # 示例
//!
//! ```rust
//! use xrd_core::prelude::*;
//!
//! // 一个样品圆 (ω)，一个探测器圆 (2θ)，主光束沿 y
//! let qc = QConversion::new(&["x+"], &["x+"], Vector3::new(0.0, 1.0, 0.0))?;
//!
//! let q = qc.point(
//!     &[AngleValues::from(vec![10.0, 20.0])],
//!     &[AngleValues::from(40.0)],
//!     &ConversionOptions::default(),
//! )?;
//! println!("qz: {:?}", q.qz());
//! # Ok::<(), xrd_core::error::ConversionError>(())
//! ```

pub mod angles;
pub mod axis;
pub mod config;
pub mod detector;
pub mod error;
pub mod experiment;
pub mod math;
pub mod qconversion;
pub mod rotation;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::angles::{AngleValues, ConversionOptions};
    pub use crate::axis::{Axis, Circle, Sense};
    pub use crate::config::{ConfiguredExperiment, ExperimentConfig, GoniometerConfig};
    pub use crate::detector::{AreaDetector, LinearDetector, PixelAxis, PixelPitch};
    pub use crate::error::{ConfigError, ConversionError, ErrorKind};
    pub use crate::experiment::{
        Experiment, Gid, GidId10b, Hxrd, QToAngleOptions, Radiation, ScatteringGeometry,
    };
    pub use crate::math::{CoordinateTransform, Matrix3, Vector3};
    pub use crate::qconversion::{AreaOptions, LinearOptions, QConversion, QPositions};
    pub use crate::rotation::CircleChain;
}
