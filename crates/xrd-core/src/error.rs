//! 转换错误定义

use thiserror::Error;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 配置阶段错误，不会破坏已有的引擎状态
    Configuration,
    /// 单次调用的参数校验失败，不产生部分结果
    Validation,
    /// 几何上无法到达的倒易空间点
    Domain,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Invalid axis syntax: {0:?} (expected [xyz][+-])")]
    InvalidAxisSyntax(String),

    #[error("Missing mandatory parameter: {0}")]
    MissingMandatoryParameter(String),

    #[error("Ambiguous pixel pitch: give either distance and pixel width or channels per degree")]
    AmbiguousPixelPitch,

    #[error("Invalid detector direction: {0}")]
    InvalidDetectorDirection(String),

    #[error("Inplane direction is parallel to the surface normal")]
    LinearlyDependentDirections,

    #[error("Invalid scattering geometry: {0:?} (expected \"hi_lo\" or \"lo_hi\")")]
    InvalidGeometryMode(String),

    #[error("{0} detector not initialized")]
    NotInitialized(&'static str),

    #[error("Wrong number of {group} angles: expected {expected}, got {got}")]
    MismatchedArgumentCount {
        group: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Angle arrays have different lengths: {expected} and {got}")]
    MismatchedBatchLength { expected: usize, got: usize },

    #[error("Delta has {got} entries, expected one per circle ({expected})")]
    MismatchedDeltaLength { expected: usize, got: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Reflection not reachable in GID geometry (qz = {qz})")]
    UnreachableReflection { qz: f64 },
}

impl ConversionError {
    /// 错误所属类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::InvalidAxisSyntax(_)
            | ConversionError::MissingMandatoryParameter(_)
            | ConversionError::AmbiguousPixelPitch
            | ConversionError::InvalidDetectorDirection(_)
            | ConversionError::LinearlyDependentDirections
            | ConversionError::InvalidGeometryMode(_)
            | ConversionError::NotInitialized(_) => ErrorKind::Configuration,
            ConversionError::MismatchedArgumentCount { .. }
            | ConversionError::MismatchedBatchLength { .. }
            | ConversionError::MismatchedDeltaLength { .. }
            | ConversionError::InvalidInput(_) => ErrorKind::Validation,
            ConversionError::UnreachableReflection { .. } => ErrorKind::Domain,
        }
    }
}

/// 配置文件加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Conversion setup error: {0}")]
    Conversion(#[from] ConversionError),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
