//! Texture complexity analysis and adaptive compression decisions.
//!
//! This crate provides the decision engine behind texture optimization:
//! - Pixel sampling and alpha-aware grayscale extraction
//! - Image-math metrics (Sobel, spatial frequency, DCT, GLCM, entropy)
//! - Interchangeable complexity strategies and a normal-map analyzer
//! - Score to downscale divisor and target resolution mapping
//! - Normal-map channel-layout detection and renormalization
//! - Platform-aware compressed format selection with codec fallback
//! - Parallel batch analysis, configuration and logging setup

pub mod alpha;
pub mod batch;
pub mod complexity_strategy;
pub mod config;
pub mod diagnostics;
pub mod divisor;
pub mod errors;
pub mod format_selector;
pub mod image_math;
pub mod logging;
pub mod normal_map;
pub mod normalize;
pub mod pipeline;
pub mod pixel;
pub mod sampling;

pub use alpha::{extract_opaque_pixels, ProcessedPixelData};
pub use batch::{analyze_batch, collect_files, BatchReport, IMAGE_EXTENSIONS};
pub use complexity_strategy::{
    create_analyzer, ComplexityAnalyzer, ComplexityResult, StrategyKind, StrategyWeights,
};
pub use config::AnalysisConfig;
pub use diagnostics::{Diagnostics, Notice};
pub use divisor::{recommended_divisor, recommended_resolution, ResolutionPolicy, ResolutionRounding};
pub use errors::{Result, TextureError};
pub use format_selector::{
    apply_format, resolve_format, select_format, CompressionOutcome, FormatDecision, FormatPolicy,
    FormatSource, Platform, TextureCodec, TextureFormat,
};
pub use normal_map::{detect_layout, preprocess_normal_map, NormalMapAnalyzer, SourceLayout};
pub use normalize::normalize;
pub use pipeline::{
    analyze_texture, AnalysisResult, TextureAnalyzer, TextureId, TextureInput,
    TextureRecommendation, TextureSettings,
};
pub use pixel::{PixelBuffer, Rgba};
pub use sampling::sample_if_needed;
