//! Single-texture analysis flow.
//!
//! ```text
//! PixelBuffer ─► sample ─► (normal map: detect layout ─► renormalize)
//!                       ─► extract ─► strategy score ─► divisor ─► resolution
//!                                                   └─► format decision
//! ```

use crate::alpha::{has_meaningful_alpha, ProcessedPixelData};
use crate::complexity_strategy::{create_analyzer, ComplexityAnalyzer, ComplexityResult};
use crate::config::AnalysisConfig;
use crate::diagnostics::Notice;
use crate::divisor::{recommended_divisor, recommended_resolution};
use crate::format_selector::{resolve_format, FormatDecision, FormatRequest, Platform, TextureFormat};
use crate::normal_map::{detect_layout, renormalize_pixel, NormalMapAnalyzer, SourceLayout};
use crate::pixel::{PixelBuffer, Rgba};
use crate::sampling::sample_if_needed;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// Key of a texture in batch results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureId(pub String);

impl TextureId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TextureId {
    fn from(s: &str) -> Self {
        TextureId(s.to_string())
    }
}

impl From<String> for TextureId {
    fn from(s: String) -> Self {
        TextureId(s)
    }
}

/// Per-texture user settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    pub format_override: Option<TextureFormat>,
    pub skip: bool,
}

#[derive(Debug, Clone)]
pub struct TextureInput {
    pub id: TextureId,
    pub pixels: PixelBuffer,
    pub is_normal_map: bool,
    pub is_emission: bool,
    pub source_format: Option<TextureFormat>,
    /// `None` computes alpha presence from the pixels.
    pub has_alpha: Option<bool>,
    pub settings: TextureSettings,
}

impl TextureInput {
    pub fn new(id: impl Into<TextureId>, pixels: PixelBuffer) -> Self {
        Self {
            id: id.into(),
            pixels,
            is_normal_map: false,
            is_emission: false,
            source_format: None,
            has_alpha: None,
            settings: TextureSettings::default(),
        }
    }

    pub fn normal_map(mut self) -> Self {
        self.is_normal_map = true;
        self
    }

    pub fn emission(mut self) -> Self {
        self.is_emission = true;
        self
    }

    pub fn with_source_format(mut self, format: TextureFormat) -> Self {
        self.source_format = Some(format);
        self
    }

    pub fn with_alpha(mut self, has_alpha: bool) -> Self {
        self.has_alpha = Some(has_alpha);
        self
    }

    pub fn with_settings(mut self, settings: TextureSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub normalized_complexity: f64,
    pub recommended_divisor: u32,
    pub recommended_resolution: (u32, u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureRecommendation {
    pub id: TextureId,
    pub source_resolution: (u32, u32),
    pub analysis: AnalysisResult,
    pub strategy: &'static str,
    pub summary: String,
    pub has_alpha: bool,
    pub format: FormatDecision,
    /// Detected packing, normal maps only.
    pub layout: Option<SourceLayout>,
}

impl TextureRecommendation {
    pub fn estimated_size_bytes(&self) -> u64 {
        let (w, h) = self.analysis.recommended_resolution;
        self.format.format.estimated_size_bytes(w, h)
    }
}

/// Analyzers built once from a config and shared by every texture.
pub struct TextureAnalyzer {
    config: AnalysisConfig,
    color: Box<dyn ComplexityAnalyzer>,
    normal: NormalMapAnalyzer,
}

impl TextureAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let color = create_analyzer(config.strategy, &config.weights);
        let normal = NormalMapAnalyzer::new(config.normal_map_weights);
        Self {
            config,
            color,
            normal,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Scores `input` and decides divisor, resolution and format. Problems
    /// worth surfacing come back as notices for the caller's diagnostics.
    pub fn analyze(&self, input: &TextureInput) -> (TextureRecommendation, Vec<Notice>) {
        let config = &self.config;
        let mut notices = Vec::new();
        let (width, height) = (input.pixels.width(), input.pixels.height());

        if input.pixels.is_empty() {
            notices.push(Notice::for_texture(
                input.id.as_str(),
                "texture has no pixels; treated as flat",
            ));
        }
        if config.format.platform == Platform::Auto {
            notices.push(Notice::once(
                "auto-platform",
                format!("platform Auto resolved to {:?}", Platform::Auto.resolve()),
            ));
        }

        let sampled = sample_if_needed(input.pixels.pixels(), width, height);
        let source_alpha = input
            .has_alpha
            .unwrap_or_else(|| has_meaningful_alpha(input.pixels.pixels()));

        let (result, strategy, layout, has_alpha) = if input.is_normal_map {
            let format = input.source_format.unwrap_or(TextureFormat::Rgba32);
            let layout = detect_layout(format, &input.pixels);
            let pixels: Cow<'_, [Rgba]> = if config.renormalize_normal_maps {
                Cow::Owned(sampled.pixels.iter().map(|&p| renormalize_pixel(p, layout)).collect())
            } else {
                Cow::Borrowed(&sampled.pixels[..])
            };
            let data = ProcessedPixelData::from_all_pixels(&pixels, sampled.width, sampled.height)
                .with_flags(true, input.is_emission);
            // Renormalized maps are written fully opaque.
            let has_alpha = if config.renormalize_normal_maps {
                false
            } else {
                source_alpha || layout.carries_data_in_alpha()
            };
            (self.normal.analyze(&data), self.normal.name(), Some(layout), has_alpha)
        } else {
            let data = ProcessedPixelData::from_pixels(&sampled.pixels, sampled.width, sampled.height)
                .with_flags(false, input.is_emission);
            (self.color.analyze(&data), self.color.name(), None, source_alpha)
        };

        let analysis = self.analysis_result(&result, width, height);
        let format = resolve_format(
            &FormatRequest {
                is_normal_map: input.is_normal_map,
                complexity: result.score,
                has_alpha,
                source_format: input.source_format,
                format_override: input.settings.format_override,
            },
            &config.format,
        );

        let mut summary = result.summary;
        if input.is_emission {
            summary.push_str(" [emission]");
        }
        if let Some(layout) = layout {
            summary.push_str(&format!(" [layout {layout}]"));
        }

        debug!(
            texture = %input.id,
            score = analysis.normalized_complexity,
            divisor = analysis.recommended_divisor,
            format = %format.format,
            "Texture analyzed"
        );

        (
            TextureRecommendation {
                id: input.id.clone(),
                source_resolution: (width, height),
                analysis,
                strategy,
                summary,
                has_alpha,
                format,
                layout,
            },
            notices,
        )
    }

    fn analysis_result(&self, result: &ComplexityResult, width: u32, height: u32) -> AnalysisResult {
        let config = &self.config;
        let divisor = recommended_divisor(
            result.score,
            config.low_threshold,
            config.high_threshold,
            config.min_divisor,
            config.max_divisor,
        );
        AnalysisResult {
            normalized_complexity: result.score,
            recommended_divisor: divisor,
            recommended_resolution: recommended_resolution(width, height, divisor, &config.resolution),
        }
    }
}

/// One-off convenience over [`TextureAnalyzer`].
pub fn analyze_texture(input: &TextureInput, config: &AnalysisConfig) -> TextureRecommendation {
    TextureAnalyzer::new(config.clone()).analyze(input).0
}
