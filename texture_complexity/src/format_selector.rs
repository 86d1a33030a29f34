//! Compressed Format Selection
//!
//! Chooses a GPU pixel format from platform, complexity, normal-map-ness and
//! alpha presence. Explicit overrides win, already-compressed sources are
//! kept, and codec failures get one retry against a conservative format.

use crate::errors::Result;
use crate::pixel::PixelBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Opaque mobile textures at or above `high_quality_threshold * MEDIUM_COMPLEXITY_RATIO`
/// get the medium block size.
pub const MEDIUM_COMPLEXITY_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    Rgba32,
    Rgb24,
    Rg16,
    R8,
    Bc1,
    Bc3,
    Bc4,
    Bc5,
    Bc7,
    Etc2Rgb,
    Etc2Rgba,
    Astc4x4,
    Astc5x5,
    Astc6x6,
    Astc8x8,
}

impl TextureFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextureFormat::Rgba32 => "RGBA32",
            TextureFormat::Rgb24 => "RGB24",
            TextureFormat::Rg16 => "RG16",
            TextureFormat::R8 => "R8",
            TextureFormat::Bc1 => "BC1 (DXT1)",
            TextureFormat::Bc3 => "BC3 (DXT5)",
            TextureFormat::Bc4 => "BC4",
            TextureFormat::Bc5 => "BC5",
            TextureFormat::Bc7 => "BC7",
            TextureFormat::Etc2Rgb => "ETC2 RGB",
            TextureFormat::Etc2Rgba => "ETC2 RGBA",
            TextureFormat::Astc4x4 => "ASTC 4x4",
            TextureFormat::Astc5x5 => "ASTC 5x5",
            TextureFormat::Astc6x6 => "ASTC 6x6",
            TextureFormat::Astc8x8 => "ASTC 8x8",
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(
            self,
            TextureFormat::Rgba32 | TextureFormat::Rgb24 | TextureFormat::Rg16 | TextureFormat::R8
        )
    }

    /// Formats that only store two channels; normal maps in them are always RG.
    pub fn is_two_channel(&self) -> bool {
        matches!(self, TextureFormat::Bc5 | TextureFormat::Rg16)
    }

    pub fn has_alpha_channel(&self) -> bool {
        matches!(
            self,
            TextureFormat::Rgba32
                | TextureFormat::Bc3
                | TextureFormat::Bc7
                | TextureFormat::Etc2Rgba
                | TextureFormat::Astc4x4
                | TextureFormat::Astc5x5
                | TextureFormat::Astc6x6
                | TextureFormat::Astc8x8
        )
    }

    /// Storage cost, used for size estimates in reports.
    pub fn bits_per_pixel(&self) -> f64 {
        match self {
            TextureFormat::Rgba32 => 32.0,
            TextureFormat::Rgb24 => 24.0,
            TextureFormat::Rg16 => 16.0,
            TextureFormat::R8 | TextureFormat::Bc3 | TextureFormat::Bc5 | TextureFormat::Bc7 => 8.0,
            TextureFormat::Etc2Rgba | TextureFormat::Astc4x4 => 8.0,
            TextureFormat::Bc1 | TextureFormat::Bc4 | TextureFormat::Etc2Rgb => 4.0,
            TextureFormat::Astc5x5 => 128.0 / 25.0,
            TextureFormat::Astc6x6 => 128.0 / 36.0,
            TextureFormat::Astc8x8 => 2.0,
        }
    }

    pub fn estimated_size_bytes(&self, width: u32, height: u32) -> u64 {
        let bits = self.bits_per_pixel() * width as f64 * height as f64;
        (bits / 8.0).ceil() as u64
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TextureFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "rgba32" => Ok(TextureFormat::Rgba32),
            "rgb24" => Ok(TextureFormat::Rgb24),
            "rg16" => Ok(TextureFormat::Rg16),
            "r8" => Ok(TextureFormat::R8),
            "bc1" | "dxt1" => Ok(TextureFormat::Bc1),
            "bc3" | "dxt5" => Ok(TextureFormat::Bc3),
            "bc4" => Ok(TextureFormat::Bc4),
            "bc5" => Ok(TextureFormat::Bc5),
            "bc7" => Ok(TextureFormat::Bc7),
            "etc2rgb" => Ok(TextureFormat::Etc2Rgb),
            "etc2rgba" => Ok(TextureFormat::Etc2Rgba),
            "astc4x4" => Ok(TextureFormat::Astc4x4),
            "astc5x5" => Ok(TextureFormat::Astc5x5),
            "astc6x6" => Ok(TextureFormat::Astc6x6),
            "astc8x8" => Ok(TextureFormat::Astc8x8),
            _ => Err(format!("unknown texture format: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Desktop,
    Mobile,
    /// Mobile on Android/iOS build targets, desktop elsewhere.
    #[default]
    Auto,
}

impl Platform {
    pub fn resolve(self) -> Platform {
        match self {
            Platform::Auto if cfg!(any(target_os = "android", target_os = "ios")) => Platform::Mobile,
            Platform::Auto => Platform::Desktop,
            other => other,
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" | "pc" => Ok(Platform::Desktop),
            "mobile" => Ok(Platform::Mobile),
            "auto" => Ok(Platform::Auto),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatPolicy {
    pub platform: Platform,
    /// Use the high-quality format for textures at or above `high_quality_threshold`.
    pub prefer_high_quality: bool,
    pub high_quality_threshold: f64,
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self {
            platform: Platform::Auto,
            prefer_high_quality: true,
            high_quality_threshold: 0.7,
        }
    }
}

pub fn select_format(
    is_normal_map: bool,
    complexity: f64,
    has_alpha: bool,
    platform: Platform,
    policy: &FormatPolicy,
) -> TextureFormat {
    let high = complexity >= policy.high_quality_threshold;
    match platform.resolve() {
        Platform::Mobile => {
            if is_normal_map {
                TextureFormat::Astc4x4
            } else if has_alpha {
                if high {
                    TextureFormat::Astc4x4
                } else {
                    TextureFormat::Astc6x6
                }
            } else if high {
                TextureFormat::Astc4x4
            } else if complexity >= policy.high_quality_threshold * MEDIUM_COMPLEXITY_RATIO {
                TextureFormat::Astc6x6
            } else {
                TextureFormat::Astc8x8
            }
        }
        _ => {
            if is_normal_map {
                if has_alpha {
                    TextureFormat::Bc7
                } else {
                    TextureFormat::Bc5
                }
            } else if high && policy.prefer_high_quality {
                TextureFormat::Bc7
            } else if has_alpha {
                TextureFormat::Bc3
            } else {
                TextureFormat::Bc1
            }
        }
    }
}

/// Conservative format retried when the codec rejects the first choice.
pub fn fallback_format(platform: Platform) -> TextureFormat {
    match platform.resolve() {
        Platform::Mobile => TextureFormat::Astc6x6,
        _ => TextureFormat::Bc3,
    }
}

/// Per-texture inputs to [`resolve_format`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatRequest {
    pub is_normal_map: bool,
    pub complexity: f64,
    pub has_alpha: bool,
    pub source_format: Option<TextureFormat>,
    pub format_override: Option<TextureFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatSource {
    Override,
    PreservedSource,
    Selected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDecision {
    pub format: TextureFormat,
    pub source: FormatSource,
    pub platform: Platform,
    pub reason: String,
}

pub fn resolve_format(request: &FormatRequest, policy: &FormatPolicy) -> FormatDecision {
    let platform = policy.platform.resolve();

    if let Some(format) = request.format_override {
        return FormatDecision {
            format,
            source: FormatSource::Override,
            platform,
            reason: format!("explicit override to {format}"),
        };
    }

    if let Some(format) = request.source_format.filter(TextureFormat::is_compressed) {
        return FormatDecision {
            format,
            source: FormatSource::PreservedSource,
            platform,
            reason: format!("source already compressed as {format}"),
        };
    }

    let format = select_format(
        request.is_normal_map,
        request.complexity,
        request.has_alpha,
        platform,
        policy,
    );
    let kind = if request.is_normal_map { "normal map" } else { "texture" };
    let alpha = if request.has_alpha { "with alpha" } else { "opaque" };
    debug!(%format, ?platform, complexity = request.complexity, "Format selected");
    FormatDecision {
        format,
        source: FormatSource::Selected,
        platform,
        reason: format!(
            "{platform:?} {kind}, {alpha}, complexity {:.3}",
            request.complexity
        ),
    }
}

// ============================================================================
// Codec application
// ============================================================================

/// Block compressor that performs the actual encoding.
pub trait TextureCodec: Send + Sync {
    fn compress(&self, pixels: &PixelBuffer, format: TextureFormat) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompressionOutcome {
    Applied {
        format: TextureFormat,
        data: Vec<u8>,
    },
    FellBack {
        requested: TextureFormat,
        format: TextureFormat,
        data: Vec<u8>,
        error: String,
    },
    /// The texture is left in its pre-compression state.
    Failed {
        requested: TextureFormat,
        warning: String,
    },
}

impl CompressionOutcome {
    pub fn format(&self) -> Option<TextureFormat> {
        match self {
            CompressionOutcome::Applied { format, .. } | CompressionOutcome::FellBack { format, .. } => {
                Some(*format)
            }
            CompressionOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CompressionOutcome::Failed { .. })
    }
}

/// Compresses with `format`, retrying once with [`fallback_format`] on failure.
pub fn apply_format(
    codec: &dyn TextureCodec,
    id: &str,
    pixels: &PixelBuffer,
    format: TextureFormat,
    platform: Platform,
) -> CompressionOutcome {
    let first_error = match codec.compress(pixels, format) {
        Ok(data) => return CompressionOutcome::Applied { format, data },
        Err(e) => e,
    };

    let fallback = fallback_format(platform);
    if fallback == format {
        let warning = format!("{id}: {format} compression failed ({first_error}); texture left uncompressed");
        warn!(texture = id, %format, error = %first_error, "Compression failed");
        return CompressionOutcome::Failed {
            requested: format,
            warning,
        };
    }

    warn!(texture = id, %format, %fallback, error = %first_error, "Compression failed; retrying with fallback");
    match codec.compress(pixels, fallback) {
        Ok(data) => CompressionOutcome::FellBack {
            requested: format,
            format: fallback,
            data,
            error: first_error.to_string(),
        },
        Err(second) => {
            warn!(texture = id, %fallback, error = %second, "Fallback compression failed");
            CompressionOutcome::Failed {
                requested: format,
                warning: format!(
                    "{id}: {format} failed ({first_error}), fallback {fallback} failed ({second}); texture left uncompressed"
                ),
            }
        }
    }
}
