//! Human-readable batch report.

use texture_complexity::{BatchReport, Diagnostics, TextureFormat, TextureRecommendation};

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Uncompressed RGBA32 size of the source against the recommended output.
pub fn size_totals(results: &[&TextureRecommendation]) -> (u64, u64) {
    results.iter().fold((0, 0), |(input, output), rec| {
        let (w, h) = rec.source_resolution;
        (
            input + TextureFormat::Rgba32.estimated_size_bytes(w, h),
            output + rec.estimated_size_bytes(),
        )
    })
}

fn print_texture(rec: &TextureRecommendation) {
    let (sw, sh) = rec.source_resolution;
    let (tw, th) = rec.analysis.recommended_resolution;
    println!("📁 {}", rec.id);
    println!(
        "   📈 Complexity: {:.3} ({})   ➗ Divisor: {}   📐 {}x{} → {}x{}",
        rec.analysis.normalized_complexity,
        rec.strategy,
        rec.analysis.recommended_divisor,
        sw,
        sh,
        tw,
        th
    );
    println!("   🗜️  Format: {} ({})", rec.format.format, rec.format.reason);
    if let Some(layout) = rec.layout {
        println!("   🧭 Normal layout: {}", layout);
    }
    println!("   💬 {}", rec.summary);
}

pub fn print_batch_human(report: &BatchReport, diagnostics: &Diagnostics) {
    let results = report.sorted_results();
    println!("\n📊 Texture Compression Advice");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for rec in &results {
        print_texture(rec);
    }

    let (input_bytes, output_bytes) = size_totals(&results);
    let reduction = if input_bytes > 0 {
        (1.0 - output_bytes as f64 / input_bytes as f64) * 100.0
    } else {
        0.0
    };

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✅ {} analyzed, ❌ {} failed, ⏭️  {} skipped (total: {})",
        report.succeeded, report.failed, report.skipped, report.total
    );
    println!(
        "💾 {} → {} ({:.1}% smaller)",
        format_bytes(input_bytes),
        format_bytes(output_bytes),
        reduction
    );

    if !report.errors.is_empty() {
        println!("\n❌ Errors encountered:");
        for (id, error) in &report.errors {
            println!("   {} → {}", id, error);
        }
    }
    if !diagnostics.is_empty() {
        println!("\n⚠️  Warnings:");
        for notice in diagnostics.warnings() {
            match &notice.texture {
                Some(texture) => println!("   {} → {}", texture, notice.message),
                None => println!("   {}", notice.message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use texture_complexity::{analyze_texture, AnalysisConfig, PixelBuffer, Rgba, TextureInput};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_size_totals_shrink_flat_texture() {
        let input = TextureInput::new("flat", PixelBuffer::filled(64, 64, Rgba::new(0.5, 0.5, 0.5, 1.0)));
        let rec = analyze_texture(&input, &AnalysisConfig::default());
        let (input_bytes, output_bytes) = size_totals(&[&rec]);
        assert_eq!(input_bytes, 64 * 64 * 4);
        assert!(output_bytes < input_bytes);
    }

    #[test]
    fn test_print_batch_no_panic() {
        print_batch_human(&BatchReport::new(), &Diagnostics::new());
    }
}
