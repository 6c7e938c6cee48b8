//! Tesseract backend
//!
//! Runs the external `tesseract` binary through rusty-tesseract. Word records
//! are grouped back into text lines so each line becomes one observation.

use async_trait::async_trait;
use image::DynamicImage;
use rusty_tesseract::{Args, Image};
use tracing::debug;

use super::ocr::{EngineError, RawObservation, RecognitionEngine};
use crate::capture::frame::PixelBuffer;
use crate::config::EngineSettings;

/// Recognition engine backed by the tesseract CLI
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    settings: EngineSettings,
}

impl TesseractEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn recognize(&self, image: &PixelBuffer) -> Result<Vec<RawObservation>, EngineError> {
        let strip = image.clone();
        let settings = self.settings.clone();

        tokio::task::spawn_blocking(move || run_tesseract(&strip, &settings))
            .await
            .map_err(|e| EngineError::Failed(format!("tesseract worker failed: {}", e)))?
    }
}

fn run_tesseract(
    strip: &PixelBuffer,
    settings: &EngineSettings,
) -> Result<Vec<RawObservation>, EngineError> {
    let dynamic = DynamicImage::ImageRgba8(strip.image().clone());
    let image = Image::from_dynamic_image(&dynamic)
        .map_err(|e| EngineError::Failed(format!("could not prepare image for tesseract: {:?}", e)))?;

    let args = Args {
        lang: settings.language.clone(),
        psm: Some(settings.psm),
        oem: Some(settings.oem),
        ..Args::default()
    };

    let output = rusty_tesseract::image_to_data(&image, &args)
        .map_err(|e| EngineError::Failed(format!("{:?}", e)))?;

    let words: Vec<WordRecord> = output
        .data
        .into_iter()
        .map(|d| WordRecord {
            line: (d.block_num, d.par_num, d.line_num),
            text: d.text,
            confidence: d.conf,
        })
        .collect();

    debug!("Tesseract returned {} record(s)", words.len());
    Ok(group_lines(&words))
}

/// One row of tesseract's TSV output
#[derive(Debug, Clone, PartialEq)]
struct WordRecord {
    /// (block, paragraph, line) the word belongs to
    line: (i32, i32, i32),
    text: String,
    /// 0..100 for words, -1 for structural rows
    confidence: f32,
}

/// Join consecutive words of the same line; confidence is the mean word confidence
fn group_lines(words: &[WordRecord]) -> Vec<RawObservation> {
    let mut lines: Vec<((i32, i32, i32), Vec<&WordRecord>)> = Vec::new();

    for word in words {
        if word.confidence < 0.0 || word.text.trim().is_empty() {
            continue;
        }
        match lines.last_mut() {
            Some((key, members)) if *key == word.line => members.push(word),
            _ => lines.push((word.line, vec![word])),
        }
    }

    lines
        .into_iter()
        .map(|(_, members)| {
            let text = members
                .iter()
                .map(|w| w.text.trim())
                .collect::<Vec<_>>()
                .join(" ");
            let mean = members.iter().map(|w| w.confidence).sum::<f32>() / members.len() as f32;
            RawObservation::new(text, (mean / 100.0).clamp(0.0, 1.0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(line: i32, text: &str, confidence: f32) -> WordRecord {
        WordRecord {
            line: (1, 1, line),
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_groups_words_by_line() {
        let words = vec![
            word(1, "", -1.0),
            word(1, "AB", 90.0),
            word(1, "1234", 70.0),
            word(2, "EXP", 50.0),
        ];
        let lines = group_lines(&words);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "AB 1234");
        assert!((lines[0].confidence - 0.8).abs() < 1e-6);
        assert_eq!(lines[1].text, "EXP");
        assert!((lines[1].confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_skips_structural_rows() {
        let words = vec![word(1, "", -1.0), word(1, "   ", 95.0)];
        assert!(group_lines(&words).is_empty());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let lines = group_lines(&[word(1, "X", 120.0)]);
        assert_eq!(lines[0].confidence, 1.0);
    }
}
