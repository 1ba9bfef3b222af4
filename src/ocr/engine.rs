use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::{find_tessdata_dir, find_tesseract_executable};
use super::TextRecognizer;
use crate::automation::config::OcrConfig;

/// Represents a line of OCR text with confidence score
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    pub confidence: f32,
}

/// Represents a single word from OCR with confidence score
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

/// Text recognizer backed by the Tesseract command-line tool.
pub struct TesseractRecognizer {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    language: String,
    psm: u32,
    min_confidence: f32,
}

impl TesseractRecognizer {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let executable = find_tesseract_executable(config)?;
        let tessdata = find_tessdata_dir(config);
        tracing::info!(
            "Tesseract: {} (tessdata: {})",
            executable.display(),
            tessdata
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default".to_string())
        );
        Ok(Self {
            executable,
            tessdata,
            language: config.language.clone(),
            psm: config.psm,
            min_confidence: config.min_confidence,
        })
    }

    /// Runs Tesseract with TSV output and returns the parsed lines.
    pub fn recognize_lines(&self, img: &RgbaImage) -> Result<Vec<OcrLine>> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        // Tesseract appends .tsv to the output base
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut cmd = Command::new(&self.executable);
        cmd.arg(temp_input.path()).arg(&output_base);
        if let Some(tessdata) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        let output = cmd
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_output(&tsv_content, self.min_confidence))
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, img: &RgbaImage) -> Result<String> {
        let lines = self.recognize_lines(img)?;
        Ok(join_lines(&lines, &self.language))
    }
}

/// Joins recognized lines with `\n`.
///
/// Chinese and Japanese models emit one word per glyph, so their words are
/// concatenated without spaces.
fn join_lines(lines: &[OcrLine], language: &str) -> String {
    let separator = if language.starts_with("chi") || language.starts_with("jpn") {
        ""
    } else {
        " "
    };
    lines
        .iter()
        .map(|line| {
            line.words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(separator)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn finish_line(lines: &mut Vec<OcrLine>, words: Vec<OcrWord>) {
    if words.is_empty() {
        return;
    }
    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(OcrLine {
        text,
        words,
        confidence,
    });
}

/// Parses Tesseract TSV output, dropping words under `min_confidence`.
fn parse_tsv_output(tsv: &str, min_confidence: f32) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<OcrWord> = Vec::new();

    for line in tsv.lines().skip(1) {
        // level, page_num, block_num, par_num, line_num, word_num,
        // left, top, width, height, conf, text
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }
        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        if current_key.is_some_and(|k| k != key) {
            finish_line(&mut lines, std::mem::take(&mut current_words));
        }
        current_key = Some(key);

        if conf >= 0.0 && conf >= min_confidence {
            current_words.push(OcrWord {
                text: text.to_string(),
                confidence: conf,
            });
        }
    }
    finish_line(&mut lines, current_words);

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(line: i32, conf: f32, text: &str) -> String {
        format!("5\t1\t1\t1\t{}\t1\t0\t0\t10\t10\t{}\t{}", line, conf, text)
    }

    #[test]
    fn test_parse_tsv_groups_lines() {
        let tsv = [
            HEADER.to_string(),
            "4\t1\t1\t1\t1\t0\t0\t0\t100\t10\t-1\t".to_string(),
            word(1, 91.0, "回合"),
            word(1, 88.5, "3"),
            word(2, 70.0, "金币"),
            word(2, 20.0, "??"),
        ]
        .join("\n");

        let lines = parse_tsv_output(&tsv, 50.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "回合 3");
        assert!((lines[0].confidence - 89.75).abs() < 1e-3);
        assert_eq!(lines[1].words.len(), 1);
        assert_eq!(join_lines(&lines, "chi_sim"), "回合3\n金币");
        assert_eq!(join_lines(&lines, "eng"), "回合 3\n金币");
    }

    #[test]
    fn test_parse_tsv_all_low_confidence_is_empty() {
        let tsv = [HEADER.to_string(), word(1, 10.0, "x")].join("\n");
        let lines = parse_tsv_output(&tsv, 50.0);
        assert!(lines.is_empty());
        assert_eq!(join_lines(&lines, "chi_sim"), "");
    }
}
