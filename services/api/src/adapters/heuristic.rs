//! services/api/src/adapters/heuristic.rs
//!
//! A local `AnalysisService` that describes a document from its size and name.
//! It performs no I/O and never fails, which makes it the default for development.

use async_trait::async_trait;
use docvault_core::domain::file_extension;
use docvault_core::ports::{AnalysisService, PortResult};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn describe(size_bytes: usize, display_name: &str) -> String {
        let size_mb = size_bytes as f64 / BYTES_PER_MB;
        let size_comment = if size_mb < 0.1 {
            "The file is very small"
        } else if size_mb < 1.0 {
            "The file is relatively small"
        } else if size_mb < 10.0 {
            "The file is medium-sized"
        } else {
            "The file is quite large"
        };

        let extension = file_extension(display_name)
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        let type_comment = match extension.as_str() {
            "pdf" => "PDF document, likely containing text and possibly images.".to_string(),
            "docx" => "Word document, formatted text.".to_string(),
            "png" => "PNG image, possibly a screenshot or a diagram.".to_string(),
            "jpg" | "jpeg" => "JPEG image, possibly a photograph.".to_string(),
            "txt" => "Plain text file without formatting.".to_string(),
            other => format!("{} file.", other.to_uppercase()),
        };

        format!("{} ({:.2} MB). {}", size_comment, size_mb, type_comment)
    }
}

#[async_trait]
impl AnalysisService for HeuristicAnalyzer {
    async fn analyze(&self, content: &[u8], display_name: &str) -> PortResult<String> {
        Ok(Self::describe(content.len(), display_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn small_pdf_is_described_by_size_and_type() {
        let text = HeuristicAnalyzer::new()
            .analyze(b"%PDF-1.7", "report.pdf")
            .await
            .unwrap();
        assert_eq!(
            text,
            "The file is very small (0.00 MB). PDF document, likely containing text and possibly images."
        );
    }

    #[test]
    fn size_classes_follow_megabyte_thresholds() {
        let mb = 1024 * 1024;
        let cases = [
            (mb / 2, "The file is relatively small (0.50 MB)"),
            (5 * mb, "The file is medium-sized (5.00 MB)"),
            (12 * mb, "The file is quite large (12.00 MB)"),
        ];
        for (size, prefix) in cases {
            let text = HeuristicAnalyzer::describe(size, "a.txt");
            assert!(text.starts_with(prefix), "{}", text);
        }
    }

    #[test]
    fn extension_lookup_is_case_insensitive_with_fallback() {
        let cases = [
            ("PHOTO.JPG", "JPEG image, possibly a photograph."),
            ("data.parquet", "PARQUET file."),
            ("LICENSE", "UNKNOWN file."),
        ];
        for (name, suffix) in cases {
            let text = HeuristicAnalyzer::describe(1, name);
            assert!(text.ends_with(suffix), "{}", text);
        }
    }

    #[tokio::test]
    async fn output_depends_only_on_size_and_name() {
        let analyzer = HeuristicAnalyzer::new();
        let a = analyzer.analyze(b"abc", "x.png").await.unwrap();
        let b = analyzer.analyze(b"xyz", "x.png").await.unwrap();
        assert_eq!(a, b);
    }
}
