use crate::engine::CompressReport;

/// What the page shows after a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    /// Object URL of the compressed blob.
    pub url: String,
    /// Suggested download name.
    pub file_name: String,
    pub download_label: String,
    pub metric_label: String,
}

impl ResultView {
    pub fn new(url: String, file_name: &str, report: &CompressReport) -> Self {
        Self {
            url,
            file_name: file_name.to_string(),
            download_label: download_label(report.output_bytes),
            metric_label: metric_label(report),
        }
    }
}

/// `Space saved: 82.0%`
pub fn metric_label(report: &CompressReport) -> String {
    format!("Space saved: {:.1}%", report.space_saved_percent())
}

/// `Download JPEG (87 kB)`, rounded to the nearest kilobyte.
pub fn download_label(bytes: usize) -> String {
    format!("Download JPEG ({} kB)", (bytes as f64 / 1024.0).round() as u64)
}
