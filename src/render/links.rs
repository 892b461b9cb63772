use crate::core::table::PrTable;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::render::load_filtered_table;
use crate::utils::error::{EtlError, Result};
use std::collections::BTreeMap;

pub const README_FILE: &str = "README.md";
pub const MARKER_START: &str = "<!-- PR_LINKS_TABLE_START -->";
pub const MARKER_END: &str = "<!-- PR_LINKS_TABLE_END -->";

/// Construct the Markdown month-to-links table (no trailing newline).
fn build_table(links_by_month: &BTreeMap<String, Vec<u64>>, repo: &str) -> String {
    let mut lines = vec!["| Month | PRs |".to_string(), "| ----- | ---- |".to_string()];
    for (month, numbers) in links_by_month {
        let links = numbers
            .iter()
            .map(|n| format!("[#{n}](https://github.com/{repo}/pull/{n})"))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("| {} | {} |", month, links));
    }
    lines.join("\n")
}

/// Replace the section between the marker comments with the freshly built
/// table, appending the markers at the end when they are missing.
fn splice_table(readme: &str, table: &str) -> String {
    let mut lines: Vec<String> = readme.lines().map(str::to_string).collect();

    let start_idx = lines.iter().position(|l| l == MARKER_START);
    let end_idx = lines.iter().position(|l| l == MARKER_END);
    let (start, end) = match (start_idx, end_idx) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            lines.push(String::new());
            lines.push(MARKER_START.to_string());
            lines.push(MARKER_END.to_string());
            (lines.len() - 2, lines.len() - 1)
        }
    };

    let mut updated = lines[..start].to_vec();
    updated.push(MARKER_START.to_string());
    updated.extend(table.lines().map(str::to_string));
    updated.push(MARKER_END.to_string());
    updated.extend(lines[end + 1..].iter().cloned());

    let mut text = updated.join("\n");
    text.push('\n');
    text
}

/// Rewrites the month-to-PR-links table in README.md from the CSV table.
pub struct LinksTablePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> LinksTablePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for LinksTablePipeline<S, C> {
    type Raw = (PrTable, String);
    /// The updated README contents, or `None` when there is nothing to list.
    type Output = Option<String>;

    async fn extract(&self) -> Result<Self::Raw> {
        let table = load_filtered_table(&self.storage, &self.config).await?;
        let readme = match self.storage.read_file(README_FILE).await {
            Ok(bytes) => String::from_utf8(bytes).map_err(|e| EtlError::Processing {
                message: format!("README is not valid UTF-8: {}", e),
            })?,
            Err(EtlError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        Ok((table, readme))
    }

    async fn transform(&self, raw: Self::Raw) -> Result<Self::Output> {
        let (table, readme) = raw;
        let links = table.links_by_month();
        if links.is_empty() {
            return Ok(None);
        }
        let table_md = build_table(&links, self.config.repo());
        Ok(Some(splice_table(&readme, &table_md)))
    }

    async fn load(&self, output: Self::Output) -> Result<String> {
        match output {
            Some(contents) => {
                self.storage
                    .write_file(README_FILE, contents.as_bytes())
                    .await?;
                tracing::info!("README.md updated with PR links table");
            }
            None => tracing::info!("No matching PRs found - README left unchanged"),
        }
        Ok(format!("{}/{}", self.config.output_path(), README_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accumulate::CSV_FILE;
    use crate::core::testutil::{MockConfig, MockStorage};
    use crate::domain::model::PrRecord;

    fn links(entries: &[(&str, &[u64])]) -> BTreeMap<String, Vec<u64>> {
        entries
            .iter()
            .map(|(month, numbers)| (month.to_string(), numbers.to_vec()))
            .collect()
    }

    #[test]
    fn test_build_table() {
        let table = build_table(&links(&[("2024-01", &[3, 7]), ("2024-02", &[9])]), "google/xls");
        assert_eq!(
            table,
            "| Month | PRs |\n\
             | ----- | ---- |\n\
             | 2024-01 | [#3](https://github.com/google/xls/pull/3) [#7](https://github.com/google/xls/pull/7) |\n\
             | 2024-02 | [#9](https://github.com/google/xls/pull/9) |"
        );
    }

    #[test]
    fn test_splice_replaces_existing_section() {
        let readme = format!(
            "# Title\n\n{}\n| old | table |\n{}\n\nFooter\n",
            MARKER_START, MARKER_END
        );
        let updated = splice_table(&readme, "| new | table |");

        assert!(updated.contains("# Title"));
        assert!(updated.contains("| new | table |"));
        assert!(!updated.contains("| old | table |"));
        assert!(updated.contains("Footer"));
        assert_eq!(updated.matches(MARKER_START).count(), 1);
    }

    #[test]
    fn test_splice_appends_markers_when_missing() {
        let updated = splice_table("# Title\n", "| new | table |");

        let start = updated.find(MARKER_START).unwrap();
        let end = updated.find(MARKER_END).unwrap();
        assert!(start < end);
        assert!(updated.contains("| new | table |"));
        assert!(updated.ends_with('\n'));
    }

    #[test]
    fn test_splice_into_empty_document() {
        let updated = splice_table("", "| t |");
        assert!(updated.contains(MARKER_START));
        assert!(updated.contains("| t |"));
    }

    fn record(number: u64, head_repo: &str, created: &str) -> PrRecord {
        PrRecord {
            pr_number: number,
            head_repo: head_repo.to_string(),
            created_at: Some(created.parse().unwrap()),
            review_requested_at: None,
            reviewing_internally_at: None,
            closed_at: None,
        }
    }

    #[tokio::test]
    async fn test_pipeline_rewrites_readme() {
        let storage = MockStorage::new();
        let csv = PrTable::from_records(vec![
            record(1, "xlsynth/xlsynth", "2024-01-10T00:00:00Z"),
            record(2, "someone/else", "2024-01-11T00:00:00Z"),
        ])
        .to_csv()
        .unwrap();
        storage.put_file(CSV_FILE, &csv).await;
        storage.put_file(README_FILE, b"# PR stats\n").await;

        let pipeline = LinksTablePipeline::new(storage.clone(), MockConfig::default());
        let raw = pipeline.extract().await.unwrap();
        let output = pipeline.transform(raw).await.unwrap();
        pipeline.load(output).await.unwrap();

        let readme = String::from_utf8(storage.get_file(README_FILE).await.unwrap()).unwrap();
        assert!(readme.contains("# PR stats"));
        assert!(readme.contains("[#1](https://github.com/google/xls/pull/1)"));
        // The filtered-out head repo contributes no links.
        assert!(!readme.contains("pull/2"));
    }

    #[tokio::test]
    async fn test_pipeline_leaves_readme_alone_without_matches() {
        let storage = MockStorage::new();
        let csv = PrTable::from_records(vec![record(2, "someone/else", "2024-01-11T00:00:00Z")])
            .to_csv()
            .unwrap();
        storage.put_file(CSV_FILE, &csv).await;
        storage.put_file(README_FILE, b"# PR stats\n").await;

        let pipeline = LinksTablePipeline::new(storage.clone(), MockConfig::default());
        let raw = pipeline.extract().await.unwrap();
        let output = pipeline.transform(raw).await.unwrap();
        assert!(output.is_none());
        pipeline.load(output).await.unwrap();

        let readme = String::from_utf8(storage.get_file(README_FILE).await.unwrap()).unwrap();
        assert_eq!(readme, "# PR stats\n");
    }
}
