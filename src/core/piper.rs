use crate::core::{Pipeline, Storage};
use crate::domain::model::PiperCommit;
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

// Field/record separators for the git pretty format; commit bodies may
// contain anything printable, so use the ASCII unit/record separators.
const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';
const PRETTY_FORMAT: &str = "%H%x1f%aI%x1f%an%x1f%B%x1e";

fn piper_footer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^PiperOrigin-RevId:\s*(\d+)\s*$").expect("static regex"))
}

/// Return the `PiperOrigin-RevId` number if present in the commit body.
fn extract_piper_rev_id(body: &str) -> Option<String> {
    piper_footer_re()
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Strip CR/LF and surrounding whitespace so fields stay single-cell in CSV.
fn sanitize_field(field: &str) -> String {
    field.replace(['\r', '\n'], "").trim().to_string()
}

/// Convert an ISO-8601 timestamp with offset to UTC `...Z`.
fn normalize_to_utc_z(ts: &str) -> Result<String> {
    let dt = DateTime::parse_from_rfc3339(ts)?;
    Ok(dt
        .with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string())
}

/// Parse `git log` output in [`PRETTY_FORMAT`] into Piper commits,
/// deduplicated on rev id (first encountered wins) and sorted newest first
/// with the git SHA as tiebreaker.
fn parse_git_log(raw: &str) -> Result<Vec<PiperCommit>> {
    let mut seen = std::collections::HashSet::new();
    let mut commits = Vec::new();

    for record in raw.split(RECORD_SEP) {
        if record.trim().is_empty() {
            continue;
        }
        let mut fields = record.splitn(4, FIELD_SEP);
        let (Some(sha), Some(author_date), Some(author), Some(body)) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            tracing::warn!("Ignoring malformed git log record");
            continue;
        };

        let Some(rev_id) = extract_piper_rev_id(body) else {
            continue;
        };
        if !seen.insert(rev_id.clone()) {
            // Multiple commits with the same footer shouldn't occur; keep the
            // first encountered.
            continue;
        }

        commits.push(PiperCommit {
            piper_rev_id: rev_id,
            git_sha: sanitize_field(sha),
            author: sanitize_field(author),
            committed_at: normalize_to_utc_z(author_date.trim())?,
        });
    }

    commits.sort_by(|a, b| {
        (b.committed_at.as_str(), b.git_sha.as_str()).cmp(&(a.committed_at.as_str(), a.git_sha.as_str()))
    });
    Ok(commits)
}

/// Scans a local git checkout for commits carrying a `PiperOrigin-RevId`
/// footer and writes them to a CSV, newest first.
pub struct PiperPipeline<S: Storage> {
    storage: S,
    repo: PathBuf,
    output: String,
}

impl<S: Storage> PiperPipeline<S> {
    pub fn new(storage: S, repo: PathBuf, output: String) -> Self {
        Self {
            storage,
            repo,
            output,
        }
    }

    fn run_git_log(&self) -> Result<String> {
        if !self.repo.join(".git").exists() {
            return Err(EtlError::Git {
                message: format!(
                    "Path does not appear to be a git repository: {}",
                    self.repo.display()
                ),
            });
        }

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .arg("log")
            .arg(format!("--pretty=format:{}", PRETTY_FORMAT))
            .output()?;

        if !output.status.success() {
            return Err(EtlError::Git {
                message: format!(
                    "git log exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for PiperPipeline<S> {
    type Raw = Vec<PiperCommit>;
    type Output = Vec<u8>;

    async fn extract(&self) -> Result<Vec<PiperCommit>> {
        tracing::info!("Scanning repository for Piper commits: {}", self.repo.display());
        let raw = self.run_git_log()?;
        let commits = parse_git_log(&raw)?;
        tracing::info!("Found {} Piper commits", commits.len());
        Ok(commits)
    }

    async fn transform(&self, commits: Vec<PiperCommit>) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for commit in &commits {
            writer.serialize(commit)?;
        }
        writer.into_inner().map_err(|e| EtlError::Processing {
            message: format!("Failed to flush CSV writer: {}", e),
        })
    }

    async fn load(&self, csv: Vec<u8>) -> Result<String> {
        self.storage.write_file(&self.output, &csv).await?;
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_piper_rev_id() {
        let body = "Some change.\n\nPiperOrigin-RevId: 123456789\n";
        assert_eq!(extract_piper_rev_id(body), Some("123456789".to_string()));

        assert_eq!(extract_piper_rev_id("No footer here"), None);
        // Footer must start the line.
        assert_eq!(
            extract_piper_rev_id("see PiperOrigin-RevId: 1 inline"),
            None
        );
    }

    #[test]
    fn test_normalize_to_utc_z() {
        assert_eq!(
            normalize_to_utc_z("2024-05-01T10:00:00+02:00").unwrap(),
            "2024-05-01T08:00:00Z"
        );
        assert_eq!(
            normalize_to_utc_z("2024-05-01T10:00:00Z").unwrap(),
            "2024-05-01T10:00:00Z"
        );
        assert!(normalize_to_utc_z("yesterday").is_err());
    }

    fn log_record(sha: &str, date: &str, author: &str, body: &str) -> String {
        format!(
            "{sha}{f}{date}{f}{author}{f}{body}{r}",
            f = FIELD_SEP,
            r = RECORD_SEP
        )
    }

    #[test]
    fn test_parse_git_log_filters_sorts_and_dedups() {
        let raw = [
            log_record(
                "a".repeat(40).as_str(),
                "2024-05-01T10:00:00+02:00",
                "Alice",
                "First\n\nPiperOrigin-RevId: 111\n",
            ),
            log_record(
                "b".repeat(40).as_str(),
                "2024-06-01T00:00:00+00:00",
                "Bob",
                "Second\n\nPiperOrigin-RevId: 222\n",
            ),
            log_record(
                "c".repeat(40).as_str(),
                "2024-07-01T00:00:00+00:00",
                "Carol",
                "Duplicate footer\n\nPiperOrigin-RevId: 111\n",
            ),
            log_record(
                "d".repeat(40).as_str(),
                "2024-07-02T00:00:00+00:00",
                "Dave",
                "No footer\n",
            ),
        ]
        .concat();

        let commits = parse_git_log(&raw).unwrap();

        assert_eq!(commits.len(), 2);
        // Newest first.
        assert_eq!(commits[0].piper_rev_id, "222");
        assert_eq!(commits[0].committed_at, "2024-06-01T00:00:00Z");
        assert_eq!(commits[1].piper_rev_id, "111");
        assert_eq!(commits[1].committed_at, "2024-05-01T08:00:00Z");
        assert_eq!(commits[1].author, "Alice");
    }

    #[test]
    fn test_parse_git_log_ignores_malformed_records() {
        let raw = format!("only-one-field{}", RECORD_SEP);
        assert!(parse_git_log(&raw).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transform_writes_csv_header() {
        let storage = crate::core::testutil::MockStorage::new();
        let pipeline = PiperPipeline::new(storage, PathBuf::from("."), "piper_commits.csv".into());

        let commits = vec![PiperCommit {
            piper_rev_id: "111".to_string(),
            git_sha: "a".repeat(40),
            author: "Alice".to_string(),
            committed_at: "2024-05-01T08:00:00Z".to_string(),
        }];
        let csv = pipeline.transform(commits).await.unwrap();
        let text = String::from_utf8(csv).unwrap();

        assert!(text.starts_with("piper_rev_id,git_sha,author,committed_at"));
        assert!(text.contains("111"));
        assert!(text.contains("Alice"));
    }
}
