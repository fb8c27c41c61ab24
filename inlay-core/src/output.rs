//! Streaming output helpers (made by FontLab https://www.fontlab.com/)

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

/// Write items as prettified JSON array.
pub fn write_json_pretty<T: Serialize>(items: &[T], mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write items as newline-delimited JSON (NDJSON).
pub fn write_ndjson<T: Serialize>(items: &[T], mut w: impl Write) -> Result<()> {
    for item in items {
        let line = serde_json::to_string(item)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::job::{Job, JobOutcome, JobReport, JobStatus};

    fn sample_outcome(ok: bool) -> JobOutcome {
        let status = if ok {
            JobStatus::Ok(JobReport::default())
        } else {
            JobStatus::Failed {
                stage: Stage::ImportResolution,
                message: "circular @import chain".to_string(),
            }
        };

        JobOutcome {
            job: Job::new("/themes/white.css", "/out/white.css"),
            status,
        }
    }

    #[test]
    fn ndjson_writes_one_line_per_outcome() {
        let outcomes = vec![sample_outcome(true), sample_outcome(false)];
        let mut buf = Vec::new();

        write_ndjson(&outcomes, &mut buf).expect("write ndjson");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: JobOutcome = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(parsed, outcomes[1]);
    }
}
