use crate::process::FileProcessingResult;

/// Total number of directive failures across `results`.
pub fn failure_count(results: &[FileProcessingResult]) -> usize {
    results.iter().map(|r| r.errors.len()).sum()
}

/// Formats failures for display, one line each, showing at most `cap` of
/// them followed by a count of the rest.
pub fn summarize_failures(results: &[FileProcessingResult], cap: usize) -> Vec<String> {
    let mut lines: Vec<String> = results
        .iter()
        .flat_map(|r| r.errors.iter().map(move |e| format!("{}: {e}", r.file_path)))
        .take(cap)
        .collect();

    let hidden = failure_count(results).saturating_sub(lines.len());
    if hidden > 0 {
        lines.push(format!("... and {hidden} more error(s)"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use pretty_assertions::assert_eq;
    use relative_path::RelativePathBuf;
    use rstest::rstest;

    fn result(path: &str, queries: &[&str]) -> FileProcessingResult {
        FileProcessingResult {
            file_path: RelativePathBuf::from(path),
            changed: false,
            errors: queries
                .iter()
                .map(|q| QueryError {
                    message: "failed".into(),
                    query: q.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn lists_each_failure_with_its_file() {
        let results = vec![result("a.md", &["LIST x"]), result("b.md", &[]), result("c.md", &["=y"])];

        assert_eq!(
            summarize_failures(&results, 5),
            vec![
                "a.md: failed (query: LIST x)".to_string(),
                "c.md: failed (query: =y)".to_string(),
            ]
        );
    }

    #[rstest]
    #[case(0, 1, 7)]
    #[case(2, 3, 5)]
    #[case(7, 7, 0)]
    #[case(10, 7, 0)]
    fn caps_output(#[case] cap: usize, #[case] expected_lines: usize, #[case] hidden: usize) {
        let results = vec![
            result("a.md", &["1", "2", "3"]),
            result("b.md", &["4", "5", "6", "7"]),
        ];

        let lines = summarize_failures(&results, cap);

        assert_eq!(lines.len(), expected_lines);
        if hidden > 0 {
            assert_eq!(lines.last().unwrap(), &format!("... and {hidden} more error(s)"));
        }
    }

    #[test]
    fn no_failures_no_lines() {
        assert!(summarize_failures(&[result("a.md", &[])], 5).is_empty());
    }
}
