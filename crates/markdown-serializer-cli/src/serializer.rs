//! Query engine adapter that runs an external command per directive.

use std::{path::PathBuf, process::Stdio};

use anyhow::{Result, bail};
use async_trait::async_trait;
use markdown_serializer_config::Config;
use markdown_serializer_engine::{ExpressionKind, Origin, QuerySerializer, SerializeError};
use tokio::{io::AsyncWriteExt, process::Command};

/// Runs the configured command with the query on stdin and takes its stdout
/// as the rendered Markdown.
///
/// The child sees `SERIALIZER_KIND` (`query`, `inline-query` or
/// `inline-script`), `SERIALIZER_ORIGIN` (note path relative to the notes
/// folder) and `SERIALIZER_TABLE_CELL` (`0` or `1`), and runs inside the
/// notes folder. A child still running when its call is abandoned is killed.
#[derive(Debug, Clone)]
pub struct CommandSerializer {
    program: String,
    args: Vec<String>,
    notes_root: PathBuf,
}

impl CommandSerializer {
    pub fn new(command: &[String], notes_root: impl Into<PathBuf>) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("no serializer command configured; set [serializer] command in the config file");
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            notes_root: notes_root.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.serializer.command, &config.notes_path)
    }

    async fn run(
        &self,
        input: &str,
        kind: &str,
        origin: &Origin,
        is_table_cell: bool,
    ) -> Result<String, SerializeError> {
        let failed = |what: &str, err: std::io::Error| {
            SerializeError::Failed(format!("{what} {}: {err}", self.program))
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.notes_root)
            .env("SERIALIZER_KIND", kind)
            .env("SERIALIZER_ORIGIN", origin.file_path().as_str())
            .env("SERIALIZER_TABLE_CELL", if is_table_cell { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| failed("could not start", err))?;

        // A command may exit without reading its input; its exit status
        // decides the outcome then.
        if let Some(mut stdin) = child.stdin.take()
            && let Err(err) = stdin.write_all(input.as_bytes()).await
            && err.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(failed("could not write to", err));
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| failed("could not wait for", err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SerializeError::Failed(if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            }));
        }

        String::from_utf8(output.stdout).map_err(|_| {
            SerializeError::Failed(format!("{} printed invalid UTF-8", self.program))
        })
    }
}

#[async_trait]
impl QuerySerializer for CommandSerializer {
    async fn serialize_query(&self, query: &str, origin: &Origin) -> Result<String, SerializeError> {
        log::debug!("running {} for query {query}", self.program);
        self.run(query, "query", origin, false).await
    }

    async fn serialize_inline_expression(
        &self,
        expression: &str,
        origin: &Origin,
        is_table_cell: bool,
    ) -> Result<String, SerializeError> {
        let kind = match ExpressionKind::of(expression) {
            ExpressionKind::Query => "inline-query",
            ExpressionKind::Script => "inline-script",
        };
        self.run(expression, kind, origin, is_table_cell).await
    }
}
