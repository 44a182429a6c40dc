use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "parley=info,parley_agents=info,parley_channels=info,serenity=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Plain => registry
            .with(fmt::layer().with_writer(RedactingWriter::stderr()))
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(RedactingWriter::stderr()),
            )
            .init(),
    }
}

/// A writer that masks API keys and bot tokens before they reach the log output.
pub struct RedactingWriter<W> {
    inner: W,
}

impl RedactingWriter<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self {
            inner: std::io::stderr(),
        }
    }
}

impl<W: std::io::Write> std::io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let original = String::from_utf8_lossy(buf);
        let redacted = redact_secrets(&original);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> MakeWriter<'a> for RedactingWriter<std::io::Stderr> {
    type Writer = RedactingWriter<std::io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::stderr()
    }
}

/// Replace OpenAI keys and Discord bot tokens with `[REDACTED]`.
pub fn redact_secrets(input: &str) -> String {
    static PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?x)
              sk-[A-Za-z0-9_\-]{20,}                          # OpenAI keys, incl. sk-proj-
            | Bot\s+[A-Za-z0-9_\-.]{30,}                      # Authorization: Bot <token>
            | [A-Za-z0-9_\-]{24,28}\.[A-Za-z0-9_\-]{6}\.[A-Za-z0-9_\-]{27,}  # raw Discord tokens
            ",
        )
        .expect("redaction regex should compile")
    });

    PATTERNS.replace_all(input, "[REDACTED]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn redacts_openai_key() {
        let input = "key=sk-1234567890123456789012345";
        assert_eq!(redact_secrets(input), "key=[REDACTED]");
    }

    #[test]
    fn redacts_openai_project_key() {
        let input = "key=sk-proj-abcdefghijklmnopqrstuvwxyz";
        assert_eq!(redact_secrets(input), "key=[REDACTED]");
    }

    #[test]
    fn redacts_discord_authorization_header() {
        let input = "Authorization: Bot abcdefghijklmnopqrstuvwxyz0123456789";
        assert_eq!(redact_secrets(input), "Authorization: [REDACTED]");
    }

    #[test]
    fn redacts_raw_discord_token() {
        let input = "token MTIzNDU2Nzg5MDEyMzQ1Njc4OTA.GaBcDe.abcdefghijklmnopqrstuvwxyz0123 used";
        assert_eq!(redact_secrets(input), "token [REDACTED] used");
    }

    #[test]
    fn leaves_normal_text_unchanged() {
        let input = "generated response for alice in #general";
        assert_eq!(redact_secrets(input), input);
    }

    #[test]
    fn writer_redacts_before_forwarding() {
        let mut writer = RedactingWriter { inner: Vec::new() };
        let line = b"calling api with sk-1234567890123456789012345\n";

        let written = writer.write(line).unwrap();
        assert_eq!(written, line.len());
        assert_eq!(
            String::from_utf8(writer.inner).unwrap(),
            "calling api with [REDACTED]\n"
        );
    }
}
