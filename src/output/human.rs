// src/output/human.rs
//! Human-readable terminal output

use crate::output::OutputHandler;
use crate::types::CertificateEvent;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;
use std::io::{self, Write};
use std::sync::Mutex;

const MAX_LISTED_DOMAINS: usize = 3;

/// Human-readable output handler, coloured when writing to a terminal
pub struct HumanOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    use_colors: bool,
}

impl HumanOutput {
    /// Create a new HumanOutput that writes to stdout
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
            use_colors: is_terminal::is_terminal(std::io::stdout()),
        }
    }

    /// Plain output to an arbitrary writer
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            use_colors: false,
        }
    }

    fn format_time(ts: Option<DateTime<Utc>>) -> String {
        ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "-".to_string())
    }

    fn render(&self, event: &CertificateEvent) -> Vec<String> {
        let mut lines = Vec::new();

        let header = if self.use_colors {
            format!(
                "{} {} {}",
                format!("[{}]", Self::format_time(Some(event.observed_at))).dimmed(),
                "[+]".green().bold(),
                event.matched_domain.cyan().bold()
            )
        } else {
            format!(
                "[{}] [+] {}",
                Self::format_time(Some(event.observed_at)),
                event.matched_domain
            )
        };
        lines.push(header);

        let source = if event.index > 0 {
            format!("{} (index {})", event.source, event.index)
        } else {
            event.source.clone()
        };

        let fields = [
            ("Source:", source),
            ("Subject CN:", event.subject.common_name.clone()),
            ("Issuer:", event.issuer.clone()),
            ("Not Before:", Self::format_time(event.not_before)),
            ("Not After:", Self::format_time(event.not_after)),
        ];
        for (label, value) in fields {
            if self.use_colors {
                lines.push(format!("    {} {}", format!("{:<12}", label).dimmed(), value));
            } else {
                lines.push(format!("    {:<12} {}", label, value));
            }
        }

        if !event.all_domains.is_empty() {
            lines.push(format!("    Domains:     ({} found)", event.all_domains.len()));
            for domain in event.all_domains.iter().take(MAX_LISTED_DOMAINS) {
                lines.push(format!("      - {}", domain));
            }
            if event.all_domains.len() > MAX_LISTED_DOMAINS {
                lines.push("      - ... and more".to_string());
            }
        }

        lines
    }
}

impl Default for HumanOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputHandler for HumanOutput {
    async fn handle(&self, event: &CertificateEvent) -> anyhow::Result<()> {
        let lines = self.render(event);

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("output writer lock poisoned"))?;
        for line in lines {
            writeln!(writer, "{}", line)?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "human"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::create_test_event;

    #[test]
    fn test_render_plain() {
        let handler = HumanOutput::with_writer(Box::new(io::sink()));
        let lines = handler.render(&create_test_event());

        assert!(lines[0].ends_with("[+] test.com"));
        assert!(lines.iter().any(|l| l.contains("Test Log (index 123)")));
        assert!(lines.iter().any(|l| l.contains("Test CA")));
        assert!(lines.iter().any(|l| l.contains("(2 found)")));
    }

    #[test]
    fn test_render_truncates_domains() {
        let handler = HumanOutput::with_writer(Box::new(io::sink()));
        let mut event = create_test_event();
        event.all_domains = (0..6).map(|i| format!("host{}.test.com", i)).collect();

        let lines = handler.render(&event);
        let listed = lines.iter().filter(|l| l.contains("- host")).count();
        assert_eq!(listed, MAX_LISTED_DOMAINS);
        assert!(lines.iter().any(|l| l.contains("... and more")));
    }

    #[tokio::test]
    async fn test_human_output() {
        let handler = HumanOutput::with_writer(Box::new(io::sink()));
        assert!(handler.handle(&create_test_event()).await.is_ok());
    }
}
