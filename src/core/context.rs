// src/core/context.rs
//
// Per-run logging context. Wraps the `log` facade so every message carries
// the site and run id, and keeps warnings for the final result.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Logging scope for one site analysis
#[derive(Debug, Clone)]
pub struct RunContext {
    site: String,
    run_id: Uuid,
    started: DateTime<Utc>,
    warnings: Vec<String>,
}

impl RunContext {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            run_id: Uuid::new_v4(),
            started: Utc::now(),
            warnings: Vec::new(),
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    pub fn elapsed_secs(&self) -> f64 {
        (Utc::now() - self.started)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0
    }

    fn prefix(&self) -> String {
        let id = self.run_id.simple().to_string();
        format!("[{} {}]", self.site, &id[..8])
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        log::debug!("{} {}", self.prefix(), message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        log::info!("{} {}", self.prefix(), message.as_ref());
    }

    /// Log a warning and keep it for the result
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{} {}", self.prefix(), message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_are_collected() {
        let mut ctx = RunContext::new("SITE01");
        ctx.info("starting");
        ctx.warn("first");
        ctx.warn(String::from("second"));
        assert_eq!(ctx.warnings(), &["first".to_string(), "second".to_string()]);
        assert_eq!(ctx.site(), "SITE01");
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunContext::new("a").run_id(), RunContext::new("a").run_id());
    }
}
