//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::required_tools;
use crate::cli::Output;
use crate::config::{Prompts, Settings, VectorStoreProvider};
use crate::rag::QueryClassifier;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Spor Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let sections = [
        ("Transcript Sources", check_transcript_sources(settings)),
        ("API Keys", check_api_keys(settings)),
        ("Storage", check_storage(settings)),
        ("Configuration", check_configuration(settings)),
    ];

    for (title, checks) in &sections {
        print_section(title, checks);
    }

    let checks = sections.iter().flat_map(|(_, checks)| checks.iter());
    let (errors, warnings) = checks.fold((0, 0), |(e, w), c| match c.status {
        CheckStatus::Error => (e + 1, w),
        CheckStatus::Warning => (e, w + 1),
        CheckStatus::Ok => (e, w),
    });

    if errors > 0 {
        Output::error(&format!("{} error(s) found. Please fix them before using Spor.", errors));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Spor is ready to use.");
    }

    Ok(())
}

fn check_transcript_sources(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if let Some(dir) = settings.local_transcript_dir() {
        if dir.is_dir() {
            results.push(CheckResult::ok("Local transcripts", &dir.display().to_string()));
        } else {
            results.push(CheckResult::warning(
                "Local transcripts",
                &format!("{} does not exist", dir.display()),
                "Create it or unset transcript.local_dir",
            ));
        }
    }

    if !settings.transcript.captions && !settings.transcript.asr && results.is_empty() {
        results.push(CheckResult::error(
            "Sources",
            "no transcript source enabled",
            "Enable transcript.captions or transcript.asr, or set transcript.local_dir",
        ));
    }

    for tool in required_tools(settings) {
        let hint = if tool == "yt-dlp" {
            install_hint_ytdlp()
        } else {
            install_hint_ffmpeg()
        };
        results.push(check_tool(tool, hint));
    }

    results
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };

    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok(name, &crate::cli::content_preview(&version, 50))
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::error(name, "not found", hint),
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

fn check_api_keys(settings: &Settings) -> Vec<CheckResult> {
    let mut results = vec![check_key("OPENAI_API_KEY", Some("sk-"))];
    if settings.vector_store.provider == VectorStoreProvider::Pinecone {
        results.push(check_key(&settings.vector_store.pinecone.api_key_env, None));
    }
    results
}

fn check_key(var: &str, prefix: Option<&str>) -> CheckResult {
    let hint = format!("Set with: export {}='...'", var);
    match std::env::var(var) {
        Ok(key) if key.trim().is_empty() => CheckResult::error(var, "empty", &hint),
        Ok(key) if prefix.is_some_and(|p| !key.starts_with(p)) => {
            CheckResult::warning(var, "set but format looks unusual", &hint)
        }
        Ok(key) => CheckResult::ok(var, &format!("configured ({})", mask(&key))),
        Err(_) => CheckResult::error(var, "not set", &hint),
    }
}

/// Show only the ends of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &data_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    match settings.vector_store.provider {
        VectorStoreProvider::Memory => results.push(CheckResult::ok(
            "Vector store",
            "memory (indexes last until the process exits)",
        )),
        VectorStoreProvider::Sqlite => {
            let db_path = settings.sqlite_path();
            let detail = match std::fs::metadata(&db_path) {
                Ok(meta) => format!("sqlite at {} ({})", db_path.display(), format_size(meta.len())),
                Err(_) => format!("sqlite at {} (not created yet)", db_path.display()),
            };
            results.push(CheckResult::ok("Vector store", &detail));
        }
        VectorStoreProvider::Pinecone => results.push(CheckResult::ok(
            "Vector store",
            &format!(
                "pinecone index {} ({}/{})",
                settings.vector_store.pinecone.index_name,
                settings.vector_store.pinecone.cloud,
                settings.vector_store.pinecone.region
            ),
        )),
    }

    results
}

fn check_configuration(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let config_path = Settings::default_config_path();
    if config_path.exists() {
        results.push(CheckResult::ok("Config file", &config_path.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: spor config edit",
        ));
    }

    match Prompts::load(settings.prompts.custom_dir.as_deref(), Some(&settings.prompts.variables)) {
        Ok(_) => results.push(CheckResult::ok("Prompts", "loaded")),
        Err(e) => results.push(CheckResult::error("Prompts", &e.to_string(), "Fix chat.toml in prompts.custom_dir")),
    }

    match QueryClassifier::with_patterns(&settings.retrieval.extra_broad_patterns) {
        Ok(_) => results.push(CheckResult::ok(
            "Broad query rules",
            &format!("{} extra pattern(s)", settings.retrieval.extra_broad_patterns.len()),
        )),
        Err(e) => results.push(CheckResult::error(
            "Broad query rules",
            &e.to_string(),
            "Fix retrieval.extra_broad_patterns",
        )),
    }

    results
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_sources_is_an_error() {
        let mut settings = Settings::default();
        settings.transcript.captions = false;
        settings.transcript.asr = false;

        let checks = check_transcript_sources(&settings);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, CheckStatus::Error);
    }

    #[test]
    fn test_pinecone_key_is_checked_only_for_pinecone() {
        let mut settings = Settings::default();
        assert_eq!(check_api_keys(&settings).len(), 1);

        settings.vector_store.provider = VectorStoreProvider::Pinecone;
        settings.vector_store.pinecone.api_key_env = "SPOR_TEST_UNSET_PINECONE".to_string();
        let checks = check_api_keys(&settings);
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[1].status, CheckStatus::Error);
    }

    #[test]
    fn test_invalid_broad_pattern_is_reported() {
        let mut settings = Settings::default();
        settings.retrieval.extra_broad_patterns = vec!["(".to_string()];
        let checks = check_configuration(&settings);
        assert!(checks
            .iter()
            .any(|c| c.name == "Broad query rules" && c.status == CheckStatus::Error));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("sk-abcdefghijklmnop1234"), "sk-abcd...1234");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
