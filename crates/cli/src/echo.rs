use owo_colors::OwoColorize;
use readcast_core::{Article, DownloadState};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Readcast".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Summarize articles and find their podcast audio\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print a labelled detail line under the current step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print one catalog entry
pub fn print_article(article: &Article) {
    println!("{} {}", format!("[{}]", article.id).bold().cyan(), article.title.bold());
    println!(
        "    {} · {} · {:.0} min",
        article.source.dimmed(),
        article.published_date.dimmed(),
        article.reading_time().ceil()
    );
    if !article.snippet.is_empty() {
        println!("    {}", article.snippet);
    }
}

/// Redraw the download progress line
pub fn print_download_progress(state: &DownloadState) {
    if let DownloadState::Downloading { progress } = state {
        if *progress < 0 {
            eprint!("\r{} downloading...", "↓".blue());
        } else {
            eprint!("\r{} downloading {:>3}%", "↓".blue(), progress);
        }
    }
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
