use crate::chat::message::{Message, Sender};
use crate::image::types::ImagePayload;
use console::style;
use std::io::{self, Write};
use std::path::PathBuf;

pub const EMPTY_REPLY_MARKER: &str = "(empty response)";

fn width() -> usize {
    let term = console::Term::stdout();
    let terminal_width = term.size().1 as usize;
    std::cmp::min(terminal_width.saturating_sub(4), 100).max(40)
}

/// Header shown when a view is mounted.
pub fn display_view_banner(title: &str, hint: &str) {
    let width = width();
    let label = format!("─ {} ", title);
    let rule = "─".repeat(width.saturating_sub(label.chars().count()));
    println!("\n{}{}", style(&label).bold().magenta(), style(rule).dim());
    println!("{}", style(hint).dim());
}

fn sender_label(sender: Sender) -> console::StyledObject<&'static str> {
    match sender {
        Sender::User => style("You").bold().green(),
        Sender::Ai => style("Gemini").bold().blue(),
    }
}

/// Render a whole message, used for the greeting and transcript replays.
pub fn display_message(message: &Message) {
    println!("{} {}", sender_label(message.sender()), message.text());
}

/// Start of a streamed reply; fragments follow on the same line.
pub fn begin_reply() {
    print!("{} {}", sender_label(Sender::Ai), style("…").dim());
    let _ = io::stdout().flush();
}

/// Clears the pending indicator once the provider accepts the turn.
pub fn reply_opened() {
    print!("\u{8} \u{8}");
    let _ = io::stdout().flush();
}

pub fn display_fragment(fragment: &str) {
    print!("{}", fragment);
    let _ = io::stdout().flush();
}

/// Close a streamed reply. `final_text` is what the transcript holds now.
pub fn end_reply(final_text: &str, failed: bool) {
    if failed {
        println!("{}", style(final_text).red());
    } else if final_text.is_empty() {
        println!("{}", style(EMPTY_REPLY_MARKER).dim().italic());
    } else if !final_text.ends_with('\n') {
        println!();
    }
}

pub fn display_markdown(text: &str) {
    let skin = termimad::MadSkin::default();
    skin.print_text(text);
}

/// Swap a reply that was streamed raw for its rendered markdown form.
pub fn replace_with_markdown(streamed: &str) {
    let term = console::Term::stdout();
    let columns = (term.size().1 as usize).max(1);
    let rows: usize = streamed
        .split('\n')
        .map(|line| console::measure_text_width(line).div_ceil(columns).max(1))
        .sum();

    // The cursor sits at the end of the last streamed row.
    let _ = term.clear_line();
    let _ = term.clear_last_lines(rows.saturating_sub(1));
    display_markdown(streamed);
}

/// Heuristic for replies worth rendering through the markdown skin.
pub fn looks_like_markdown(text: &str) -> bool {
    text.contains("```") || text.contains('*') || text.contains('`') || text.contains('#')
}

pub fn display_generating(count: u8, aspect_ratio: &str) {
    println!(
        "{} {}",
        style("⏳").yellow(),
        style(format!(
            "Generating {} image(s) at {}...",
            count, aspect_ratio
        ))
        .dim()
    );
}

/// One line per image: index, MIME type, and size.
pub fn display_image_results(images: &[ImagePayload]) {
    if images.is_empty() {
        println!("{}", style("No images were returned.").dim());
        return;
    }

    println!("\n{}", style("🖼  GENERATED IMAGES").bold().blue());
    for (index, image) in images.iter().enumerate() {
        println!(
            "  {} {:<10} {:>8}  {}",
            style(format!("[{}]", index + 1)).bold(),
            image.mime_type(),
            format_size(image.len()),
            style(image.file_name(index)).dim()
        );
    }
}

pub fn display_saved(paths: &[PathBuf]) {
    for path in paths {
        println!("{} {}", style("💾").green(), path.display());
    }
}

pub fn display_info(message: &str) {
    println!("{}", message);
}

/// Errors are rendered apart from results, on stderr.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("⚠️ ").bold().red(), style(message).red());
}

fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < KIB * KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MiB", bytes as f64 / (KIB * KIB) as f64)
    }
}
