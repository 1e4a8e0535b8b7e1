//! Display formatting utilities for CLI output

use colored::*;
use regex::RegexBuilder;

use crate::server::services::rag::{format_sources, SourceEntry};

const ANSWER_WIDTH: usize = 80;

/// Highlight query terms in text, case-insensitively
pub fn highlight_keywords(text: &str, terms: &[String]) -> String {
  let mut sorted: Vec<&String> = terms.iter().filter(|t| t.chars().count() > 2).collect();
  sorted.sort_by_key(|t| std::cmp::Reverse(t.len()));

  let pattern = sorted.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
  if pattern.is_empty() {
    return text.to_string();
  }

  match RegexBuilder::new(&pattern).case_insensitive(true).build() {
    Ok(regex) => regex.replace_all(text, |caps: &regex::Captures| caps[0].yellow().bold().to_string()).into_owned(),
    Err(_) => text.to_string(),
  }
}

/// Wrap text to fit within a specified width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    let mut current_line = String::new();
    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.chars().count() + 1 + word.chars().count() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(std::mem::take(&mut current_line));
        current_line = word.to_string();
      }
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

pub fn display_answer(answer: &str) {
  println!("{}", "Answer".green().bold());
  for line in wrap_text(answer.trim(), ANSWER_WIDTH) {
    println!("{line}");
  }
  println!();
}

/// Numbered source list with relevance scores
pub fn display_sources(sources: &[SourceEntry], terms: &[String]) {
  if sources.is_empty() {
    return;
  }

  println!("{} ({})", "Sources".blue().bold(), sources.len());
  for (i, source) in format_sources(sources).iter().enumerate() {
    let profile = if source.profile.is_empty() { String::new() } else { format!(" profile {}", source.profile) };
    println!(
      "  {}. {} {}{} {}",
      i + 1,
      highlight_keywords(&source.title, terms),
      source.date.cyan(),
      profile.dimmed(),
      format!("[relevance {}]", source.relevance).dimmed()
    );
  }
}
