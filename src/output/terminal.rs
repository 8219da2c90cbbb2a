// Colored terminal output for feed pages.
//
// This module handles all terminal-specific formatting. The main.rs
// display paths delegate here.

use chrono::Utc;
use colored::Colorize;

use super::truncate_chars;
use crate::feed::{FeedItem, FeedPage};

/// Display one feed page in the terminal.
pub fn display_feed_page(page: &FeedPage, mode_label: &str) {
    if page.items.is_empty() {
        println!("Nothing here yet.");
        return;
    }

    println!(
        "\n{}",
        format!("=== {} feed ({} logs) ===", mode_label, page.items.len()).bold()
    );
    println!();

    for item in &page.items {
        display_item(item);
    }

    match page.next_cursor {
        Some(cursor) => println!(
            "  {}",
            format!("More available — continue with --cursor {}", cursor.to_rfc3339()).dimmed()
        ),
        None => println!("  {}", "End of feed.".dimmed()),
    }
}

fn display_item(item: &FeedItem) {
    let handle = match &item.author {
        Some(profile) => format!("@{}", profile.username),
        None => "[deleted account]".to_string(),
    };
    let age = format_age(item);

    let mut markers = String::new();
    if item.viewer_has_liked {
        markers.push_str(&format!(" {}", "♥".red()));
    }
    if item.viewer_has_relogged {
        markers.push_str(&format!(" {}", "↻".green()));
    }

    println!("  {} {} {}{}", handle.bold(), "·".dimmed(), age.dimmed(), markers);
    println!("    {}", truncate_chars(&item.log.content, 120));
    println!(
        "    {}",
        format!(
            "{} likes · {} comments · {} relogs",
            item.likes_count, item.comments_count, item.relogs_count
        )
        .dimmed()
    );
    println!();
}

fn format_age(item: &FeedItem) -> String {
    let minutes = (Utc::now() - item.log.created_at).num_minutes().max(0);
    match minutes {
        0..=59 => format!("{minutes}m"),
        60..=1439 => format!("{}h", minutes / 60),
        _ => format!("{}d", minutes / 1440),
    }
}
