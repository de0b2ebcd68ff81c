//! Display formatting for counters, dates, ratings and links.

use chrono::{DateTime, Utc};

/// Compact download counter: `1200` becomes `1.2K`, `3400000` becomes `3.4M`.
pub fn human_readable_downloads(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// `Mar 5, 2024`, or `N/A` without a timestamp.
pub fn format_date(timestamp: Option<&DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.format("%b %-d, %Y").to_string(),
        None => "N/A".to_string(),
    }
}

/// Full, half and empty stars for a 0-5 rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarBreakdown {
    pub full: usize,
    pub half: usize,
    pub empty: usize,
}

pub fn star_breakdown(rating: f64) -> StarBreakdown {
    let rating = if rating.is_finite() {
        rating.clamp(0.0, 5.0)
    } else {
        0.0
    };
    let full = rating.floor() as usize;
    let half = usize::from(rating.fract() >= 0.5);
    StarBreakdown {
        full,
        half,
        empty: 5 - full - half,
    }
}

/// Label and icon inferred from a social link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDetails {
    pub url: String,
    pub icon: &'static str,
    pub label: String,
}

pub fn link_details(url: &str) -> LinkDetails {
    let (icon, label) = if url.contains("github.com") {
        ("github", "GitHub".to_string())
    } else if url.contains("linkedin.com") {
        ("linkedin", "LinkedIn".to_string())
    } else if url.contains("twitter.com") {
        ("twitter", "Twitter".to_string())
    } else if url.contains("mailto:") {
        ("mail", "Email".to_string())
    } else {
        ("link", url.to_string())
    };
    LinkDetails {
        url: url.to_string(),
        icon,
        label,
    }
}

/// First `max_chars` characters followed by `...`; short text is returned as is.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
