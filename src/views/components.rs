//! Markup shared between pages.

use maud::{html, Markup};

use crate::format::{human_readable_downloads, star_breakdown};
use crate::models::Listing;
use crate::session::actions;
use crate::session::{Notice, Route, Severity};

pub fn icon(name: &str, class: &str) -> Markup {
    html! { i data-lucide=(name) class=(class) {} }
}

/// Read-only star display for an average rating.
pub fn stars(rating: f64) -> Markup {
    let breakdown = star_breakdown(rating);
    html! {
        div.stars aria-label=(format!("{:.1} out of 5 stars", rating)) {
            @for _ in 0..breakdown.full { (icon("star", "star full")) }
            @for _ in 0..breakdown.half { (icon("star-half", "star half")) }
            @for _ in 0..breakdown.empty { (icon("star", "star empty")) }
        }
    }
}

pub fn detail_href(listing_id: &str) -> String {
    Route::Detail {
        listing_id: listing_id.to_string(),
    }
    .fragment()
}

pub fn listing_card(listing: &Listing) -> Markup {
    html! {
        a.card.listing-card href=(detail_href(&listing.id)) data-listing-id=(listing.id) {
            div.card-header {
                div.listing-icon { (icon(listing.icon_name(), "icon-lg")) }
                div {
                    h3 { (listing.name) }
                    p.meta { (listing.version) " | " (listing.category_name) }
                }
            }
            p.tagline { (listing.tagline) }
            div.card-footer {
                (stars(listing.rating))
                span.downloads { (icon("download-cloud", "icon-sm")) " " (human_readable_downloads(listing.downloads)) }
                span.button { "Explore" }
            }
        }
    }
}

/// Five clickable stars, or the confirmation once this device has rated.
pub fn rating_widget(listing_id: &str, has_rated: bool) -> Markup {
    html! {
        div.card.rating-widget {
            @if has_rated {
                h3 { "You have rated this app" }
                div.stars {
                    @for _ in 1..=5u8 { (icon("star", "star disabled")) }
                }
                p.hint { "Your rating has been recorded." }
            } @else {
                h3 { "Rate this app" }
                div.stars {
                    @for value in 1..=5u8 {
                        button.star-button type="button"
                            data-action=(actions::SUBMIT_RATING)
                            data-listing-id=(listing_id)
                            data-stars=(value)
                            aria-label=(format!("Rate {} stars", value)) {
                            (icon("star", "star"))
                        }
                    }
                }
            }
        }
    }
}

pub fn notice(notice: &Notice) -> Markup {
    let severity = match notice.severity {
        Severity::Info => "notice-info",
        Severity::Success => "notice-success",
        Severity::Error => "notice-error",
    };
    html! {
        div class=(format!("notice {}", severity)) role="status" {
            span { (notice.message) }
            button.notice-close type="button"
                data-action=(actions::DISMISS_NOTICE)
                data-id=(notice.id.to_string())
                aria-label="Dismiss" {
                (icon("x", "icon-sm"))
            }
        }
    }
}

/// Centered explanatory block used by empty and error states.
pub fn empty_state(glyph: &str, heading: &str, body: Markup) -> Markup {
    html! {
        div.empty-state {
            (icon(glyph, "icon-xl"))
            h1 { (heading) }
            p { (body) }
        }
    }
}
