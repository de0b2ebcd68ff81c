//! Page rendering.
//!
//! Markup is produced with `maud`. Pages only read the view state; clicks are
//! expressed as `href="#..."` links and `data-action` attributes that clients
//! post back as session actions.

mod components;
mod pages;

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::session::state::Page;
use crate::session::{Frame, RatingMemory, ViewState};

/// Everything a page renderer may read.
pub struct RenderContext<'a> {
    pub state: &'a ViewState,
    pub ratings: &'a RatingMemory,
    pub site_name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub title: String,
    pub html: String,
}

const NAV_LINKS: [(&str, &str, &str); 4] = [
    ("home", "#home", "Home"),
    ("apps", "#apps", "Apps"),
    ("updates", "#updates", "Updates"),
    ("about", "#about", "About"),
];

/// Render the page the state is on.
pub fn render(ctx: &RenderContext<'_>) -> Rendered {
    let state = ctx.state;
    let site = ctx.site_name;

    let (heading, markup): (Option<String>, Markup) = match state.page() {
        Page::Loading => (None, pages::loading(state.last_error.is_some())),
        Page::Home => (None, pages::home(&state.listings, state.profile.as_ref(), site)),
        Page::Catalog => (
            Some("App Store".to_string()),
            pages::catalog(&state.listings, &state.nav),
        ),
        Page::Detail => match state.selected_listing() {
            Some(listing) => (
                Some(listing.name.clone()),
                pages::detail(
                    listing,
                    state.detail.as_ref(),
                    ctx.ratings.has_rated(&listing.id),
                ),
            ),
            None => (Some("Page Not Found".to_string()), pages::not_found()),
        },
        Page::About => (Some("About".to_string()), pages::about(state.profile.as_ref())),
        Page::Updates => (Some("Updates".to_string()), pages::updates(&state.listings)),
        Page::NotFound => (Some("Page Not Found".to_string()), pages::not_found()),
    };

    Rendered {
        title: match heading {
            Some(heading) => format!("{} | {}", heading, site),
            None => site.to_string(),
        },
        html: markup.into_string(),
    }
}

/// Full HTML document around a frame, served at `/`.
pub fn document(frame: &Frame, site_name: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (frame.title) }
            }
            body data-revision=(frame.revision) data-fade-ms=(frame.fade_ms) {
                header.site-header {
                    a.brand href="#home" { (site_name) }
                    nav {
                        @for (key, href, label) in NAV_LINKS {
                            a.nav-link.active[frame.active_nav == Some(key)] href=(href) { (label) }
                        }
                    }
                }
                div #message-container {
                    @for notice in &frame.notices {
                        (components::notice(notice))
                    }
                }
                main #content data-page=(format!("{:?}", frame.page).to_lowercase()) {
                    (PreEscaped(&frame.html))
                }
            }
        }
    }
}
