//! One renderer per page.

use maud::{html, Markup};

use crate::format::{format_date, human_readable_downloads, link_details, truncate};
use crate::models::{Category, DeveloperProfile, Listing};
use crate::session::actions;
use crate::session::catalog;
use crate::session::state::{CategoryFilter, DetailState, NavigationState, SortKey};

use super::components::{detail_href, empty_state, icon, listing_card, rating_widget, stars};

const FEATURED_EXCERPT_CHARS: usize = 150;
const LATEST_UPDATES: usize = 4;
const SCREENSHOT_PLACEHOLDER: &str = "https://placehold.co/800x600/1E1E2F/4AC0FF?text=No+Screenshot";

/// Quick links on the home page: category and the label shown for it.
const QUICK_CATEGORIES: [(Category, &str); 4] = [
    (Category::Productivity, "Productivity"),
    (Category::Games, "Fun"),
    (Category::Tools, "Tools"),
    (Category::Experiments, "Experiments"),
];

pub fn loading(interrupted: bool) -> Markup {
    html! {
        div.loading {
            div.loader {}
            h2 { "Initializing App Store..." }
            @if interrupted {
                p { "Connection interrupted. Waiting for the store to come back..." }
            } @else {
                p { "Fetching the latest listings." }
            }
        }
    }
}

pub fn home(listings: &[Listing], profile: Option<&DeveloperProfile>, site_name: &str) -> Markup {
    if listings.is_empty() && profile.is_none() {
        return empty_state(
            "database",
            "No Data Found",
            html! { "The store is empty. Publish listings and a developer profile through the admin API." },
        );
    }

    let featured = catalog::featured(listings, profile);
    let developer = profile.map_or("a developer", |p| p.name.as_str());

    html! {
        section.hero {
            h1 { "Welcome to " span.accent { (site_name) } }
            p { "Discover fun, productivity, and experimental apps built by " (developer) }
            a.button.cta href="#apps" { (icon("rocket", "icon-md")) " Browse Apps" }
        }

        @if let Some(listing) = featured {
            section.featured {
                h2 { "Featured App" }
                div.card.featured-card {
                    div {
                        h3 { (listing.name) }
                        p.tagline { (listing.tagline) }
                        p { (truncate(&listing.description, FEATURED_EXCERPT_CHARS)) }
                        a.button href=(detail_href(&listing.id)) { "View Details" }
                        span.downloads {
                            (icon("download-cloud", "icon-sm")) " " (human_readable_downloads(listing.downloads))
                        }
                    }
                    img src=(listing.screenshots.first().map_or(SCREENSHOT_PLACEHOLDER, String::as_str))
                        alt=(format!("{} screenshot", listing.name));
                }
            }
        }

        section.quick-categories {
            h2 { "Quick Categories" }
            div.grid {
                @for (category, label) in QUICK_CATEGORIES {
                    a.card.category-tile href=(format!("#apps/filter/{}", category.as_str())) {
                        (icon(category.details().icon, "icon-lg"))
                        p { (label) }
                    }
                }
            }
        }

        @if !listings.is_empty() {
            section.latest-updates {
                h2 { "Latest Updates" }
                div.ticker {
                    @for listing in listings.iter().take(LATEST_UPDATES) {
                        a.card.update-card href=(detail_href(&listing.id)) {
                            div.update-header {
                                span.name { (listing.name) }
                                span.version { (listing.version) }
                            }
                            p.date { (format_date(Some(&listing.release_date))) }
                            p { "Check out the latest updates for version " (listing.version) "." }
                        }
                    }
                }
            }
        }
    }
}

/// Distinct categories in the order they first appear.
fn present_categories(listings: &[Listing]) -> Vec<&Listing> {
    let mut seen: Vec<&Listing> = Vec::new();
    for listing in listings {
        if !seen.iter().any(|l| l.category == listing.category) {
            seen.push(listing);
        }
    }
    seen
}

pub fn catalog(listings: &[Listing], nav: &NavigationState) -> Markup {
    let shown = catalog::catalog(listings, nav.filter, nav.sort, &nav.search);

    html! {
        h1 { "The App Store" }

        form.filter-bar data-action=(actions::FILTER) {
            select name="category" {
                option value="all" selected[nav.filter == CategoryFilter::All] { "All Categories" }
                @for listing in present_categories(listings) {
                    option value=(listing.category.as_str())
                        selected[nav.filter == CategoryFilter::Only(listing.category)] {
                        (listing.category_name)
                    }
                }
            }
            select name="sort" {
                @for sort in SortKey::ALL {
                    option value=(sort.as_str()) selected[nav.sort == sort] {
                        "Sort by: " (sort.label())
                    }
                }
            }
            input type="search" name="search" placeholder="Search apps by name..." value=(nav.search);
        }

        div.grid #app-grid {
            @for listing in &shown {
                (listing_card(listing))
            }
            @if shown.is_empty() {
                p.no-results { "No apps match your filter or search." }
            }
        }
    }
}

pub fn detail(listing: &Listing, detail: Option<&DetailState>, has_rated: bool) -> Markup {
    let shots = &listing.screenshots;
    let index = detail.map_or(0, |d| d.screenshot).min(shots.len().saturating_sub(1));
    let current = shots.get(index).map(String::as_str);

    html! {
        a.back-link href="#apps" { (icon("chevron-left", "icon-md")) " Back to App Store" }

        div.detail-grid {
            div.detail-main {
                div.detail-header {
                    div.listing-icon { (icon(listing.icon_name(), "icon-xl")) }
                    div {
                        h1 { (listing.name) }
                        p.tagline { (listing.tagline) }
                    }
                }

                div.carousel {
                    @if let Some(src) = current {
                        button.screenshot type="button" data-action=(actions::OPEN_LIGHTBOX) {
                            img #app-screenshot src=(src) alt="App Screenshot";
                        }
                    } @else {
                        img #app-screenshot src=(SCREENSHOT_PLACEHOLDER) alt="No screenshot";
                    }
                    @if shots.len() > 1 {
                        (carousel_arrows())
                        p.carousel-position { (index + 1) " / " (shots.len()) }
                    }
                }

                h2 { "About the App" }
                p.description { (listing.description) }

                h2 { "What's New" }
                div.changelog {
                    @match detail.and_then(|d| d.changelog.as_ref()) {
                        None => { p.pending { "Loading changelog..." } },
                        Some(entries) if entries.is_empty() => { p { "No changelog entries found yet." } },
                        Some(entries) => {
                            @for entry in entries {
                                div.card.changelog-entry {
                                    h4 {
                                        "Version " (entry.version)
                                        " " span.date { "(" (format_date(Some(&entry.date))) ")" }
                                    }
                                    p { (entry.notes) }
                                }
                            }
                        }
                    }
                }
            }

            aside.detail-sidebar {
                div.card {
                    h3 { "Download & Stats" }
                    @if let Some(url) = &listing.package_url {
                        a.button.cta href=(url) download
                            data-action=(actions::DOWNLOAD) data-listing-id=(listing.id) {
                            (icon("download", "icon-md")) " Download Package"
                        }
                    }
                    @if let Some(url) = &listing.store_url {
                        a.button.outline href=(url) target="_blank" rel="noopener noreferrer" {
                            (icon("play", "icon-md")) " Get on the Store"
                        }
                    }
                    button.button.outline type="button"
                        data-action=(actions::SHARE) data-listing-id=(listing.id) {
                        (icon("share-2", "icon-md")) " Share App"
                    }
                    dl.stats {
                        dt { "Current Version:" } dd { (listing.version) }
                        dt { "Total Downloads:" } dd { (human_readable_downloads(listing.downloads)) }
                        dt { "Release Date:" } dd { (format_date(Some(&listing.release_date))) }
                        dt { "Rating:" }
                        dd { (stars(listing.rating)) " (" (format!("{:.1}", listing.rating)) ")" }
                    }
                }
                (rating_widget(&listing.id, has_rated))
            }
        }

        @if let (Some(src), true) = (current, detail.is_some_and(|d| d.lightbox)) {
            div.lightbox role="dialog" {
                button.lightbox-close type="button" data-action=(actions::CLOSE_LIGHTBOX) aria-label="Close" {
                    (icon("x", "icon-lg"))
                }
                img #lightbox-image src=(src) alt="Full size screenshot";
                @if shots.len() > 1 {
                    (carousel_arrows())
                }
            }
        }
    }
}

fn carousel_arrows() -> Markup {
    html! {
        button.arrow.prev type="button" data-action=(actions::PREV_SCREENSHOT) aria-label="Previous screenshot" {
            (icon("chevron-left", "icon-md"))
        }
        button.arrow.next type="button" data-action=(actions::NEXT_SCREENSHOT) aria-label="Next screenshot" {
            (icon("chevron-right", "icon-md"))
        }
    }
}

pub fn about(profile: Option<&DeveloperProfile>) -> Markup {
    let Some(profile) = profile else {
        return empty_state(
            "user-x",
            "Developer Profile Missing",
            html! { "The developer profile is not available yet." },
        );
    };

    let first_name = profile.name.split_whitespace().next().unwrap_or_default();
    let image = if profile.image_url.trim().is_empty() {
        format!("https://placehold.co/192x192/4AC0FF/0F111A?text={}", first_name)
    } else {
        profile.image_url.clone()
    };

    html! {
        div.about-header {
            h1 { "About " (profile.name) }
        }
        div.card.about {
            div.profile-card {
                img.avatar src=(image) alt=(format!("{} Profile Photo", profile.name));
                h3 { (profile.name) }
                @if !profile.city.is_empty() {
                    p.city { (profile.city) }
                }
                div.links {
                    @for link in profile.links.iter().map(|url| link_details(url)) {
                        a href=(link.url) target="_blank" rel="noopener noreferrer" aria-label=(link.label) {
                            (icon(link.icon, "icon-md"))
                            span {
                                @if link.label == link.url {
                                    (link.url.split_once("://").map_or(link.url.as_str(), |(_, rest)| rest))
                                } @else {
                                    (link.label)
                                }
                            }
                        }
                    }
                }
            }
            div.bio {
                h2 { "My Journey & Philosophy" }
                p { (profile.bio) }
                h2 { "Tech Stack & Skills" }
                div.skills {
                    @for skill in &profile.skills {
                        span.skill { (skill) }
                    }
                }
            }
        }
    }
}

pub fn updates(listings: &[Listing]) -> Markup {
    html! {
        h1 { "Latest Updates & News" }
        div.updates {
            @for listing in listings {
                div.card.update-row {
                    div {
                        h3 { (listing.name) " updated to Version " (listing.version) }
                        p { "View the app details to see the full changelog." }
                        span.date { (format_date(Some(&listing.release_date))) }
                    }
                    a.button.outline href=(detail_href(&listing.id)) { "View App" }
                }
            }
        }
        @if listings.is_empty() {
            p.no-results { "No recent updates found." }
        }
    }
}

pub fn not_found() -> Markup {
    html! {
        (empty_state(
            "alert-triangle",
            "404 - Page Not Found",
            html! { "Looks like that page is still in development or the URL is incorrect." },
        ))
        a.button href="#home" { "Go to Home" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangelogEntry;
    use crate::session::catalog::fixtures::listing;
    use crate::session::state::FetchTag;
    use chrono::Utc;

    fn detail_state(changelog: Option<Vec<ChangelogEntry>>) -> DetailState {
        DetailState {
            tag: FetchTag {
                listing_id: "a".to_string(),
                seq: 1,
            },
            changelog,
            screenshot: 0,
            lightbox: false,
        }
    }

    #[test]
    fn test_home_empty_state_and_featured() {
        let html = home(&[], None, "Shelf").into_string();
        assert!(html.contains("No Data Found"));

        let mut featured = listing("a", Category::Tools, 1, 1);
        featured.description = "x".repeat(200);
        let html = home(&[featured], None, "Shelf").into_string();
        assert!(html.contains("Featured App"));
        assert!(html.contains(&format!("{}...", "x".repeat(150))));
        assert!(html.contains("built by a developer"));
        assert!(html.contains("#apps/filter/games"));
    }

    #[test]
    fn test_catalog_controls_reflect_navigation() {
        let listings = vec![
            listing("a", Category::Tools, 5, 1),
            listing("b", Category::Games, 9, 2),
            listing("c", Category::Tools, 1, 3),
        ];
        let nav = NavigationState {
            filter: CategoryFilter::Only(Category::Tools),
            sort: SortKey::MostDownloaded,
            search: "app".to_string(),
            ..Default::default()
        };
        let html = catalog(&listings, &nav).into_string();

        assert_eq!(html.matches(r#"value="tools""#).count(), 1);
        assert!(html.contains(r#"<option value="tools" selected>Tools</option>"#));
        assert!(html.contains(r#"<option value="mostDownloaded" selected>"#));
        assert!(html.contains(r##"href="#app/a""##));
        assert!(!html.contains(r##"href="#app/b""##));
        // Most downloaded first.
        let a = html.find("#app/a").unwrap();
        let c = html.find("#app/c").unwrap();
        assert!(a < c);
    }

    #[test]
    fn test_catalog_without_matches() {
        let nav = NavigationState {
            search: "nothing".to_string(),
            ..Default::default()
        };
        let html = catalog(&[listing("a", Category::Tools, 1, 1)], &nav).into_string();
        assert!(html.contains("No apps match your filter or search."));
    }

    #[test]
    fn test_detail_changelog_states() {
        let mut app = listing("a", Category::Tools, 1, 1);
        app.package_url = Some("https://example.com/a.apk".to_string());

        let html = detail(&app, Some(&detail_state(None)), false).into_string();
        assert!(html.contains("Loading changelog..."));
        assert!(html.contains(r#"data-action="download""#));
        assert!(html.contains("Rate this app"));

        let html = detail(&app, Some(&detail_state(Some(vec![]))), true).into_string();
        assert!(html.contains("No changelog entries found yet."));
        assert!(html.contains("You have rated this app"));

        let entry = ChangelogEntry {
            version: "1.1.0".to_string(),
            date: Utc::now(),
            notes: "Faster sync".to_string(),
        };
        let html = detail(&app, Some(&detail_state(Some(vec![entry]))), false).into_string();
        assert!(html.contains("Version 1.1.0"));
        assert!(html.contains("Faster sync"));
    }

    #[test]
    fn test_detail_carousel_and_lightbox() {
        let mut app = listing("a", Category::Tools, 1, 1);
        app.screenshots = vec!["one.png".to_string(), "two.png".to_string()];

        let mut state = detail_state(Some(vec![]));
        state.screenshot = 1;
        let html = detail(&app, Some(&state), false).into_string();
        assert!(html.contains("two.png"));
        assert!(!html.contains("one.png"));
        assert!(html.contains(r#"data-action="nextScreenshot""#));
        assert!(!html.contains("lightbox-image"));

        state.lightbox = true;
        let html = detail(&app, Some(&state), false).into_string();
        assert!(html.contains("lightbox-image"));

        app.screenshots.truncate(1);
        let html = detail(&app, Some(&detail_state(Some(vec![]))), false).into_string();
        assert!(!html.contains("nextScreenshot"));
    }

    #[test]
    fn test_about_page() {
        assert!(about(None).into_string().contains("Developer Profile Missing"));

        let profile = DeveloperProfile {
            name: "Kim Lee".to_string(),
            city: "Oslo".to_string(),
            skills: vec!["Rust".to_string()],
            links: vec![
                "https://github.com/kim".to_string(),
                "https://kim.dev".to_string(),
            ],
            ..Default::default()
        };
        let html = about(Some(&profile)).into_string();
        assert!(html.contains("About Kim Lee"));
        assert!(html.contains("Oslo"));
        assert!(html.contains("GitHub"));
        assert!(html.contains("<span>kim.dev</span>"));
        assert!(html.contains("text=Kim"));
    }

    #[test]
    fn test_updates_page() {
        assert!(updates(&[]).into_string().contains("No recent updates found."));
        let html = updates(&[listing("a", Category::Tools, 1, 1)]).into_string();
        assert!(html.contains("App a updated to Version 1.0.0"));
    }
}
