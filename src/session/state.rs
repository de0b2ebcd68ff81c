//! View state of a browsing session.
//!
//! All mutation goes through [`ViewState::apply`], which returns the effects
//! the driver has to carry out (render, fetch). Nothing here touches I/O.

use serde::{Deserialize, Serialize};

use crate::db::RatingAggregate;
use crate::errors::AppError;
use crate::gateway::Snapshot;
use crate::models::{Category, ChangelogEntry, DeveloperProfile, Listing};

use super::router::Route;

/// Logical page currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Page {
    Home,
    Catalog,
    Detail,
    About,
    Updates,
    NotFound,
    Loading,
}

impl Page {
    /// Navigation entry to highlight. Detail pages belong to the catalog.
    pub fn nav_key(&self) -> Option<&'static str> {
        match self {
            Page::Home => Some("home"),
            Page::Catalog | Page::Detail => Some("apps"),
            Page::About => Some("about"),
            Page::Updates => Some("updates"),
            Page::NotFound | Page::Loading => None,
        }
    }
}

/// Active category filter on the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn parse(id: &str) -> Option<Self> {
        if id.trim().eq_ignore_ascii_case("all") {
            Some(CategoryFilter::All)
        } else {
            Category::from_id(id).map(CategoryFilter::Only)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Only(category) => category.as_str(),
        }
    }
}

/// Catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Newest,
    #[serde(alias = "Most Downloaded")]
    MostDownloaded,
}

impl SortKey {
    pub const ALL: [SortKey; 2] = [SortKey::Newest, SortKey::MostDownloaded];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::MostDownloaded => "mostDownloaded",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Newest => "Newest",
            SortKey::MostDownloaded => "Most Downloaded",
        }
    }
}

/// Where the user is and how the catalog is narrowed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationState {
    pub page: Option<Page>,
    pub filter: CategoryFilter,
    pub sort: SortKey,
    pub search: String,
    /// Only meaningful while `page` is `Detail`.
    pub selected: Option<String>,
}

/// Two-flag join over the first snapshot of each subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadinessGate {
    listings_loaded: bool,
    profile_loaded: bool,
    ready: bool,
}

impl ReadinessGate {
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns `true` when this call opened the gate.
    pub fn listings_loaded(&mut self) -> bool {
        self.listings_loaded = true;
        self.update()
    }

    /// Returns `true` when this call opened the gate.
    pub fn profile_loaded(&mut self) -> bool {
        self.profile_loaded = true;
        self.update()
    }

    pub fn listings_failed(&mut self) {
        self.listings_loaded = false;
        self.ready = false;
    }

    pub fn profile_failed(&mut self) {
        self.profile_loaded = false;
        self.ready = false;
    }

    fn update(&mut self) -> bool {
        let opened = !self.ready && self.listings_loaded && self.profile_loaded;
        if opened {
            self.ready = true;
        }
        opened
    }
}

/// Identifies one changelog fetch. A result only lands if its tag still
/// matches the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTag {
    pub listing_id: String,
    pub seq: u64,
}

/// Per-visit state of the detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailState {
    pub tag: FetchTag,
    /// `None` while the fetch is in flight.
    pub changelog: Option<Vec<ChangelogEntry>>,
    pub screenshot: usize,
    pub lightbox: bool,
}

/// Inputs to the state machine.
#[derive(Debug)]
pub enum Transition {
    ListingsSnapshot(Snapshot<Vec<Listing>>),
    ProfileSnapshot(Snapshot<Option<DeveloperProfile>>),
    Navigate(Route),
    Filter {
        filter: CategoryFilter,
        sort: SortKey,
        search: String,
    },
    ChangelogLoaded {
        tag: FetchTag,
        entries: Vec<ChangelogEntry>,
    },
    RatingRecorded {
        listing_id: String,
        aggregate: RatingAggregate,
    },
    StepScreenshot(isize),
    Lightbox(bool),
}

/// Work the driver carries out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Render { scroll_to_top: bool },
    FetchChangelog(FetchTag),
}

#[derive(Debug, Default)]
pub struct ViewState {
    pub listings: Vec<Listing>,
    pub profile: Option<DeveloperProfile>,
    pub gate: ReadinessGate,
    pub nav: NavigationState,
    /// Current location fragment, replayed when the gate opens.
    pub location: Route,
    pub detail: Option<DetailState>,
    /// Most recent subscription failure, cleared once the gate is open again.
    pub last_error: Option<AppError>,
    fetch_seq: u64,
}

impl ViewState {
    pub fn new(location: Route) -> Self {
        Self {
            location,
            ..Default::default()
        }
    }

    /// The page actually shown: loading until the gate is open, not-found for
    /// a detail selection that does not resolve.
    pub fn page(&self) -> Page {
        if !self.gate.is_ready() {
            return Page::Loading;
        }
        match self.nav.page.unwrap_or(Page::Home) {
            Page::Detail if self.selected_listing().is_none() => Page::NotFound,
            page => page,
        }
    }

    /// The listing the detail page is showing.
    pub fn selected_listing(&self) -> Option<&Listing> {
        let id = self.nav.selected.as_deref()?;
        self.listings.iter().find(|listing| listing.id == id)
    }

    /// A detail page is waiting for its changelog.
    pub fn is_pending(&self) -> bool {
        self.page() == Page::Detail
            && self
                .detail
                .as_ref()
                .is_some_and(|detail| detail.changelog.is_none())
    }

    /// The single entry point for state changes.
    pub fn apply(&mut self, transition: Transition) -> Vec<Effect> {
        match transition {
            Transition::ListingsSnapshot(Ok(listings)) => {
                tracing::debug!("Listings snapshot with {} entries", listings.len());
                self.listings = listings;
                let opened = self.gate.listings_loaded();
                if self.gate.is_ready() {
                    self.last_error = None;
                }
                self.after_snapshot(opened)
            }
            Transition::ListingsSnapshot(Err(e)) => {
                self.gate.listings_failed();
                self.last_error = Some(e);
                render(false)
            }
            Transition::ProfileSnapshot(Ok(profile)) => {
                tracing::debug!("Profile snapshot (present: {})", profile.is_some());
                self.profile = profile;
                let opened = self.gate.profile_loaded();
                if self.gate.is_ready() {
                    self.last_error = None;
                }
                self.after_snapshot(opened)
            }
            Transition::ProfileSnapshot(Err(e)) => {
                self.gate.profile_failed();
                self.last_error = Some(e);
                render(false)
            }
            Transition::Navigate(route) => {
                self.location = route.clone();
                if !self.gate.is_ready() {
                    return render(false);
                }
                self.enter(route)
            }
            Transition::Filter {
                filter,
                sort,
                search,
            } => {
                self.nav.filter = filter;
                self.nav.sort = sort;
                self.nav.search = search;
                self.nav.page = Some(Page::Catalog);
                self.nav.selected = None;
                self.detail = None;
                self.location = Route::Catalog {
                    filter: Some(filter),
                };
                render(false)
            }
            Transition::ChangelogLoaded { tag, entries } => {
                match self.detail.as_mut() {
                    Some(detail) if detail.tag == tag && self.nav.page == Some(Page::Detail) => {
                        detail.changelog = Some(entries);
                        render(false)
                    }
                    _ => {
                        tracing::debug!("Discarding stale changelog for {}", tag.listing_id);
                        Vec::new()
                    }
                }
            }
            Transition::RatingRecorded {
                listing_id,
                aggregate,
            } => {
                // The last listings snapshot may predate the commit.
                if let Some(listing) = self.listings.iter_mut().find(|l| l.id == listing_id) {
                    listing.rating = aggregate.rating;
                    listing.rating_count = aggregate.rating_count;
                    listing.rating_sum = aggregate.rating_sum;
                }
                if self.page() == Page::Detail && self.nav.selected.as_deref() == Some(listing_id.as_str()) {
                    let tag = self.next_tag(&listing_id);
                    if let Some(detail) = self.detail.as_mut() {
                        detail.tag = tag.clone();
                    }
                    vec![
                        Effect::Render {
                            scroll_to_top: false,
                        },
                        Effect::FetchChangelog(tag),
                    ]
                } else {
                    Vec::new()
                }
            }
            Transition::StepScreenshot(step) => {
                let count = self.selected_listing().map_or(0, |l| l.screenshots.len());
                match self.detail.as_mut() {
                    Some(detail) if count > 0 => {
                        let count = count as isize;
                        let next = (detail.screenshot as isize + step).rem_euclid(count);
                        detail.screenshot = next as usize;
                        render(false)
                    }
                    _ => Vec::new(),
                }
            }
            Transition::Lightbox(open) => {
                let has_screenshots = self
                    .selected_listing()
                    .is_some_and(|l| !l.screenshots.is_empty());
                match self.detail.as_mut() {
                    Some(detail) if has_screenshots || !open => {
                        detail.lightbox = open;
                        render(false)
                    }
                    _ => Vec::new(),
                }
            }
        }
    }

    /// A subscription delivered data. Replays the location when the gate just
    /// opened, otherwise refreshes whatever is on screen.
    fn after_snapshot(&mut self, opened: bool) -> Vec<Effect> {
        if opened {
            tracing::info!("Data ready, routing to {}", self.location.fragment());
            return self.enter(self.location.clone());
        }
        if !self.gate.is_ready() {
            return Vec::new();
        }
        if self.nav.page == Some(Page::Detail) && self.selected_listing().is_none() {
            tracing::debug!("Selected listing disappeared, returning to catalog");
            return self.enter(Route::Catalog { filter: None });
        }
        render(false)
    }

    fn enter(&mut self, route: Route) -> Vec<Effect> {
        if !matches!(route, Route::Detail { .. }) {
            self.nav.selected = None;
            self.detail = None;
        }

        let page = match &route {
            Route::Home => Page::Home,
            Route::Catalog { filter } => {
                if let Some(filter) = filter {
                    self.nav.filter = *filter;
                }
                Page::Catalog
            }
            Route::About => Page::About,
            Route::Updates => Page::Updates,
            Route::Detail { listing_id } => return self.enter_detail(listing_id.clone()),
        };

        self.nav.page = Some(page);
        self.location = route;
        render(true)
    }

    fn enter_detail(&mut self, listing_id: String) -> Vec<Effect> {
        if !self.listings.iter().any(|listing| listing.id == listing_id) {
            tracing::debug!("Listing {} not loaded, redirecting to catalog", listing_id);
            return self.enter(Route::Catalog { filter: None });
        }

        let tag = self.next_tag(&listing_id);
        self.nav.page = Some(Page::Detail);
        self.nav.selected = Some(listing_id.clone());
        self.location = Route::Detail { listing_id };
        self.detail = Some(DetailState {
            tag: tag.clone(),
            changelog: None,
            screenshot: 0,
            lightbox: false,
        });

        vec![
            Effect::Render {
                scroll_to_top: true,
            },
            Effect::FetchChangelog(tag),
        ]
    }

    fn next_tag(&mut self, listing_id: &str) -> FetchTag {
        self.fetch_seq += 1;
        FetchTag {
            listing_id: listing_id.to_string(),
            seq: self.fetch_seq,
        }
    }
}

fn render(scroll_to_top: bool) -> Vec<Effect> {
    vec![Effect::Render { scroll_to_top }]
}
