//! Session driver.
//!
//! One task owns the [`ViewState`] and is the only place it is mutated. It
//! multiplexes the two live subscriptions, results of its own background work
//! and commands from HTTP handlers, then publishes a fresh [`Frame`] on a watch
//! channel whenever something visible changed.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use crate::config::Config;
use crate::db::RatingAggregate;
use crate::errors::AppError;
use crate::gateway::Gateway;
use crate::models::ChangelogEntry;
use crate::views::{self, RenderContext};

use super::actions::UiAction;
use super::notices::{Notice, NoticeBoard, Severity};
use super::ratings::RatingMemory;
use super::router::Route;
use super::state::{CategoryFilter, Effect, FetchTag, Page, Transition, ViewState};

/// Page fade duration the client should animate with.
pub const FADE_MS: u64 = 300;

const COMMAND_BUFFER: usize = 32;

const ALREADY_RATED: &str = "You have already rated this app.";
const RATING_FAILED: &str = "Could not submit rating. Please try again.";
const DOWNLOAD_STARTED: &str =
    "Download started! Check your notifications or downloads folder to install.";
const LINK_COPIED: &str = "Link copied to clipboard!";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub public_url: String,
    pub site_name: String,
    pub notice_ttl: Duration,
    pub settle_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            public_url: config.public_url.clone(),
            site_name: config.site_name.clone(),
            notice_ttl: config.notice_ttl,
            settle_timeout: config.settle_timeout,
        }
    }
}

/// Content the client should share or copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

/// Everything a client needs to paint the current screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub revision: u64,
    pub page: Page,
    pub location: String,
    pub title: String,
    pub active_nav: Option<&'static str>,
    pub html: String,
    pub scroll_to_top: bool,
    pub fade_ms: u64,
    /// A fetch or rating is still in flight; another frame will follow.
    pub pending: bool,
    pub ready: bool,
    pub notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<SharePayload>,
}

enum Command {
    Dispatch(UiAction, oneshot::Sender<Result<(), AppError>>),
}

/// Results of work the driver spawned itself.
enum Event {
    ChangelogLoaded {
        tag: FetchTag,
        entries: Vec<ChangelogEntry>,
    },
    RatingFinished {
        listing_id: String,
        stars: u8,
        result: Result<RatingAggregate, AppError>,
    },
    NoticeExpired(Uuid),
}

/// Cloneable access to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    frames: watch::Receiver<Frame>,
    settle_timeout: Duration,
}

impl SessionHandle {
    /// The most recently published frame.
    pub fn current(&self) -> Frame {
        self.frames.borrow().clone()
    }

    /// Receiver that observes every published frame.
    pub fn frames(&self) -> watch::Receiver<Frame> {
        self.frames.clone()
    }

    /// Run one action and return the first frame without pending work, or the
    /// latest frame once the settle timeout passes.
    pub async fn dispatch(&self, action: UiAction) -> Result<Frame, AppError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Dispatch(action, reply))
            .await
            .map_err(|_| AppError::Unavailable("Session has stopped".to_string()))?;
        outcome
            .await
            .map_err(|_| AppError::Unavailable("Session dropped the request".to_string()))??;
        Ok(self.settled().await)
    }

    pub async fn settled(&self) -> Frame {
        let mut frames = self.frames();
        let settled = tokio::time::timeout(self.settle_timeout, frames.wait_for(|f| !f.pending))
            .await
            .ok()
            .and_then(Result::ok)
            .map(|frame| frame.clone());
        settled.unwrap_or_else(|| self.current())
    }
}

/// Start the session task. It runs until every handle is dropped.
pub fn spawn(gateway: Gateway, ratings: RatingMemory, settings: SessionSettings) -> SessionHandle {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let settle_timeout = settings.settle_timeout;

    let mut driver = Driver {
        gateway,
        ratings,
        settings,
        state: ViewState::new(Route::Home),
        notices: NoticeBoard::default(),
        rating_in_flight: HashSet::new(),
        share: None,
        revision: 0,
        events: events_tx,
    };
    let (frames_tx, frames_rx) = watch::channel(driver.frame(false));

    tokio::spawn(driver.run(commands_rx, events_rx, frames_tx));

    SessionHandle {
        commands: commands_tx,
        frames: frames_rx,
        settle_timeout,
    }
}

struct Driver {
    gateway: Gateway,
    ratings: RatingMemory,
    settings: SessionSettings,
    state: ViewState,
    notices: NoticeBoard,
    rating_in_flight: HashSet<String>,
    share: Option<SharePayload>,
    revision: u64,
    events: mpsc::UnboundedSender<Event>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
        frames: watch::Sender<Frame>,
    ) {
        let mut listings = self.gateway.subscribe_listings();
        let mut profile = self.gateway.subscribe_profile();
        tracing::info!("Session started");

        loop {
            let effects = tokio::select! {
                Some(snapshot) = listings.recv() => {
                    if let Err(e) = &snapshot {
                        tracing::error!("Listings subscription error: {}", e);
                    }
                    self.state.apply(Transition::ListingsSnapshot(snapshot))
                }
                Some(snapshot) = profile.recv() => {
                    if let Err(e) = &snapshot {
                        tracing::error!("Profile subscription error: {}", e);
                    }
                    self.state.apply(Transition::ProfileSnapshot(snapshot))
                }
                Some(event) = events.recv() => self.handle_event(event).await,
                command = commands.recv() => {
                    let Some(Command::Dispatch(action, reply)) = command else {
                        tracing::info!("All session handles dropped, stopping session");
                        return;
                    };
                    match self.dispatch(action) {
                        Ok(effects) => {
                            self.execute(effects, &frames);
                            let _ = reply.send(Ok(()));
                        }
                        Err(e) => {
                            let _ = reply.send(Err(e));
                        }
                    }
                    continue;
                }
            };
            self.execute(effects, &frames);
        }
    }

    fn dispatch(&mut self, action: UiAction) -> Result<Vec<Effect>, AppError> {
        tracing::debug!("Dispatching {} action", action.name());
        self.share = None;

        let effects = match action {
            UiAction::Navigate { fragment } => {
                self.state.apply(Transition::Navigate(Route::parse(&fragment)))
            }
            UiAction::Filter {
                category,
                sort,
                search,
            } => self.state.apply(Transition::Filter {
                filter: CategoryFilter::parse(&category).unwrap_or_default(),
                sort,
                search,
            }),
            UiAction::SubmitRating { listing_id, stars } => self.submit_rating(listing_id, stars)?,
            UiAction::Download { listing_id } => self.download(listing_id),
            UiAction::Share { listing_id } => self.share(&listing_id)?,
            UiAction::NextScreenshot => self.state.apply(Transition::StepScreenshot(1)),
            UiAction::PrevScreenshot => self.state.apply(Transition::StepScreenshot(-1)),
            UiAction::OpenLightbox => self.state.apply(Transition::Lightbox(true)),
            UiAction::CloseLightbox => self.state.apply(Transition::Lightbox(false)),
            UiAction::DismissNotice { id } => {
                if self.notices.dismiss(id) {
                    redraw()
                } else {
                    Vec::new()
                }
            }
        };
        Ok(effects)
    }

    async fn handle_event(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::ChangelogLoaded { tag, entries } => {
                self.state.apply(Transition::ChangelogLoaded { tag, entries })
            }
            Event::RatingFinished {
                listing_id,
                stars,
                result,
            } => {
                self.rating_in_flight.remove(&listing_id);
                match result {
                    Ok(aggregate) => {
                        tracing::info!(
                            "Rated {} with {} stars (now {:.2}, {} stars over {} ratings)",
                            listing_id,
                            stars,
                            aggregate.rating,
                            aggregate.rating_sum,
                            aggregate.rating_count
                        );
                        if let Err(e) = self.ratings.remember(&listing_id).await {
                            tracing::warn!("Could not persist rating memory: {}", e);
                        }
                        let mut effects = self.notify(
                            Severity::Success,
                            format!("Thank you for rating {} stars!", stars),
                        );
                        effects.extend(self.state.apply(Transition::RatingRecorded {
                            listing_id,
                            aggregate,
                        }));
                        effects
                    }
                    Err(e) => {
                        tracing::warn!("Rating transaction for {} failed: {}", listing_id, e);
                        self.notify(Severity::Error, RATING_FAILED)
                    }
                }
            }
            Event::NoticeExpired(id) => {
                if self.notices.dismiss(id) {
                    redraw()
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn submit_rating(&mut self, listing_id: String, stars: u8) -> Result<Vec<Effect>, AppError> {
        if !(1..=5).contains(&stars) {
            return Err(AppError::Validation(format!(
                "Rating must be between 1 and 5 stars, got {}",
                stars
            )));
        }
        if self.ratings.has_rated(&listing_id) || self.rating_in_flight.contains(&listing_id) {
            tracing::debug!("Rejecting repeat rating of {}", listing_id);
            return Ok(self.notify(Severity::Error, ALREADY_RATED));
        }

        self.rating_in_flight.insert(listing_id.clone());
        let gateway = self.gateway.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = gateway
                .increment_rating_and_recompute(&listing_id, stars)
                .await;
            let _ = events.send(Event::RatingFinished {
                listing_id,
                stars,
                result,
            });
        });

        Ok(redraw())
    }

    fn download(&mut self, listing_id: String) -> Vec<Effect> {
        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            match gateway.increment_download_count(&listing_id).await {
                Ok(downloads) => {
                    tracing::debug!("Download count of {} is now {}", listing_id, downloads)
                }
                Err(e) => tracing::warn!("Failed to increment download count for {}: {}", listing_id, e),
            }
        });
        self.notify(Severity::Info, DOWNLOAD_STARTED)
    }

    fn share(&mut self, listing_id: &str) -> Result<Vec<Effect>, AppError> {
        let listing = self
            .state
            .listings
            .iter()
            .find(|listing| listing.id == listing_id)
            .ok_or_else(|| AppError::NotFound(format!("Listing {} not found", listing_id)))?;

        let site = &self.settings.site_name;
        self.share = Some(SharePayload {
            title: format!("Check out {} on {}", listing.name, site),
            text: format!("I found this cool app, {}, on {}!", listing.name, site),
            url: format!(
                "{}/{}",
                self.settings.public_url,
                Route::Detail {
                    listing_id: listing.id.clone()
                }
                .fragment()
            ),
        });
        Ok(self.notify(Severity::Info, LINK_COPIED))
    }

    /// Show a notice and schedule its removal.
    fn notify(&mut self, severity: Severity, message: impl Into<String>) -> Vec<Effect> {
        let id = self.notices.push(severity, message);
        let events = self.events.clone();
        let ttl = self.settings.notice_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let _ = events.send(Event::NoticeExpired(id));
        });
        redraw()
    }

    fn execute(&mut self, effects: Vec<Effect>, frames: &watch::Sender<Frame>) {
        let mut render: Option<bool> = None;
        for effect in effects {
            match effect {
                Effect::Render { scroll_to_top } => {
                    render = Some(render.unwrap_or(false) || scroll_to_top);
                }
                Effect::FetchChangelog(tag) => self.fetch_changelog(tag),
            }
        }
        if let Some(scroll_to_top) = render {
            let frame = self.frame(scroll_to_top);
            tracing::debug!(
                "Publishing frame {} ({:?}, pending: {})",
                frame.revision,
                frame.page,
                frame.pending
            );
            frames.send_replace(frame);
        }
    }

    fn fetch_changelog(&self, tag: FetchTag) {
        let gateway = self.gateway.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let entries = gateway.fetch_changelog(&tag.listing_id).await;
            let _ = events.send(Event::ChangelogLoaded { tag, entries });
        });
    }

    fn frame(&mut self, scroll_to_top: bool) -> Frame {
        self.revision += 1;
        let rendered = views::render(&RenderContext {
            state: &self.state,
            ratings: &self.ratings,
            site_name: &self.settings.site_name,
        });
        let page = self.state.page();

        Frame {
            revision: self.revision,
            page,
            location: self.state.location.fragment(),
            title: rendered.title,
            active_nav: page.nav_key(),
            html: rendered.html,
            scroll_to_top,
            fade_ms: FADE_MS,
            pending: self.state.is_pending() || !self.rating_in_flight.is_empty(),
            ready: self.state.gate.is_ready(),
            notices: self.notices.active().to_vec(),
            share: self.share.clone(),
        }
    }
}

fn redraw() -> Vec<Effect> {
    vec![Effect::Render {
        scroll_to_top: false,
    }]
}
