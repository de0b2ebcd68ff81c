//! UI actions as data.
//!
//! Rendered markup names its actions through `data-action` attributes using
//! the constants below; clients post the matching [`UiAction`] back.

use serde::Deserialize;
use uuid::Uuid;

use super::state::SortKey;

pub const NAVIGATE: &str = "navigate";
pub const FILTER: &str = "filter";
pub const SUBMIT_RATING: &str = "submitRating";
pub const DOWNLOAD: &str = "download";
pub const SHARE: &str = "share";
pub const NEXT_SCREENSHOT: &str = "nextScreenshot";
pub const PREV_SCREENSHOT: &str = "prevScreenshot";
pub const OPEN_LIGHTBOX: &str = "openLightbox";
pub const CLOSE_LIGHTBOX: &str = "closeLightbox";
pub const DISMISS_NOTICE: &str = "dismissNotice";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiAction {
    Navigate {
        fragment: String,
    },
    Filter {
        #[serde(default = "all_categories")]
        category: String,
        #[serde(default)]
        sort: SortKey,
        #[serde(default)]
        search: String,
    },
    #[serde(rename_all = "camelCase")]
    SubmitRating {
        listing_id: String,
        stars: u8,
    },
    #[serde(rename_all = "camelCase")]
    Download {
        listing_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Share {
        listing_id: String,
    },
    NextScreenshot,
    PrevScreenshot,
    OpenLightbox,
    CloseLightbox,
    DismissNotice {
        id: Uuid,
    },
}

fn all_categories() -> String {
    "all".to_string()
}

impl UiAction {
    /// The `data-action` name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            UiAction::Navigate { .. } => NAVIGATE,
            UiAction::Filter { .. } => FILTER,
            UiAction::SubmitRating { .. } => SUBMIT_RATING,
            UiAction::Download { .. } => DOWNLOAD,
            UiAction::Share { .. } => SHARE,
            UiAction::NextScreenshot => NEXT_SCREENSHOT,
            UiAction::PrevScreenshot => PREV_SCREENSHOT,
            UiAction::OpenLightbox => OPEN_LIGHTBOX,
            UiAction::CloseLightbox => CLOSE_LIGHTBOX,
            UiAction::DismissNotice { .. } => DISMISS_NOTICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actions_deserialize_from_tagged_json() {
        let action: UiAction =
            serde_json::from_value(json!({ "type": "submitRating", "listingId": "a", "stars": 4 }))
                .unwrap();
        assert_eq!(
            action,
            UiAction::SubmitRating {
                listing_id: "a".to_string(),
                stars: 4
            }
        );
        assert_eq!(action.name(), SUBMIT_RATING);

        let action: UiAction = serde_json::from_value(json!({ "type": "filter" })).unwrap();
        assert_eq!(
            action,
            UiAction::Filter {
                category: "all".to_string(),
                sort: SortKey::Newest,
                search: String::new()
            }
        );

        let action: UiAction =
            serde_json::from_value(json!({ "type": "nextScreenshot" })).unwrap();
        assert_eq!(action.name(), NEXT_SCREENSHOT);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(serde_json::from_value::<UiAction>(json!({ "type": "eval", "code": "1" })).is_err());
    }
}
