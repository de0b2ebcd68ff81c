//! Location-fragment routing.

use super::state::CategoryFilter;

/// A parsed location fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    /// `None` keeps whatever category filter is already active.
    Catalog { filter: Option<CategoryFilter> },
    Detail { listing_id: String },
    About,
    Updates,
}

impl Route {
    /// Parse `#apps/filter/tools` style fragments. Anything unrecognised is home.
    pub fn parse(fragment: &str) -> Self {
        let path = fragment.trim().trim_start_matches('#');
        let mut segments = path.split('/');
        let head = segments.next().unwrap_or_default();
        let params: Vec<&str> = segments.collect();

        match head {
            "home" => Route::Home,
            "apps" => {
                let filter = match params.as_slice() {
                    ["filter", id, ..] => CategoryFilter::parse(id).unwrap_or_else(|| {
                        tracing::debug!("Unknown category filter {:?}, showing all", id);
                        CategoryFilter::All
                    }),
                    _ => CategoryFilter::All,
                };
                Route::Catalog {
                    filter: Some(filter),
                }
            }
            "app" => match params.first().filter(|id| !id.is_empty()) {
                Some(id) => Route::Detail {
                    listing_id: id.to_string(),
                },
                None => Route::Catalog { filter: None },
            },
            "about" => Route::About,
            "updates" => Route::Updates,
            _ => Route::Home,
        }
    }

    /// Canonical fragment for this route.
    pub fn fragment(&self) -> String {
        match self {
            Route::Home => "#home".to_string(),
            Route::Catalog {
                filter: Some(CategoryFilter::Only(category)),
            } => format!("#apps/filter/{}", category.as_str()),
            Route::Catalog { .. } => "#apps".to_string(),
            Route::Detail { listing_id } => format!("#app/{}", listing_id),
            Route::About => "#about".to_string(),
            Route::Updates => "#updates".to_string(),
        }
    }
}
