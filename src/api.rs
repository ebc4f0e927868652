//! HTTP client for the external recipe search endpoint. The collaborator is
//! TheMealDB's free-text search API: one `GET` with the term in the `s`
//! query parameter, answered by `{"meals": [...]}` or `{"meals": null}`
//! when nothing matched. Parsing happens here so the rest of the app only
//! ever sees the [`Recipe`] shape with its fixed ingredient slot array.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Ingredient, Recipe, INGREDIENT_SLOTS};

/// Public search endpoint of the upstream recipe database.
pub const SEARCH_ENDPOINT: &str = "https://www.themealdb.com/api/json/v1/1/search.php";

/// Hard ceiling on how long a single search request may take. A fetch is
/// never awaited by the UI, but a stuck socket should still not pin a
/// worker thread forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures a search request can produce. None of these ever reach the
/// user directly; the search controller logs them and keeps the previous
/// result list on screen.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, DNS, or timeout problems from the HTTP layer.
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("search endpoint returned HTTP {0}")]
    Status(reqwest::StatusCode),
    /// The body was not the expected JSON shape.
    #[error("malformed search response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Top-level search response. `meals` is `null` (not an empty array) when
/// the term matched nothing.
#[derive(Deserialize)]
struct SearchResponse {
    meals: Option<Vec<RawMeal>>,
}

/// Wire shape of one meal record. The twenty numbered ingredient/measure
/// fields land in the flattened map and get folded into the fixed slot
/// array by the [`Recipe`] conversion, which is the only place the dynamic
/// field names appear.
#[derive(Deserialize)]
struct RawMeal {
    #[serde(rename = "idMeal")]
    id: String,
    #[serde(rename = "strMeal")]
    name: String,
    #[serde(rename = "strCategory")]
    category: Option<String>,
    #[serde(rename = "strMealThumb")]
    thumbnail: Option<String>,
    #[serde(rename = "strInstructions")]
    instructions: Option<String>,
    #[serde(rename = "strYoutube")]
    youtube: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, Option<String>>,
}

impl From<RawMeal> for Recipe {
    fn from(raw: RawMeal) -> Self {
        let mut ingredients: [Option<Ingredient>; INGREDIENT_SLOTS] = Default::default();
        for (index, slot) in ingredients.iter_mut().enumerate() {
            let number = index + 1;
            let name = match raw
                .extra
                .get(&format!("strIngredient{number}"))
                .and_then(|value| non_blank(value.as_deref()))
            {
                Some(name) => name,
                None => continue,
            };
            let measure = raw
                .extra
                .get(&format!("strMeasure{number}"))
                .and_then(|value| non_blank(value.as_deref()))
                .unwrap_or_default();
            *slot = Some(Ingredient { name, measure });
        }

        Recipe {
            id: raw.id,
            name: raw.name,
            category: non_blank(raw.category.as_deref()),
            thumbnail: non_blank(raw.thumbnail.as_deref()),
            instructions: non_blank(raw.instructions.as_deref()),
            video_url: non_blank(raw.youtube.as_deref()),
            ingredients,
        }
    }
}

/// Normalize the API's habit of encoding "absent" as `null`, `""`, or a
/// lone space.
fn non_blank(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decode a raw response body into the domain shape. Split out from the
/// transport so it can be exercised against fixtures.
pub fn parse_search_response(body: &str) -> Result<Vec<Recipe>, ApiError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .meals
        .unwrap_or_default()
        .into_iter()
        .map(Recipe::from)
        .collect())
}

/// Blocking client for the recipe search endpoint. Cheap to clone into the
/// worker threads that perform fetches off the UI loop.
#[derive(Clone)]
pub struct RecipeApi {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl RecipeApi {
    /// Build a client against the public endpoint.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_endpoint(SEARCH_ENDPOINT)
    }

    /// Build a client against a custom endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Fetch every recipe matching `term`. An explicit "no matches" answer
    /// decodes to an empty list; transport and HTTP failures surface as
    /// [`ApiError`] for the caller to log.
    pub fn search(&self, term: &str) -> Result<Vec<Recipe>, ApiError> {
        debug!("searching recipes for {term:?}");
        let response = self.client.get(&self.endpoint).query(&[("s", term)]).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        let body = response.text()?;
        parse_search_response(&body)
    }
}
