use serde::{Deserialize, Serialize};

/// Kind of event linking a user to a content item.
///
/// Mirrors the `interaction_type` column of the upstream `user_interactions`
/// table. Kinds without an explicit rating carry an implied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Like,
    Dislike,
    Rating,
}

impl InteractionKind {
    /// Rating implied by the interaction kind when none is given explicitly:
    /// like = 5.0, dislike = 1.0, anything else = 3.0.
    pub fn implied_rating(self) -> f64 {
        match self {
            InteractionKind::Like => 5.0,
            InteractionKind::Dislike => 1.0,
            InteractionKind::View | InteractionKind::Rating => 3.0,
        }
    }
}

/// A single user–content interaction in the working set.
///
/// The rating is already effective (implied ratings resolved at load time);
/// the kind is carried through for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: i64,
    pub content_id: i64,
    pub rating: f64,
    pub kind: InteractionKind,
}

impl Interaction {
    pub fn new(user_id: i64, content_id: i64, rating: f64, kind: InteractionKind) -> Self {
        Self {
            user_id,
            content_id,
            rating,
            kind,
        }
    }
}

/// An interaction submitted through the API, before the implied-rating
/// mapping is applied by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInteraction {
    pub user_id: i64,
    pub content_id: i64,
    pub interaction_type: InteractionKind,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// A recommendable content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub content_id: i64,
    pub title: String,
}

/// A single ranked recommendation returned to the caller.
///
/// Scores are normalized to [0, 1] within one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub content_id: i64,
    pub score: f64,
    pub title: String,
}

/// Recommendation strategy selector.
///
/// A closed enum rather than a free-form string tag: an unrecognized value
/// fails deserialization instead of silently running the default path. An
/// omitted field still means `Similarity`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Similarity,
    Popularity,
}
