use serde::{Deserialize, Serialize};

pub const DEFAULT_COUNT: usize = 5;

fn default_count() -> usize { DEFAULT_COUNT }

/// A recommendation request: free text plus the user attributes that gate and bias it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub genre_preferences: Vec<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>, count: usize) -> Self {
        Self { text: text.into(), count, age: None, genre_preferences: Vec::new(), gender: None, country: None }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genre_preferences = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// The text actually projected: query plus any demographic words.
    pub fn query_text(&self) -> String {
        let mut text = self.text.clone();
        for extra in [&self.gender, &self.country].into_iter().flatten() {
            if !extra.trim().is_empty() {
                text.push(' ');
                text.push_str(extra.trim());
            }
        }
        text
    }
}
