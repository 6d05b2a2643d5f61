use serde::Deserialize;

use crate::movie::Movie;

/// Movie attributes accepted from callers. Absent keys leave the current value alone.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieParams {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub duration: Option<i32>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub director_id: Option<i32>,
}

impl MovieParams {
    pub fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = Some(title);
        }
        if let Some(year) = self.year {
            movie.year = Some(year);
        }
        if let Some(duration) = self.duration {
            movie.duration = Some(duration);
        }
        if let Some(description) = self.description {
            movie.description = Some(description);
        }
        if let Some(image) = self.image {
            movie.image = Some(image);
        }
        if let Some(director_id) = self.director_id {
            movie.director_id = Some(director_id);
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DirectorParams {
    pub name: String,
    pub dob: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}
