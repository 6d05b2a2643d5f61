use sea_orm::{
    ActiveValue::{NotSet, Set},
    DatabaseConnection, EntityTrait, ModelTrait, QueryOrder,
};
use tracing::info;

use crate::{
    entities::{director, movie},
    error::{AppError, AppResult},
    models::{DirectorParams, MovieParams},
    movie::{Movie, now_sec},
};

#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    pub async fn find_movie(&self, id: i32) -> AppResult<Movie> {
        Movie::find(&self.db, id).await?.ok_or(AppError::NotFound("movie"))
    }

    pub async fn create_movie(&self, params: MovieParams) -> AppResult<Movie> {
        let mut movie = Movie::new();
        params.apply(&mut movie);
        self.save(movie).await
    }

    pub async fn update_movie(&self, id: i32, params: MovieParams) -> AppResult<Movie> {
        let mut movie = self.find_movie(id).await?;
        params.apply(&mut movie);
        self.save(movie).await
    }

    pub async fn movie_director(&self, id: i32) -> AppResult<Option<director::Model>> {
        let movie = self.find_movie(id).await?;
        Ok(movie.director(&self.db).await?)
    }

    pub async fn list_directors(&self) -> AppResult<Vec<director::Model>> {
        Ok(director::Entity::find().order_by_asc(director::Column::Id).all(&self.db).await?)
    }

    pub async fn find_director(&self, id: i32) -> AppResult<director::Model> {
        director::Entity::find_by_id(id).one(&self.db).await?.ok_or(AppError::NotFound("director"))
    }

    pub async fn create_director(&self, params: DirectorParams) -> AppResult<director::Model> {
        let now = now_sec();
        let model = director::ActiveModel {
            id: NotSet,
            name: Set(params.name),
            dob: Set(params.dob),
            bio: Set(params.bio),
            image: Set(params.image),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let res = director::Entity::insert(model).exec(&self.db).await?;
        info!(director_id = res.last_insert_id, "director created");
        self.find_director(res.last_insert_id).await
    }

    pub async fn director_movies(&self, id: i32) -> AppResult<Vec<Movie>> {
        let director = self.find_director(id).await?;
        let rows = director
            .find_related(movie::Entity)
            .order_by_asc(movie::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn save(&self, mut movie: Movie) -> AppResult<Movie> {
        if movie.save(&self.db).await? {
            Ok(movie)
        } else {
            Err(AppError::Invalid(movie.errors().clone()))
        }
    }
}
