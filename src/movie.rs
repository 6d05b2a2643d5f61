use sea_orm::{
    ActiveValue::{NotSet, Set, Unchanged},
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, QueryFilter,
    TransactionTrait, Value,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    entities::{director, movie},
    validation::{Errors, Field, MOVIE_RULES, Rule, ValidationError, ValidationResult},
};

/// One row of the `movies` table, persisted or not, with the errors from its last validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: Option<i32>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub duration: Option<i32>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub director_id: Option<i32>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    #[serde(skip)]
    errors: Errors,
}

impl Movie {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find<C>(db: &C, id: i32) -> Result<Option<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(movie::Entity::find_by_id(id).one(db).await?.map(Self::from))
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    /// Runs every rule in [`MOVIE_RULES`] and replaces the stored errors with the outcome.
    ///
    /// Failures are collected rather than short-circuited. Blank values are never
    /// considered duplicates, and a persisted row never collides with itself.
    pub async fn validate<C>(&mut self, db: &C) -> Result<ValidationResult, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut errors = Errors::default();

        for rule in MOVIE_RULES {
            match *rule {
                Rule::Presence(field) => {
                    if is_blank(&self.value(field)) {
                        errors.push(ValidationError::MissingRequiredField(field));
                    }
                },
                Rule::Uniqueness(field) => {
                    let value = self.value(field);
                    if !is_blank(&value) && self.is_taken(db, field, value).await? {
                        errors.push(ValidationError::DuplicateValue(field));
                    }
                },
            }
        }

        self.errors = errors.clone();
        Ok(if errors.is_empty() { Ok(()) } else { Err(errors) })
    }

    /// Validates and writes the row inside one transaction.
    ///
    /// Returns `Ok(false)` without touching the table when validation fails; the
    /// failures stay available through [`Movie::errors`].
    pub async fn save(&mut self, db: &DatabaseConnection) -> Result<bool, DbErr> {
        let txn = db.begin().await?;
        reserve_writer(&txn).await?;

        if self.validate(&txn).await?.is_err() {
            txn.rollback().await?;
            debug!(
                movie_id = ?self.id,
                errors = ?self.errors.full_messages(),
                "movie failed validation"
            );
            return Ok(false);
        }

        let now = now_sec();
        let mut model = movie::ActiveModel {
            id: NotSet,
            title: Set(self.title.clone()),
            year: Set(self.year),
            duration: Set(self.duration),
            description: Set(self.description.clone()),
            image: Set(self.image.clone()),
            director_id: Set(self.director_id),
            created_at: NotSet,
            updated_at: Set(now),
        };

        let (id, created_at) = match self.id {
            Some(id) => {
                model.id = Unchanged(id);
                movie::Entity::update(model).exec(&txn).await?;
                (id, self.created_at.unwrap_or(now))
            },
            None => {
                model.created_at = Set(now);
                let res = movie::Entity::insert(model).exec(&txn).await?;
                (res.last_insert_id, now)
            },
        };

        txn.commit().await?;

        if self.id.is_none() {
            info!(movie_id = id, title = ?self.title, "movie created");
        } else {
            debug!(movie_id = id, "movie updated");
        }

        self.id = Some(id);
        self.created_at = Some(created_at);
        self.updated_at = Some(now);
        Ok(true)
    }

    /// Looks up the director by `director_id`. A dangling or unset id yields `None`.
    pub async fn director<C>(&self, db: &C) -> Result<Option<director::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        let Some(director_id) = self.director_id else {
            return Ok(None);
        };
        director::Entity::find_by_id(director_id).one(db).await
    }

    fn value(&self, field: Field) -> Value {
        match field {
            Field::Title => self.title.clone().into(),
            Field::DirectorId => self.director_id.into(),
        }
    }

    async fn is_taken<C>(&self, db: &C, field: Field, value: Value) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut query = movie::Entity::find().filter(column(field).eq(value));
        if let Some(id) = self.id {
            query = query.filter(movie::Column::Id.ne(id));
        }
        Ok(query.one(db).await?.is_some())
    }
}

impl From<movie::Model> for Movie {
    fn from(m: movie::Model) -> Self {
        Self {
            id: Some(m.id),
            title: m.title,
            year: m.year,
            duration: m.duration,
            description: m.description,
            image: m.image,
            director_id: m.director_id,
            created_at: Some(m.created_at),
            updated_at: Some(m.updated_at),
            errors: Errors::default(),
        }
    }
}

/// Takes the SQLite write lock before anything is read, so concurrent savers queue on the
/// busy timeout and then validate against the committed winner.
async fn reserve_writer<C>(db: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    if db.get_database_backend() == DbBackend::Sqlite {
        db.execute_unprepared("UPDATE movies SET id = id WHERE 0").await?;
    }
    Ok(())
}

fn column(field: Field) -> movie::Column {
    match field {
        Field::Title => movie::Column::Title,
        Field::DirectorId => movie::Column::DirectorId,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::String(Some(s)) => s.trim().is_empty(),
        Value::String(None) | Value::Int(None) => true,
        _ => false,
    }
}

pub(crate) fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::db;

    async fn insert_director(db: &DatabaseConnection, name: &str) -> director::Model {
        let now = now_sec();
        let model = director::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            dob: Set(None),
            bio: Set(Some("Directs things.".to_string())),
            image: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let res = director::Entity::insert(model).exec(db).await.unwrap();
        director::Entity::find_by_id(res.last_insert_id).one(db).await.unwrap().unwrap()
    }

    fn candidate(title: Option<&str>, director_id: Option<i32>) -> Movie {
        Movie {
            title: title.map(str::to_string),
            director_id,
            ..Movie::new()
        }
    }

    async fn movie_count(db: &DatabaseConnection) -> u64 {
        movie::Entity::find().count(db).await.unwrap()
    }

    #[tokio::test]
    async fn missing_director_is_rejected() {
        let db = db::memory().await;
        let mut m = Movie {
            title: Some("Alien".to_string()),
            year: Some(1979),
            duration: Some(117),
            ..Movie::new()
        };

        assert!(!m.save(&db).await.unwrap());
        assert!(!m.is_persisted());
        assert_eq!(m.errors().on(Field::DirectorId), vec![ValidationError::MissingRequiredField(
            Field::DirectorId
        )]);
        assert_eq!(m.errors().full_messages(), vec!["Director can't be blank".to_string()]);
        assert_eq!(movie_count(&db).await, 0);
    }

    #[tokio::test]
    async fn zero_director_id_counts_as_present() {
        let db = db::memory().await;
        let mut m = candidate(Some("x"), Some(0));

        assert!(m.save(&db).await.unwrap());
        assert!(m.errors().is_empty());
        assert_eq!(movie_count(&db).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_of_one_title_lose_to_validation() {
        let scratch = db::scratch("concurrent-saves", 8).await;

        for round in 0..5 {
            let title = format!("Heat {round}");
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let db = scratch.db.clone();
                    let title = title.clone();
                    tokio::spawn(async move {
                        let mut m = candidate(Some(&title), Some(1));
                        let saved = m.save(&db).await.unwrap();
                        (saved, m.errors().clone())
                    })
                })
                .collect();

            let mut saved = 0;
            for handle in handles {
                let (ok, errors) = handle.await.unwrap();
                if ok {
                    saved += 1;
                } else {
                    assert_eq!(errors.on(Field::Title), vec![ValidationError::DuplicateValue(
                        Field::Title
                    )]);
                }
            }
            assert_eq!(saved, 1, "round {round}");
        }

        assert_eq!(movie_count(&scratch.db).await, 5);
    }

    #[tokio::test]
    async fn duplicate_title_is_rejected() {
        let db = db::memory().await;

        let mut first = candidate(Some("zebra"), Some(1));
        assert!(first.save(&db).await.unwrap());
        assert!(first.errors().is_empty());

        let mut second = candidate(Some("zebra"), Some(2));
        assert!(!second.save(&db).await.unwrap());
        assert_eq!(second.errors().on(Field::Title), vec![ValidationError::DuplicateValue(
            Field::Title
        )]);
        assert!(second.id.is_none());
        assert_eq!(movie_count(&db).await, 1);
    }

    #[tokio::test]
    async fn both_failures_are_reported_in_rule_order() {
        let db = db::memory().await;
        assert!(candidate(Some("zebra"), Some(1)).save(&db).await.unwrap());

        let mut n = candidate(Some("zebra"), None);
        assert!(!n.save(&db).await.unwrap());
        assert_eq!(n.errors().full_messages(), vec![
            "Director can't be blank".to_string(),
            "Title has already been taken".to_string()
        ]);
    }

    #[tokio::test]
    async fn absent_titles_never_collide() {
        let db = db::memory().await;

        assert!(candidate(None, Some(1)).save(&db).await.unwrap());
        assert!(candidate(None, Some(1)).save(&db).await.unwrap());
        assert!(candidate(Some("   "), Some(1)).save(&db).await.unwrap());
        assert!(candidate(Some("   "), Some(1)).save(&db).await.unwrap());
        assert_eq!(movie_count(&db).await, 4);
    }

    #[tokio::test]
    async fn title_comparison_is_case_sensitive() {
        let db = db::memory().await;

        assert!(candidate(Some("Zebra"), Some(1)).save(&db).await.unwrap());
        assert!(candidate(Some("zebra"), Some(1)).save(&db).await.unwrap());
    }

    #[tokio::test]
    async fn update_does_not_collide_with_itself() {
        let db = db::memory().await;
        let mut m = candidate(Some("Heat"), Some(1));
        assert!(m.save(&db).await.unwrap());
        let id = m.id.unwrap();

        m.year = Some(1995);
        assert!(m.save(&db).await.unwrap());
        assert_eq!(m.id, Some(id));
        assert!(m.errors().is_empty());

        let stored = Movie::find(&db, id).await.unwrap().unwrap();
        assert_eq!(stored.year, Some(1995));
        assert_eq!(stored.title.as_deref(), Some("Heat"));
        assert_eq!(movie_count(&db).await, 1);
    }

    #[tokio::test]
    async fn update_to_taken_title_leaves_row_unchanged() {
        let db = db::memory().await;
        assert!(candidate(Some("Heat"), Some(1)).save(&db).await.unwrap());
        let mut other = candidate(Some("Ronin"), Some(1));
        assert!(other.save(&db).await.unwrap());

        other.title = Some("Heat".to_string());
        assert!(!other.save(&db).await.unwrap());
        assert!(other.errors().contains(ValidationError::DuplicateValue(Field::Title)));

        let stored = Movie::find(&db, other.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Ronin"));
    }

    #[tokio::test]
    async fn errors_clear_after_a_successful_save() {
        let db = db::memory().await;
        let mut m = candidate(Some("Thief"), None);
        assert!(!m.save(&db).await.unwrap());
        assert_eq!(m.errors().len(), 1);

        m.director_id = Some(1);
        assert!(m.save(&db).await.unwrap());
        assert!(m.errors().is_empty());
        assert!(m.is_persisted());
        assert!(m.created_at.is_some());
    }

    #[tokio::test]
    async fn validate_does_not_write() {
        let db = db::memory().await;
        let mut m = candidate(Some("Collateral"), Some(1));

        assert_eq!(m.validate(&db).await.unwrap(), Ok(()));
        assert_eq!(movie_count(&db).await, 0);
    }

    #[tokio::test]
    async fn director_with_dangling_id_is_none() {
        let db = db::memory().await;
        let mut m = candidate(Some("Orphan"), Some(404));
        assert!(m.save(&db).await.unwrap());

        assert_eq!(m.director(&db).await.unwrap(), None);
        assert_eq!(Movie::new().director(&db).await.unwrap(), None);
    }

    #[tokio::test]
    async fn director_returns_matching_row() {
        let db = db::memory().await;
        let director = insert_director(&db, "Michael Mann").await;
        insert_director(&db, "Ridley Scott").await;

        let mut m = candidate(Some("Heat"), Some(director.id));
        assert!(m.save(&db).await.unwrap());

        assert_eq!(m.director(&db).await.unwrap(), Some(director));
    }
}
