pub use sea_orm_migration::prelude::*;

mod m20240213_000001_create_directors;
mod m20240213_000002_create_movies;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240213_000001_create_directors::Migration),
            Box::new(m20240213_000002_create_movies::Migration),
        ]
    }
}
