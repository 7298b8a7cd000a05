use crate::entities::prelude::*;
use crate::entities::settings;
use crate::models::settings::DEFAULTS;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert()
            .into_table(Settings)
            .columns([settings::Column::Key, settings::Column::Value])
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();

        for (key, value) in DEFAULTS {
            insert.values_panic([(*key).into(), (*value).into()]);
        }

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Settings)
            .and_where(
                Expr::col(settings::Column::Key).is_in(DEFAULTS.iter().map(|(key, _)| *key)),
            )
            .to_owned();

        manager.exec_stmt(delete).await
    }
}
