//! Author entity
//!
//! A tracked subject whose publications are ingested. The ingestion
//! core reads these rows but never mutates them; the admin surface
//! owns creation and editing.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub name: String,

    /// Stored manual search query; may be empty
    #[sea_orm(column_type = "Text")]
    pub query: String,

    /// Optional bibliography URL; a PubMed results URL takes precedence
    /// over the manual query during resolution
    #[sea_orm(column_type = "Text", nullable)]
    pub bibliography_url: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::publication_author::Entity")]
    PublicationAuthors,
}

impl Related<super::publication_author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PublicationAuthors.def()
    }
}

impl Related<super::publication::Entity> for Entity {
    fn to() -> RelationDef {
        super::publication_author::Relation::Publication.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::publication_author::Relation::Author.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
