//! Publication entity
//!
//! The durable, deduplicated representation of one bibliographic
//! record. Dedup key is the PMID or, absent one, the exact title.
//! Field updates are last-write-wins overwrites. Rows are only ever
//! soft-deleted (`trashed_at`); trashed rows are invisible to dedup
//! lookups and listings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "publications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Upstream external id (PMID)
    #[sea_orm(column_type = "Text", nullable)]
    pub pmid: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub journal: String,

    /// Raw upstream date string, kept under the legacy field name
    #[sea_orm(column_type = "Text")]
    pub pubdate_raw: String,

    /// Human-facing date string
    #[sea_orm(column_type = "Text")]
    pub pubdate_display: String,

    /// Canonical `YYYY-MM-DD`; empty when no upstream date coerced
    #[sea_orm(column_type = "Text")]
    pub pubdate_iso: String,

    /// Author names joined with `", "`
    #[sea_orm(column_type = "Text")]
    pub authors: String,

    #[sea_orm(column_type = "Text")]
    pub doi: String,

    #[sea_orm(column_type = "Text")]
    pub pmcid: String,

    /// Canonical article URL
    #[sea_orm(column_type = "Text")]
    pub url: String,

    /// Externally visible sort timestamp, resynchronized from
    /// `pubdate_iso` whenever a non-empty ISO date is written
    pub published_at: Option<DateTimeWithTimeZone>,

    /// Soft-delete marker
    pub trashed_at: Option<DateTimeWithTimeZone>,

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

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        super::publication_author::Relation::Author.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::publication_author::Relation::Publication.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the row is soft-deleted
    pub fn is_trashed(&self) -> bool {
        self.trashed_at.is_some()
    }
}
