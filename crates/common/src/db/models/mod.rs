//! SeaORM entity models

mod author;
mod publication;
mod publication_author;

pub use author::{
    ActiveModel as AuthorActiveModel, Column as AuthorColumn, Entity as AuthorEntity,
    Model as Author,
};

pub use publication::{
    ActiveModel as PublicationActiveModel, Column as PublicationColumn,
    Entity as PublicationEntity, Model as Publication,
};

pub use publication_author::{
    ActiveModel as PublicationAuthorActiveModel, Column as PublicationAuthorColumn,
    Entity as PublicationAuthorEntity, Model as PublicationAuthor,
};
