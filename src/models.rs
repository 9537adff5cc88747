//! The blog's tables: users, blogs and comments.
use crate::core::Result;
use crate::field::{next_id, unix_timestamp, Field};
use crate::model::Model;
use crate::schema::{Registry, Schema, SchemaBuilder};
use std::sync::Arc;

fn id_field() -> Field {
    Field::string().ddl("varchar(50)").primary_key().default_with(next_id)
}

fn created_at_field() -> Field {
    Field::float().default_with(unix_timestamp)
}

pub fn user_schema() -> Result<Arc<Schema>> {
    SchemaBuilder::new("User")
        .table("users")
        .field("id", id_field())
        .field("email", Field::string().ddl("varchar(50)"))
        .field("passwd", Field::string().ddl("varchar(50)"))
        .field("admin", Field::boolean())
        .field("name", Field::string().ddl("varchar(50)"))
        .field("image", Field::string().ddl("varchar(500)"))
        .field("created_at", created_at_field())
        .build()
}

pub fn blog_schema() -> Result<Arc<Schema>> {
    SchemaBuilder::new("Blog")
        .table("blogs")
        .field("id", id_field())
        .field("user_id", Field::string().ddl("varchar(50)"))
        .field("user_name", Field::string().ddl("varchar(50)"))
        .field("user_image", Field::string().ddl("varchar(500)"))
        .field("name", Field::string().ddl("varchar(50)"))
        .field("summary", Field::string().ddl("varchar(200)"))
        .field("content", Field::text())
        .field("created_at", created_at_field())
        .build()
}

pub fn comment_schema() -> Result<Arc<Schema>> {
    SchemaBuilder::new("Comment")
        .table("comments")
        .field("id", id_field())
        .field("blog_id", Field::string().ddl("varchar(50)"))
        .field("user_id", Field::string().ddl("varchar(50)"))
        .field("user_name", Field::string().ddl("varchar(50)"))
        .field("user_image", Field::string().ddl("varchar(500)"))
        .field("content", Field::text())
        .field("created_at", created_at_field())
        .build()
}

/// Model handles for the three blog tables.
#[derive(Debug, Clone)]
pub struct BlogModels {
    pub user: Model,
    pub blog: Model,
    pub comment: Model,
}

/// Registers the blog schemas and returns their model handles.
pub fn register_blog_models(registry: &mut Registry) -> Result<BlogModels> {
    Ok(BlogModels {
        user: Model::new(registry.register(user_schema()?)?),
        blog: Model::new(registry.register(blog_schema()?)?),
        comment: Model::new(registry.register(comment_schema()?)?),
    })
}
