use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    application::repos::{ComponentsRepo, RepoError},
    domain::components::{ComponentField, ComponentFilter, ComponentRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

const SELECT_COMPONENTS: &str = "SELECT id, user_id, component_slug, code, demo_code, \
     tailwind_config_extension, global_css_extension, compiled_css \
     FROM components WHERE ";

#[derive(sqlx::FromRow)]
struct ComponentRow {
    id: i64,
    user_id: String,
    component_slug: String,
    code: Option<String>,
    demo_code: Option<String>,
    tailwind_config_extension: Option<String>,
    global_css_extension: Option<String>,
    compiled_css: Option<String>,
}

impl From<ComponentRow> for ComponentRecord {
    fn from(row: ComponentRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.user_id,
            slug: row.component_slug,
            code_ref: row.code,
            demo_code_ref: row.demo_code,
            tailwind_extension_ref: row.tailwind_config_extension,
            global_css_extension_ref: row.global_css_extension,
            compiled_css_cache: row.compiled_css,
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ComponentFilter) {
    match filter {
        ComponentFilter::Id(id) => {
            qb.push("id = ");
            qb.push_bind(*id);
        }
        ComponentFilter::OwnerAndSlug { owner_id, slug } => {
            qb.push("user_id = ");
            qb.push_bind(owner_id.clone());
            qb.push(" AND component_slug = ");
            qb.push_bind(slug.clone());
        }
        ComponentFilter::Slug(slug) => {
            qb.push("component_slug = ");
            qb.push_bind(slug.clone());
        }
    }
}

fn select_query(filter: &ComponentFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_COMPONENTS);
    push_filter(&mut qb, filter);
    // Two rows are enough to tell "exactly one" from "ambiguous".
    qb.push(" ORDER BY id LIMIT 2");
    qb
}

fn update_query(
    id: i64,
    field: ComponentField,
    value: Option<String>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE components SET ");
    qb.push(field.as_str());
    qb.push(" = ");
    qb.push_bind(value);
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb
}

#[async_trait]
impl ComponentsRepo for PostgresRepositories {
    async fn fetch_one(&self, filter: &ComponentFilter) -> Result<ComponentRecord, RepoError> {
        let mut qb = select_query(filter);
        let rows = qb
            .build_query_as::<ComponentRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        RepoError::single(rows).map(ComponentRecord::from)
    }

    async fn update_field(
        &self,
        id: i64,
        field: ComponentField,
        value: Option<String>,
    ) -> Result<(), RepoError> {
        let mut qb = update_query(id, field, value);
        qb.build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
