//! Members, labels, epics, iterations and deletion for [`HttpClient`].

use serde::Deserialize;
use shortcut_core::entity::{CreatedEntity, EntityType, Member};
use shortcut_core::payload::{CreateEpic, CreateIteration, CreateLabel};
use tracing::debug;

use crate::error::Result;
use crate::http::client::HttpClient;

/// The fields shared by every created resource.
///
/// `entity_type` is not trusted from the response; the caller knows what it
/// created.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEntity {
    pub id: i64,
    #[serde(default)]
    pub app_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl RawEntity {
    pub(crate) fn into_created(self, entity_type: EntityType) -> CreatedEntity {
        CreatedEntity {
            id: self.id,
            entity_type,
            app_url: self.app_url,
            name: self.name,
            external_id: self.external_id,
        }
    }
}

impl HttpClient {
    pub(crate) fn list_members_impl(&self) -> Result<Vec<Member>> {
        let members: Vec<Member> = self.get_json("/members", &[])?;
        debug!("fetched {} members", members.len());
        Ok(members)
    }

    pub(crate) fn create_label_impl(&self, label: &CreateLabel) -> Result<CreatedEntity> {
        let raw: RawEntity = self.post_json(EntityType::Label.collection_path(), label)?;
        Ok(raw.into_created(EntityType::Label))
    }

    pub(crate) fn create_epic_impl(&self, epic: &CreateEpic) -> Result<CreatedEntity> {
        let raw: RawEntity = self.post_json(EntityType::Epic.collection_path(), epic)?;
        Ok(raw.into_created(EntityType::Epic))
    }

    pub(crate) fn create_iteration_impl(
        &self,
        iteration: &CreateIteration,
    ) -> Result<CreatedEntity> {
        let raw: RawEntity =
            self.post_json(EntityType::Iteration.collection_path(), iteration)?;
        Ok(raw.into_created(EntityType::Iteration))
    }

    pub(crate) fn delete_entity_impl(&self, entity_type: EntityType, id: i64) -> Result<()> {
        self.delete_path(&entity_type.api_path(id))
    }
}
