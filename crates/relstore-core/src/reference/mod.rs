//! `EntityReference`/`EntityReferenceList`: the four-state wrapper around a
//! possibly-unresolved foreign key, replacing open inheritance over a
//! generic entity base class with an explicit tagged union plus fetch hook.

use crate::error::Error;
use relstore_proto::{RowId, TableRecord};
use serde_json::{json, Value as Json};

/// A reference to a single entity of type `type_name`, in one of four
/// states: null, id-only, entity-only, or both.
#[derive(Debug, Clone, Default)]
pub struct EntityReference {
    type_name: String,
    id: Option<RowId>,
    entity: Option<TableRecord>,
}

impl EntityReference {
    pub fn null(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            entity: None,
        }
    }

    pub fn from_id(type_name: impl Into<String>, id: RowId) -> Self {
        Self {
            type_name: type_name.into(),
            id: Some(id),
            entity: None,
        }
    }

    pub fn from_entity(type_name: impl Into<String>, id_field: &str, entity: TableRecord) -> Self {
        let id = entity
            .get(id_field)
            .and_then(|v| v.as_id().cloned());
        Self {
            type_name: type_name.into(),
            id,
            entity: Some(entity),
        }
    }

    pub fn is_null(&self) -> bool {
        self.id.is_none() && self.entity.is_none()
    }

    pub fn is_loaded(&self) -> bool {
        self.entity.is_some()
    }

    pub fn id(&self) -> Option<&RowId> {
        self.id.as_ref()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Fetch the entity if not already loaded, using `fetch(id, type_name)`.
    /// A failing hook surfaces as [`Error::FetchFailed`] without discarding
    /// the reference's id — the caller decides whether to retry.
    pub fn get(
        &mut self,
        fetch: impl FnOnce(&RowId, &str) -> Result<Option<TableRecord>, Error>,
    ) -> Result<Option<&TableRecord>, Error> {
        if self.entity.is_none() {
            if let Some(id) = &self.id {
                self.entity = fetch(id, &self.type_name)?;
            }
        }
        Ok(self.entity.as_ref())
    }

    pub fn set(&mut self, id_field: &str, entity: TableRecord) {
        self.id = entity.get(id_field).and_then(|v| v.as_id().cloned());
        self.entity = Some(entity);
    }

    /// Set the id directly. If the id changes, any loaded entity is
    /// discarded since it no longer corresponds to this reference's target.
    pub fn set_id(&mut self, id: RowId) {
        if self.id.as_ref() != Some(&id) {
            self.entity = None;
        }
        self.id = Some(id);
    }

    pub fn refresh(
        &mut self,
        fetch: impl FnOnce(&RowId, &str) -> Result<Option<TableRecord>, Error>,
    ) -> Result<(), Error> {
        if let Some(id) = &self.id {
            self.entity = fetch(id, &self.type_name)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Json {
        match (&self.id, &self.entity) {
            (_, Some(entity)) => json!({
                "EntityReference": self.type_name,
                "id": self.id,
                "entity": entity.to_canonical_json(),
            }),
            (Some(id), None) => json!({
                "EntityReference": self.type_name,
                "id": id,
            }),
            (None, None) => Json::Null,
        }
    }
}

impl PartialEq for EntityReference {
    /// Equal by `(type, id)` when both have ids; otherwise by identity of
    /// the loaded entity; otherwise by comparing a loaded side's derived id
    /// against the other side's id.
    fn eq(&self, other: &Self) -> bool {
        if self.type_name != other.type_name {
            return false;
        }
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => match (&self.entity, &other.entity) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

/// A reference to an ordered list of entities, with parallel id/entity
/// lists of equal length when both are present.
#[derive(Debug, Clone, Default)]
pub struct EntityReferenceList {
    type_name: String,
    ids: Vec<RowId>,
    entities: Vec<Option<TableRecord>>,
}

impl EntityReferenceList {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ids: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub fn from_ids(type_name: impl Into<String>, ids: Vec<RowId>) -> Self {
        let len = ids.len();
        Self {
            type_name: type_name.into(),
            ids,
            entities: vec![None; len],
        }
    }

    pub fn ids(&self) -> &[RowId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn push(&mut self, id: RowId, entity: Option<TableRecord>) {
        self.ids.push(id);
        self.entities.push(entity);
    }

    /// Lazily fetch the entity at `index`, filling the hole if absent.
    pub fn get_at(
        &mut self,
        index: usize,
        fetch: impl FnOnce(&RowId, &str) -> Result<Option<TableRecord>, Error>,
    ) -> Result<Option<&TableRecord>, Error> {
        if index >= self.ids.len() {
            return Ok(None);
        }
        if self.entities[index].is_none() {
            self.entities[index] = fetch(&self.ids[index], &self.type_name)?;
        }
        Ok(self.entities[index].as_ref())
    }

    pub fn to_json(&self) -> Json {
        json!({
            "EntityReferenceList": self.type_name,
            "ids": self.ids,
            "entities": self.entities.iter().map(|e| e.as_ref().map(TableRecord::to_canonical_json).unwrap_or(Json::Null)).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relstore_proto::Value;

    #[test]
    fn from_id_and_from_entity_agree_when_ids_match() {
        let mut entity = TableRecord::new();
        entity.set("id", Value::Id(RowId::Int(1)));

        let by_id = EntityReference::from_id("User", RowId::Int(1));
        let by_entity = EntityReference::from_entity("User", "id", entity);

        assert_eq!(by_id, by_entity);
    }

    #[test]
    fn set_id_discards_loaded_entity_on_change() {
        let mut entity = TableRecord::new();
        entity.set("id", Value::Id(RowId::Int(1)));
        let mut reference = EntityReference::from_entity("User", "id", entity);
        assert!(reference.is_loaded());

        reference.set_id(RowId::Int(2));
        assert!(!reference.is_loaded());
        assert_eq!(reference.id(), Some(&RowId::Int(2)));
    }

    #[test]
    fn null_reference_reports_null_and_not_loaded() {
        let reference = EntityReference::null("User");
        assert!(reference.is_null());
        assert!(!reference.is_loaded());
        assert_eq!(reference.to_json(), Json::Null);
    }

    #[test]
    fn reference_list_tracks_parallel_lengths() {
        let mut list = EntityReferenceList::from_ids("Role", vec![RowId::Int(1), RowId::Int(2)]);
        assert_eq!(list.len(), 2);
        let fetched = list
            .get_at(0, |_id, _type| {
                let mut r = TableRecord::new();
                r.set("id", Value::Id(RowId::Int(1)));
                Ok(Some(r))
            })
            .unwrap();
        assert!(fetched.is_some());
    }

    #[test]
    fn get_propagates_fetch_hook_failure() {
        let mut reference = EntityReference::from_id("User", RowId::Int(1));
        let err = reference
            .get(|_id, _type| Err(Error::FetchFailed("down".into())))
            .unwrap_err();
        assert!(matches!(err, Error::FetchFailed(_)));
    }
}
