//! Ad-hoc filter drawer state.
//!
//! Holds the editable condition rows behind the `q` URL parameter. Rows are
//! addressed by a stable id so the UI can edit them in any order. Picking a
//! new field always resets the row's operator to that field type's default
//! and clears its value.

use serde::Serialize;

use crate::fields::registry;
use crate::fields::{FieldType, SpaceSchema};
use crate::query::{
    build_query_string, join_list_value, parse_query, split_list_value, FieldPath, Operator,
    QueryCondition,
};
use crate::{Error, Result};

pub type ConditionId = u64;

/// One editable row of the drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftCondition {
    pub id: ConditionId,
    #[serde(serialize_with = "serialize_path")]
    pub field: Option<FieldPath>,
    pub operator: Option<Operator>,
    pub value: String,
}

fn serialize_path<S: serde::Serializer>(
    path: &Option<FieldPath>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match path {
        Some(path) => serializer.serialize_some(&path.as_path()),
        None => serializer.serialize_none(),
    }
}

impl DraftCondition {
    fn to_query_condition(&self) -> QueryCondition {
        QueryCondition {
            field: self.field.as_ref().map(FieldPath::as_path).unwrap_or_default(),
            operator: self.operator,
            value: self.value.clone(),
        }
    }

    /// Items of a list-operator value.
    pub fn list_value(&self) -> Vec<String> {
        split_list_value(&self.value)
    }
}

#[derive(Debug, Clone)]
pub struct AdhocFilterDrawer {
    schema: SpaceSchema,
    conditions: Vec<DraftCondition>,
    next_id: ConditionId,
}

impl AdhocFilterDrawer {
    /// Open the drawer on the current `q` value, if any.
    pub fn open(schema: &SpaceSchema, q: Option<&str>) -> Self {
        let mut drawer = Self {
            schema: schema.clone(),
            conditions: Vec::new(),
            next_id: 1,
        };
        for condition in q.map(parse_query).unwrap_or_default() {
            let id = drawer.allocate_id();
            drawer.conditions.push(DraftCondition {
                id,
                field: (!condition.field.is_empty()).then(|| condition.path()),
                operator: condition.operator,
                value: condition.value,
            });
        }
        tracing::debug!(
            subsystem = "query",
            component = "drawer",
            op = "open",
            conditions = drawer.conditions.len(),
            "Opened filter drawer"
        );
        drawer
    }

    fn allocate_id(&mut self) -> ConditionId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn row_mut(&mut self, id: ConditionId) -> Result<&mut DraftCondition> {
        self.conditions
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::InvalidQuery(format!("no condition with id {}", id)))
    }

    fn field_type_of(&self, path: &FieldPath) -> Result<FieldType> {
        self.schema
            .field_type_at(path)
            .ok_or_else(|| Error::UnknownField(path.as_path()))
    }

    pub fn conditions(&self) -> &[DraftCondition] {
        &self.conditions
    }

    /// Append an empty row and return its id.
    pub fn add_condition(&mut self) -> ConditionId {
        let id = self.allocate_id();
        self.conditions.push(DraftCondition {
            id,
            field: None,
            operator: None,
            value: String::new(),
        });
        id
    }

    pub fn remove_condition(&mut self, id: ConditionId) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| c.id != id);
        self.conditions.len() != before
    }

    /// Target a different field; operator and value are reset.
    pub fn set_field(&mut self, id: ConditionId, path: FieldPath) -> Result<()> {
        let field_type = self.field_type_of(&path)?;
        let operator = registry::default_operator(field_type).ok_or_else(|| {
            Error::InvalidQuery(format!("{} cannot be filtered", path.display_name()))
        })?;
        let row = self.row_mut(id)?;
        row.field = Some(path);
        row.operator = Some(operator);
        row.value.clear();
        Ok(())
    }

    /// Change the operator; it must be valid for the row's field type.
    pub fn set_operator(&mut self, id: ConditionId, operator: Operator) -> Result<()> {
        let path = self
            .conditions
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.field.clone())
            .ok_or_else(|| Error::InvalidQuery(format!("condition {} has no field", id)))?;
        let field_type = self.field_type_of(&path)?;
        if !registry::supports_operator(field_type, operator) {
            return Err(Error::InvalidQuery(format!(
                "operator '{}' does not apply to {} fields",
                operator, field_type
            )));
        }
        let row = self.row_mut(id)?;
        if row.operator.is_some_and(|old| old.is_list() != operator.is_list()) {
            row.value.clear();
        }
        row.operator = Some(operator);
        Ok(())
    }

    pub fn set_value(&mut self, id: ConditionId, value: impl Into<String>) -> Result<()> {
        self.row_mut(id)?.value = value.into();
        Ok(())
    }

    /// Set the items of a list operator (`in`, `nin`, `all`).
    pub fn set_list_value<S: AsRef<str>>(&mut self, id: ConditionId, items: &[S]) -> Result<()> {
        self.row_mut(id)?.value = join_list_value(items);
        Ok(())
    }

    /// Fields a row may target.
    pub fn available_fields(&self) -> Vec<FieldPath> {
        self.schema.filterable_paths()
    }

    /// Operators offered for a row; empty until its field is chosen.
    pub fn operators_for(&self, id: ConditionId) -> &'static [Operator] {
        self.conditions
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.field.as_ref())
            .and_then(|path| self.schema.field_type_at(path))
            .map(registry::operators)
            .unwrap_or(&[])
    }

    /// The `q` value for the current rows; `None` removes the parameter.
    pub fn query_string(&self) -> Option<String> {
        let conditions: Vec<QueryCondition> = self
            .conditions
            .iter()
            .map(DraftCondition::to_query_condition)
            .collect();
        build_query_string(&conditions)
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }
}
