//! Adapter implementation backed by a peer federation server.

use regex::Regex;

use async_trait::async_trait;
use serde_json::{json, Value};

use cenote_core::error::{AdapterError, AdapterErrorKind, AdapterResult, RemoteError};
use cenote_core::models::{ModelDefinition, Record, ScalarType};
use cenote_core::ports::{
    Adapter, AssociationOp, Connection, CountResult, MutationInput, OrderItem, Pagination, Search,
};

use crate::client::PeerClient;
use crate::wire::{
    order_to_wire, pagination_to_wire, parse_connection, parse_count, parse_record, search_to_wire,
};

/// Configuration of one webservice adapter.
#[derive(Debug, Clone)]
pub struct WebserviceAdapterConfig {
    /// Unique adapter name within the model's registry.
    pub adapter_name: String,
    /// Anchored pattern of the id-space slice the peer owns.
    pub id_pattern: Regex,
    /// Whether the peer itself federates the model further. A
    /// delegating peer needs the local registry added to its exclusion
    /// list, otherwise records reachable from both servers would be
    /// double counted.
    pub delegating: bool,
}

/// Adapter that forwards all operations to a sibling federation server
/// over GraphQL.
pub struct WebserviceAdapter {
    client: PeerClient,
    definition: ModelDefinition,
    config: WebserviceAdapterConfig,
}

impl WebserviceAdapter {
    pub fn new(
        client: PeerClient,
        definition: ModelDefinition,
        config: WebserviceAdapterConfig,
    ) -> Self {
        Self {
            client,
            definition,
            config,
        }
    }

    fn remote_error(&self, operation: &str, err: RemoteError) -> AdapterError {
        AdapterError::new(
            &self.config.adapter_name,
            operation,
            AdapterErrorKind::Remote,
            err,
        )
    }

    fn field(&self, payload: &Value, name: &str) -> AdapterResult<Value> {
        payload.get(name).cloned().ok_or_else(|| {
            self.remote_error(
                name,
                RemoteError::Decode(format!("peer answer carries no '{name}' field")),
            )
        })
    }
}

#[async_trait]
impl Adapter for WebserviceAdapter {
    fn adapter_name(&self) -> &str {
        &self.config.adapter_name
    }

    fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    fn recognize_id(&self, id: &str) -> bool {
        self.config.id_pattern.is_match(id)
    }

    fn supports_nested_exclusion(&self) -> bool {
        self.config.delegating
    }

    async fn count_records(&self, search: &Search) -> AdapterResult<CountResult> {
        let field = format!("count{}", self.definition.name_plural_capitalized());
        let data = self
            .client
            .execute(
                &count_document(&self.definition),
                json!({ "search": search_to_wire(search) }),
            )
            .await
            .map_err(|e| self.remote_error("countRecords", e))?;

        // A delegating peer annotates a partial sum with its own nested
        // failures; they travel with the count instead of being dropped.
        parse_count(&self.field(&data, &field)?)
            .map_err(|e| self.remote_error("countRecords", e))
    }

    async fn read_all_cursor(
        &self,
        search: &Search,
        order: Option<&[OrderItem]>,
        pagination: Option<&Pagination>,
    ) -> AdapterResult<Connection> {
        let field = format!("{}Connection", self.definition.name_plural);
        let variables = json!({
            "search": search_to_wire(search),
            "order": order.map(order_to_wire),
            "pagination": pagination.map(pagination_to_wire),
        });
        let data = self
            .client
            .execute(&connection_document(&self.definition), variables)
            .await
            .map_err(|e| self.remote_error("readAllCursor", e))?;

        parse_connection(&self.field(&data, &field)?)
            .map_err(|e| self.remote_error("readAllCursor", e))
    }

    async fn read_by_id(&self, id: &str) -> AdapterResult<Option<Record>> {
        let field = format!("readOne{}", self.definition.name_capitalized());
        let data = self
            .client
            .execute(&read_one_document(&self.definition), json!({ "id": id }))
            .await
            .map_err(|e| self.remote_error("readOne", e))?;

        match self.field(&data, &field)? {
            Value::Null => Ok(None),
            payload => parse_record(&payload)
                .map(Some)
                .map_err(|e| self.remote_error("readOne", e)),
        }
    }

    async fn add_one(&self, input: &MutationInput) -> AdapterResult<Record> {
        let field = format!("add{}", self.definition.name_capitalized());
        let document = mutation_document(&self.definition, input, "add")
            .map_err(|e| self.remote_error("addOne", e))?;
        let data = self
            .client
            .execute(&document, Value::Null)
            .await
            .map_err(|e| self.remote_error("addOne", e))?;

        parse_record(&self.field(&data, &field)?).map_err(|e| self.remote_error("addOne", e))
    }

    async fn update_one(&self, input: &MutationInput) -> AdapterResult<Record> {
        let field = format!("update{}", self.definition.name_capitalized());
        let document = mutation_document(&self.definition, input, "update")
            .map_err(|e| self.remote_error("updateOne", e))?;
        let data = self
            .client
            .execute(&document, Value::Null)
            .await
            .map_err(|e| self.remote_error("updateOne", e))?;

        parse_record(&self.field(&data, &field)?).map_err(|e| self.remote_error("updateOne", e))
    }

    async fn delete_one(&self, id: &str) -> AdapterResult<()> {
        self.client
            .execute(&delete_document(&self.definition), json!({ "id": id }))
            .await
            .map_err(|e| self.remote_error("deleteOne", e))?;
        Ok(())
    }
}

// =============================================================================
// Document builders
// =============================================================================

fn selection_set(definition: &ModelDefinition) -> String {
    definition.attribute_names().collect::<Vec<_>>().join(" ")
}

const ERROR_SELECTION: &str = "errors { adapter operation kind message }";

fn count_document(definition: &ModelDefinition) -> String {
    format!(
        "query ($search: SearchInput) {{ count{}(search: $search) {{ sum {ERROR_SELECTION} }} }}",
        definition.name_plural_capitalized(),
    )
}

fn connection_document(definition: &ModelDefinition) -> String {
    format!(
        "query ($search: SearchInput, $order: [OrderInput!], $pagination: PaginationInput) {{ \
         {}Connection(search: $search, order: $order, pagination: $pagination) {{ \
         edges {{ node {{ {} }} cursor }} \
         pageInfo {{ hasNextPage hasPreviousPage startCursor endCursor }} \
         {ERROR_SELECTION} }} }}",
        definition.name_plural,
        selection_set(definition),
    )
}

/// GraphQL type of the id argument, matching the peer's declared
/// attribute type.
fn id_graphql_type(definition: &ModelDefinition) -> &'static str {
    match definition.scalar_of(&definition.id_attribute) {
        Some(ScalarType::Int) => "Int!",
        _ => "String!",
    }
}

fn read_one_document(definition: &ModelDefinition) -> String {
    format!(
        "query ($id: {}) {{ readOne{}({}: $id) {{ {} }} }}",
        id_graphql_type(definition),
        definition.name_capitalized(),
        definition.id_attribute,
        selection_set(definition),
    )
}

fn delete_document(definition: &ModelDefinition) -> String {
    format!(
        "mutation ($id: {}) {{ delete{}({}: $id) }}",
        id_graphql_type(definition),
        definition.name_capitalized(),
        definition.id_attribute,
    )
}

/// Build an add/update mutation with inline argument literals.
///
/// Attribute values and association steps become flat arguments, the
/// way the peer's mutation fields declare them. JSON literals for
/// scalars are valid GraphQL literals, so values are rendered with the
/// JSON serializer.
fn mutation_document(
    definition: &ModelDefinition,
    input: &MutationInput,
    verb: &str,
) -> Result<String, RemoteError> {
    let mut args = Vec::new();

    for attr in &definition.attributes {
        if let Some(value) = input.values.get(&attr.name) {
            args.push(format!("{}: {}", attr.name, literal(value)?));
        }
    }
    for update in &input.associations {
        let (prefix, value) = match &update.op {
            AssociationOp::Add(value) => ("add", value),
            AssociationOp::Remove(value) => ("remove", value),
        };
        args.push(format!("{prefix}_{}: {}", update.field, literal(value)?));
    }

    if args.is_empty() {
        return Err(RemoteError::Decode(
            "mutation input carries no arguments".into(),
        ));
    }

    Ok(format!(
        "mutation {{ {verb}{}({}) {{ {} }} }}",
        definition.name_capitalized(),
        args.join(", "),
        selection_set(definition),
    ))
}

fn literal(value: &Value) -> Result<String, RemoteError> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(RemoteError::Decode(format!(
            "value {value} is not a scalar mutation argument"
        ))),
        scalar => Ok(scalar.to_string()),
    }
}
