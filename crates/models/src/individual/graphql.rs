//! GraphQL surface of the `individual` model.
//!
//! Field and argument names use the attribute names verbatim, so the
//! documents a peer's webservice adapter sends resolve against this
//! schema unchanged.

use std::sync::Arc;

use async_graphql::{Context, Object, Result, SimpleObject};
use serde_json::{json, Value};
use tracing::debug;

use cenote_core::catalog::Catalog;
use cenote_core::models::Record;
use cenote_core::ports::{AssociationOp, AssociationUpdate, MutationInput, Search};
use cenote_core::services::DdmService;
use cenote_graphql::{into_order, AdapterFailure, OrderInput, PageInfoType, PaginationInput, SearchInput};

use super::definition;

// -----------------------------------------------------------------------------
// Output types
// -----------------------------------------------------------------------------

/// One individual record.
#[derive(SimpleObject, Clone, Debug)]
#[graphql(rename_fields = "snake_case")]
pub struct Individual {
    pub name: String,
    pub origin: Option<String>,
    pub description: Option<String>,
    pub accession_id: Option<String>,
    pub genotype_id: Option<i64>,
    pub field_unit_id: Option<String>,
}

impl From<Record> for Individual {
    fn from(record: Record) -> Self {
        let text = |field: &str| {
            record
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            name: text("name").unwrap_or_default(),
            origin: text("origin"),
            description: text("description"),
            accession_id: text("accession_id"),
            genotype_id: record.get("genotype_id").and_then(Value::as_i64),
            field_unit_id: text("field_unit_id"),
        }
    }
}

/// One individual with the cursor that addresses it.
#[derive(SimpleObject, Clone)]
pub struct IndividualEdge {
    pub node: Individual,
    pub cursor: String,
}

/// A merged page of individuals with page metadata and the non-fatal
/// per-adapter failures collected while assembling it.
#[derive(SimpleObject)]
pub struct IndividualConnection {
    pub edges: Vec<IndividualEdge>,
    pub page_info: PageInfoType,
    pub errors: Vec<AdapterFailure>,
}

/// Aggregated count with the per-adapter failures of the fan-out.
#[derive(SimpleObject)]
pub struct IndividualCount {
    pub sum: u64,
    pub errors: Vec<AdapterFailure>,
}

// -----------------------------------------------------------------------------
// Queries
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct IndividualQuery;

#[Object(rename_args = "snake_case")]
impl IndividualQuery {
    /// Read a single individual by name.
    async fn read_one_individual<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        name: String,
    ) -> Result<Option<Individual>> {
        let catalog = ctx.data::<Arc<Catalog>>()?;
        let ddm = ctx.data::<Arc<DdmService>>()?;
        let model = catalog.model("individual")?;

        let record = ddm.read_by_id(model, &name).await?;
        Ok(record.map(Individual::from))
    }

    /// Count individuals matching the search across all adapters.
    async fn count_individuals<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        search: Option<SearchInput>,
    ) -> Result<IndividualCount> {
        let catalog = ctx.data::<Arc<Catalog>>()?;
        let ddm = ctx.data::<Arc<DdmService>>()?;
        let model = catalog.model("individual")?;

        let search = match search {
            Some(input) => input.into_search()?,
            None => Search::all(),
        };

        let result = ddm.count_records(model, &search, None).await;
        Ok(IndividualCount {
            sum: result.sum,
            errors: result.errors.into_iter().map(Into::into).collect(),
        })
    }

    /// Read a cursor-paginated window of individuals merged across all
    /// adapters.
    async fn individuals_connection<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        search: Option<SearchInput>,
        order: Option<Vec<OrderInput>>,
        pagination: Option<PaginationInput>,
    ) -> Result<IndividualConnection> {
        let catalog = ctx.data::<Arc<Catalog>>()?;
        let ddm = ctx.data::<Arc<DdmService>>()?;
        let model = catalog.model("individual")?;

        let search = match search {
            Some(input) => input.into_search()?,
            None => Search::all(),
        };
        let order = into_order(order);
        let pagination = pagination
            .map(PaginationInput::into_pagination)
            .transpose()?;

        let connection = ddm
            .read_all_cursor(
                model,
                &search,
                order.as_deref(),
                pagination.as_ref(),
                None,
            )
            .await?;

        Ok(IndividualConnection {
            edges: connection
                .edges
                .into_iter()
                .map(|edge| IndividualEdge {
                    node: Individual::from(edge.node),
                    cursor: edge.cursor.value,
                })
                .collect(),
            page_info: connection.page_info.into(),
            errors: connection.errors.into_iter().map(Into::into).collect(),
        })
    }
}

// -----------------------------------------------------------------------------
// Mutations
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct IndividualMutation;

#[Object(rename_args = "snake_case")]
impl IndividualMutation {
    /// Create an individual on the adapter that owns its name.
    #[allow(clippy::too_many_arguments)]
    async fn add_individual<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        name: String,
        origin: Option<String>,
        description: Option<String>,
        accession_id: Option<String>,
        genotype_id: Option<i64>,
        add_field_unit_id: Option<String>,
        remove_field_unit_id: Option<String>,
    ) -> Result<Individual> {
        let catalog = ctx.data::<Arc<Catalog>>()?;
        let ddm = ctx.data::<Arc<DdmService>>()?;
        let model = catalog.model("individual")?;

        debug!(name = %name, "addIndividual");
        let input = MutationInput {
            values: scalar_values(&name, origin, description, accession_id, genotype_id),
            associations: association_steps(add_field_unit_id, remove_field_unit_id),
        };
        let record = ddm.add_one(model, &input).await?;
        Ok(record.into())
    }

    /// Update an individual on the adapter that owns its name. Absent
    /// arguments leave the stored value untouched.
    #[allow(clippy::too_many_arguments)]
    async fn update_individual<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        name: String,
        origin: Option<String>,
        description: Option<String>,
        accession_id: Option<String>,
        genotype_id: Option<i64>,
        add_field_unit_id: Option<String>,
        remove_field_unit_id: Option<String>,
    ) -> Result<Individual> {
        let catalog = ctx.data::<Arc<Catalog>>()?;
        let ddm = ctx.data::<Arc<DdmService>>()?;
        let model = catalog.model("individual")?;

        debug!(name = %name, "updateIndividual");
        let input = MutationInput {
            values: scalar_values(&name, origin, description, accession_id, genotype_id),
            associations: association_steps(add_field_unit_id, remove_field_unit_id),
        };
        let record = ddm.update_one(model, &input).await?;
        Ok(record.into())
    }

    /// Delete an individual by name.
    async fn delete_individual<'ctx>(&self, ctx: &Context<'ctx>, name: String) -> Result<String> {
        let catalog = ctx.data::<Arc<Catalog>>()?;
        let ddm = ctx.data::<Arc<DdmService>>()?;
        let model = catalog.model("individual")?;

        debug!(name = %name, "deleteIndividual");
        ddm.delete_one(model, &name).await?;
        Ok("Item successfully deleted".to_string())
    }
}

fn scalar_values(
    name: &str,
    origin: Option<String>,
    description: Option<String>,
    accession_id: Option<String>,
    genotype_id: Option<i64>,
) -> Record {
    let mut values = Record::new();
    values.set("name", json!(name));
    if let Some(origin) = origin {
        values.set("origin", json!(origin));
    }
    if let Some(description) = description {
        values.set("description", json!(description));
    }
    if let Some(accession_id) = accession_id {
        values.set("accession_id", json!(accession_id));
    }
    if let Some(genotype_id) = genotype_id {
        values.set("genotype_id", json!(genotype_id));
    }
    values
}

fn association_steps(add: Option<String>, remove: Option<String>) -> Vec<AssociationUpdate> {
    let mut steps = Vec::new();
    if let Some(id) = add {
        steps.push(AssociationUpdate {
            field: "field_unit_id".to_string(),
            op: AssociationOp::Add(json!(id)),
        });
    }
    if let Some(id) = remove {
        steps.push(AssociationUpdate {
            field: "field_unit_id".to_string(),
            op: AssociationOp::Remove(json!(id)),
        });
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_to_individual() {
        let record = Record::new()
            .with("name", json!("inst1_ind_4"))
            .with("origin", json!("MX"))
            .with("genotype_id", json!(17))
            .with("field_unit_id", json!(Value::Null));

        let individual = Individual::from(record);
        assert_eq!(individual.name, "inst1_ind_4");
        assert_eq!(individual.origin.as_deref(), Some("MX"));
        assert_eq!(individual.genotype_id, Some(17));
        // Les attributs absents et les nulls JSON se lisent pareil
        assert_eq!(individual.description, None);
        assert_eq!(individual.field_unit_id, None);
    }

    #[test]
    fn test_scalar_values_skip_absent_arguments() {
        let values = scalar_values("a", None, Some("desc".into()), None, Some(3));
        assert_eq!(values.get("name"), Some(&json!("a")));
        assert_eq!(values.get("description"), Some(&json!("desc")));
        assert_eq!(values.get("genotype_id"), Some(&json!(3)));
        assert_eq!(values.get("origin"), None);
    }

    #[test]
    fn test_association_steps() {
        let steps = association_steps(Some("fu_2".into()), None);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].field, "field_unit_id");
        assert!(matches!(steps[0].op, AssociationOp::Add(_)));

        assert!(association_steps(None, None).is_empty());
    }

    #[test]
    fn test_model_is_registered_under_its_definition_name() {
        assert_eq!(definition().name, "individual");
    }
}
