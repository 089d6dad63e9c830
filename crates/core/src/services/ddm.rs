//! Distributed data model aggregator.
//!
//! [`DdmService`] implements the federated operations of a logical
//! model over its adapter registry. Reads fan out to every responsible
//! adapter concurrently, demote per-adapter failures to collected
//! values, then merge, re-order and re-paginate the surviving partial
//! results into one global window. Mutations and id reads are routed to
//! the single adapter whose `recognize_id` predicate claims the id.
//!
//! Once a fan-out has begun, no adapter failure aborts the aggregate:
//! partial data plus its error list is always preferable to losing the
//! healthy sites' answers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::catalog::LogicalModel;
use crate::error::{AdapterError, AdapterErrorKind, AdapterResult, ModelError, ModelResult};
use crate::metrics::{record_adapter_error, record_fanout_calls, record_operation, FanoutTimer};
use crate::models::Record;
use crate::ports::{
    default_order, Adapter, Connection, CountResult, MemorySource, MutationInput, OrderItem,
    Pagination, Search,
};
use crate::services::paginator::{paginate, PaginatorConfig};

/// Aggregator configuration.
#[derive(Debug, Clone)]
pub struct DdmConfig {
    /// Bounded wait applied to every per-adapter sub-call. An elapsed
    /// wait becomes a collected timeout error, never a hang of the
    /// whole fan-out.
    pub adapter_timeout: Duration,
    /// Maximum window size for the merged re-pagination.
    pub limit_records: u64,
}

impl Default for DdmConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(30),
            limit_records: 10_000,
        }
    }
}

/// Federated operations over one logical model's adapter registry.
pub struct DdmService {
    config: DdmConfig,
}

impl DdmService {
    pub fn new(config: DdmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DdmConfig {
        &self.config
    }

    // =========================================================================
    // Fan-out reads
    // =========================================================================

    /// Count matching records across all responsible adapters.
    ///
    /// The aggregate is the arithmetic sum of the successful per-adapter
    /// counts; failing adapters contribute an error entry instead of
    /// aborting the sum. Nested failures a delegating adapter carries in
    /// its own partial count are folded into the same error list.
    pub async fn count_records(
        &self,
        model: &LogicalModel,
        search: &Search,
        authorized_adapters: Option<&[String]>,
    ) -> CountResult {
        record_operation("countRecords", &model.definition().name);
        let _timer = FanoutTimer::new();

        let calls = self.fan_out(model, search, authorized_adapters, |adapter, search| {
            Box::pin(async move { adapter.count_records(&search).await })
        });
        let (partials, mut errors) = self.join_settled(calls).await;

        let mut sum = 0;
        for partial in partials {
            sum += partial.sum;
            errors.extend(partial.errors);
        }
        CountResult { sum, errors }
    }

    /// Read one globally ordered, cursor-paginated window across all
    /// responsible adapters.
    ///
    /// Pagination arguments are validated synchronously before any
    /// adapter is contacted. Each adapter then answers its own local
    /// window for the same arguments; the aggregate flattens the local
    /// windows, re-orders them under the shared comparison policy and
    /// re-paginates the merged set in memory with the very same
    /// paginator the adapters use, so the global window obeys identical
    /// rules. `hasNextPage`/`hasPreviousPage` of the merged page are
    /// OR-ed with the local flags: if any site had more, the federation
    /// has more.
    pub async fn read_all_cursor(
        &self,
        model: &LogicalModel,
        search: &Search,
        order: Option<&[OrderItem]>,
        pagination: Option<&Pagination>,
        authorized_adapters: Option<&[String]>,
    ) -> ModelResult<Connection> {
        // Reject illegal argument combinations before any fan-out.
        if let Some(pagination) = pagination {
            pagination.validate().map_err(ModelError::Query)?;
        }

        record_operation("readAllCursor", &model.definition().name);
        let _timer = FanoutTimer::new();

        let order_owned: Option<Vec<OrderItem>> = order.map(|o| o.to_vec());
        let pagination_owned: Option<Pagination> = pagination.cloned();

        let calls = self.fan_out(model, search, authorized_adapters, move |adapter, search| {
            let order = order_owned.clone();
            let pagination = pagination_owned.clone();
            Box::pin(async move {
                adapter
                    .read_all_cursor(&search, order.as_deref(), pagination.as_ref())
                    .await
            })
        });
        let (pages, mut errors) = self.join_settled(calls).await;

        // Phase 1: flatten the local windows and remember whether any
        // site reported more data on either side.
        let mut nodes: Vec<Record> = Vec::new();
        let mut sticky_has_next = false;
        let mut sticky_has_previous = false;
        for page in pages {
            sticky_has_next |= page.page_info.has_next_page;
            sticky_has_previous |= page.page_info.has_previous_page;
            errors.extend(page.errors);
            nodes.extend(page.edges.into_iter().map(|edge| edge.node));
        }

        // Phase 2: re-order and re-paginate the merged set in memory.
        let merged_order = match order {
            Some(order) => order.to_vec(),
            None => default_order(model.definition()),
        };
        let default_window;
        let effective_pagination = match pagination {
            Some(p) => p,
            None => {
                // Unpaginated merged read: window the whole merged set,
                // capped at the configured maximum.
                let first = (nodes.len() as u64).min(self.config.limit_records);
                default_window = Pagination::forward(first, None);
                &default_window
            }
        };

        let source = MemorySource::new(model.definition().clone(), nodes);
        let paginator_config = PaginatorConfig {
            limit_records: self.config.limit_records,
        };
        let mut connection = paginate(
            &source,
            search.argument.as_ref(),
            Some(&merged_order),
            Some(effective_pagination),
            &paginator_config,
        )
        .await
        .map_err(ModelError::Query)?;

        connection.page_info.has_next_page |= sticky_has_next;
        connection.page_info.has_previous_page |= sticky_has_previous;
        connection.errors = errors;
        Ok(connection)
    }

    // =========================================================================
    // Routed operations
    // =========================================================================

    /// Read one record via the single adapter that owns its id.
    pub async fn read_by_id(&self, model: &LogicalModel, id: &str) -> ModelResult<Option<Record>> {
        record_operation("readOne", &model.definition().name);
        let adapter = model.adapter_for_id(id)?;
        let record = self
            .bounded(adapter, "readOne", adapter.read_by_id(id))
            .await?;
        Ok(record)
    }

    /// Create a record on the adapter that owns its id.
    pub async fn add_one(&self, model: &LogicalModel, input: &MutationInput) -> ModelResult<Record> {
        record_operation("addOne", &model.definition().name);
        let id = self.require_id(model, input)?;
        let adapter = model.adapter_for_id(&id)?;
        let record = self
            .bounded(adapter, "addOne", adapter.add_one(input))
            .await?;
        Ok(record)
    }

    /// Update a record on the adapter that owns its id.
    pub async fn update_one(
        &self,
        model: &LogicalModel,
        input: &MutationInput,
    ) -> ModelResult<Record> {
        record_operation("updateOne", &model.definition().name);
        let id = self.require_id(model, input)?;
        let adapter = model.adapter_for_id(&id)?;
        let record = self
            .bounded(adapter, "updateOne", adapter.update_one(input))
            .await?;
        Ok(record)
    }

    /// Delete a record on the adapter that owns its id.
    pub async fn delete_one(&self, model: &LogicalModel, id: &str) -> ModelResult<()> {
        record_operation("deleteOne", &model.definition().name);
        let adapter = model.adapter_for_id(id)?;
        self.bounded(adapter, "deleteOne", adapter.delete_one(id))
            .await?;
        Ok(())
    }

    fn require_id(&self, model: &LogicalModel, input: &MutationInput) -> ModelResult<String> {
        input
            .values
            .id_value(model.definition())
            .ok_or_else(|| {
                ModelError::Validation(format!(
                    "mutation input is missing the id attribute '{}'",
                    model.definition().id_attribute
                ))
            })
    }

    /// Apply the configured timeout to one routed adapter call.
    async fn bounded<T>(
        &self,
        adapter: &Arc<dyn Adapter>,
        operation: &str,
        call: impl std::future::Future<Output = AdapterResult<T>>,
    ) -> AdapterResult<T> {
        match tokio::time::timeout(self.config.adapter_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::timeout(adapter.adapter_name(), operation)),
        }
    }

    // =========================================================================
    // Fan-out machinery
    // =========================================================================

    /// Spawn one bounded sub-call per responsible adapter.
    ///
    /// Responsible adapters are the registry filtered down to the
    /// authorization subset (if any), minus the adapters the search
    /// already excludes. A delegating adapter receives the search
    /// augmented with this registry's full adapter-name list so its own
    /// nested fan-out skips every site already covered here.
    fn fan_out<T, F>(
        &self,
        model: &LogicalModel,
        search: &Search,
        authorized_adapters: Option<&[String]>,
        call: F,
    ) -> Vec<(String, JoinHandle<AdapterResult<T>>)>
    where
        T: Send + 'static,
        F: Fn(
            Arc<dyn Adapter>,
            Search,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = AdapterResult<T>> + Send>,
        >,
    {
        let registry_names = model.adapter_names();
        let timeout = self.config.adapter_timeout;

        let mut calls = Vec::new();
        for adapter in model.registered_adapters() {
            let name = adapter.adapter_name().to_string();
            if let Some(authorized) = authorized_adapters {
                if !authorized.contains(&name) {
                    continue;
                }
            }
            if search.exclude_adapter_names.contains(&name) {
                continue;
            }

            let sub_search = if adapter.supports_nested_exclusion() {
                search.with_exclusions(registry_names.iter().cloned())
            } else {
                search.clone()
            };

            let task_name = name.clone();
            let future = call(Arc::clone(adapter), sub_search);
            let handle = tokio::spawn(async move {
                match tokio::time::timeout(timeout, future).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(adapter = %task_name, "⏱️  Adapter call timed out");
                        Err(AdapterError::timeout(task_name, "fanOut"))
                    }
                }
            });
            calls.push((name, handle));
        }

        debug!(
            model = %model.definition().name,
            calls = calls.len(),
            "⚡ Fan-out started"
        );
        record_fanout_calls(calls.len() as u64);
        calls
    }

    /// Await every sub-call and split the outcomes into successes and
    /// collected failures.
    ///
    /// A cancelled task contributes nothing at all; a panicked task is
    /// demoted to an internal adapter error like any other failure.
    async fn join_settled<T>(
        &self,
        calls: Vec<(String, JoinHandle<AdapterResult<T>>)>,
    ) -> (Vec<T>, Vec<AdapterError>) {
        let mut successes = Vec::new();
        let mut errors = Vec::new();

        for (name, handle) in calls {
            match handle.await {
                Ok(Ok(value)) => successes.push(value),
                Ok(Err(err)) => {
                    warn!(adapter = %name, error = %err, "⚠️  Adapter failed during fan-out");
                    record_adapter_error(&err.adapter, &err.kind.to_string());
                    errors.push(err);
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    let err = AdapterError::new(
                        name.clone(),
                        "fanOut",
                        AdapterErrorKind::Internal,
                        join_err,
                    );
                    warn!(adapter = %name, error = %err, "💥 Adapter task panicked");
                    record_adapter_error(&err.adapter, &err.kind.to_string());
                    errors.push(err);
                }
            }
        }

        (successes, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::models::{AttributeDef, ModelDefinition, ScalarType};
    use crate::ports::{Cursor, RecordSource, SearchArgument};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn definition() -> ModelDefinition {
        ModelDefinition {
            name: "individual".into(),
            name_plural: "individuals".into(),
            attributes: vec![
                AttributeDef::new("name", ScalarType::String),
                AttributeDef::new("origin", ScalarType::String),
            ],
            id_attribute: "name".into(),
            label_attribute: "name".into(),
        }
    }

    fn rec(name: &str, origin: &str) -> Record {
        Record::new()
            .with("name", json!(name))
            .with("origin", json!(origin))
    }

    /// Configurable adapter stub backed by an in-memory source.
    struct MockAdapter {
        name: String,
        prefix: String,
        definition: ModelDefinition,
        records: Vec<Record>,
        fail: bool,
        delay: Option<Duration>,
        delegating: bool,
        nested_count_errors: Vec<AdapterError>,
        calls: AtomicUsize,
        seen_searches: Mutex<Vec<Search>>,
    }

    impl MockAdapter {
        fn new(name: &str, prefix: &str, records: Vec<Record>) -> Self {
            Self {
                name: name.into(),
                prefix: prefix.into(),
                definition: definition(),
                records,
                fail: false,
                delay: None,
                delegating: false,
                nested_count_errors: Vec::new(),
                calls: AtomicUsize::new(0),
                seen_searches: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn delegating(mut self) -> Self {
            self.delegating = true;
            self
        }

        fn with_nested_count_errors(mut self, errors: Vec<AdapterError>) -> Self {
            self.nested_count_errors = errors;
            self
        }

        async fn enter(&self, search: &Search, operation: &str) -> AdapterResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_searches.lock().unwrap().push(search.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AdapterError::new(
                    &self.name,
                    operation,
                    AdapterErrorKind::Remote,
                    "connection refused",
                ));
            }
            Ok(())
        }

        fn source(&self) -> MemorySource {
            MemorySource::new(self.definition.clone(), self.records.clone())
        }
    }

    #[async_trait]
    impl Adapter for MockAdapter {
        fn adapter_name(&self) -> &str {
            &self.name
        }

        fn definition(&self) -> &ModelDefinition {
            &self.definition
        }

        fn recognize_id(&self, id: &str) -> bool {
            id.starts_with(&self.prefix)
        }

        fn supports_nested_exclusion(&self) -> bool {
            self.delegating
        }

        async fn count_records(&self, search: &Search) -> AdapterResult<CountResult> {
            self.enter(search, "countRecords").await?;
            let sum = self
                .source()
                .count(search.argument.as_ref())
                .await
                .map_err(|e| {
                    AdapterError::new(&self.name, "countRecords", AdapterErrorKind::Storage, e)
                })?;
            Ok(CountResult {
                sum,
                errors: self.nested_count_errors.clone(),
            })
        }

        async fn read_all_cursor(
            &self,
            search: &Search,
            order: Option<&[OrderItem]>,
            pagination: Option<&Pagination>,
        ) -> AdapterResult<Connection> {
            self.enter(search, "readAllCursor").await?;
            paginate(
                &self.source(),
                search.argument.as_ref(),
                order,
                pagination,
                &PaginatorConfig::default(),
            )
            .await
            .map_err(|e| {
                AdapterError::new(&self.name, "readAllCursor", AdapterErrorKind::Storage, e)
            })
        }

        async fn read_by_id(&self, id: &str) -> AdapterResult<Option<Record>> {
            Ok(self
                .records
                .iter()
                .find(|r| r.id_value(&self.definition).as_deref() == Some(id))
                .cloned())
        }

        async fn add_one(&self, input: &MutationInput) -> AdapterResult<Record> {
            Ok(input.values.clone())
        }

        async fn update_one(&self, input: &MutationInput) -> AdapterResult<Record> {
            Ok(input.values.clone())
        }

        async fn delete_one(&self, _id: &str) -> AdapterResult<()> {
            Ok(())
        }
    }

    fn model(adapters: Vec<Arc<MockAdapter>>) -> (LogicalModel, Vec<Arc<MockAdapter>>) {
        let mut model = LogicalModel::new(definition());
        for adapter in &adapters {
            model = model.register(Arc::clone(adapter) as Arc<dyn Adapter>);
        }
        (model, adapters)
    }

    fn names(connection: &Connection) -> Vec<String> {
        connection
            .edges
            .iter()
            .map(|e| e.node.get("name").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    // Test critique: lecture fédérée saine - les fenêtres locales sont
    // fusionnées, réordonnées globalement et refenêtrées
    #[tokio::test]
    async fn test_read_merges_and_reorders_globally() {
        let (model, _) = model(vec![
            Arc::new(MockAdapter::new(
                "SITE_A",
                "A-",
                vec![rec("A-001", "MX"), rec("A-003", "MX")],
            )),
            Arc::new(MockAdapter::new(
                "SITE_B",
                "B-",
                vec![rec("A-002", "PE"), rec("A-004", "PE")],
            )),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let page = service
            .read_all_cursor(
                &model,
                &Search::all(),
                None,
                Some(&Pagination::forward(3, None)),
                None,
            )
            .await
            .unwrap();

        // Ordre global entrelacé, pas la concaténation des sites
        assert_eq!(names(&page), ["A-001", "A-002", "A-003"]);
        assert!(page.page_info.has_next_page);
        assert!(page.errors.is_empty());
    }

    // Test critique: la marche par curseur traverse les sites - la page
    // suivante reprend au rang global exact du curseur, pas au rang
    // local d'un site
    #[tokio::test]
    async fn test_cursor_walk_spans_adapters() {
        let (model, _) = model(vec![
            Arc::new(MockAdapter::new(
                "SITE_A",
                "A-",
                vec![rec("A-001", "MX"), rec("A-003", "MX"), rec("A-005", "MX")],
            )),
            Arc::new(MockAdapter::new(
                "SITE_B",
                "B-",
                vec![rec("A-002", "PE"), rec("A-004", "PE"), rec("A-006", "PE")],
            )),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let page1 = service
            .read_all_cursor(
                &model,
                &Search::all(),
                None,
                Some(&Pagination::forward(3, None)),
                None,
            )
            .await
            .unwrap();
        assert_eq!(names(&page1), ["A-001", "A-002", "A-003"]);

        // Rangs globaux 4 et 5, fournis par des sites différents
        let after = page1.page_info.end_cursor.clone();
        let page2 = service
            .read_all_cursor(
                &model,
                &Search::all(),
                None,
                Some(&Pagination::forward(2, after)),
                None,
            )
            .await
            .unwrap();

        assert_eq!(names(&page2), ["A-004", "A-005"]);
        assert!(page2.page_info.has_previous_page);
        assert!(page2.page_info.has_next_page);
    }

    // Test critique: un site en panne n'avorte jamais l'agrégat - les
    // données partielles arrivent avec la liste d'erreurs
    #[tokio::test]
    async fn test_failing_adapter_yields_partial_data() {
        let (model, _) = model(vec![
            Arc::new(MockAdapter::new(
                "SITE_A",
                "A-",
                vec![rec("A-001", "MX"), rec("A-002", "MX")],
            )),
            Arc::new(MockAdapter::new("SITE_DOWN", "D-", vec![]).failing()),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let page = service
            .read_all_cursor(&model, &Search::all(), None, None, None)
            .await
            .unwrap();

        assert_eq!(names(&page), ["A-001", "A-002"]);
        assert_eq!(page.errors.len(), 1);
        assert_eq!(page.errors[0].adapter, "SITE_DOWN");
        assert_eq!(page.errors[0].kind, AdapterErrorKind::Remote);
    }

    #[tokio::test]
    async fn test_count_sums_and_collects_errors() {
        let (model, _) = model(vec![
            Arc::new(MockAdapter::new(
                "SITE_A",
                "A-",
                vec![rec("A-001", "MX"), rec("A-002", "MX")],
            )),
            Arc::new(MockAdapter::new("SITE_B", "B-", vec![rec("B-001", "PE")])),
            Arc::new(MockAdapter::new("SITE_DOWN", "D-", vec![]).failing()),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let result = service.count_records(&model, &Search::all(), None).await;
        assert_eq!(result.sum, 3);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].adapter, "SITE_DOWN");
    }

    // Test critique: les erreurs imbriquées qu'un pair délégant annexe
    // à son comptage partiel remontent dans l'agrégat au lieu d'être
    // perdues
    #[tokio::test]
    async fn test_count_carries_nested_peer_errors() {
        let nested = AdapterError::new(
            "REMOTE_C",
            "countRecords",
            AdapterErrorKind::Timeout,
            "adapter call exceeded the configured timeout",
        );
        let (model, _) = model(vec![
            Arc::new(MockAdapter::new("LOCAL", "L-", vec![rec("L-001", "MX")])),
            Arc::new(
                MockAdapter::new("FEDERATED", "F-", vec![rec("F-001", "PE")])
                    .delegating()
                    .with_nested_count_errors(vec![nested]),
            ),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let result = service.count_records(&model, &Search::all(), None).await;
        assert_eq!(result.sum, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].adapter, "REMOTE_C");
        assert_eq!(result.errors[0].kind, AdapterErrorKind::Timeout);
    }

    // Test critique: un adaptateur délégant reçoit la liste complète du
    // registre en exclusions pour empêcher récursion et double comptage
    #[tokio::test]
    async fn test_delegating_adapter_gets_registry_exclusions() {
        let (model, adapters) = model(vec![
            Arc::new(MockAdapter::new("LOCAL", "L-", vec![rec("L-001", "MX")])),
            Arc::new(MockAdapter::new("FEDERATED", "F-", vec![]).delegating()),
        ]);
        let service = DdmService::new(DdmConfig::default());

        service.count_records(&model, &Search::all(), None).await;

        // L'adaptateur simple garde la recherche telle quelle
        let plain = adapters[0].seen_searches.lock().unwrap();
        assert!(plain[0].exclude_adapter_names.is_empty());

        // L'adaptateur délégant voit tout le registre exclu
        let delegated = adapters[1].seen_searches.lock().unwrap();
        assert_eq!(delegated[0].exclude_adapter_names, ["LOCAL", "FEDERATED"]);
    }

    // Test critique: un adaptateur déjà exclu par une fédération
    // englobante n'est jamais appelé
    #[tokio::test]
    async fn test_excluded_adapter_skipped() {
        let (model, adapters) = model(vec![
            Arc::new(MockAdapter::new("LOCAL", "L-", vec![rec("L-001", "MX")])),
            Arc::new(MockAdapter::new("VISITED", "V-", vec![rec("V-001", "PE")])),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let search = Search::all().with_exclusions(["VISITED"]);
        let result = service.count_records(&model, &search, None).await;

        assert_eq!(result.sum, 1);
        assert_eq!(adapters[1].calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_authorized_subset_restricts_fanout() {
        let (model, adapters) = model(vec![
            Arc::new(MockAdapter::new("SITE_A", "A-", vec![rec("A-001", "MX")])),
            Arc::new(MockAdapter::new("SITE_B", "B-", vec![rec("B-001", "PE")])),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let authorized = vec!["SITE_A".to_string()];
        let result = service
            .count_records(&model, &Search::all(), Some(&authorized))
            .await;

        assert_eq!(result.sum, 1);
        assert_eq!(adapters[1].calls.load(Ordering::SeqCst), 0);
    }

    // Test critique: des arguments de pagination illégaux sont rejetés
    // avant tout contact avec un adaptateur
    #[tokio::test]
    async fn test_invalid_pagination_rejected_before_fanout() {
        let (model, adapters) = model(vec![Arc::new(MockAdapter::new(
            "SITE_A",
            "A-",
            vec![rec("A-001", "MX")],
        ))]);
        let service = DdmService::new(DdmConfig::default());

        let pagination = Pagination {
            after: Some(Cursor::new("abc")),
            ..Default::default()
        };
        let err = service
            .read_all_cursor(&model, &Search::all(), None, Some(&pagination), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ModelError::Query(QueryError::InvalidPaginationArgs)
        ));
        assert_eq!(adapters[0].calls.load(Ordering::SeqCst), 0);
    }

    // Test critique: un site muet devient une erreur de timeout
    // collectée, jamais un blocage du fan-out entier
    #[tokio::test(start_paused = true)]
    async fn test_slow_adapter_becomes_timeout_error() {
        let (model, _) = model(vec![
            Arc::new(MockAdapter::new("SITE_A", "A-", vec![rec("A-001", "MX")])),
            Arc::new(
                MockAdapter::new("SITE_SLOW", "S-", vec![rec("S-001", "PE")])
                    .delayed(Duration::from_secs(3600)),
            ),
        ]);
        let service = DdmService::new(DdmConfig {
            adapter_timeout: Duration::from_secs(5),
            ..Default::default()
        });

        let page = service
            .read_all_cursor(&model, &Search::all(), None, None, None)
            .await
            .unwrap();

        assert_eq!(names(&page), ["A-001"]);
        assert_eq!(page.errors.len(), 1);
        assert_eq!(page.errors[0].kind, AdapterErrorKind::Timeout);
        assert_eq!(page.errors[0].adapter, "SITE_SLOW");
    }

    // Test critique: les drapeaux hasNext/hasPrev locaux restent
    // collants - si un site avait plus de données, la fédération aussi
    #[tokio::test]
    async fn test_sticky_page_flags() {
        // SITE_B a 3 enregistrements mais first=2 ne fenêtre que les 2
        // premiers du résultat global; localement SITE_B en retient
        // aussi 2 et signale hasNext
        let (model, _) = model(vec![
            Arc::new(MockAdapter::new("SITE_A", "A-", vec![rec("A-001", "MX")])),
            Arc::new(MockAdapter::new(
                "SITE_B",
                "B-",
                vec![rec("B-001", "PE"), rec("B-002", "PE"), rec("B-003", "PE")],
            )),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let page = service
            .read_all_cursor(
                &model,
                &Search::all(),
                None,
                Some(&Pagination::forward(2, None)),
                None,
            )
            .await
            .unwrap();

        assert_eq!(names(&page), ["A-001", "B-001"]);
        assert!(page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn test_filtered_read_applies_search_everywhere() {
        let (model, _) = model(vec![
            Arc::new(MockAdapter::new(
                "SITE_A",
                "A-",
                vec![rec("A-001", "MX"), rec("A-002", "PE")],
            )),
            Arc::new(MockAdapter::new(
                "SITE_B",
                "B-",
                vec![rec("B-001", "MX"), rec("B-002", "CO")],
            )),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let search = Search::filtered(SearchArgument::field_eq("origin", json!("MX")));
        let page = service
            .read_all_cursor(&model, &search, None, None, None)
            .await
            .unwrap();
        assert_eq!(names(&page), ["A-001", "B-001"]);

        let count = service.count_records(&model, &search, None).await;
        assert_eq!(count.sum, 2);
    }

    // Test critique: routage par id - exactement l'adaptateur qui
    // reconnaît l'id est sollicité
    #[tokio::test]
    async fn test_read_by_id_routes_to_owner() {
        let (model, _) = model(vec![
            Arc::new(MockAdapter::new("SITE_A", "A-", vec![rec("A-001", "MX")])),
            Arc::new(MockAdapter::new("SITE_B", "B-", vec![rec("B-001", "PE")])),
        ]);
        let service = DdmService::new(DdmConfig::default());

        let record = service.read_by_id(&model, "B-001").await.unwrap().unwrap();
        assert_eq!(record.get("origin"), Some(&json!("PE")));

        let err = service.read_by_id(&model, "Z-001").await.unwrap_err();
        assert!(matches!(err, ModelError::Registry(_)));
    }

    #[tokio::test]
    async fn test_mutation_requires_id_attribute() {
        let (model, _) = model(vec![Arc::new(MockAdapter::new("SITE_A", "A-", vec![]))]);
        let service = DdmService::new(DdmConfig::default());

        let input = MutationInput::from_values(Record::new().with("origin", json!("MX")));
        let err = service.add_one(&model, &input).await.unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));

        let input = MutationInput::from_values(rec("A-010", "MX"));
        let created = service.add_one(&model, &input).await.unwrap();
        assert_eq!(created.get("name"), Some(&json!("A-010")));
    }
}
