//! The adapter: model registry plus compiled statements over a gateway.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use ormsql_core::{
    row_get, ConditionTree, Filter, FilterCompiler, IntrospectedTable, MigrationPlan, ModelSchema,
    Row, SchemaDiffer, UpdateSpec, Value, ValueCodec, ID_COLUMN,
};

use crate::config::AdapterSettings;
use crate::error::{AdapterError, BulkUpdateError, Result};
use crate::gateway::{ConnectionGateway, ExecInfo, GatewayError, QueryOutput};
use crate::id::generate_id;
use crate::registry::ModelRegistry;

/// Column alias used by [`Adapter::count`].
const COUNT_COLUMN: &str = "cnt";

/// MySQL adapter over a [`ConnectionGateway`].
///
/// Every operation looks up an immutable model snapshot, compiles SQL with
/// `ormsql-core`, and executes it through the gateway. Compilation errors are
/// returned before anything is sent.
pub struct Adapter<G: ConnectionGateway> {
    gateway: Arc<G>,
    registry: ModelRegistry,
    settings: AdapterSettings,
}

impl<G: ConnectionGateway> Adapter<G> {
    /// Create an adapter over `gateway`.
    pub fn new(gateway: G, settings: AdapterSettings) -> Self {
        Self::with_shared_gateway(Arc::new(gateway), settings)
    }

    /// Create an adapter over a gateway shared with other owners.
    pub fn with_shared_gateway(gateway: Arc<G>, settings: AdapterSettings) -> Self {
        Self {
            gateway,
            registry: ModelRegistry::new(),
            settings,
        }
    }

    /// The underlying gateway.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Adapter settings.
    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// Register a model.
    ///
    /// The model is validated first. A model without an engine picks up the
    /// adapter's default engine.
    pub fn define(&self, mut model: ModelSchema) -> Result<Arc<ModelSchema>> {
        model.validate()?;
        if model.settings.engine.is_none() {
            model.settings.engine = self.settings.engine.clone();
        }
        tracing::debug!(
            model = %model.name,
            table = model.table_name(),
            properties = model.properties.len(),
            "defined model"
        );
        Ok(self.registry.insert(model))
    }

    /// Snapshot of a defined model.
    pub fn model(&self, name: &str) -> Result<Arc<ModelSchema>> {
        self.registry
            .get(name)
            .ok_or_else(|| AdapterError::UnknownModel(name.to_string()))
    }

    /// Every defined model, in definition order.
    pub fn models(&self) -> Vec<Arc<ModelSchema>> {
        self.registry.all()
    }

    /// Run a filtered SELECT.
    ///
    /// Rows are decoded through the model's codec, except when the filter
    /// projects a non-empty attribute list, in which case they come back raw.
    pub async fn find(&self, model: &str, filter: &Filter) -> Result<Vec<Row>> {
        let schema = self.model(model)?;
        let sql = FilterCompiler::new(&schema).compile_select(filter)?;
        let rows = expect_rows(self.run(&sql).await?)?;

        if filter.attributes.as_ref().is_some_and(|a| !a.is_empty()) {
            return Ok(rows);
        }
        let codec = ValueCodec::new(&schema);
        Ok(rows.into_iter().map(|row| codec.hydrate(row)).collect())
    }

    /// Insert a row and return its id.
    ///
    /// Uuid-mode models get a generated id when `data` carries none. The
    /// returned id is the server's auto-increment id when there is one,
    /// otherwise the id that was inserted.
    pub async fn create(&self, model: &str, mut data: Row) -> Result<Value> {
        let schema = self.model(model)?;
        let has_id = row_get(&data, ID_COLUMN).is_some_and(Value::is_truthy);
        if !has_id {
            if let Some(id) = generate_id(schema.id_mode()) {
                data.retain(|(key, _)| key != ID_COLUMN);
                data.insert(0, (ID_COLUMN.to_string(), Value::String(id)));
            }
        }

        let sql = FilterCompiler::new(&schema).compile_insert(&data)?;
        let info = expect_affected(self.run(&sql).await?)?;
        Ok(match info.insert_id {
            Some(id) => Value::from(id),
            None => row_get(&data, ID_COLUMN).cloned().unwrap_or(Value::Null),
        })
    }

    /// Insert a row, or update the existing row with the same id.
    ///
    /// Returns `data` with `id` set to the server's insert id when one was
    /// reported.
    pub async fn update_or_create(&self, model: &str, mut data: Row) -> Result<Row> {
        let schema = self.model(model)?;
        let sql = FilterCompiler::new(&schema).compile_upsert(&data)?;
        let info = expect_affected(self.run(&sql).await?)?;

        if let Some(id) = info.insert_id {
            match data.iter_mut().find(|(key, _)| key == ID_COLUMN) {
                Some((_, value)) => *value = Value::from(id),
                None => data.push((ID_COLUMN.to_string(), Value::from(id))),
            }
        }
        Ok(data)
    }

    /// Count rows, optionally restricted by a condition tree.
    pub async fn count(&self, model: &str, where_clause: Option<&ConditionTree>) -> Result<u64> {
        let schema = self.model(model)?;
        let sql = FilterCompiler::new(&schema).compile_count(where_clause)?;
        let rows = expect_rows(self.run(&sql).await?)?;

        rows.first()
            .and_then(|row| row_get(row, COUNT_COLUMN))
            .and_then(count_of)
            .ok_or(AdapterError::UnexpectedOutput("a count row"))
    }

    /// Apply a batch of updates concurrently.
    ///
    /// Items run independently. On full success the per-item results come
    /// back in input order; if any item fails, a [`BulkUpdateError`] carries
    /// both positional arrays.
    pub async fn update(
        &self,
        model: &str,
        specs: &[UpdateSpec],
    ) -> std::result::Result<Vec<ExecInfo>, BulkUpdateError> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let schema = match self.model(model) {
            Ok(schema) => schema,
            Err(e) => {
                return Err(BulkUpdateError {
                    errors: vec![Some(e); specs.len()],
                    results: vec![None; specs.len()],
                })
            }
        };

        let compiled = FilterCompiler::new(&schema).compile_bulk_update(specs);
        let outcomes = join_all(compiled.into_iter().map(|sql| self.run_update(sql))).await;

        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        tracing::debug!(model, items = specs.len(), failed, "bulk update finished");
        if failed == 0 {
            return Ok(outcomes.into_iter().filter_map(|o| o.ok()).collect());
        }

        let (errors, results) = outcomes
            .into_iter()
            .map(|outcome| match outcome {
                Ok(info) => (None, Some(info)),
                Err(e) => (Some(e), None),
            })
            .unzip();
        Err(BulkUpdateError { errors, results })
    }

    /// Compute the DDL needed to bring a model's table up to date.
    ///
    /// A missing table yields a create plan.
    pub async fn check_migration(&self, model: &str) -> Result<MigrationPlan> {
        let schema = self.model(model)?;
        let live = self.introspect(schema.table_name()).await?;
        Ok(SchemaDiffer::new(&schema).diff(live.as_ref())?)
    }

    /// Create or alter every model's table.
    ///
    /// Every model is attempted. Returns the plans that were applied, or the
    /// first error once all models have been tried.
    pub async fn autoupdate(&self) -> Result<Vec<MigrationPlan>> {
        let mut applied = Vec::new();
        let mut first_error = None;

        for schema in self.models() {
            match self.migrate(&schema).await {
                Ok(Some(plan)) => applied.push(plan),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(model = %schema.name, error = %e, "migration failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(applied),
        }
    }

    /// True when no model's table needs DDL.
    pub async fn is_actual(&self) -> Result<bool> {
        for schema in self.models() {
            let plan = self.check_migration(&schema.name).await?;
            if plan.needs_changes() {
                tracing::info!(
                    model = %schema.name,
                    kind = %plan.kind,
                    statements = plan.len(),
                    "schema is out of date"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn migrate(&self, schema: &ModelSchema) -> Result<Option<MigrationPlan>> {
        let live = self.introspect(schema.table_name()).await?;
        let plan = SchemaDiffer::new(schema).diff(live.as_ref())?;
        let Some(sql) = plan.to_sql() else {
            tracing::debug!(model = %schema.name, "schema up to date");
            return Ok(None);
        };

        tracing::info!(
            model = %schema.name,
            kind = %plan.kind,
            statements = plan.len(),
            "applying migration"
        );
        self.run(&sql).await?;
        Ok(Some(plan))
    }

    async fn introspect(&self, table: &str) -> Result<Option<IntrospectedTable>> {
        let fields = match self.gateway.introspect_fields(table).await {
            Ok(fields) => fields,
            Err(GatewayError::NoSuchTable(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let indexes = self.gateway.introspect_indexes(table).await?;
        Ok(Some(IntrospectedTable::new(fields, indexes)))
    }

    async fn run_update(&self, compiled: ormsql_core::Result<String>) -> Result<ExecInfo> {
        let sql = compiled?;
        expect_affected(self.run(&sql).await?)
    }

    async fn run(&self, sql: &str) -> Result<QueryOutput> {
        let started = Instant::now();
        let result = self.gateway.execute(sql).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(_) => tracing::debug!(sql, elapsed_ms, "executed"),
            Err(e) => tracing::warn!(sql, elapsed_ms, error = %e, "execution failed"),
        }
        Ok(result?)
    }
}

fn expect_rows(output: QueryOutput) -> Result<Vec<Row>> {
    output
        .into_rows()
        .ok_or(AdapterError::UnexpectedOutput("a result set"))
}

fn expect_affected(output: QueryOutput) -> Result<ExecInfo> {
    output
        .into_affected()
        .ok_or(AdapterError::UnexpectedOutput("an affected-row count"))
}

fn count_of(value: &Value) -> Option<u64> {
    match value {
        Value::Int(i) => u64::try_from(*i).ok(),
        Value::Float(f) if *f >= 0.0 => Some(*f as u64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RecordingGateway;
    use ormsql_core::{IdMode, PropertyDef, PropertyType};

    fn person() -> ModelSchema {
        ModelSchema::new("person")
            .with_property(PropertyDef::new("name", PropertyType::String))
            .with_property(PropertyDef::new("admin", PropertyType::Boolean))
    }

    fn adapter(gateway: RecordingGateway) -> Adapter<RecordingGateway> {
        let adapter = Adapter::new(gateway, AdapterSettings::new("test"));
        adapter.define(person()).unwrap();
        adapter
    }

    #[test]
    fn test_define_applies_default_engine() {
        let adapter = Adapter::new(
            RecordingGateway::new(),
            AdapterSettings::new("test").with_engine("InnoDB"),
        );
        let model = adapter.define(person()).unwrap();
        assert_eq!(model.settings.engine.as_deref(), Some("InnoDB"));

        let model = adapter.define(person().with_engine("MyISAM")).unwrap();
        assert_eq!(model.settings.engine.as_deref(), Some("MyISAM"));
        assert_eq!(adapter.models().len(), 1);
    }

    #[test]
    fn test_define_rejects_invalid_model() {
        let adapter = Adapter::new(RecordingGateway::new(), AdapterSettings::default());
        let err = adapter.define(ModelSchema::new("")).unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Core(ormsql_core::Error::InvalidSchema(_))
        ));
        assert!(matches!(
            adapter.model("person"),
            Err(AdapterError::UnknownModel(_))
        ));
    }

    #[tokio::test]
    async fn test_find_hydrates_rows() {
        let gateway = RecordingGateway::with_responder(|_| {
            Ok(QueryOutput::Rows(vec![vec![
                ("name".to_string(), Value::from("Ann")),
                ("admin".to_string(), Value::from("1")),
            ]]))
        });
        let adapter = adapter(gateway);

        let rows = adapter.find("person", &Filter::new()).await.unwrap();
        assert_eq!(row_get(&rows[0], "admin"), Some(&Value::Bool(true)));

        let rows = adapter
            .find("person", &Filter::new().with_attributes(["admin"]))
            .await
            .unwrap();
        assert_eq!(row_get(&rows[0], "admin"), Some(&Value::from("1")));
        assert_eq!(
            adapter.gateway().executed(),
            vec!["SELECT * FROM `person`", "SELECT `admin` FROM `person`"]
        );
    }

    #[tokio::test]
    async fn test_find_with_empty_attributes_hydrates() {
        let gateway = RecordingGateway::with_responder(|_| {
            Ok(QueryOutput::Rows(vec![vec![("admin".to_string(), Value::from("0"))]]))
        });
        let adapter = adapter(gateway);

        let filter = Filter::new().with_attributes(Vec::<String>::new());
        let rows = adapter.find("person", &filter).await.unwrap();
        assert_eq!(row_get(&rows[0], "admin"), Some(&Value::Bool(false)));
        assert_eq!(adapter.gateway().executed(), vec!["SELECT * FROM `person`"]);
    }

    #[tokio::test]
    async fn test_compile_errors_send_nothing() {
        let adapter = adapter(RecordingGateway::new());
        let filter = Filter::new().with_where(ConditionTree::new());
        let err = adapter.find("person", &filter).await.unwrap_err();
        assert!(matches!(err, AdapterError::Core(_)));
        assert!(adapter.gateway().executed().is_empty());
    }

    #[tokio::test]
    async fn test_create_returns_insert_id() {
        let gateway =
            RecordingGateway::with_responder(|_| Ok(QueryOutput::Affected(ExecInfo::inserted(9))));
        let adapter = adapter(gateway);

        let id = adapter
            .create("person", vec![("name".to_string(), Value::from("Ann"))])
            .await
            .unwrap();
        assert_eq!(id, Value::Int(9));
        assert_eq!(
            adapter.gateway().executed(),
            vec!["INSERT INTO `person` SET `name` = 'Ann'"]
        );
    }

    #[tokio::test]
    async fn test_create_generates_uuid() {
        let adapter = Adapter::new(RecordingGateway::new(), AdapterSettings::default());
        adapter.define(person().with_id_mode(IdMode::V4)).unwrap();

        let id = adapter
            .create("person", vec![("name".to_string(), Value::from("Ann"))])
            .await
            .unwrap();
        let id = id.as_str().unwrap().to_string();
        assert_eq!(id.len(), 36);
        assert_eq!(
            adapter.gateway().executed(),
            vec![format!("INSERT INTO `person` SET `id` = '{id}', `name` = 'Ann'")]
        );

        let given = adapter
            .create("person", vec![("id".to_string(), Value::from("fixed"))])
            .await
            .unwrap();
        assert_eq!(given, Value::from("fixed"));
    }

    #[tokio::test]
    async fn test_update_or_create_sets_id() {
        let gateway =
            RecordingGateway::with_responder(|_| Ok(QueryOutput::Affected(ExecInfo::inserted(4))));
        let adapter = adapter(gateway);

        let row = adapter
            .update_or_create("person", vec![("name".to_string(), Value::from("Ann"))])
            .await
            .unwrap();
        assert_eq!(row_get(&row, "id"), Some(&Value::Int(4)));
        assert_eq!(
            adapter.gateway().executed(),
            vec!["INSERT INTO `person` (`name`) VALUES ('Ann') ON DUPLICATE KEY UPDATE `name` = 'Ann'"]
        );
    }

    #[tokio::test]
    async fn test_count_reads_cnt_column() {
        let gateway = RecordingGateway::with_responder(|_| {
            Ok(QueryOutput::Rows(vec![vec![(
                "cnt".to_string(),
                Value::from("12"),
            )]]))
        });
        let adapter = adapter(gateway);

        let where_clause = ConditionTree::new().eq("name", "Ann");
        assert_eq!(adapter.count("person", Some(&where_clause)).await.unwrap(), 12);
        assert_eq!(adapter.count("person", None).await.unwrap(), 12);
        assert_eq!(
            adapter.gateway().executed(),
            vec![
                "SELECT count(*) as cnt FROM `person` WHERE `name` = 'Ann'",
                "SELECT count(*) as cnt FROM `person`",
            ]
        );
    }

    #[tokio::test]
    async fn test_unexpected_output() {
        let adapter = adapter(RecordingGateway::new());
        let err = adapter.count("person", None).await.unwrap_err();
        assert_eq!(err, AdapterError::UnexpectedOutput("a result set"));
    }

    #[tokio::test]
    async fn test_update_unknown_model_fails_every_item() {
        let adapter = adapter(RecordingGateway::new());
        let spec = UpdateSpec::new(
            ConditionTree::new().eq("id", 1i64),
            vec![("name".to_string(), Value::from("A"))],
        );
        let err = adapter.update("ghost", &[spec.clone(), spec]).await.unwrap_err();
        assert_eq!(err.failed(), 2);
        assert_eq!(err.results, vec![None, None]);
        assert!(adapter.update("person", &[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_count_of() {
        assert_eq!(count_of(&Value::Int(3)), Some(3));
        assert_eq!(count_of(&Value::Int(-1)), None);
        assert_eq!(count_of(&Value::from(" 7 ")), Some(7));
        assert_eq!(count_of(&Value::Null), None);
    }
}
