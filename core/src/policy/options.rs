//! Build-time configuration: which models and operations exist, and the
//! per-model policy callbacks evaluated on every request.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::filter::FilterTree;
use crate::operation::{Operation, OperationSelection};
use crate::sort::Sort;
use crate::Row;

/// Arguments of the build-time callbacks (`fields`, `operations`,
/// `input_fields`).
#[derive(Clone, Copy, Debug)]
pub struct ModelParams<'a> {
    pub model_name: &'a str,
}

/// Arguments of the per-request policy callbacks.
#[derive(Debug)]
pub struct PolicyParams<'a, C> {
    pub model_name: &'a str,
    pub ctx: &'a C,
    pub operation: Operation,
}

pub type ModelFn<T> = Arc<dyn Fn(&ModelParams<'_>) -> Option<T> + Send + Sync>;
pub type PolicyFn<C, T> = Arc<dyn Fn(&PolicyParams<'_, C>) -> Option<T> + Send + Sync>;

/// Either an allow-list or a deny-list of names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IncludeExclude<T> {
    Include(Vec<T>),
    Exclude(Vec<T>),
}

impl<T> IncludeExclude<T> {
    pub fn allows<Q>(&self, item: &Q) -> bool
    where
        T: PartialEq<Q>,
        Q: ?Sized,
    {
        match self {
            IncludeExclude::Include(items) => items.iter().any(|i| i == item),
            IncludeExclude::Exclude(items) => !items.iter().any(|i| i == item),
        }
    }
}

impl IncludeExclude<String> {
    pub fn include<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IncludeExclude::Include(items.into_iter().map(Into::into).collect())
    }

    pub fn exclude<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IncludeExclude::Exclude(items.into_iter().map(Into::into).collect())
    }
}

/// Optional callback slots for one model.
///
/// Every slot returns `Option`: `None` means the policy has nothing to say
/// for this model/context/operation.
pub struct ModelOptions<C> {
    pub fields: Option<ModelFn<IncludeExclude<String>>>,
    pub operations: Option<ModelFn<OperationSelection>>,
    pub input_fields: Option<ModelFn<IncludeExclude<String>>>,
    pub depth_limit: Option<PolicyFn<C, usize>>,
    pub executable: Option<PolicyFn<C, bool>>,
    pub limit: Option<PolicyFn<C, u64>>,
    pub order_by: Option<PolicyFn<C, Sort>>,
    pub where_: Option<PolicyFn<C, FilterTree>>,
    pub input_data: Option<PolicyFn<C, Row>>,
}

impl<C> ModelOptions<C> {
    pub fn new() -> Self {
        Self {
            fields: None,
            operations: None,
            input_fields: None,
            depth_limit: None,
            executable: None,
            limit: None,
            order_by: None,
            where_: None,
            input_data: None,
        }
    }

    #[must_use]
    pub fn fields<F>(mut self, f: F) -> Self
    where
        F: Fn(&ModelParams<'_>) -> Option<IncludeExclude<String>> + Send + Sync + 'static,
    {
        self.fields = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn operations<F>(mut self, f: F) -> Self
    where
        F: Fn(&ModelParams<'_>) -> Option<OperationSelection> + Send + Sync + 'static,
    {
        self.operations = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn input_fields<F>(mut self, f: F) -> Self
    where
        F: Fn(&ModelParams<'_>) -> Option<IncludeExclude<String>> + Send + Sync + 'static,
    {
        self.input_fields = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn depth_limit<F>(mut self, f: F) -> Self
    where
        F: Fn(&PolicyParams<'_, C>) -> Option<usize> + Send + Sync + 'static,
    {
        self.depth_limit = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn executable<F>(mut self, f: F) -> Self
    where
        F: Fn(&PolicyParams<'_, C>) -> Option<bool> + Send + Sync + 'static,
    {
        self.executable = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn limit<F>(mut self, f: F) -> Self
    where
        F: Fn(&PolicyParams<'_, C>) -> Option<u64> + Send + Sync + 'static,
    {
        self.limit = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn order_by<F>(mut self, f: F) -> Self
    where
        F: Fn(&PolicyParams<'_, C>) -> Option<Sort> + Send + Sync + 'static,
    {
        self.order_by = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn where_<F>(mut self, f: F) -> Self
    where
        F: Fn(&PolicyParams<'_, C>) -> Option<FilterTree> + Send + Sync + 'static,
    {
        self.where_ = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn input_data<F>(mut self, f: F) -> Self
    where
        F: Fn(&PolicyParams<'_, C>) -> Option<Row> + Send + Sync + 'static,
    {
        self.input_data = Some(Arc::new(f));
        self
    }

    /// Slot-by-slot overlay: every slot set on `self` wins over `defaults`.
    pub fn or(&self, defaults: &ModelOptions<C>) -> ModelOptions<C> {
        ModelOptions {
            fields: self.fields.clone().or_else(|| defaults.fields.clone()),
            operations: self.operations.clone().or_else(|| defaults.operations.clone()),
            input_fields: self
                .input_fields
                .clone()
                .or_else(|| defaults.input_fields.clone()),
            depth_limit: self
                .depth_limit
                .clone()
                .or_else(|| defaults.depth_limit.clone()),
            executable: self.executable.clone().or_else(|| defaults.executable.clone()),
            limit: self.limit.clone().or_else(|| defaults.limit.clone()),
            order_by: self.order_by.clone().or_else(|| defaults.order_by.clone()),
            where_: self.where_.clone().or_else(|| defaults.where_.clone()),
            input_data: self.input_data.clone().or_else(|| defaults.input_data.clone()),
        }
    }
}

impl<C> Default for ModelOptions<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for ModelOptions<C> {
    fn clone(&self) -> Self {
        self.or(&ModelOptions::new())
    }
}

impl<C> fmt::Debug for ModelOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOptions")
            .field("fields", &self.fields.is_some())
            .field("operations", &self.operations.is_some())
            .field("input_fields", &self.input_fields.is_some())
            .field("depth_limit", &self.depth_limit.is_some())
            .field("executable", &self.executable.is_some())
            .field("limit", &self.limit.is_some())
            .field("order_by", &self.order_by.is_some())
            .field("where_", &self.where_.is_some())
            .field("input_data", &self.input_data.is_some())
            .finish()
    }
}

/// Generator-wide configuration.
pub struct GeneratorOptions<C> {
    /// Which tables become models; every table when unset.
    pub use_models: Option<IncludeExclude<String>>,
    /// Defaults for every model.
    pub all: ModelOptions<C>,
    /// Per-model overrides keyed by table name.
    pub models: BTreeMap<String, ModelOptions<C>>,
}

impl<C> GeneratorOptions<C> {
    pub fn new() -> Self {
        Self {
            use_models: None,
            all: ModelOptions::new(),
            models: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn use_models(mut self, selection: IncludeExclude<String>) -> Self {
        self.use_models = Some(selection);
        self
    }

    #[must_use]
    pub fn all(mut self, options: ModelOptions<C>) -> Self {
        self.all = options;
        self
    }

    #[must_use]
    pub fn model(mut self, name: impl Into<String>, options: ModelOptions<C>) -> Self {
        self.models.insert(name.into(), options);
        self
    }

    pub fn is_modeled(&self, table: &str) -> bool {
        self.use_models
            .as_ref()
            .is_none_or(|selection| selection.allows(table))
    }

    /// Effective options for `model`: its own slots over the `all` slots.
    pub fn options_for(&self, model: &str) -> ModelOptions<C> {
        match self.models.get(model) {
            Some(options) => options.or(&self.all),
            None => self.all.clone(),
        }
    }
}

impl<C> Default for GeneratorOptions<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for GeneratorOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorOptions")
            .field("use_models", &self.use_models)
            .field("all", &self.all)
            .field("models", &self.models)
            .finish()
    }
}

/// Constant-valued options, loadable with serde from a host-supplied
/// document.
///
/// ```ignore
/// let options: StaticOptions = serde_json::from_str(r#"{
///     "all": { "limit": 100, "depthLimit": 5 },
///     "models": { "posts": { "where": { "published": true } } }
/// }"#)?;
/// let options: GeneratorOptions<Ctx> = options.into();
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_models: Option<IncludeExclude<String>>,
    pub all: StaticModelOptions,
    pub models: BTreeMap<String, StaticModelOptions>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<IncludeExclude<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<OperationSelection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_fields: Option<IncludeExclude<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Sort>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<FilterTree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_data: Option<Row>,
}

fn constant<T>(value: T) -> ModelFn<T>
where
    T: Clone + Send + Sync + 'static,
{
    Arc::new(move |_: &ModelParams<'_>| Some(value.clone()))
}

fn constant_policy<C: 'static, T>(value: T) -> PolicyFn<C, T>
where
    T: Clone + Send + Sync + 'static,
{
    Arc::new(move |_: &PolicyParams<'_, C>| Some(value.clone()))
}

impl<C: 'static> From<StaticModelOptions> for ModelOptions<C> {
    fn from(value: StaticModelOptions) -> Self {
        ModelOptions {
            fields: value.fields.map(constant),
            operations: value.operations.map(constant),
            input_fields: value.input_fields.map(constant),
            depth_limit: value.depth_limit.map(constant_policy),
            executable: value.executable.map(constant_policy),
            limit: value.limit.map(constant_policy),
            order_by: value.order_by.map(constant_policy),
            where_: value.where_.map(constant_policy),
            input_data: value.input_data.map(constant_policy),
        }
    }
}

impl<C: 'static> From<StaticOptions> for GeneratorOptions<C> {
    fn from(value: StaticOptions) -> Self {
        GeneratorOptions {
            use_models: value.use_models,
            all: value.all.into(),
            models: value
                .models
                .into_iter()
                .map(|(name, options)| (name, options.into()))
                .collect(),
        }
    }
}
