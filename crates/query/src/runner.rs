//! Cache-aside query execution.

use std::sync::Arc;

use sqlcache_core::cache::{
    CacheKey, CacheListener, CacheStats, ExpirationRules, ExpiringCache, ListenerChain, ParamKey, TracingListener,
    Window,
};
use sqlcache_core::{AppConfig, Clock, Error, Value};
use sqlcache_rewrite::{Conditions, RewriteConfig, Rewriter, conditional_properties, is_enabled, selector_properties};

use crate::catalog::QueryCatalog;
use crate::executor::QueryExecutor;
use crate::result::ResultSet;
use crate::statement::Statement;

/// Cache of query results keyed by [`CacheKey`].
pub type ResultCache = ExpiringCache<CacheKey, Arc<ResultSet>>;

/// Runs registered queries, answering from the cache when an expiration
/// rule exists for the query id.
///
/// Flow per call: rewrite the template, bind placeholders, build the key,
/// look up the cache, and on a miss execute and store with the rule's TTL.
pub struct CachedQueryRunner<E> {
    catalog: QueryCatalog,
    rewriter: Rewriter,
    rules: Arc<ExpirationRules>,
    cache: ResultCache,
    clock: Arc<dyn Clock>,
    stats: Arc<CacheStats>,
    executor: E,
}

impl<E: QueryExecutor> CachedQueryRunner<E> {
    /// Assemble a runner from parts. `cache` must share `clock`.
    pub fn new(
        catalog: QueryCatalog, rewriter: Rewriter, rules: Arc<ExpirationRules>, cache: ResultCache,
        clock: Arc<dyn Clock>, executor: E,
    ) -> Self {
        let stats = Arc::new(CacheStats::new());
        let cache = cache.with_listener(Self::listeners(&stats));
        Self { catalog, rewriter, rules, cache, clock, stats, executor }
    }

    /// Runner configured from `config`: catalog, rewrite policy, expiration
    /// rules and a bounded LRU cache of `config.capacity` results.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` or `Error::MalformedExpression` for an
    /// invalid configuration.
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>, executor: E) -> Result<Self, Error> {
        config.validate()?;
        let rules = Arc::new(config.expiration_rules()?);
        let cache = ExpiringCache::bounded(config.capacity, Arc::clone(&clock))?;

        tracing::info!(
            capacity = config.capacity,
            queries = config.queries.len(),
            cached_queries = rules.len(),
            "Query runner configured"
        );

        Ok(Self::new(
            QueryCatalog::from_config(config),
            Rewriter::new(RewriteConfig::from(config)),
            rules,
            cache,
            clock,
            executor,
        ))
    }

    fn listeners(stats: &Arc<CacheStats>) -> Arc<dyn CacheListener<CacheKey>> {
        let stats: Arc<dyn CacheListener<CacheKey>> = stats.clone();
        Arc::new(ListenerChain::<CacheKey>::new().with(Arc::new(TracingListener::new("query-results"))).with(stats))
    }

    /// Run query `id`, serving a cached result when one is live.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownQuery` for an unregistered id
    /// - `Error::InvalidBinding` / `Error::MalformedTemplate` from rewriting and binding
    /// - `Error::Execution` from the executor
    pub fn query(&self, id: &str, conditions: &dyn Conditions, window: Window) -> Result<ResultSet, Error> {
        let (statement, key) = self.prepare(id, conditions, window)?;

        if !self.rules.is_enabled(id) {
            tracing::debug!(query_id = id, "no expiration rule; executing uncached");
            return self.executor.execute(&statement, key.params(), window);
        }

        if let Some(cached) = self.cache.get_if_not_expired(&key)? {
            return Ok(cached.materialize());
        }

        let result = Arc::new(self.executor.execute(&statement, key.params(), window)?);
        let expires_at = self.rules.expiry_for(id, self.clock.now())?;
        tracing::debug!(query_id = id, key = %key.digest(), rows = result.len(), "caching query result");
        self.cache.add(key, Arc::clone(&result), expires_at)?;
        Ok(result.materialize())
    }

    /// The key `query` would use for these arguments.
    ///
    /// # Errors
    ///
    /// Same as [`CachedQueryRunner::query`], minus execution failures.
    pub fn key_for(&self, id: &str, conditions: &dyn Conditions, window: Window) -> Result<CacheKey, Error> {
        self.prepare(id, conditions, window).map(|(_, key)| key)
    }

    fn prepare(&self, id: &str, conditions: &dyn Conditions, window: Window) -> Result<(Statement, CacheKey), Error> {
        let template = self.catalog.get(id)?;
        let sql = self.rewriter.rewrite(template, conditions)?;
        let statement = Statement::parse(sql);

        let mut params = statement.bind(conditions)?;
        let allow_array_empty_string = self.rewriter.config().allow_array_empty_string;
        for property in conditional_properties(template) {
            let enabled = is_enabled(&conditions.resolve(&property)?, allow_array_empty_string);
            params.bind(ParamKey::Name(format!("$if({property})")), Value::Bool(enabled));
        }
        for property in selector_properties(template) {
            let value = conditions.resolve(&property)?;
            params.bind(ParamKey::Name(format!("$sort({property})")), value);
        }

        let key = CacheKey::builder(id).params(params).window(window).build();
        Ok((statement, key))
    }

    /// Drop one cached result. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConfigured` only for a cache assembled without a store.
    pub fn invalidate(&self, key: &CacheKey) -> Result<bool, Error> {
        self.cache.remove(key)
    }

    /// Drop every cached result.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConfigured` only for a cache assembled without a store.
    pub fn clear(&self) -> Result<(), Error> {
        self.cache.clear()
    }

    /// Drop cached results that are past their expiry.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConfigured` only for a cache assembled without a store.
    pub fn purge_expired(&self) -> Result<usize, Error> {
        self.cache.purge_expired()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn rules(&self) -> &ExpirationRules {
        &self.rules
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }
}
