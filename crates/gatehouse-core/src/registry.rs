//! Route registry: binds URL patterns to schema, capability and predicates.
//!
//! Routes are declared as data and checked when built, so a misconfigured
//! route fails at startup instead of on the first request that reaches it.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::capability::CapabilityRequirement;
use crate::errors::RegistrationError;
use crate::predicate::SecondaryPredicate;
use crate::schema::{FieldSchema, ParamLocation, Schema};
use crate::verdict::DenialPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A URL pattern such as `/learn/{classroom_url_fragment}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

impl RoutePattern {
    pub fn parse(route: &str, pattern: &str) -> Result<Self, RegistrationError> {
        let invalid = |reason: &str| RegistrationError::InvalidPattern {
            route: route.to_string(),
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        for part in split_path(pattern) {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }
            if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(invalid("parameter names must be non-empty identifiers"));
                }
                if !seen.insert(name) {
                    return Err(invalid("parameter appears twice"));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(invalid("braces are only allowed around a whole segment"));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Two patterns with the same shape match exactly the same paths.
    fn same_shape(&self, other: &RoutePattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    /// Capture path parameters if `path` matches.
    ///
    /// `path` is the raw, still percent-encoded request path. It is split on
    /// `/` first and each segment decoded afterwards, so an encoded slash
    /// stays inside its segment. A segment that does not decode to UTF-8
    /// matches nothing.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts = split_path(path);
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut captured = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            let part = urlencoding::decode(part).ok()?;
            match segment {
                Segment::Literal(literal) if *literal == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    captured.push((name.clone(), part.into_owned()));
                }
                _ => return None,
            }
        }
        Some(captured)
    }
}

/// Immutable description of one access-validated route.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    name: String,
    pattern: RoutePattern,
    schema: Schema,
    capability: CapabilityRequirement,
    predicates: Vec<SecondaryPredicate>,
    denial_policy: DenialPolicy,
}

impl RouteSpec {
    pub fn builder(name: impl Into<String>, pattern: impl Into<String>) -> RouteSpecBuilder {
        RouteSpecBuilder {
            name: name.into(),
            pattern: pattern.into(),
            schema: Schema::new(),
            capability: CapabilityRequirement::OpenAccess,
            predicates: Vec::new(),
            denial_policy: DenialPolicy::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn capability(&self) -> &CapabilityRequirement {
        &self.capability
    }

    pub fn predicates(&self) -> &[SecondaryPredicate] {
        &self.predicates
    }

    pub fn denial_policy(&self) -> DenialPolicy {
        self.denial_policy
    }
}

#[derive(Debug, Clone)]
pub struct RouteSpecBuilder {
    name: String,
    pattern: String,
    schema: Schema,
    capability: CapabilityRequirement,
    predicates: Vec<SecondaryPredicate>,
    denial_policy: DenialPolicy,
}

impl RouteSpecBuilder {
    pub fn path_field(mut self, field: FieldSchema) -> Self {
        self.schema = self.schema.path_field(field);
        self
    }

    pub fn query_field(mut self, field: FieldSchema) -> Self {
        self.schema = self.schema.query_field(field);
        self
    }

    pub fn capability(mut self, capability: CapabilityRequirement) -> Self {
        self.capability = capability;
        self
    }

    pub fn predicate(mut self, predicate: SecondaryPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn denials(mut self, policy: DenialPolicy) -> Self {
        self.denial_policy = policy;
        self
    }

    /// Report every capability denial as an absent resource.
    pub fn conceal_denials(self) -> Self {
        self.denials(DenialPolicy::Conceal)
    }

    pub fn build(self) -> Result<RouteSpec, RegistrationError> {
        let route = self.name.as_str();
        let pattern = RoutePattern::parse(route, &self.pattern)?;
        self.schema.check_declaration(route)?;

        for param in pattern.params() {
            if !self.schema.declares(ParamLocation::Path, param) {
                return Err(RegistrationError::UndeclaredPathParam {
                    route: route.to_string(),
                    param: param.to_string(),
                });
            }
        }
        let pattern_params: HashSet<&str> = pattern.params().collect();
        for field in self.schema.path_fields() {
            if !pattern_params.contains(field.name()) {
                return Err(RegistrationError::UnboundPathField {
                    route: route.to_string(),
                    field: field.name().to_string(),
                });
            }
        }

        let unknown = |stage: &str, param: &str| RegistrationError::UnknownParameter {
            route: route.to_string(),
            stage: stage.to_string(),
            param: param.to_string(),
        };

        for param in self.capability.referenced_params() {
            if !self.schema.declares(ParamLocation::Path, param) {
                return Err(unknown("capability", param));
            }
        }

        let mut established = HashSet::new();
        for predicate in &self.predicates {
            let (path, query) = predicate.referenced_params();
            for param in path {
                if !self.schema.declares(ParamLocation::Path, param) {
                    return Err(unknown(predicate.name(), param));
                }
            }
            for param in query {
                if !self.schema.declares(ParamLocation::Query, param) {
                    return Err(unknown(predicate.name(), param));
                }
            }

            if let Some(kind) = predicate.requires()
                && !established.contains(&kind)
            {
                return Err(RegistrationError::PredicateOrder {
                    route: route.to_string(),
                    predicate: predicate.name().to_string(),
                    kind,
                });
            }
            if let Some(kind) = predicate.provides() {
                established.insert(kind);
            }
        }

        Ok(RouteSpec {
            name: self.name,
            pattern,
            schema: self.schema,
            capability: self.capability,
            predicates: self.predicates,
            denial_policy: self.denial_policy,
        })
    }
}

/// A matched route and the path parameters captured from the request path.
#[derive(Debug, Clone)]
pub struct ResolvedRoute<'r> {
    pub route: &'r RouteSpec,
    pub path_params: Vec<(String, String)>,
}

/// All registered routes. Built at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Vec<RouteSpec>,
    by_name: HashMap<String, usize>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: RouteSpec) -> Result<(), RegistrationError> {
        if self.by_name.contains_key(spec.name()) {
            return Err(RegistrationError::DuplicateRoute(spec.name().to_string()));
        }
        if let Some(existing) = self
            .routes
            .iter()
            .find(|r| r.pattern.same_shape(&spec.pattern))
        {
            return Err(RegistrationError::DuplicatePattern {
                route: spec.name().to_string(),
                pattern: spec.pattern.as_str().to_string(),
                existing: existing.name().to_string(),
            });
        }

        debug!(route = spec.name(), pattern = spec.pattern.as_str(), "Route registered");
        self.by_name.insert(spec.name().to_string(), self.routes.len());
        self.routes.push(spec);
        Ok(())
    }

    /// The matching route with the most literal segments.
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute<'_>> {
        let mut best: Option<ResolvedRoute<'_>> = None;
        for route in &self.routes {
            let Some(path_params) = route.pattern.matches(path) else {
                continue;
            };
            let better = match &best {
                Some(current) => {
                    route.pattern.literal_count() > current.route.pattern.literal_count()
                }
                None => true,
            };
            if better {
                best = Some(ResolvedRoute { route, path_params });
            }
        }
        best
    }

    pub fn get(&self, name: &str) -> Option<&RouteSpec> {
        self.by_name.get(name).map(|&i| &self.routes[i])
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteSpec> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
