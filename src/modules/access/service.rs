use tracing::debug;

use gatehouse_core::{AccessPipeline, AppError, Decision, Principal, RawParams, Verdict};

use crate::metrics::{track_collaborator_failure, track_verdict};

/// Label used for requests no route matches.
pub const UNMATCHED_ROUTE: &str = "unmatched";

pub struct AccessService;

impl AccessService {
    /// Resolve `path`, run the pipeline and turn a denial into an [`AppError`].
    pub async fn validate(
        pipeline: &AccessPipeline,
        path: &str,
        query: Vec<(String, String)>,
        principal: &Principal,
    ) -> Result<(), AppError> {
        let (label, decision) = match pipeline.resolve(path) {
            Some(resolved) => {
                let route = resolved.route;
                let raw = RawParams::new(resolved.path_params, query);
                match pipeline.evaluate(route, principal, &raw).await {
                    Ok(decision) => (route.name(), decision),
                    Err(err) => {
                        track_collaborator_failure(route.name());
                        return Err(err.into());
                    }
                }
            }
            None => {
                debug!(path, "No access-validated page matches");
                (UNMATCHED_ROUTE, Decision::unknown_route())
            }
        };

        track_verdict(label, decision.verdict.label());
        match decision.verdict {
            Verdict::Allowed => Ok(()),
            Verdict::Denied(kind) => Err(kind.into()),
        }
    }
}
