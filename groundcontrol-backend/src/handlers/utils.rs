use std::collections::{HashMap, HashSet};

use groundcontrol_model::{JobFilter, JobStatus};
use groundcontrol_relay::ConnectionArgs;

use crate::error::ApiError;

/// Fetch a required path parameter.
pub fn path_param<'a>(path: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ApiError> {
    path.get(name)
        .map(String::as_str)
        .ok_or_else(|| ApiError::bad_request(format!("missing {name} path parameter")))
}

pub fn parse_optional_i64(raw: Option<&String>, field: &str) -> Result<Option<i64>, ApiError> {
    raw.map(|value| {
        value
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request(format!("{field} must be an integer")))
    })
    .transpose()
}

/// Parse a comma separated list of job statuses. An absent or blank value
/// means "any status".
pub fn parse_statuses(raw: Option<&String>) -> Result<Option<HashSet<JobStatus>>, ApiError> {
    let Some(raw) = raw.map(|value| value.trim()).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<JobStatus>().map_err(ApiError::bad_request))
        .collect::<Result<HashSet<_>, _>>()
        .map(Some)
}

/// Build a job filter from `status` and `ownerId` query parameters.
pub fn job_filter_from_params(params: &HashMap<String, String>) -> Result<JobFilter, ApiError> {
    Ok(JobFilter {
        statuses: parse_statuses(params.get("status"))?,
        owner_id: params
            .get("ownerId")
            .filter(|value| !value.is_empty())
            .cloned(),
    })
}

/// Build relay pagination arguments from `first`, `last`, `after` and `before`.
pub fn connection_args_from_params(
    params: &HashMap<String, String>,
) -> Result<ConnectionArgs, ApiError> {
    Ok(ConnectionArgs {
        after: params.get("after").cloned(),
        before: params.get("before").cloned(),
        first: parse_optional_i64(params.get("first"), "first")?,
        last: parse_optional_i64(params.get("last"), "last")?,
    })
}
