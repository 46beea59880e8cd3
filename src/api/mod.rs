//! Request/response contract of the revision endpoints.
//!
//! Each handler takes an already-decoded request, runs it against the
//! storage client and returns a status code plus JSON body, the same shapes
//! the browser front end consumes: `{ message, novoCustoPrevisto, project }`
//! on a successful append, the raw rows for lists, and `{ error }` with a
//! 4xx/5xx status on any failure. Routing and transport belong to whoever
//! embeds these handlers.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::db::Database;
use crate::error::{CustosError, CustosResult};
use crate::models::{InitialValues, NewProject, NewRevision, Project};

pub(crate) const REVISION_CREATED: &str = "Reorçamento criado com sucesso";

pub(crate) type AppendRevisionRequest = NewRevision;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn from_error(err: &CustosError) -> Self {
        if err.is_validation() || err.is_not_found() {
            warn!(status = err.status_code(), error = %err, "request rejected");
        } else {
            error!(error = %err, "request failed in storage");
        }
        Self {
            status: err.status_code(),
            body: json!({ "error": err.to_string() }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendRevisionResponse {
    message: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    novo_custo_previsto: Decimal,
    project: Project,
}

/// Decodes a JSON request body. Malformed bodies are validation errors.
pub(crate) fn parse_body<T: DeserializeOwned>(raw: &str) -> CustosResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| CustosError::Validation(format!("invalid request body: {e}")))
}

fn respond<T: Serialize>(result: CustosResult<T>) -> Response {
    match result {
        Ok(value) => match serde_json::to_value(&value) {
            Ok(body) => Response { status: 200, body },
            Err(e) => Response::from_error(&CustosError::Persistence(e.to_string())),
        },
        Err(err) => Response::from_error(&err),
    }
}

/// `POST /api/reorcamentos`
pub(crate) fn append_revision(db: &mut Database, request: &AppendRevisionRequest) -> Response {
    let result = db
        .append_revision(request)
        .map(|applied| {
            info!(
                revision_id = applied.revision.id,
                project_id = applied.revision.project_id,
                "POST /api/reorcamentos"
            );
            AppendRevisionResponse {
                message: REVISION_CREATED,
                novo_custo_previsto: applied.novo_custo_previsto,
                project: applied.project,
            }
        });
    respond(result)
}

/// `GET /api/reorcamentos/:projectId`
pub(crate) fn list_revisions(db: &Database, project_id: i64) -> Response {
    respond(db.list_revisions(project_id))
}

/// `GET /api/reorcamentos/:projectId/acumulado`
pub(crate) fn cumulative_series(db: &Database, project_id: i64) -> Response {
    respond(db.cumulative_series(project_id))
}

/// `POST /api/projects`
pub(crate) fn create_project(db: &Database, request: &NewProject) -> Response {
    respond(db.insert_project(request))
}

/// `GET /api/projects/:id`
pub(crate) fn get_project(db: &Database, id: i64) -> Response {
    respond(db.require_project(id))
}

/// `PUT /api/projects/:id`
///
/// Resets the forecast cost to the new initial cost; see
/// [`Database::reset_initial`].
pub(crate) fn update_project(db: &mut Database, id: i64, request: &InitialValues) -> Response {
    respond(db.reset_initial(id, request.venda_inicial, request.custo_inicial))
}
