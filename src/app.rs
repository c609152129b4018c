#![cfg(not(tarpaulin_include))]

use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use handlebars::Handlebars;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::container::RowId;
use crate::error::{PresenterError, UploadError};
use crate::greeting;
use crate::presenter::{TablePresenter, TableView};
use crate::session::{SessionContext, SessionStore};
use crate::upload::{CompletedUpload, UploadReceiver};

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

const TABLE_TEMPLATE: &str = "table";

pub struct AppState {
    sessions: SessionStore,
    receiver: UploadReceiver,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(receiver: UploadReceiver) -> Result<Self, handlebars::TemplateError> {
        let mut templates = Handlebars::new();
        templates.register_template_string(TABLE_TEMPLATE, include_str!("./static/table.hbs"))?;

        Ok(Self {
            sessions: SessionStore::new(),
            receiver,
            templates,
        })
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Snapshot of the caller's table, or of an unbound one when the request
    /// has no live session.
    fn view(&self, jar: &CookieJar) -> TableView {
        match self.sessions.find(jar) {
            Some(session) => session.presenter().view(),
            None => TablePresenter::new().view(),
        }
    }

    fn session(&self, jar: &CookieJar) -> Result<Arc<SessionContext>, AppError> {
        self.sessions.find(jar).ok_or(AppError::NoSession)
    }

    fn render(&self, table: &TableView) -> Result<Html<String>, AppError> {
        let page = self
            .templates
            .render(TABLE_TEMPLATE, &PageContext { table })?;
        Ok(Html(page))
    }
}

#[derive(Serialize)]
struct PageContext<'a> {
    table: &'a TableView,
}

#[derive(Deserialize)]
struct ColumnSelection {
    column: String,
}

#[derive(Deserialize)]
struct CellEdit {
    row: u64,
    column: String,
    value: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Presenter(#[from] PresenterError),

    #[error("no table has been uploaded in this session")]
    NoSession,

    #[error("failed to render page: {0}")]
    Render(#[from] handlebars::RenderError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Upload(err) => upload_status(err),
            AppError::Presenter(PresenterError::NotEditable) | AppError::NoSession => {
                StatusCode::CONFLICT
            }
            AppError::Presenter(PresenterError::Container(_)) => StatusCode::NOT_FOUND,
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{self}");
        } else {
            info!("request rejected: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

fn upload_status(err: &UploadError) -> StatusCode {
    match err {
        UploadError::TempStorage(_) | UploadError::Write(_) | UploadError::Read(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        UploadError::Malformed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        UploadError::MissingFile | UploadError::Multipart(_) => StatusCode::BAD_REQUEST,
        UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
    }
}

/// Build the application router around shared state.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(serve_table_page))
        .route("/abc", get(greeting::ping))
        .route("/upload", post(upload_csv))
        .route("/columns/select", post(select_column))
        .route("/cells", post(edit_cell))
        .route("/api/table", get(get_table_data))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(UploadReceiver::new(&config.temp_dir))?);
    let app = router(state, config.max_upload_bytes);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Listening on http://{}", config.bind_addr());
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_table_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Html<String>, AppError> {
    state.render(&state.view(&jar))
}

async fn get_table_data(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<TableView> {
    Json(state.view(&jar))
}

async fn upload_csv(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    // every response below returns the jar
    let (jar, session) = state.sessions.resolve(jar);

    match receive_upload(&state.receiver, &mut multipart).await {
        Ok(upload) => {
            info!(
                "bound `{}` ({} columns, {} rows) to session {}",
                upload.filename,
                upload.container.column_count(),
                upload.container.row_count(),
                session.id()
            );
            session.presenter().bind(upload.container, upload.filename);
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(err) => {
            error!("upload failed for session {}: {err}", session.id());
            let status = upload_status(&err);
            let view = {
                let mut presenter = session.presenter();
                presenter.report_failure(err.to_string());
                presenter.view()
            };
            Ok((status, jar, state.render(&view)?).into_response())
        }
    }
}

/// Stream the first `file` field into a new upload and complete it.
async fn receive_upload(
    receiver: &UploadReceiver,
    multipart: &mut Multipart,
) -> Result<CompletedUpload, UploadError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(UploadError::MissingFile);
        }
        let mime_type = field.content_type().unwrap_or("text/csv").to_string();

        let mut handle = receiver.open(&filename, &mime_type)?;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            handle.write(&chunk)?;
        }
        // reading back and parsing the whole file blocks
        return tokio::task::spawn_blocking(move || handle.complete())
            .await
            .map_err(|e| UploadError::Read(std::io::Error::other(e)))?;
    }

    Err(UploadError::MissingFile)
}

fn multipart_error(err: MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge(err.body_text())
    } else {
        UploadError::Multipart(err.body_text())
    }
}

async fn select_column(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(selection): Form<ColumnSelection>,
) -> Result<Redirect, AppError> {
    state
        .session(&jar)?
        .presenter()
        .on_column_header_clicked(&selection.column)?;
    Ok(Redirect::to("/"))
}

async fn edit_cell(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(edit): Form<CellEdit>,
) -> Result<Redirect, AppError> {
    state
        .session(&jar)?
        .presenter()
        .edit_cell(RowId::from(edit.row), &edit.column, edit.value)?;
    Ok(Redirect::to("/"))
}
