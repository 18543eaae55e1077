use async_graphql::{
    http::GraphiQLSource, Context, EmptySubscription, ErrorExtensions, MergedObject, Schema,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::auth::extractors::BearerToken;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

mod auth;
mod catalog;
mod types;

#[derive(MergedObject, Default)]
pub struct QueryRoot(auth::ProfileQuery, catalog::CatalogQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(auth::AuthMutation, catalog::CatalogMutation);

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> AppSchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(state)
        .finish()
}

pub fn router() -> Router<AppSchema> {
    Router::new().route("/graphql", get(graphiql).post(graphql_handler))
}

async fn graphql_handler(
    State(schema): State<AppSchema>,
    token: BearerToken,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner().data(token)).await.into()
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Bearer token the transport attached to this request.
pub(crate) fn bearer<'a>(ctx: &'a Context<'_>) -> Option<&'a str> {
    ctx.data_opt::<BearerToken>().and_then(BearerToken::as_deref)
}

/// Guard rejections become GraphQL errors; every other outcome stays with the
/// resolver so it can be reported in the payload.
pub(crate) fn reject_unauthorized<T>(
    result: AppResult<T>,
) -> async_graphql::Result<AppResult<T>> {
    match result {
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized.extend()),
        other => Ok(other),
    }
}
