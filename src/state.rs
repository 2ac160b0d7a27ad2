use std::sync::Arc;

use axum::extract::FromRef;

use crate::{auth::TokenIssuer, db::OrmConn};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub tokens: Arc<TokenIssuer>,
}

impl FromRef<AppState> for Arc<TokenIssuer> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
