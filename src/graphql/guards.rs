use async_graphql::{Context, Guard, Result};
use axum::http::HeaderMap;

/// The header the front desk sends its staff token in.
pub const STAFF_TOKEN_HEADER: &str = "BARBELL_TOKEN";

/// Request data marking the caller as staff.
#[derive(Clone, Copy, Debug)]
pub struct Staff;

pub struct StaffOnly;

#[async_trait::async_trait]
impl Guard for StaffOnly {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        if ctx.data_opt::<Staff>().is_some() {
            Ok(())
        } else {
            Err(format!("A valid {} header is required", STAFF_TOKEN_HEADER).into())
        }
    }
}

/// Whether the request comes from staff. Without a configured token
/// everyone is staff.
pub fn is_staff(headers: &HeaderMap, staff_token: Option<&str>) -> bool {
    match staff_token {
        None => true,
        Some(expected) => get_token(headers).map_or(false, |token| token == expected.trim()),
    }
}

pub(crate) fn get_token(headers: &HeaderMap) -> Option<&str> {
    headers.iter().find_map(|(name, value)| {
        if name == STAFF_TOKEN_HEADER {
            value.to_str().ok().map(str::trim)
        } else {
            None
        }
    })
}
